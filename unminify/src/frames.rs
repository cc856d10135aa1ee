use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// A frame token is `/<path>.js:<line>:<column>`, where <path> is the shortest run of
// characters that makes the rest match, and may be preceded by anything at all. Only the
// leftmost token on a line is considered. Digits are ASCII only.
static FRAME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(.*?)\.js:([0-9]+):([0-9]+)").expect("frame token pattern is valid"));

const GENERATED_EXTENSION: &str = ".js";

/// A generated position as reported in a stack trace, 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedPosition {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

/// The candidate token found on a trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameToken {
    pub span: Range<usize>,
    pub position: GeneratedPosition,
}

impl FrameToken {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.span.clone()]
    }
}

/// Find the first frame token on a line of trace text.
///
/// A token whose line or column doesn't fit in 32 bits is treated as no match at all.
pub fn match_frame(line: &str) -> Option<FrameToken> {
    let captures = FRAME_TOKEN.captures(line)?;
    let whole = captures.get(0)?;
    let path = captures.get(1)?.as_str();
    let line_number = captures.get(2)?.as_str().parse().ok()?;
    let column = captures.get(3)?.as_str().parse().ok()?;

    Some(FrameToken {
        span: whole.range(),
        position: GeneratedPosition {
            file: format!("{}{}", path, GENERATED_EXTENSION),
            line: line_number,
            column,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    // Original line and column are 1-based, as they're shown to people. Wider than the
    // map's own positions so the last representable one still renders.
    Resolved {
        source: String,
        line: u64,
        column: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Unresolved,
    NoMatch,
}

/// One line of a stack trace, and what we managed to do with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StackFrame {
    pub raw_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedPosition>,
    pub resolution: Resolution,
}

impl StackFrame {
    pub fn unmatched(raw_line: &str) -> Self {
        Self {
            raw_line: raw_line.to_string(),
            matched_token: None,
            generated: None,
            resolution: Resolution::NoMatch,
        }
    }

    pub fn matched(raw_line: &str, token: &FrameToken, resolution: Resolution) -> Self {
        Self {
            raw_line: raw_line.to_string(),
            matched_token: Some(token.text(raw_line).to_string()),
            generated: Some(token.position.clone()),
            resolution,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }
}
