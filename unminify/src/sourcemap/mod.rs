use serde::Deserialize;

use crate::error::MapError;

pub mod index;
pub mod mappings;
pub mod vlq;

pub use index::PositionIndex;
pub use mappings::{parse_mappings, Origin, Segment};

const SUPPORTED_VERSION: u64 = 3;

// The on-disk JSON shape. Anything we don't name here is ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    // Any JSON at all, so a wrong version is reported as such rather than as bad JSON
    version: serde_json::Value,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: String,
}

/// A decoded, queryable source map.
#[derive(Debug)]
pub struct SourceMap {
    pub file: Option<String>,
    pub sources: Vec<String>,
    pub names: Vec<String>,
    index: PositionIndex,
}

/// A resolved original position. Line and column are 0-based, like everything else
/// inside the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition<'a> {
    pub source: &'a str,
    pub line: u32,
    pub column: u32,
    pub name: Option<&'a str>,
}

impl SourceMap {
    pub fn from_json(raw: &str) -> Result<Self, MapError> {
        let raw: RawSourceMap = serde_json::from_str(raw)?;
        Self::from_raw(raw)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, MapError> {
        let raw: RawSourceMap = serde_json::from_slice(raw)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSourceMap) -> Result<Self, MapError> {
        if raw.version.as_u64() != Some(SUPPORTED_VERSION) {
            return Err(MapError::UnsupportedVersion(raw.version.to_string()));
        }

        let segments = parse_mappings(&raw.mappings, raw.sources.len(), raw.names.len())?;

        let sources = match raw.source_root.as_deref() {
            Some(root) if !root.is_empty() => raw
                .sources
                .into_iter()
                .map(|s| join_source_root(root, &s))
                .collect(),
            _ => raw.sources,
        };

        Ok(Self {
            file: raw.file,
            sources,
            names: raw.names,
            index: PositionIndex::new(segments),
        })
    }

    pub fn index(&self) -> &PositionIndex {
        &self.index
    }

    /// Resolve a 0-based generated position to its original position.
    pub fn lookup(&self, line: u32, column: u32) -> Option<OriginalPosition<'_>> {
        let (_, origin) = self.index.query(line, column)?;
        // Both indexes were bounds-checked during the parse
        let source = self.sources.get(origin.source_index as usize)?;
        let name = origin
            .name_index
            .and_then(|i| self.names.get(i as usize))
            .map(String::as_str);

        Some(OriginalPosition {
            source,
            line: origin.line,
            column: origin.column,
            name,
        })
    }
}

fn join_source_root(root: &str, source: &str) -> String {
    if source.starts_with('/') || source.contains("://") {
        return source.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), source)
}
