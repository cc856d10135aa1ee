use std::{
    path::PathBuf,
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};

use moka::future::{Cache, CacheBuilder};
use tracing::{debug, warn};

use crate::{
    config::Config,
    error::{MapError, ResolveError, StoreError},
    frames::{match_frame, FrameToken, Resolution, StackFrame},
    metric_consts::{
        FRAMES_RESOLVED, FRAMES_UNMATCHED, FRAMES_UNRESOLVED, MAP_CACHE_HITS, MAP_CACHE_MISSES,
        MAP_PARSE_ERRORS, MAP_PARSE_TIME, TRACES_RESOLVED,
    },
    sourcemap::SourceMap,
    store::MapStore,
};

const NOT_FOUND_MESSAGE: &str = "(error: original position not found)";

/// How resolved and unresolved frames are marked in the annotated trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    #[default]
    Html,
    Plain,
}

impl Markup {
    fn highlight(&self, location: &str) -> String {
        match self {
            Markup::Html => format!("<span class=\"highlight\">{}</span>", location),
            Markup::Plain => location.to_string(),
        }
    }

    fn not_found(&self) -> String {
        match self {
            Markup::Html => format!(" <span class=\"error\">{}</span>", NOT_FOUND_MESSAGE),
            Markup::Plain => format!(" {}", NOT_FOUND_MESSAGE),
        }
    }
}

impl FromStr for Markup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "html" => Ok(Markup::Html),
            "plain" => Ok(Markup::Plain),
            other => Err(format!("unknown markup: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedTrace {
    pub text: String,
    pub frames: Vec<StackFrame>,
}

/// Parse a source map and resolve every frame of a stack trace against it. A broken map
/// fails the whole thing, a frame that can't be resolved only marks its own line.
pub fn resolve_trace(
    map_text: &str,
    trace: &str,
    markup: Markup,
) -> Result<AnnotatedTrace, MapError> {
    let map = SourceMap::from_json(map_text)?;
    Ok(annotate(&map, trace, markup))
}

pub fn annotate(map: &SourceMap, trace: &str, markup: Markup) -> AnnotatedTrace {
    let mut lines = Vec::new();
    let mut frames = Vec::new();

    for line in trace.split('\n') {
        let (annotated, frame) = annotate_line(map, line, markup);
        lines.push(annotated);
        frames.push(frame);
    }

    metrics::counter!(TRACES_RESOLVED).increment(1);

    AnnotatedTrace {
        text: lines.join("\n"),
        frames,
    }
}

fn annotate_line(map: &SourceMap, line: &str, markup: Markup) -> (String, StackFrame) {
    let Some(token) = match_frame(line) else {
        metrics::counter!(FRAMES_UNMATCHED).increment(1);
        return (line.to_string(), StackFrame::unmatched(line));
    };

    let resolution = resolve_token(map, &token);
    let annotated = match &resolution {
        Resolution::Resolved {
            source,
            line: original_line,
            column,
            ..
        } => {
            metrics::counter!(FRAMES_RESOLVED).increment(1);
            let location = format!("{}:{}:{}", source, original_line, column);
            format!(
                "{}{}{}",
                &line[..token.span.start],
                markup.highlight(&location),
                &line[token.span.end..]
            )
        }
        _ => {
            metrics::counter!(FRAMES_UNRESOLVED).increment(1);
            // Keep a trailing \r at the very end of the line
            match line.strip_suffix('\r') {
                Some(body) => format!("{}{}\r", body, markup.not_found()),
                None => format!("{}{}", line, markup.not_found()),
            }
        }
    };

    let frame = StackFrame::matched(line, &token, resolution);
    (annotated, frame)
}

fn resolve_token(map: &SourceMap, token: &FrameToken) -> Resolution {
    // Traces report 1-based lines, the map is 0-based. Columns are used as given.
    let Some(line) = token.position.line.checked_sub(1) else {
        return Resolution::Unresolved;
    };

    match map.lookup(line, token.position.column) {
        Some(pos) => Resolution::Resolved {
            source: pos.source.to_string(),
            line: u64::from(pos.line) + 1,
            column: u64::from(pos.column) + 1,
            name: pos.name.map(str::to_string),
        },
        None => Resolution::Unresolved,
    }
}

type MapKey = (PathBuf, SystemTime);

/// Resolves traces against maps in a [`MapStore`]. Parsed maps are optionally cached,
/// keyed by path and modification time, so an overwritten map is picked up again.
pub struct Resolver {
    store: MapStore,
    cache: Option<Cache<MapKey, Arc<SourceMap>>>,
    markup: Markup,
}

impl Resolver {
    pub fn new(config: &Config, store: MapStore) -> Self {
        let cache = (config.map_cache_size > 0).then(|| {
            CacheBuilder::new(config.map_cache_size)
                .time_to_live(Duration::from_secs(config.map_cache_ttl_seconds))
                .build()
        });

        Self {
            store,
            cache,
            markup: config.output_markup,
        }
    }

    pub fn store(&self) -> &MapStore {
        &self.store
    }

    pub async fn resolve(&self, map_id: &str, trace: &str) -> Result<AnnotatedTrace, ResolveError> {
        let map = self.load(map_id).await?;
        Ok(annotate(&map, trace, self.markup))
    }

    pub async fn load(&self, map_id: &str) -> Result<Arc<SourceMap>, ResolveError> {
        let Some(cache) = &self.cache else {
            return self.build(map_id).await;
        };

        let key = self.store.stat(map_id).await?;
        if let Some(map) = cache.get(&key).await {
            metrics::counter!(MAP_CACHE_HITS).increment(1);
            return Ok(map);
        }
        metrics::counter!(MAP_CACHE_MISSES).increment(1);

        // Concurrent misses on the same key wait on a single build
        Ok(cache.try_get_with(key, self.build(map_id)).await?)
    }

    async fn build(&self, map_id: &str) -> Result<Arc<SourceMap>, ResolveError> {
        let raw = self.store.read_map_file(map_id).await?;

        let start = Instant::now();
        let parsed = tokio::task::spawn_blocking(move || SourceMap::from_json(&raw))
            .await
            .map_err(StoreError::from)?;
        metrics::histogram!(MAP_PARSE_TIME).record(start.elapsed().as_secs_f64());

        match parsed {
            Ok(map) => {
                debug!("Parsed {} with {} segments", map_id, map.index().len());
                Ok(Arc::new(map))
            }
            Err(e) => {
                metrics::counter!(MAP_PARSE_ERRORS).increment(1);
                warn!("Failed to parse source map {}: {}", map_id, e);
                Err(e.into())
            }
        }
    }
}
