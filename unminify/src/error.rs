use std::sync::Arc;

use thiserror::Error;

// Structural problems with a source map. Any of these makes the whole map unusable,
// we never hand back a partially decoded segment table.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("Malformed VLQ mapping data: {0}")]
    MalformedVlq(String),
    #[error("Unsupported source map version: {0}")]
    UnsupportedVersion(String),
    #[error("Source index {index} out of range, map has {len} sources")]
    SourceIndexOutOfRange { index: i64, len: usize },
    #[error("Name index {index} out of range, map has {len} names")]
    NameIndexOutOfRange { index: i64, len: usize },
    #[error("Invalid source map JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Map file not found: {0}")]
    NotFound(String),
    #[error("Invalid map path: {0}")]
    InvalidPath(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

// A failure of a whole resolution request. Per-line misses are not errors, they
// show up as `Resolution::Unresolved` on the frame instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Store(#[from] StoreError),
    // Failures from a cached build are handed to every waiter on that build
    #[error(transparent)]
    Shared(#[from] Arc<ResolveError>),
}

impl ResolveError {
    // Look through any layers of sharing to the failure that actually happened
    pub fn root(&self) -> &ResolveError {
        match self {
            ResolveError::Shared(inner) => inner.root(),
            other => other,
        }
    }
}
