pub mod app_context;
pub mod config;
pub mod error;
pub mod frames;
pub mod metric_consts;
pub mod resolver;
pub mod router;
pub mod server;
pub mod sourcemap;
pub mod store;

pub use resolver::{resolve_trace, AnnotatedTrace, Markup, Resolver};
pub use sourcemap::SourceMap;
