//! Cross-cutting resource pipeline nodes.
//!
//! | Node | Acts on | Behavior |
//! |------|---------|----------|
//! | [`ExpandEnvironmentVariables`] | every request | substitutes `%VAR%` / `${VAR}` in the name |
//! | [`ValidateRequiredResource`] | required reads | turns not-found into an error |
//! | [`SerializeJson`] | typed bodies | JSON-encodes requests, decodes expected responses |
//! | [`CacheInMemory`] | reads with a TTL | serves copies of recent successful responses |
//! | [`CreateBodyStream`] | create/update | materializes deferred bodies |
//!
//! [`standard_pipeline`] composes them in that order in front of a terminal.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Nodes inspect and rewrite requests; they never touch a
//! backend directly.

mod body_stream;
mod cache;
pub mod config;
mod expand;
mod serialize;
mod validate;

use std::sync::Arc;

pub use body_stream::CreateBodyStream;
pub use cache::{CacheInMemory, DEFAULT_MAX_ENTRIES};
pub use config::{CacheConfig, ExpansionConfig, PipelineConfig, ValidationConfig};
pub use expand::ExpandEnvironmentVariables;
pub use serialize::SerializeJson;
pub use validate::ValidateRequiredResource;

use pipeline::{Node, Pipeline, Terminal};

/// Composes the standard node order in front of `terminal`.
///
/// `codecs` (typically [`SerializeJson`] instances) run after validation and
/// before the cache, so cached bodies are stored encoded and decoded per hit.
pub fn standard_pipeline(
    config: &PipelineConfig,
    terminal: Arc<dyn Terminal>,
    codecs: Vec<Arc<dyn Node>>,
) -> Pipeline {
    let mut builder = Pipeline::builder(terminal);
    if config.expansion.enabled {
        builder = builder.node(ExpandEnvironmentVariables::new());
    }
    if config.validation.enabled {
        builder = builder.node(ValidateRequiredResource);
    }
    for codec in codecs {
        builder = builder.shared_node(codec);
    }
    if config.cache.enabled {
        builder = builder.node(CacheInMemory::with_capacity(config.cache.max_entries));
    }
    builder.node(CreateBodyStream).build()
}
