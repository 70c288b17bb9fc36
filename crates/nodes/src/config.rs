//! Node configuration.
//!
//! Every section has defaults so an empty configuration file yields the
//! standard pipeline with every node enabled.

use serde::{Deserialize, Serialize};

/// Which cross-cutting nodes the standard pipeline includes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub expansion: ExpansionConfig,
    pub validation: ValidationConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Include [`crate::ExpandEnvironmentVariables`].
    pub enabled: bool,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Include [`crate::ValidateRequiredResource`].
    pub enabled: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Include [`crate::CacheInMemory`].
    pub enabled: bool,
    /// TTL applied by callers that do not choose one. Zero disables caching
    /// for those callers.
    pub default_max_age_secs: u64,
    /// Upper bound on cached responses.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_max_age_secs: 0,
            max_entries: crate::DEFAULT_MAX_ENTRIES,
        }
    }
}
