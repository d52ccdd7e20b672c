//! Configuration loading and types for lectern.
//!
//! This module handles all aspects of configuration:
//! - Type definitions for config structures (`types`)
//! - Loading configs from files (`load`)
//! - The per-invocation build context read from the environment (`context`)

mod context;
mod load;
mod types;

pub use context::BuildContext;
pub use types::{CollectionConfig, Config, MarkdownConfig, SearchConfig, WatchConfig};

// =============================================================================
// Errors
// =============================================================================

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to deserialize config: {0}")]
    Deserialize(#[from] ::config::ConfigError),

    #[error("failed to get current working directory: {0}")]
    CwdFailure(std::io::Error),

    #[error("{0}")]
    Validation(String),
}
