//! Pipeline error types.

use std::path::PathBuf;

use crate::build::format::FormatError;
use crate::build::render::RenderError;
use crate::build::search::SearchError;
use crate::build::shortcodes::ShortcodeError;

/// Errors that can occur during pipeline processing.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("{path}: shortcode error: {source}")]
    Shortcode {
        path: PathBuf,
        source: ShortcodeError,
    },

    #[error("{path}: {source}")]
    Render { path: PathBuf, source: RenderError },

    #[error("{path}: {source}")]
    Format { path: PathBuf, source: FormatError },

    #[error("search indexing failed: {0}")]
    Search(#[from] SearchError),

    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl PipelineError {
    /// Create a stage-specific error.
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}
