//! Pipeline error types
//!
//! Raised while resolving stage order, before any stage exists.

use thiserror::Error;

/// Pipeline configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    /// `disable` named a stage that is not in the pipeline
    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    /// `Before`/`After` named an anchor that is not in the pipeline
    #[error("stage '{stage}' is positioned relative to unknown stage '{anchor}'")]
    UnknownAnchor { stage: String, anchor: String },

    /// A stage was positioned relative to itself
    #[error("stage '{stage}' cannot be positioned relative to itself")]
    SelfAnchor { stage: String },
}

impl PipelineError {
    pub fn unknown_anchor(stage: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self::UnknownAnchor {
            stage: stage.into(),
            anchor: anchor.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
