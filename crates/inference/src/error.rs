use crate::config::ModelFamily;
use thiserror::Error;

/// Request- and startup-level failures of the detection pipeline.
#[derive(Error, Debug)]
pub enum DetectError {
    /// The engine output does not have the length the configured layout implies.
    #[error("Output layout mismatch for {family} model: expected {expected} values, got {actual}")]
    LayoutMismatch {
        family: ModelFamily,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Inference failed: {0:#}")]
    InferenceFailure(anyhow::Error),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

impl DetectError {
    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        DetectError::InvalidConfig(msg.into())
    }
}
