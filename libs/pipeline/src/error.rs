//! Errors returned by `Consumer::consume`

use courier_codec::{ConsumeError, ConsumeStage, PublishError};
use thiserror::Error;

/// Consume-side failure, or the downstream publisher's failure unchanged
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Consume(#[from] ConsumeError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl PipelineError {
    /// Stage that failed when the error came from the consume side
    pub fn consume_stage(&self) -> Option<ConsumeStage> {
        match self {
            PipelineError::Consume(err) => Some(err.stage()),
            PipelineError::Publish(_) => None,
        }
    }

    pub fn as_consume(&self) -> Option<&ConsumeError> {
        match self {
            PipelineError::Consume(err) => Some(err),
            PipelineError::Publish(_) => None,
        }
    }

    pub fn as_publish(&self) -> Option<&PublishError> {
        match self {
            PipelineError::Publish(err) => Some(err),
            PipelineError::Consume(_) => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
