//! Renderer error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RendererError {
    #[error("Unable to allocate buffers of {len} elements")]
    Allocation { len: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Nothing has been iterated yet")]
    NotYetIterated,

    #[error("Iteration ceiling reached: {requested} exceeds {ceiling}")]
    IterationCeilingReached { requested: u32, ceiling: u16 },

    #[error("Renderer has been freed")]
    Freed,
}

impl RendererError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RendererError::InvalidParameter(message.into())
    }
}
