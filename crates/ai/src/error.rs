//! Stream error types.

use thiserror::Error;

/// Errors raised while running a provider stream.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The upstream provider failed or closed the stream abnormally.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl StreamError {
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }
}

/// Error code for programmatic handling in stream events.
impl StreamError {
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::Provider(_) => "PROVIDER_ERROR",
        }
    }
}
