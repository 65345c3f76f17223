//! Error types for request handlers.

/// Failures a handler reports to the caller instead of crashing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FunctionError {
    /// A path parameter the route declares is absent or empty.
    #[error("missing path parameter: {0}")]
    MissingPathParameter(String),

    /// The request body could not be parsed.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// An unexpected failure inside the handler.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FunctionError {
    /// HTTP status code reported for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingPathParameter(_) | Self::InvalidBody(_) => 400,
            Self::Internal(_) => 500,
        }
    }
}
