//! Common error types used throughout episonext.
//!
//! Per-item enrichment failures are recovered locally by the engine; this
//! type names the failure so it can be logged and counted.

/// Common error type for episonext.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested title or season was not found in the catalog.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A watch item or configuration value violated its contract.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external catalog returned an error or could not be reached.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// An upstream call did not complete within its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Upstream error.
    pub fn upstream<S: Into<String>>(msg: S) -> Self {
        Self::Upstream(msg.into())
    }

    /// Create a new Timeout error.
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failure came from the external catalog (network, HTTP
    /// status, or deadline) rather than from the caller's input.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Timeout(_))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
