//! Error types for the Master Mind domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator has its own error enum; the pipeline recovers from
//! most of them locally and only surfaces [`Error`] for failures that
//! prevent building a response at all.

use thiserror::Error;

/// The top-level error type for all Master Mind operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion Service errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Memory Store errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Caller errors ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Collaborator errors ---

/// Failures talking to the Completion Service.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider returned no usable content")]
    EmptyResponse,
}

/// Failures talking to the Memory Store.
#[derive(Debug, Clone, Error)]
pub enum MemoryError {
    #[error("Memory store request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Memory store rejected credentials: {0}")]
    AuthenticationFailed(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Could not decode memory store response: {0}")]
    Decode(String),

    #[error("Memory store not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn memory_error_converts_into_top_level() {
        let err: Error = MemoryError::Network("connection refused".into()).into();
        assert!(matches!(err, Error::Memory(MemoryError::Network(_))));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn invalid_request_keeps_detail() {
        let err = Error::InvalidRequest("user_id must not be empty".into());
        assert_eq!(err.to_string(), "Invalid request: user_id must not be empty");
    }
}
