//! Error types for the taskling domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the top-level `Error` is
//! what the gateway maps onto HTTP statuses.

use thiserror::Error;

/// The top-level error type for all taskling operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Model errors ---
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    // --- Request-level failures ---
    /// The request itself was malformed (empty message, bad field value).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The caller does not own the referenced conversation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by model API, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_displays_correctly() {
        let err = Error::Model(ModelError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn store_error_wraps_into_top_level() {
        let err = Error::from(StoreError::QueryFailed("no such table: tasks".into()));
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn forbidden_names_the_resource() {
        let err = Error::Forbidden("conversation 0b2f is not yours".into());
        assert!(err.to_string().contains("0b2f"));
    }
}
