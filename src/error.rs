//! Error types for Guide Assist.
//!
//! The chat engine itself cannot fail: the fallback intent guarantees a
//! match for any input and the tour accepts every transition. Errors only
//! arise at construction and collaborator boundaries.

/// Top-level error type for the application.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Content generation error: {0}")]
    GenAi(#[from] GenAiError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Intent catalog / tour script construction errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Intent {id} has an empty response list")]
    EmptyResponses { id: String },

    #[error("Duplicate intent id: {id}")]
    DuplicateIntent { id: String },

    #[error("Catalog must contain exactly one fallback intent (empty keyword set), found {count}")]
    FallbackCount { count: usize },

    #[error("Tour script must contain at least one step")]
    EmptyTour,

    #[error("Duplicate tour step id: {id}")]
    DuplicateStep { id: String },
}

/// Generative-content collaborator errors.
///
/// These never escape the `genai` module's public surface — callers receive
/// fixed fallback values instead (see `genai::GeminiClient`).
#[derive(Debug, thiserror::Error)]
pub enum GenAiError {
    #[error("Request to {endpoint} failed: {reason}")]
    RequestFailed { endpoint: String, reason: String },

    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Could not extract text from model response: {reason}")]
    EmptyResponse { reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for the application.
pub type Result<T> = std::result::Result<T, Error>;
