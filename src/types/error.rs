//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for the generation client's retry decisions.
//!
//! ## Error Categories
//!
//! - **RateLimit**: Backend rate limiting (wait and retry)
//! - **Transient**: Temporary server issues (retry)
//! - **Network**: Connectivity issues (retry with backoff)
//! - **Auth**: Authentication failures (fail fast)
//! - **BadRequest**: Request rejected as malformed (fail fast)
//!
//! ## Tiers
//!
//! Only configuration, credential, root directory and change-source errors are fatal.
//! Everything below that is accumulated into the run report by the pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Error categories for retry decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Rate limited - wait then retry
    RateLimit,
    /// Context/token limit exceeded - retrying the same prompt won't help
    TokenLimit,
    /// Authentication failed - fail fast, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Backend missing (404, model not installed)
    Unavailable,
    /// Invalid request - don't retry, fix request
    BadRequest,
    /// Backend answered with a body we could not decode
    ParseError,
    /// Temporary server issues - retry
    Transient,
    /// Unknown error - no retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::TokenLimit => write!(f, "TOKEN_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Check if this category is retryable with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError
        )
    }

    /// Get recommended minimum delay for this category
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(30),
            Self::Network => Duration::from_secs(5),
            Self::Transient => Duration::from_secs(2),
            Self::ParseError => Duration::from_secs(1),
            _ => Duration::from_millis(500),
        }
    }
}

// =============================================================================
// LLM Error
// =============================================================================

/// Backend error with category, context, and retry hints
#[derive(Debug, Clone)]
pub struct LlmError {
    /// Error category for retry decisions
    pub category: ErrorCategory,
    /// Detailed error message
    pub message: String,
    /// Provider that produced the error
    pub provider: Option<String>,
    /// Suggested wait time before retry (if the backend sent one)
    pub retry_after: Option<Duration>,
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(provider) = &self.provider {
            write!(f, "[{}:{}] {}", provider, self.category, self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            provider: None,
            retry_after: None,
        }
    }

    pub fn with_provider(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: Some(provider.into()),
            retry_after: None,
        }
    }

    /// Add suggested retry delay
    pub fn retry_after(mut self, duration: Duration) -> Self {
        self.retry_after = Some(duration);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    /// Get recommended retry delay
    pub fn recommended_delay(&self) -> Duration {
        self.retry_after
            .unwrap_or_else(|| self.category.recommended_delay())
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps transport failures and HTTP statuses to error categories
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify HTTP status code directly
    pub fn classify_http_status(status: u16, message: &str, provider: &str) -> LlmError {
        match status {
            429 => LlmError::with_provider(ErrorCategory::RateLimit, message, provider)
                .retry_after(Duration::from_secs(30)),
            401 | 403 => LlmError::with_provider(ErrorCategory::Auth, message, provider),
            400 | 422 => {
                let lower = message.to_lowercase();
                if lower.contains("context length") || lower.contains("maximum context") {
                    LlmError::with_provider(ErrorCategory::TokenLimit, message, provider)
                } else {
                    LlmError::with_provider(ErrorCategory::BadRequest, message, provider)
                }
            }
            404 => LlmError::with_provider(ErrorCategory::Unavailable, message, provider),
            408 => LlmError::with_provider(ErrorCategory::Network, message, provider),
            // 500 series are transient - can retry
            500..=599 => LlmError::with_provider(ErrorCategory::Transient, message, provider)
                .retry_after(Duration::from_secs(5)),
            _ => LlmError::with_provider(ErrorCategory::Unknown, message, provider),
        }
    }

    /// Classify a reqwest transport error (no HTTP status received)
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> LlmError {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return LlmError::with_provider(ErrorCategory::Network, err.to_string(), provider);
        }
        if err.is_decode() || err.is_body() {
            return LlmError::with_provider(ErrorCategory::ParseError, err.to_string(), provider);
        }
        if let Some(status) = err.status() {
            return Self::classify_http_status(status.as_u16(), &err.to_string(), provider);
        }
        LlmError::with_provider(ErrorCategory::Unknown, err.to_string(), provider)
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DocsmithError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Fatal Errors
    // -------------------------------------------------------------------------
    #[error("Root directory {path} is not readable: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // File-scoped Errors
    // -------------------------------------------------------------------------
    #[error("Parse error in {path}: {message}")]
    Parse { message: String, path: String },

    #[error("Cannot read {path}: {message}")]
    Unreadable { message: String, path: String },

    #[error("Invalid patch for {path}: {message}")]
    Patch { message: String, path: String },

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    /// Structured backend error with category and retry hints
    #[error("LLM error: {0}")]
    Llm(LlmError),

    #[error("Version control error: {0}")]
    Vcs(String),

    #[error("Delivery failed via {sink}: {message}")]
    Delivery { sink: String, message: String },
}

impl From<LlmError> for DocsmithError {
    fn from(err: LlmError) -> Self {
        DocsmithError::Llm(err)
    }
}

pub type Result<T> = std::result::Result<T, DocsmithError>;

impl DocsmithError {
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            path: path.into(),
        }
    }

    pub fn patch(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Patch {
            message: message.into(),
            path: path.into(),
        }
    }

    /// Errors that abort the whole run rather than a single file or declaration
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::RootUnreadable { .. }
                | Self::MissingCredentials(_)
                | Self::Config(_)
                | Self::Vcs(_)
                | Self::Delivery { .. }
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Transient.to_string(), "TRANSIENT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
        assert!(!ErrorCategory::TokenLimit.is_retryable());
    }

    #[test]
    fn test_classify_http_status() {
        let rate_limit = ErrorClassifier::classify_http_status(429, "Rate limited", "test");
        assert_eq!(rate_limit.category, ErrorCategory::RateLimit);
        assert!(rate_limit.recommended_delay() >= Duration::from_secs(30));

        let auth = ErrorClassifier::classify_http_status(401, "Unauthorized", "test");
        assert_eq!(auth.category, ErrorCategory::Auth);

        let server_error = ErrorClassifier::classify_http_status(503, "Overloaded", "test");
        assert_eq!(server_error.category, ErrorCategory::Transient);

        let too_long =
            ErrorClassifier::classify_http_status(400, "maximum context length is 8192", "test");
        assert_eq!(too_long.category, ErrorCategory::TokenLimit);
    }

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::with_provider(ErrorCategory::RateLimit, "Too many requests", "openai");
        assert_eq!(err.to_string(), "[openai:RATE_LIMIT] Too many requests");

        let err_no_provider = LlmError::new(ErrorCategory::Network, "Connection failed");
        assert_eq!(err_no_provider.to_string(), "[NETWORK] Connection failed");
    }

    #[test]
    fn test_fatal_tiers() {
        assert!(DocsmithError::MissingCredentials("OPENAI_API_KEY".into()).is_fatal());
        assert!(DocsmithError::Config("bad".into()).is_fatal());
        assert!(!DocsmithError::parse("a.ts", "syntax").is_fatal());
        assert!(!DocsmithError::patch("a.ts", "overlap").is_fatal());
    }
}
