//! Error types for the generation pipeline and the completion providers.
//!
//! `ProviderError` lives in `studyforge-core` so the assembler can downcast
//! provider failures and decide whether to retry without string matching.

use thiserror::Error;

/// Errors that abort a generation or evaluation request.
///
/// A shortfall of parsed questions is deliberately *not* an error: the
/// assembler returns a partial exam together with [`crate::model::Shortfall`]
/// records instead.
#[derive(Debug, Error)]
pub enum StudyError {
    /// There is no source text to generate questions from.
    #[error("content is empty: nothing to generate questions from")]
    ContentEmpty,

    /// A question count of zero was requested.
    #[error("question count must be greater than zero")]
    InvalidCount,

    /// The completion service is unreachable or returned an error.
    #[error("completion service unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        /// Retrying will not help (unknown model, bad credentials).
        permanent: bool,
        /// Back-off hint from the service, if any.
        retry_after_ms: Option<u64>,
    },
}

impl StudyError {
    /// Wrap a provider failure, keeping its retry classification.
    pub fn unavailable(err: anyhow::Error) -> Self {
        let provider_err = err.downcast_ref::<ProviderError>();
        StudyError::ServiceUnavailable {
            message: format!("{err:#}"),
            permanent: provider_err.is_some_and(ProviderError::is_permanent),
            retry_after_ms: provider_err.and_then(ProviderError::retry_after_ms),
        }
    }

    /// The caller-imposed deadline elapsed before the model answered.
    pub fn deadline_exceeded(secs: u64) -> Self {
        StudyError::ServiceUnavailable {
            message: format!("no response within {secs}s"),
            permanent: false,
            retry_after_ms: None,
        }
    }

    /// Returns `true` if the error means the model service could not be used.
    pub fn is_service_failure(&self) -> bool {
        matches!(self, StudyError::ServiceUnavailable { .. })
    }

    /// Returns `true` if a caller may reasonably try the request again.
    pub fn is_retryable(&self) -> bool {
        match self {
            StudyError::ServiceUnavailable { permanent, .. } => !permanent,
            StudyError::ContentEmpty | StudyError::InvalidCount => false,
        }
    }
}

/// Errors that can occur when talking to a completion service.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model is not available on the service.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The service returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The transport gave up waiting for a response.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// The service could not be reached.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Returns `true` if this error is permanent and should not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ProviderError::AuthenticationFailed(_) | ProviderError::ModelNotFound(_)
        )
    }

    /// Returns the retry-after delay in milliseconds, if applicable.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            ProviderError::RateLimited { retry_after_ms } => Some(*retry_after_ms),
            _ => None,
        }
    }
}
