//! AI backend errors.

/// Errors raised while configuring, probing or streaming from a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AIError {
    /// Cloud provider configured without a credential.
    #[error("API key is required for cloud providers ({provider})")]
    CredentialRequired {
        /// Provider that needs the key.
        provider: String,
    },

    /// Provider id not present in the registry.
    #[error("unknown AI provider '{0}'")]
    UnknownProvider(String),

    /// Provider is listed but has no streaming adapter.
    #[error("provider '{0}' is not implemented yet")]
    NotImplemented(String),

    /// Configuration values are inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Backend answered with a non-success HTTP status.
    #[error("server returned status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Credential rejected by the backend.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse provider response.
    #[error("parse error: {0}")]
    Parse(String),

    /// Overall time budget exceeded.
    #[error("response timed out after {timeout_secs}s")]
    Timeout {
        /// Budget in seconds.
        timeout_secs: u64,
    },

    /// Error event reported inside the stream by the backend.
    #[error("provider error: {0}")]
    Provider(String),
}

const MAX_BODY_CHARS: usize = 200;

impl AIError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        AIError::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        AIError::Parse(message.into())
    }

    /// Creates an HTTP status error, keeping at most 200 characters of body.
    pub fn http(status: u16, body: impl AsRef<str>) -> Self {
        let body: String = body.as_ref().trim().chars().take(MAX_BODY_CHARS).collect();
        AIError::Http { status, body }
    }

    /// True for "not configured" conditions, as opposed to transport failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AIError::CredentialRequired { .. }
                | AIError::UnknownProvider(_)
                | AIError::NotImplemented(_)
                | AIError::InvalidConfiguration(_)
        )
    }
}
