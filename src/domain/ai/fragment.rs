//! Items of a streaming completion.

use serde::Serialize;
use std::fmt;

use super::AIError;

/// Why a stream ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamFailureKind {
    /// Backend not configured (missing credential, unknown or unsupported provider).
    Configuration,
    /// Non-success HTTP status.
    Http,
    Network,
    Timeout,
    /// Error event reported by the backend mid-stream.
    Provider,
}

/// Terminal failure of a stream, rendered as a human-readable fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamFailure {
    pub kind: StreamFailureKind,
    pub message: String,
}

impl StreamFailure {
    pub fn new(kind: StreamFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(timeout_secs: u64) -> Self {
        AIError::Timeout { timeout_secs }.into()
    }
}

impl From<AIError> for StreamFailure {
    fn from(err: AIError) -> Self {
        let kind = match &err {
            e if e.is_configuration() => StreamFailureKind::Configuration,
            AIError::Http { .. } | AIError::AuthenticationFailed => StreamFailureKind::Http,
            AIError::Timeout { .. } => StreamFailureKind::Timeout,
            AIError::Provider(_) | AIError::Parse(_) => StreamFailureKind::Provider,
            _ => StreamFailureKind::Network,
        };
        Self::new(kind, err.to_string())
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StreamFailureKind::Timeout => {
                write!(f, "\n\n[Response timed out. Please try again.]")
            }
            StreamFailureKind::Network => write!(f, "\n\n[Connection error: {}]", self.message),
            _ => write!(f, "\n\n[Error: {}]", self.message),
        }
    }
}

/// One item of a completion stream.
///
/// A stream yields any number of `Text` items and at most one trailing
/// `Failed`; a stream that ends without `Failed` completed normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text(String),
    Failed(StreamFailure),
}

impl Fragment {
    pub fn text(&self) -> Option<&str> {
        match self {
            Fragment::Text(text) => Some(text),
            Fragment::Failed(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Fragment::Failed(_))
    }

    /// What a transcript should show for this item.
    pub fn display_text(&self) -> String {
        match self {
            Fragment::Text(text) => text.clone(),
            Fragment::Failed(failure) => failure.to_string(),
        }
    }
}
