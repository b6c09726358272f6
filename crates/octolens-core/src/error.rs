//! Error types shared by every layer of the engine.

use thiserror::Error;

use crate::types::ResourceKind;

/// Errors surfaced by resolution, log extraction and the transport boundary.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the API key (HTTP 401).
    #[error("The Octopus API key is invalid or has expired")]
    AuthenticationInvalid,

    /// The server answered with a status other than 200/201.
    #[error("Request failed with status {status}: {body}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Raw response body, kept for diagnostics.
        body: String,
    },

    /// The exchange could not be completed (connect, timeout, I/O).
    #[error("Network error: {0}")]
    Network(String),

    /// No candidate matched the queried name at any resolution tier.
    #[error("{kind} \"{name}\" was not found")]
    ResourceNotFound {
        /// Kind of resource that was looked up.
        kind: ResourceKind,
        /// The value exactly as the caller supplied it.
        name: String,
    },

    /// The runbook exists but has no published snapshot to run.
    #[error("Runbook \"{0}\" has not been published")]
    RunbookNotPublished(String),

    /// A success body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server URL could not be combined with an API path.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A required argument was empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// `ResourceNotFound` carrying the queried name as typed.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            kind,
            name: name.into(),
        }
    }

    /// Whether a call that failed with this error may be attempted again.
    ///
    /// Authentication failures and deterministic lookups are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RequestFailed { .. } | Self::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Reject empty (or whitespace-only) required arguments.
pub(crate) fn ensure_not_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!(
            "{what} must be a non-empty string"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retryable() {
        assert!(
            Error::RequestFailed {
                status: 500,
                body: String::new()
            }
            .is_retryable()
        );
        assert!(Error::Network("reset".into()).is_retryable());
        assert!(!Error::AuthenticationInvalid.is_retryable());
        assert!(!Error::not_found(ResourceKind::Project, "Web").is_retryable());
        assert!(!Error::RunbookNotPublished("Backup".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_kind_and_query() {
        let err = Error::not_found(ResourceKind::Environment, "Prod ");
        assert_eq!(err.to_string(), "Environment \"Prod \" was not found");
    }

    #[test]
    fn ensure_not_empty_rejects_blank() {
        assert!(ensure_not_empty("  ", "project_name").is_err());
        assert!(ensure_not_empty("Web", "project_name").is_ok());
    }
}
