//! Error types for quotes-core

use std::fmt;

use thiserror::Error;

/// Result type alias using quotes-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quotes-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failure talking to the hosted backend
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend rejected the request
    #[error("Store error: {0}")]
    Store(StoreFailure),

    /// A mutation affected no rows, or the backend policy refused it
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A mutation was attempted without a signed-in user
    #[error("{0}")]
    Unauthenticated(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image rendering or encoding error
    #[error("Render error: {0}")]
    Render(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Auth provider error
    #[error("Auth error: {0}")]
    Auth(#[from] crate::auth::AuthError),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Message suitable for showing inline next to the form or list that failed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated(message)
            | Self::InvalidInput(message)
            | Self::PermissionDenied(message) => message.clone(),
            Self::Store(failure) => failure.message.clone(),
            Self::NotFound(_) => "The requested quote could not be found.".to_string(),
            Self::Http(_) => "Could not reach the quote service. Please try again.".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this error means the current user may not perform the action.
    #[must_use]
    pub const fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Structured backend rejection.
///
/// PostgREST reports failures as `{message, code, details, hint}`; the optional
/// fields are kept for diagnostics instead of being probed ad hoc.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreFailure {
    pub message: String,
    pub code: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub status: Option<u16>,
}

impl StoreFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for StoreFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(status) = self.status {
            write!(f, " ({status})")?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failure_display_includes_status_and_detail() {
        let failure = StoreFailure {
            message: "new row violates row-level security policy".to_string(),
            code: Some("42501".to_string()),
            detail: Some("Failing row contains (…)".to_string()),
            hint: None,
            status: Some(403),
        };
        let rendered = Error::Store(failure).to_string();
        assert!(rendered.contains("row-level security"));
        assert!(rendered.contains("(403)"));
        assert!(rendered.contains("Failing row"));
    }

    #[test]
    fn user_message_passes_through_gate_messages() {
        let error = Error::Unauthenticated("Please login to add quotes.".to_string());
        assert_eq!(error.user_message(), "Please login to add quotes.");
        assert!(!error.is_permission_denied());
    }
}
