use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quotes_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Quote not found: {0}")]
    QuoteNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error(
        "Supabase is not configured. Run `quotes config init` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    NotConfigured,
}

impl CliError {
    /// Text shown to the user on failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(error) => error.user_message(),
            other => other.to_string(),
        }
    }
}
