use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use quotes_core::render::DEFAULT_PIXEL_BUDGET;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which quote store the server talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Hosted PostgREST endpoint of the Supabase project.
    Supabase,
    /// Local `SQLite` file.
    Sqlite(PathBuf),
}

#[derive(Clone, PartialEq, Eq)]
pub struct SupabaseProject {
    pub url: String,
    pub anon_key: String,
}

impl fmt::Debug for SupabaseProject {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseProject")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub public_base_url: String,
    pub store: StoreBackend,
    /// Auth and avatar storage; required for the Supabase store.
    pub supabase: Option<SupabaseProject>,
    pub rate_limit_window: Duration,
    pub quote_write_rate_limit_per_window: u32,
    pub avatar_upload_rate_limit_per_window: u32,
    pub share_image_pixel_budget: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "QUOTES_API_BIND_ADDR", "127.0.0.1:8080");

        let public_base_url =
            value_or_default(&lookup, "QUOTES_PUBLIC_BASE_URL", "http://localhost:8080");
        if !is_http_url(&public_base_url) {
            return Err(ConfigError::Invalid(
                "QUOTES_PUBLIC_BASE_URL must start with http:// or https://".to_string(),
            ));
        }
        let public_base_url = trim_trailing(&public_base_url).to_string();

        let supabase = parse_supabase(&lookup)?;

        let store = match value_or_default(&lookup, "QUOTES_STORE", "supabase")
            .to_ascii_lowercase()
            .as_str()
        {
            "supabase" => {
                if supabase.is_none() {
                    return Err(ConfigError::MissingVar("SUPABASE_URL"));
                }
                StoreBackend::Supabase
            }
            "sqlite" => StoreBackend::Sqlite(PathBuf::from(value_or_default(
                &lookup,
                "QUOTES_SQLITE_PATH",
                "quotes.db",
            ))),
            other => {
                return Err(ConfigError::Invalid(format!(
                    "QUOTES_STORE must be `supabase` or `sqlite`, got `{other}`"
                )))
            }
        };

        let rate_limit_window_secs = value_or_default(&lookup, "RATE_LIMIT_WINDOW_SECS", "60")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::Invalid(
                    "RATE_LIMIT_WINDOW_SECS must be an integer in [10, 3600]".to_string(),
                )
            })?;
        if !(10..=3_600).contains(&rate_limit_window_secs) {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_WINDOW_SECS must be in [10, 3600]".to_string(),
            ));
        }

        let quote_write_rate_limit_per_window =
            value_or_default(&lookup, "QUOTE_WRITE_RATE_LIMIT_PER_WINDOW", "30")
                .parse::<u32>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "QUOTE_WRITE_RATE_LIMIT_PER_WINDOW must be an integer in [1, 1000]"
                            .to_string(),
                    )
                })?;
        if !(1..=1_000).contains(&quote_write_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "QUOTE_WRITE_RATE_LIMIT_PER_WINDOW must be in [1, 1000]".to_string(),
            ));
        }

        let avatar_upload_rate_limit_per_window =
            value_or_default(&lookup, "AVATAR_UPLOAD_RATE_LIMIT_PER_WINDOW", "5")
                .parse::<u32>()
                .map_err(|_| {
                    ConfigError::Invalid(
                        "AVATAR_UPLOAD_RATE_LIMIT_PER_WINDOW must be an integer in [1, 100]"
                            .to_string(),
                    )
                })?;
        if !(1..=100).contains(&avatar_upload_rate_limit_per_window) {
            return Err(ConfigError::Invalid(
                "AVATAR_UPLOAD_RATE_LIMIT_PER_WINDOW must be in [1, 100]".to_string(),
            ));
        }

        let share_image_pixel_budget = value_or_default(
            &lookup,
            "SHARE_IMAGE_PIXEL_BUDGET",
            &DEFAULT_PIXEL_BUDGET.to_string(),
        )
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::Invalid("SHARE_IMAGE_PIXEL_BUDGET must be an integer".to_string())
        })?;
        // The 1x fallback alone needs 800x600 pixels.
        if share_image_pixel_budget < 480_000 {
            return Err(ConfigError::Invalid(
                "SHARE_IMAGE_PIXEL_BUDGET must be at least 480000".to_string(),
            ));
        }

        Ok(Self {
            bind_addr,
            public_base_url,
            store,
            supabase,
            rate_limit_window: Duration::from_secs(rate_limit_window_secs),
            quote_write_rate_limit_per_window,
            avatar_upload_rate_limit_per_window,
            share_image_pixel_budget,
        })
    }
}

fn parse_supabase(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<SupabaseProject>, ConfigError> {
    let url = optional_trimmed(&lookup, "SUPABASE_URL");
    let anon_key = optional_trimmed(&lookup, "SUPABASE_ANON_KEY");
    if url.is_none() && anon_key.is_none() {
        return Ok(None);
    }

    let url = url.ok_or(ConfigError::MissingVar("SUPABASE_URL"))?;
    let anon_key = anon_key.ok_or(ConfigError::MissingVar("SUPABASE_ANON_KEY"))?;
    if !is_http_url(&url) {
        return Err(ConfigError::Invalid(
            "SUPABASE_URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(Some(SupabaseProject {
        url: trim_trailing(&url).to_string(),
        anon_key,
    }))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn supabase_store_requires_project() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = parse(&map).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn sqlite_store_needs_no_secrets() {
        let map = HashMap::from([("QUOTES_STORE", "sqlite"), ("QUOTES_SQLITE_PATH", "/tmp/q.db")]);
        let config = parse(&map).unwrap();
        assert_eq!(config.store, StoreBackend::Sqlite(PathBuf::from("/tmp/q.db")));
        assert!(config.supabase.is_none());
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.public_base_url, "http://localhost:8080");
        assert_eq!(config.rate_limit_window, Duration::from_secs(60));
    }

    #[test]
    fn half_configured_project_is_rejected() {
        let map = HashMap::from([
            ("QUOTES_STORE", "sqlite"),
            ("SUPABASE_URL", "https://project.supabase.co"),
        ]);
        let err = parse(&map).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_ANON_KEY"));
    }

    #[test]
    fn rejects_out_of_range_limits() {
        let map = HashMap::from([
            ("QUOTES_STORE", "sqlite"),
            ("QUOTE_WRITE_RATE_LIMIT_PER_WINDOW", "0"),
        ]);
        assert!(parse(&map).is_err());

        let map = HashMap::from([("QUOTES_STORE", "sqlite"), ("SHARE_IMAGE_PIXEL_BUDGET", "10")]);
        assert!(parse(&map).is_err());

        let map = HashMap::from([("QUOTES_STORE", "mongo")]);
        assert!(parse(&map).is_err());
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let map = HashMap::from([
            ("SUPABASE_URL", "https://project.supabase.co/"),
            ("SUPABASE_ANON_KEY", "sensitive-anon-key"),
            ("QUOTES_PUBLIC_BASE_URL", "https://quotes.example.com/"),
        ]);
        let config = parse(&map).unwrap();

        assert_eq!(config.store, StoreBackend::Supabase);
        assert_eq!(config.public_base_url, "https://quotes.example.com");
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-anon-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
