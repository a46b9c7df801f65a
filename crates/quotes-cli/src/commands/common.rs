use std::env;

use chrono::{DateTime, Utc};
use quotes_core::auth::resolve_optional_supabase_config;
use quotes_core::session::SessionStore;
use quotes_core::storage::SupabaseStorage;
use quotes_core::store::{PostgrestConfig, PostgrestStore};
use quotes_core::util::truncate_with_ellipsis;
use quotes_core::{Quote, QuoteId};

use crate::auth::SupabaseAuthService;
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

const PREVIEW_CHARS: usize = 60;

/// Everything a command needs to talk to the configured project.
pub struct Backend {
    pub profile_name: String,
    pub site_url: String,
    pub store: PostgrestStore,
    pub storage: SupabaseStorage,
    pub session: SessionStore,
}

impl Backend {
    /// Resolve the profile, build the clients and restore the stored session.
    pub async fn connect(global_profile: Option<&str>) -> Result<Self, CliError> {
        let (profile_name, profile) = resolve_profile(global_profile)?;
        let (url, anon_key) =
            resolve_optional_supabase_config(profile.supabase_url(), profile.supabase_anon_key())
                .map_err(|error| CliError::Config(error.to_string()))?
                .ok_or(CliError::NotConfigured)?;

        let store = PostgrestStore::new(&PostgrestConfig::new(&url, anon_key.clone())?)?;
        let storage = SupabaseStorage::new(&url, anon_key.clone())?;
        let auth = SupabaseAuthService::new(&profile_name, &url, &anon_key)
            .map_err(|error| CliError::Auth(error.to_string()))?;

        let session = SessionStore::new();
        if let Err(error) = session.init(&auth).await {
            tracing::warn!("Could not restore the stored session: {}", error);
        }

        Ok(Self {
            profile_name,
            site_url: profile.site_url(),
            store,
            storage,
            session,
        })
    }
}

/// Profile name and settings with environment overrides applied.
pub fn resolve_profile(global_profile: Option<&str>) -> Result<(String, CliProfile), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(global_profile);
    let profile = config
        .profile(&profile_name)
        .cloned()
        .unwrap_or_default()
        .with_env_overrides(|name| env::var(name).ok());
    Ok((profile_name, profile))
}

pub fn parse_quote_id(raw: &str) -> Result<QuoteId, CliError> {
    Ok(raw.parse::<QuoteId>()?)
}

/// Join positional words into quote content.
pub fn normalize_content(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// One-line listing: id, preview, author and category.
pub fn format_quote_line(quote: &Quote) -> String {
    let preview = truncate_with_ellipsis(&quote.content.replace('\n', " "), PREVIEW_CHARS);
    match &quote.category {
        Some(category) => format!("{}  \"{}\" - {} [{}]", quote.id, preview, quote.author, category),
        None => format!("{}  \"{}\" - {}", quote.id, preview, quote.author),
    }
}

pub fn format_quote_detail(quote: &Quote) -> Vec<String> {
    let mut lines = vec![
        format!("\"{}\"", quote.content),
        format!("  - {}", quote.author),
        String::new(),
        format!("ID:       {}", quote.id),
    ];
    if let Some(category) = &quote.category {
        lines.push(format!("Category: {category}"));
    }
    lines.push(format!("Shared:   {}", format_date(quote.created_at)));
    if quote.updated_at > quote.created_at {
        lines.push(format!("Updated:  {}", format_date(quote.updated_at)));
    }
    lines
}

pub fn format_date(value: DateTime<Utc>) -> String {
    value.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;

    fn quote(category: Option<&str>) -> Quote {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        Quote {
            id: QuoteId::from("q-1".to_string()),
            content: "Line one\nline two".to_string(),
            author: "Anon".to_string(),
            category: category.map(str::to_string),
            created_at: created,
            updated_at: created,
            user_id: None,
        }
    }

    #[test]
    fn normalize_content_joins_and_trims() {
        let parts = vec!["  Be".to_string(), "kind. ".to_string()];
        assert_eq!(normalize_content(&parts), Some("Be kind.".to_string()));
        assert_eq!(normalize_content(&[" ".to_string()]), None);
        assert_eq!(normalize_content(&[]), None);
    }

    #[test]
    fn quote_line_flattens_newlines() {
        assert_eq!(
            format_quote_line(&quote(Some("life"))),
            "q-1  \"Line one line two\" - Anon [life]"
        );
        assert_eq!(
            format_quote_line(&quote(None)),
            "q-1  \"Line one line two\" - Anon"
        );
    }

    #[test]
    fn detail_shows_date_and_skips_unchanged_update() {
        let lines = format_quote_detail(&quote(None));
        assert!(lines.contains(&"Shared:   January 2, 2024".to_string()));
        assert!(!lines.iter().any(|line| line.starts_with("Updated")));
        assert!(!lines.iter().any(|line| line.starts_with("Category")));
    }

    #[test]
    fn blank_id_is_rejected() {
        assert!(parse_quote_id("   ").is_err());
    }
}
