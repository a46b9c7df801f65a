use std::env;
use std::path::Path;

use quotes_core::util::{is_http_url, normalize_text_option};

use crate::cli::ConfigCommands;
use crate::commands::common::resolve_profile;
use crate::config_profiles::{default_config_path, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            site_url,
            no_activate,
        } => {
            let path = default_config_path().map_err(CliError::Config)?;
            let profile_name = init_profile(
                &path,
                global_profile,
                ProfileInput {
                    supabase_url,
                    supabase_anon_key,
                    site_url,
                },
                no_activate,
            )?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );
            Ok(())
        }
        ConfigCommands::Show => {
            let (profile_name, profile) = resolve_profile(global_profile)?;
            for line in describe_profile(&profile_name, &profile) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

/// Values passed to `config init`; `None` keeps what is stored.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub site_url: Option<String>,
}

/// Merge `input` into the named profile and save the file at `path`.
pub fn init_profile(
    path: &Path,
    profile_name: Option<&str>,
    input: ProfileInput,
    no_activate: bool,
) -> Result<String, CliError> {
    let mut config = CliProfilesConfig::load_from_path(path).map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let supabase_url = normalize_text_option(input.supabase_url)
        .or_else(|| normalize_text_option(env::var("SUPABASE_URL").ok()));
    let supabase_anon_key = normalize_text_option(input.supabase_anon_key)
        .or_else(|| normalize_text_option(env::var("SUPABASE_ANON_KEY").ok()));
    let site_url = normalize_text_option(input.site_url);

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = supabase_url {
        profile.supabase_url = Some(value);
    }
    if let Some(value) = supabase_anon_key {
        profile.supabase_anon_key = Some(value);
    }
    if let Some(value) = site_url {
        profile.site_url = Some(value);
    }

    validate_profile_urls(profile)?;

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    config.save_to_path(path).map_err(CliError::Config)?;
    Ok(profile_name)
}

pub fn describe_profile(profile_name: &str, profile: &CliProfile) -> Vec<String> {
    vec![
        format!("Profile:           {profile_name}"),
        format!(
            "Supabase URL:      {}",
            profile.supabase_url().unwrap_or_else(|| "(not set)".to_string())
        ),
        format!(
            "Supabase anon key: {}",
            profile
                .supabase_anon_key()
                .map_or_else(|| "(not set)".to_string(), |key| redact(&key))
        ),
        format!("Site URL:          {}", profile.site_url()),
    ]
}

fn redact(key: &str) -> String {
    let visible: String = key.chars().take(6).collect();
    format!("{visible}...")
}

fn validate_profile_urls(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    if let Some(url) = normalize_text_option(profile.site_url.clone()) {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "site_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn init_writes_and_activates_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let name = init_profile(
            &path,
            Some("work"),
            ProfileInput {
                supabase_url: Some("https://abc.supabase.co".to_string()),
                supabase_anon_key: Some("anon-key".to_string()),
                site_url: Some("https://quotes.example/".to_string()),
            },
            false,
        )
        .unwrap();

        assert_eq!(name, "work");
        let config = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(config.active_profile.as_deref(), Some("work"));
        let profile = config.profile("work").unwrap();
        assert_eq!(profile.site_url(), "https://quotes.example");
        assert_eq!(profile.supabase_anon_key().as_deref(), Some("anon-key"));
    }

    #[test]
    fn init_keeps_active_profile_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        init_profile(&path, Some("first"), ProfileInput::default(), false).unwrap();
        init_profile(&path, Some("second"), ProfileInput::default(), true).unwrap();

        let config = CliProfilesConfig::load_from_path(&path).unwrap();
        assert_eq!(config.active_profile.as_deref(), Some("first"));
        assert!(config.profile("second").is_some());
    }

    #[test]
    fn init_rejects_non_http_site_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let error = init_profile(
            &path,
            None,
            ProfileInput {
                site_url: Some("quotes.example".to_string()),
                ..ProfileInput::default()
            },
            false,
        )
        .unwrap_err();
        assert!(matches!(error, CliError::Config(message) if message.contains("site_url")));
        assert!(!path.exists());
    }

    #[test]
    fn show_redacts_anon_key() {
        let profile = CliProfile {
            supabase_url: Some("https://abc.supabase.co".to_string()),
            supabase_anon_key: Some("eyJhbGciOiJIUzI1NiJ9.secret".to_string()),
            site_url: None,
        };
        let lines = describe_profile("default", &profile);
        assert_eq!(lines[2], "Supabase anon key: eyJhbG...");
        assert_eq!(lines[3], "Site URL:          http://localhost:8080");
    }
}
