use std::path::Path;

use quotes_core::auth::AuthUser;
use quotes_core::controller::{self, ProfileForm};
use quotes_core::models::avatar_initial;
use quotes_core::session::SessionStore;
use quotes_core::storage::AvatarStorage;
use quotes_core::store::ProfileStore;
use quotes_core::Profile;

use crate::cli::ProfileCommands;
use crate::commands::common::Backend;
use crate::error::CliError;

pub async fn run_profile(backend: &Backend, command: ProfileCommands) -> Result<(), CliError> {
    match command {
        ProfileCommands::Show { json } => {
            let profile = controller::load_profile(&backend.store, &backend.session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                for line in format_profile(&profile, backend.session.current_user().as_ref()) {
                    println!("{line}");
                }
            }
            Ok(())
        }
        ProfileCommands::Set { name, avatar_url } => {
            let profile =
                update_profile(&backend.store, &backend.session, name, avatar_url).await?;
            println!(
                "Saved profile for {}",
                profile.name.as_deref().unwrap_or("(no name)")
            );
            Ok(())
        }
        ProfileCommands::Avatar { path } => {
            let profile =
                upload_avatar_file(&backend.storage, &backend.store, &backend.session, &path)
                    .await?;
            println!("{}", profile.avatar_url.unwrap_or_default());
            Ok(())
        }
    }
}

pub fn format_profile(profile: &Profile, user: Option<&AuthUser>) -> Vec<String> {
    let email = user.and_then(|user| user.email.as_deref());
    vec![
        format!("Name:   {}", profile.name.as_deref().unwrap_or("(not set)")),
        format!("Email:  {}", email.unwrap_or("(unknown)")),
        format!(
            "Avatar: {}",
            profile
                .avatar_url
                .clone()
                .unwrap_or_else(|| format!("(initial {})", avatar_initial(email)))
        ),
    ]
}

/// Merge the given fields into the stored profile; omitted fields keep their value.
pub async fn update_profile(
    store: &dyn ProfileStore,
    session: &SessionStore,
    name: Option<String>,
    avatar_url: Option<String>,
) -> Result<Profile, CliError> {
    let current = controller::load_profile(store, session).await?;
    let form = ProfileForm {
        name: name.or(current.name),
        avatar_url: avatar_url.or(current.avatar_url),
    };
    Ok(controller::save_profile(store, session, form).await?)
}

/// Upload the image, then point the profile at it.
pub async fn upload_avatar_file(
    storage: &dyn AvatarStorage,
    store: &dyn ProfileStore,
    session: &SessionStore,
    path: &Path,
) -> Result<Profile, CliError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::Config(format!("Invalid file name: {}", path.display())))?
        .to_string();
    let bytes = tokio::fs::read(path).await?;
    let url = controller::upload_avatar(storage, session, &file_name, bytes).await?;
    update_profile(store, session, None, Some(url)).await
}
