//! Avatar uploads to Supabase object storage.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{Error, Result, StoreFailure};
use crate::store::Actor;
use crate::util::unix_timestamp_millis;

/// Public bucket that holds profile avatars.
pub const AVATAR_BUCKET: &str = "profile-images";

/// Largest avatar accepted for upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Object storage for profile avatars.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    /// Upload `bytes` as the actor's avatar and return its public URL.
    async fn upload_avatar(&self, actor: &Actor, file_name: &str, bytes: Vec<u8>)
        -> Result<String>;
}

/// Supabase Storage client scoped to [`AVATAR_BUCKET`].
#[derive(Clone)]
pub struct SupabaseStorage {
    storage_url: String,
    anon_key: String,
    client: Client,
}

impl fmt::Debug for SupabaseStorage {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SupabaseStorage")
            .field("storage_url", &self.storage_url)
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SupabaseStorage {
    pub fn new(project_url: &str, anon_key: impl Into<String>) -> Result<Self> {
        let base = project_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config("Supabase anon key must not be empty".to_string()));
        }

        Ok(Self {
            storage_url: format!("{base}/storage/v1"),
            anon_key,
            client: Client::builder().build()?,
        })
    }

    /// Public URL for an object in the avatar bucket.
    pub fn public_object_url(&self, object_key: &str) -> String {
        format!(
            "{}/object/public/{AVATAR_BUCKET}/{}",
            self.storage_url,
            object_key.trim_matches('/')
        )
    }
}

#[async_trait]
impl AvatarStorage for SupabaseStorage {
    async fn upload_avatar(
        &self,
        actor: &Actor,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<String> {
        let content_type = avatar_content_type(file_name, bytes.len())?;
        let object_key = avatar_object_key(&actor.user_id, file_name, unix_timestamp_millis())?;

        let response = self
            .client
            .post(format!(
                "{}/object/{AVATAR_BUCKET}/{object_key}",
                self.storage_url
            ))
            .header("apikey", &self.anon_key)
            .bearer_auth(&actor.access_token)
            .header("x-upsert", "true")
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| {
                    value
                        .get("message")
                        .or_else(|| value.get("error"))
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "Upload failed".to_string());
            tracing::warn!(status = status.as_u16(), "Avatar upload rejected");
            let mut failure = StoreFailure::new(message);
            failure.status = Some(status.as_u16());
            return Err(Error::Store(failure));
        }

        tracing::info!(object_key = %object_key, "Uploaded avatar");
        Ok(self.public_object_url(&object_key))
    }
}

/// `<user_id>/avatar-<unix_ms>.<ext>`, using the upload's file extension.
pub fn avatar_object_key(user_id: &str, file_name: &str, timestamp_ms: i64) -> Result<String> {
    let user_id = user_id.trim();
    if user_id.is_empty() || user_id.contains('/') {
        return Err(Error::InvalidInput("Invalid user id for upload".to_string()));
    }

    let extension = file_extension(file_name).ok_or_else(|| {
        Error::InvalidInput("The selected file has no extension.".to_string())
    })?;
    Ok(format!("{user_id}/avatar-{timestamp_ms}.{extension}"))
}

/// Content type for an avatar, rejecting empty, oversized and non-image files.
pub fn avatar_content_type(file_name: &str, size: usize) -> Result<String> {
    if size == 0 {
        return Err(Error::InvalidInput(
            "You must select an image to upload.".to_string(),
        ));
    }
    if size > MAX_AVATAR_BYTES {
        return Err(Error::InvalidInput(
            "The selected image is larger than 5 MB.".to_string(),
        ));
    }

    let mime = mime_guess::from_path(file_name).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(Error::InvalidInput(
            "The selected file is not an image.".to_string(),
        ));
    }
    Ok(mime.essence_str().to_string())
}

fn file_extension(file_name: &str) -> Option<String> {
    let (_, extension) = file_name.trim().rsplit_once('.')?;
    let extension = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    (!extension.is_empty()).then_some(extension)
}
