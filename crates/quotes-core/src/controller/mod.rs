//! Form handling for quote and profile edits.
//!
//! Every mutation goes through the same steps: require a signed-in user,
//! validate the form, then call the store. The sign-in check happens before
//! validation so an anonymous submit never reaches the network.

pub mod search;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{NewQuote, Profile, ProfileUpdate, Quote, QuoteId, QuotePatch};
use crate::session::SessionStore;
use crate::storage::AvatarStorage;
use crate::store::{Actor, ProfileStore, QuoteStore};

pub use search::{ResponseGate, SearchDebouncer, SearchTicket, SearchUpdate, SEARCH_DEBOUNCE};

pub const LOGIN_TO_ADD_MESSAGE: &str = "Please login to add quotes.";
pub const LOGIN_TO_EDIT_MESSAGE: &str = "Please login to edit quotes.";
pub const LOGIN_TO_DELETE_MESSAGE: &str = "Please login to delete quotes.";
pub const LOGIN_FOR_PROFILE_MESSAGE: &str = "Please login to edit your profile.";

/// Add/edit quote form fields as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QuoteForm {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl QuoteForm {
    pub fn new(
        content: impl Into<String>,
        author: impl Into<String>,
        category: Option<String>,
    ) -> Self {
        Self {
            content: content.into(),
            author: author.into(),
            category,
        }
    }

    /// Pre-filled form for editing an existing quote.
    #[must_use]
    pub fn from_quote(quote: &Quote) -> Self {
        Self::new(&quote.content, &quote.author, quote.category.clone())
    }

    /// Validate into an insert payload owned by `user_id`.
    pub fn validate(&self, user_id: &str) -> Result<NewQuote> {
        NewQuote::new(
            &self.content,
            &self.author,
            self.category.as_deref(),
            user_id,
        )
    }

    /// Validate into an update payload.
    pub fn validate_patch(&self) -> Result<QuotePatch> {
        QuotePatch::new(&self.content, &self.author, self.category.as_deref())
    }
}

/// Profile form fields as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            name: form.name,
            avatar_url: form.avatar_url,
        }
        .normalized()
    }
}

fn require_actor(session: &SessionStore, message: &str) -> Result<Actor> {
    session
        .actor()
        .ok_or_else(|| Error::Unauthenticated(message.to_string()))
}

/// Whether the user may see edit and delete controls for `quote`.
///
/// Display only; the store decides what the user may actually change.
#[must_use]
pub fn can_edit(quote: &Quote, user_id: Option<&str>) -> bool {
    quote.is_owned_by(user_id)
}

pub async fn submit_quote(
    store: &dyn QuoteStore,
    session: &SessionStore,
    form: &QuoteForm,
) -> Result<Quote> {
    let actor = require_actor(session, LOGIN_TO_ADD_MESSAGE)?;
    let new_quote = form.validate(&actor.user_id)?;
    let quote = store.insert_quote(&actor, &new_quote).await?;
    tracing::info!(quote_id = %quote.id, "Quote added");
    Ok(quote)
}

pub async fn save_quote_edit(
    store: &dyn QuoteStore,
    session: &SessionStore,
    id: &QuoteId,
    form: &QuoteForm,
) -> Result<Quote> {
    let actor = require_actor(session, LOGIN_TO_EDIT_MESSAGE)?;
    let patch = form.validate_patch()?;
    let quote = store.update_quote(&actor, id, &patch).await?;
    tracing::info!(quote_id = %quote.id, "Quote updated");
    Ok(quote)
}

pub async fn remove_quote(
    store: &dyn QuoteStore,
    session: &SessionStore,
    id: &QuoteId,
) -> Result<()> {
    let actor = require_actor(session, LOGIN_TO_DELETE_MESSAGE)?;
    store.delete_quote(&actor, id).await?;
    tracing::info!(quote_id = %id, "Quote deleted");
    Ok(())
}

/// Profile to show when editing, falling back to an empty one for new users.
pub async fn load_profile(store: &dyn ProfileStore, session: &SessionStore) -> Result<Profile> {
    let actor = require_actor(session, LOGIN_FOR_PROFILE_MESSAGE)?;
    let profile = store.get_profile(&actor.user_id).await?;
    Ok(profile.unwrap_or(Profile {
        id: actor.user_id,
        name: None,
        avatar_url: None,
    }))
}

pub async fn save_profile(
    store: &dyn ProfileStore,
    session: &SessionStore,
    form: ProfileForm,
) -> Result<Profile> {
    let actor = require_actor(session, LOGIN_FOR_PROFILE_MESSAGE)?;
    let profile = store.save_profile(&actor, &form.into()).await?;
    tracing::info!("Profile saved");
    Ok(profile)
}

pub async fn upload_avatar(
    storage: &dyn AvatarStorage,
    session: &SessionStore,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<String> {
    let actor = require_actor(session, LOGIN_FOR_PROFILE_MESSAGE)?;
    storage.upload_avatar(&actor, file_name, bytes).await
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::auth::{AuthSession, AuthUser};
    use crate::db::SqliteStore;
    use crate::query::{PageWindow, Predicate};

    /// Counts calls so tests can assert nothing reached the backend.
    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn touch<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Config("unexpected store call".to_string()))
        }
    }

    #[async_trait]
    impl QuoteStore for CountingStore {
        async fn list_quotes(&self, _: &Predicate, _: PageWindow) -> Result<Vec<Quote>> {
            self.touch()
        }
        async fn count_quotes(&self, _: &Predicate) -> Result<u64> {
            self.touch()
        }
        async fn get_quote(&self, _: &QuoteId) -> Result<Option<Quote>> {
            self.touch()
        }
        async fn insert_quote(&self, _: &Actor, _: &NewQuote) -> Result<Quote> {
            self.touch()
        }
        async fn update_quote(&self, _: &Actor, _: &QuoteId, _: &QuotePatch) -> Result<Quote> {
            self.touch()
        }
        async fn delete_quote(&self, _: &Actor, _: &QuoteId) -> Result<()> {
            self.touch()
        }
        async fn list_categories(&self) -> Result<Vec<String>> {
            self.touch()
        }
        async fn list_index_entries(&self, _: u64) -> Result<Vec<Quote>> {
            self.touch()
        }
    }

    fn signed_in(user_id: &str) -> SessionStore {
        let session = SessionStore::new();
        session.set_signed_in(AuthSession {
            access_token: "token".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: user_id.to_string(),
                email: None,
            },
        });
        session
    }

    #[tokio::test]
    async fn anonymous_submit_never_reaches_store() {
        let store = CountingStore::default();
        let session = SessionStore::new();
        session.sign_out();

        // Even an invalid form reports the sign-in requirement first.
        let err = submit_quote(&store, &session, &QuoteForm::default())
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Please login to add quotes.");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_before_store() {
        let store = CountingStore::default();
        let session = signed_in("alice");

        let err = submit_quote(&store, &session, &QuoteForm::new("  ", "Someone", None))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Quote content is required");

        let err = submit_quote(&store, &session, &QuoteForm::new("Text", "", None))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Author is required");
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn submit_edit_and_remove_against_local_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let alice = signed_in("alice");
        let form = QuoteForm::new(
            "  The best way out is always through.  ",
            "Robert Frost",
            Some("  ".to_string()),
        );

        let quote = submit_quote(&store, &alice, &form).await.unwrap();
        assert_eq!(quote.content, "The best way out is always through.");
        assert_eq!(quote.category, None);
        assert!(can_edit(&quote, Some("alice")));
        assert!(!can_edit(&quote, Some("bob")));
        assert!(!can_edit(&quote, None));

        let mut edit = QuoteForm::from_quote(&quote);
        edit.category = Some("perseverance".to_string());
        let updated = save_quote_edit(&store, &alice, &quote.id, &edit)
            .await
            .unwrap();
        assert_eq!(updated.category.as_deref(), Some("perseverance"));

        let bob = signed_in("bob");
        let err = save_quote_edit(&store, &bob, &quote.id, &edit)
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "No rows were updated. You might not have permission to edit this quote."
        );
        assert!(remove_quote(&store, &bob, &quote.id)
            .await
            .unwrap_err()
            .is_permission_denied());

        remove_quote(&store, &alice, &quote.id).await.unwrap();
        assert!(store.get_quote(&quote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_save_trims_and_loads_fallback() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = signed_in("alice");

        let empty = load_profile(&store, &session).await.unwrap();
        assert_eq!(empty.id, "alice");
        assert_eq!(empty.name, None);

        let saved = save_profile(
            &store,
            &session,
            ProfileForm {
                name: Some("  Alice  ".to_string()),
                avatar_url: Some(" ".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(saved.name.as_deref(), Some("Alice"));
        assert_eq!(saved.avatar_url, None);
    }

    #[tokio::test]
    async fn profile_requires_sign_in() {
        let store = SqliteStore::open_in_memory().unwrap();
        let session = SessionStore::new();
        let err = save_profile(&store, &session, ProfileForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unauthenticated(_)));
    }
}
