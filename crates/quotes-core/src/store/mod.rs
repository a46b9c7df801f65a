//! Store abstractions for quotes and profiles.
//!
//! Reads are public. Every mutation carries an [`Actor`]; the backend's
//! row-level policy decides whether the actor may touch the row, and a
//! mutation that affects nothing is reported as [`crate::Error::PermissionDenied`].

mod postgrest;

use std::fmt;

use async_trait::async_trait;

use crate::auth::AuthSession;
use crate::models::{NewQuote, Profile, ProfileUpdate, Quote, QuoteId, QuotePatch};
use crate::query::{PageWindow, Predicate};
use crate::Result;

pub use postgrest::{PostgrestConfig, PostgrestStore};

/// Upper bound on rows returned for sitemap generation.
pub const MAX_INDEX_ENTRIES: u64 = 1000;

/// Message reported when an update matched no rows the actor may edit.
pub const UPDATE_DENIED_MESSAGE: &str =
    "No rows were updated. You might not have permission to edit this quote.";

/// Message reported when a delete matched no rows the actor may remove.
pub const DELETE_DENIED_MESSAGE: &str =
    "No rows were deleted. You might not have permission to delete this quote.";

/// The authenticated user a mutation is performed for.
#[derive(Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub access_token: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
        }
    }
}

impl From<&AuthSession> for Actor {
    fn from(session: &AuthSession) -> Self {
        Self::new(session.user.id.clone(), session.access_token.clone())
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Actor")
            .field("user_id", &self.user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Quote collection operations.
#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// One window of matching quotes, newest first.
    async fn list_quotes(&self, predicate: &Predicate, window: PageWindow) -> Result<Vec<Quote>>;

    /// Number of quotes matching `predicate`.
    async fn count_quotes(&self, predicate: &Predicate) -> Result<u64>;

    /// Fetch a single quote.
    async fn get_quote(&self, id: &QuoteId) -> Result<Option<Quote>>;

    /// Insert a quote owned by `actor`.
    async fn insert_quote(&self, actor: &Actor, quote: &NewQuote) -> Result<Quote>;

    /// Update a quote; zero affected rows is a permission failure.
    async fn update_quote(&self, actor: &Actor, id: &QuoteId, patch: &QuotePatch)
        -> Result<Quote>;

    /// Delete a quote; zero affected rows is a permission failure.
    async fn delete_quote(&self, actor: &Actor, id: &QuoteId) -> Result<()>;

    /// Distinct non-null categories, sorted.
    async fn list_categories(&self) -> Result<Vec<String>>;

    /// Quotes for the sitemap, at most `limit` (capped at [`MAX_INDEX_ENTRIES`]).
    async fn list_index_entries(&self, limit: u64) -> Result<Vec<Quote>>;
}

/// Profile operations.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;

    /// Create the actor's profile, or update it when it already exists.
    async fn save_profile(&self, actor: &Actor, update: &ProfileUpdate) -> Result<Profile>;
}

/// Sort and de-duplicate category labels.
pub(crate) fn unique_categories(categories: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut categories = categories
        .into_iter()
        .filter(|category| !category.trim().is_empty())
        .collect::<Vec<_>>();
    categories.sort();
    categories.dedup();
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthUser;

    #[test]
    fn actor_debug_redacts_token() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: AuthUser {
                id: "user-1".to_string(),
                email: None,
            },
        };
        let actor = Actor::from(&session);
        assert_eq!(actor.user_id, "user-1");
        let rendered = format!("{actor:?}");
        assert!(!rendered.contains("secret-access-token"));
    }

    #[test]
    fn unique_categories_sorts_and_dedups() {
        let categories = unique_categories(vec![
            "wisdom".to_string(),
            "life".to_string(),
            "wisdom".to_string(),
            " ".to_string(),
        ]);
        assert_eq!(categories, vec!["life".to_string(), "wisdom".to_string()]);
    }
}
