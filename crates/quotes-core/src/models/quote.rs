//! Quote model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;
use crate::util::{normalize_text_option, truncate_with_ellipsis};

/// Opaque quote identifier.
///
/// The hosted store issues UUIDs; the local store mints UUID v7 values so ids
/// sort by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(String);

impl QuoteId {
    /// Mint a new time-sortable identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QuoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl FromStr for QuoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Quote ID cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// A stored quote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Quote {
    /// `"content" - author`, used for clipboard and share intents.
    #[must_use]
    pub fn share_text(&self) -> String {
        format!("\"{}\" - {}", self.content, self.author)
    }

    /// Short title used by page metadata; content is cut at 100 characters.
    #[must_use]
    pub fn headline(&self) -> String {
        format!(
            "\"{}\" - {}",
            truncate_with_ellipsis(&self.content, 100),
            self.author
        )
    }

    /// Whether `user_id` owns this quote.
    ///
    /// Only used to decide which controls to show; the store's row-level
    /// policy is what actually allows or refuses a mutation.
    #[must_use]
    pub fn is_owned_by(&self, user_id: Option<&str>) -> bool {
        match (self.user_id.as_deref(), user_id) {
            (Some(owner), Some(user)) => owner == user,
            _ => false,
        }
    }
}

/// Insert payload for a new quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewQuote {
    pub content: String,
    pub author: String,
    pub category: Option<String>,
    pub user_id: String,
}

impl NewQuote {
    /// Build a trimmed insert payload, rejecting empty content or author.
    pub fn new(
        content: &str,
        author: &str,
        category: Option<&str>,
        user_id: impl Into<String>,
    ) -> Result<Self, Error> {
        let (content, author, category) = normalize_fields(content, author, category)?;
        Ok(Self {
            content,
            author,
            category,
            user_id: user_id.into(),
        })
    }
}

/// Update payload for an existing quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotePatch {
    pub content: String,
    pub author: String,
    pub category: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl QuotePatch {
    pub fn new(content: &str, author: &str, category: Option<&str>) -> Result<Self, Error> {
        let (content, author, category) = normalize_fields(content, author, category)?;
        Ok(Self {
            content,
            author,
            category,
            updated_at: Utc::now(),
        })
    }
}

fn normalize_fields(
    content: &str,
    author: &str,
    category: Option<&str>,
) -> Result<(String, String, Option<String>), Error> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::InvalidInput("Quote content is required".to_string()));
    }
    let author = author.trim();
    if author.is_empty() {
        return Err(Error::InvalidInput("Author is required".to_string()));
    }
    Ok((
        content.to_string(),
        author.to_string(),
        normalize_text_option(category.map(str::to_string)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(user_id: Option<&str>) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::generate(),
            content: "Stay hungry, stay foolish.".to_string(),
            author: "Steve Jobs".to_string(),
            category: Some("inspiration".to_string()),
            created_at: now,
            updated_at: now,
            user_id: user_id.map(str::to_string),
        }
    }

    #[test]
    fn quote_id_rejects_blank_input() {
        assert!("  ".parse::<QuoteId>().is_err());
        assert_eq!("abc".parse::<QuoteId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(QuoteId::generate(), QuoteId::generate());
    }

    #[test]
    fn new_quote_trims_and_drops_empty_category() {
        let quote = NewQuote::new("  Be kind.  ", " Anon ", Some("   "), "user-1").unwrap();
        assert_eq!(quote.content, "Be kind.");
        assert_eq!(quote.author, "Anon");
        assert_eq!(quote.category, None);
    }

    #[test]
    fn new_quote_rejects_empty_content() {
        let err = NewQuote::new(" \n ", "Anon", None, "user-1").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("content")));
    }

    #[test]
    fn patch_rejects_empty_author() {
        let err = QuotePatch::new("Words", "  ", None).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(message) if message.contains("Author")));
    }

    #[test]
    fn ownership_requires_both_ids() {
        let owned = sample(Some("user-1"));
        assert!(owned.is_owned_by(Some("user-1")));
        assert!(!owned.is_owned_by(Some("user-2")));
        assert!(!owned.is_owned_by(None));
        assert!(!sample(None).is_owned_by(Some("user-1")));
    }

    #[test]
    fn headline_truncates_long_content() {
        let mut quote = sample(None);
        quote.content = "a".repeat(150);
        let headline = quote.headline();
        assert!(headline.starts_with(&format!("\"{}...\"", "a".repeat(100))));
        assert!(headline.ends_with("- Steve Jobs"));
    }

    #[test]
    fn deserializes_store_row() {
        let raw = r#"{
            "id": "7f7c9d1e-0000-4000-8000-000000000001",
            "content": "Hope is a waking dream.",
            "author": "Aristotle",
            "category": null,
            "created_at": "2024-05-01T10:00:00.123456+00:00",
            "updated_at": "2024-05-01T10:00:00.123456+00:00",
            "user_id": null
        }"#;
        let quote: Quote = serde_json::from_str(raw).unwrap();
        assert_eq!(quote.author, "Aristotle");
        assert!(quote.category.is_none());
    }
}
