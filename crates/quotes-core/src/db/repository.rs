//! `SQLite` implementation of the quote and profile stores

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::connection::UNICODE_LOWER;
use super::Database;
use crate::error::{Error, Result};
use crate::models::{NewQuote, Profile, ProfileUpdate, Quote, QuoteId, QuotePatch};
use crate::query::{PageWindow, Predicate};
use crate::store::{
    Actor, ProfileStore, QuoteStore, DELETE_DENIED_MESSAGE, MAX_INDEX_ENTRIES,
    UPDATE_DENIED_MESSAGE,
};

const QUOTE_COLUMNS: &str = "id, content, author, category, created_at, updated_at, user_id";

/// Quote and profile store backed by a local `SQLite` file.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Database>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

/// WHERE clause and bound values for a predicate.
fn where_clause(predicate: &Predicate) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(pattern) = predicate.search_pattern() {
        // Both sides are folded so non-ASCII letters match case-insensitively.
        let pattern = pattern.to_lowercase();
        clauses.push(format!(
            "({UNICODE_LOWER}(content) LIKE ? ESCAPE '\\' \
             OR {UNICODE_LOWER}(author) LIKE ? ESCAPE '\\' \
             OR {UNICODE_LOWER}(category) LIKE ? ESCAPE '\\')"
        ));
        for _ in 0..3 {
            values.push(Value::Text(pattern.clone()));
        }
    }
    if let Some(category) = &predicate.category {
        clauses.push("category = ?".to_string());
        values.push(Value::Text(category.clone()));
    }
    if let Some(owner_id) = &predicate.owner_id {
        clauses.push("user_id = ?".to_string());
        values.push(Value::Text(owner_id.clone()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_quote(row: &Row<'_>) -> rusqlite::Result<Quote> {
    Ok(Quote {
        id: QuoteId::from(row.get::<_, String>(0)?),
        content: row.get(1)?,
        author: row.get(2)?,
        category: row.get(3)?,
        created_at: from_millis(row.get(4)?),
        updated_at: from_millis(row.get(5)?),
        user_id: row.get(6)?,
    })
}

fn select_quote(conn: &Connection, id: &str) -> Result<Option<Quote>> {
    let quote = conn
        .query_row(
            &format!("SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1"),
            params![id],
            row_to_quote,
        )
        .optional()?;
    Ok(quote)
}

fn select_profile(conn: &Connection, id: &str) -> Result<Option<Profile>> {
    let profile = conn
        .query_row(
            "SELECT id, name, avatar_url FROM profiles WHERE id = ?1",
            params![id],
            |row| {
                Ok(Profile {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    avatar_url: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(profile)
}

#[async_trait]
impl QuoteStore for SqliteStore {
    async fn list_quotes(&self, predicate: &Predicate, window: PageWindow) -> Result<Vec<Quote>> {
        let (filter, mut values) = where_clause(predicate);
        values.push(Value::Integer(to_sql_int(window.limit)));
        values.push(Value::Integer(to_sql_int(window.offset)));

        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes{filter} \
             ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        ))?;
        let quotes = stmt
            .query_map(params_from_iter(values), row_to_quote)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(quotes)
    }

    async fn count_quotes(&self, predicate: &Predicate) -> Result<u64> {
        let (filter, values) = where_clause(predicate);
        let db = self.db.lock().await;
        let count: i64 = db.connection().query_row(
            &format!("SELECT COUNT(*) FROM quotes{filter}"),
            params_from_iter(values),
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn get_quote(&self, id: &QuoteId) -> Result<Option<Quote>> {
        let db = self.db.lock().await;
        select_quote(db.connection(), id.as_str())
    }

    async fn insert_quote(&self, actor: &Actor, quote: &NewQuote) -> Result<Quote> {
        if quote.user_id != actor.user_id {
            return Err(Error::PermissionDenied(
                "Quotes can only be added for the signed-in user.".to_string(),
            ));
        }

        let id = QuoteId::generate();
        let now = Utc::now().timestamp_millis();
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO quotes (id, content, author, category, created_at, updated_at, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?6)",
            params![
                id.as_str(),
                quote.content,
                quote.author,
                quote.category,
                now,
                actor.user_id
            ],
        )?;
        tracing::debug!(quote_id = %id, "Inserted quote");

        select_quote(db.connection(), id.as_str())?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn update_quote(
        &self,
        actor: &Actor,
        id: &QuoteId,
        patch: &QuotePatch,
    ) -> Result<Quote> {
        let db = self.db.lock().await;
        let affected = db.connection().execute(
            "UPDATE quotes SET content = ?1, author = ?2, category = ?3, updated_at = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                patch.content,
                patch.author,
                patch.category,
                patch.updated_at.timestamp_millis(),
                id.as_str(),
                actor.user_id
            ],
        )?;
        if affected == 0 {
            tracing::warn!(quote_id = %id, "Update matched no rows owned by the actor");
            return Err(Error::PermissionDenied(UPDATE_DENIED_MESSAGE.to_string()));
        }

        select_quote(db.connection(), id.as_str())?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn delete_quote(&self, actor: &Actor, id: &QuoteId) -> Result<()> {
        let db = self.db.lock().await;
        let affected = db.connection().execute(
            "DELETE FROM quotes WHERE id = ?1 AND user_id = ?2",
            params![id.as_str(), actor.user_id],
        )?;
        if affected == 0 {
            tracing::warn!(quote_id = %id, "Delete matched no rows owned by the actor");
            return Err(Error::PermissionDenied(DELETE_DENIED_MESSAGE.to_string()));
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(
            "SELECT DISTINCT category FROM quotes
             WHERE category IS NOT NULL AND trim(category) != ''
             ORDER BY category",
        )?;
        let categories = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(categories)
    }

    async fn list_index_entries(&self, limit: u64) -> Result<Vec<Quote>> {
        let limit = limit.min(MAX_INDEX_ENTRIES);
        let db = self.db.lock().await;
        let mut stmt = db.connection().prepare(&format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes ORDER BY updated_at DESC, id DESC LIMIT ?1"
        ))?;
        let quotes = stmt
            .query_map(params![to_sql_int(limit)], row_to_quote)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(quotes)
    }
}

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let db = self.db.lock().await;
        select_profile(db.connection(), user_id)
    }

    async fn save_profile(&self, actor: &Actor, update: &ProfileUpdate) -> Result<Profile> {
        let update = update.clone().normalized();
        let db = self.db.lock().await;
        db.connection().execute(
            "INSERT INTO profiles (id, name, avatar_url) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, avatar_url = excluded.avatar_url",
            params![actor.user_id, update.name, update.avatar_url],
        )?;

        select_profile(db.connection(), &actor.user_id)?
            .ok_or_else(|| Error::NotFound(actor.user_id.clone()))
    }
}
