//! PostgREST (Supabase data API) implementation of the store traits.

use async_trait::async_trait;
use reqwest::header::CONTENT_RANGE;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{
    unique_categories, Actor, ProfileStore, QuoteStore, DELETE_DENIED_MESSAGE,
    MAX_INDEX_ENTRIES, UPDATE_DENIED_MESSAGE,
};
use crate::error::{Error, StoreFailure};
use crate::models::{NewQuote, Profile, ProfileUpdate, Quote, QuoteId, QuotePatch};
use crate::query::{escape_like, PageWindow, Predicate};
use crate::util::{compact_text, is_http_url};
use crate::Result;

const QUOTES_TABLE: &str = "quotes";
const PROFILES_TABLE: &str = "profiles";
const RLS_VIOLATION_CODE: &str = "42501";

/// Connection settings for a Supabase project's REST endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgrestConfig {
    pub supabase_url: String,
    pub anon_key: String,
}

impl PostgrestConfig {
    pub fn new(supabase_url: impl AsRef<str>, anon_key: impl Into<String>) -> Result<Self> {
        let supabase_url = supabase_url.as_ref().trim().trim_end_matches('/').to_string();
        if !is_http_url(&supabase_url) {
            return Err(Error::Config(
                "Supabase URL must include http:// or https://".to_string(),
            ));
        }
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(Error::Config(
                "Supabase anon key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            supabase_url,
            anon_key,
        })
    }

    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.supabase_url)
    }
}

impl std::fmt::Debug for PostgrestConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PostgrestConfig")
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Quote and profile store backed by the hosted PostgREST API.
#[derive(Clone)]
pub struct PostgrestStore {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl PostgrestStore {
    pub fn new(config: &PostgrestConfig) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            anon_key: config.anon_key.clone(),
            client: Client::builder().build()?,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    fn actor_request(&self, request: RequestBuilder, actor: &Actor) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&actor.access_token)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Vec<T>> {
        let response = request.send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl QuoteStore for PostgrestStore {
    async fn list_quotes(&self, predicate: &Predicate, window: PageWindow) -> Result<Vec<Quote>> {
        let mut params = predicate_params(predicate);
        params.push(("select".to_string(), "*".to_string()));
        params.push(("order".to_string(), "created_at.desc".to_string()));
        params.push(("offset".to_string(), window.offset.to_string()));
        params.push(("limit".to_string(), window.limit.to_string()));

        let request = self.public_request(self.client.get(self.table_url(QUOTES_TABLE)).query(&params));
        self.fetch_rows(request).await
    }

    async fn count_quotes(&self, predicate: &Predicate) -> Result<u64> {
        let mut params = predicate_params(predicate);
        params.push(("select".to_string(), "id".to_string()));

        let request = self.public_request(
            self.client
                .head(self.table_url(QUOTES_TABLE))
                .query(&params)
                .header("Prefer", "count=exact"),
        );
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let header = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::Store(StoreFailure::new("Count response had no Content-Range")))?;
        parse_content_range_total(header)
    }

    async fn get_quote(&self, id: &QuoteId) -> Result<Option<Quote>> {
        let request = self.public_request(
            self.client
                .get(self.table_url(QUOTES_TABLE))
                .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]),
        );
        let rows: Vec<Quote> = self.fetch_rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_quote(&self, actor: &Actor, quote: &NewQuote) -> Result<Quote> {
        let request = self.actor_request(
            self.client
                .post(self.table_url(QUOTES_TABLE))
                .header("Prefer", "return=representation")
                .json(&[quote]),
            actor,
        );
        let rows: Vec<Quote> = self.fetch_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::PermissionDenied("The quote was not saved.".to_string()))
    }

    async fn update_quote(
        &self,
        actor: &Actor,
        id: &QuoteId,
        patch: &QuotePatch,
    ) -> Result<Quote> {
        let request = self.actor_request(
            self.client
                .patch(self.table_url(QUOTES_TABLE))
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation")
                .json(patch),
            actor,
        );
        let rows: Vec<Quote> = self.fetch_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::PermissionDenied(UPDATE_DENIED_MESSAGE.to_string()))
    }

    async fn delete_quote(&self, actor: &Actor, id: &QuoteId) -> Result<()> {
        let request = self.actor_request(
            self.client
                .delete(self.table_url(QUOTES_TABLE))
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation"),
            actor,
        );
        let rows: Vec<Quote> = self.fetch_rows(request).await?;
        if rows.is_empty() {
            return Err(Error::PermissionDenied(DELETE_DENIED_MESSAGE.to_string()));
        }
        Ok(())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let request = self.public_request(
            self.client
                .get(self.table_url(QUOTES_TABLE))
                .query(&[("select", "category"), ("category", "not.is.null")]),
        );
        let rows: Vec<CategoryRow> = self.fetch_rows(request).await?;
        Ok(unique_categories(rows.into_iter().filter_map(|row| row.category)))
    }

    async fn list_index_entries(&self, limit: u64) -> Result<Vec<Quote>> {
        let limit = limit.min(MAX_INDEX_ENTRIES);
        let request = self.public_request(self.client.get(self.table_url(QUOTES_TABLE)).query(&[
            ("select", "*".to_string()),
            ("order", "updated_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]));
        self.fetch_rows(request).await
    }
}

#[async_trait]
impl ProfileStore for PostgrestStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let request = self.public_request(self.client.get(self.table_url(PROFILES_TABLE)).query(&[
            ("select", "id,name,avatar_url".to_string()),
            ("id", format!("eq.{user_id}")),
        ]));
        let rows: Vec<Profile> = self.fetch_rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn save_profile(&self, actor: &Actor, update: &ProfileUpdate) -> Result<Profile> {
        let row = ProfileRow {
            id: &actor.user_id,
            name: update.name.as_deref(),
            avatar_url: update.avatar_url.as_deref(),
        };
        let request = self.actor_request(
            self.client
                .post(self.table_url(PROFILES_TABLE))
                .query(&[("on_conflict", "id")])
                .header("Prefer", "resolution=merge-duplicates,return=representation")
                .json(&[row]),
            actor,
        );
        let rows: Vec<Profile> = self.fetch_rows(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| Error::PermissionDenied("The profile was not saved.".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProfileRow<'a> {
    id: &'a str,
    name: Option<&'a str>,
    avatar_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// PostgREST filter parameters for a predicate.
fn predicate_params(predicate: &Predicate) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(search) = &predicate.search {
        let pattern = quote_filter_value(&format!("*{}*", ilike_term(search)));
        params.push((
            "or".to_string(),
            format!("(content.ilike.{pattern},author.ilike.{pattern},category.ilike.{pattern})"),
        ));
    }
    if let Some(category) = &predicate.category {
        params.push(("category".to_string(), format!("eq.{category}")));
    }
    if let Some(owner_id) = &predicate.owner_id {
        params.push(("user_id".to_string(), format!("eq.{owner_id}")));
    }
    params
}

/// LIKE-escaped search term for an `ilike` filter. PostgREST rewrites every
/// `*` to `%` and offers no escape for it, so a literal `*` is narrowed to
/// the single-character wildcard instead of matching any run of text.
fn ilike_term(search: &str) -> String {
    escape_like(search).replace('*', "_")
}

/// Double-quote a value for use inside a PostgREST logical filter, so commas
/// and parentheses in user input stay literal.
fn quote_filter_value(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Total from a `Content-Range` header such as `0-3/17` or `*/0`.
fn parse_content_range_total(header: &str) -> Result<u64> {
    header
        .rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            Error::Store(StoreFailure::new(format!(
                "Unexpected Content-Range header: {}",
                compact_text(header)
            )))
        })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    Ok(response.json::<T>().await?)
}

async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    classify_error(status, &body)
}

fn classify_error(status: StatusCode, body: &str) -> Error {
    let failure = serde_json::from_str::<PostgrestErrorBody>(body).map_or_else(
        |_| StoreFailure {
            message: if body.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                compact_text(body)
            },
            status: Some(status.as_u16()),
            ..StoreFailure::default()
        },
        |payload| StoreFailure {
            message: payload
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            code: payload.code,
            detail: payload.details,
            hint: payload.hint,
            status: Some(status.as_u16()),
        },
    );

    if failure.code.as_deref() == Some(RLS_VIOLATION_CODE) {
        tracing::warn!(status = status.as_u16(), "Row-level policy rejected request");
        return Error::PermissionDenied(failure.message);
    }
    tracing::warn!(
        status = status.as_u16(),
        code = failure.code.as_deref().unwrap_or("none"),
        "Store request failed"
    );
    Error::Store(failure)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn config_requires_http_url_and_key() {
        assert!(PostgrestConfig::new("demo.supabase.co", "anon").is_err());
        assert!(PostgrestConfig::new("https://demo.supabase.co", " ").is_err());
        let config = PostgrestConfig::new("https://demo.supabase.co/", "anon").unwrap();
        assert_eq!(config.rest_url(), "https://demo.supabase.co/rest/v1");
        assert!(format!("{config:?}").contains("[REDACTED]"));
    }

    #[test]
    fn predicate_params_cover_all_filters() {
        let predicate = Predicate {
            search: Some("hope".to_string()),
            category: Some("life".to_string()),
            owner_id: Some("user-1".to_string()),
        };
        let params = predicate_params(&predicate);
        assert_eq!(
            params,
            vec![
                (
                    "or".to_string(),
                    "(content.ilike.\"*hope*\",author.ilike.\"*hope*\",category.ilike.\"*hope*\")"
                        .to_string()
                ),
                ("category".to_string(), "eq.life".to_string()),
                ("user_id".to_string(), "eq.user-1".to_string()),
            ]
        );
    }

    #[test]
    fn empty_predicate_has_no_filters() {
        assert!(predicate_params(&Predicate::default()).is_empty());
    }

    #[test]
    fn search_values_are_quoted_and_escaped() {
        assert_eq!(quote_filter_value("a,b)"), "\"a,b)\"");
        assert_eq!(quote_filter_value("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote_filter_value("*50\\%*"), "\"*50\\\\%*\"");
    }

    #[test]
    fn search_asterisk_is_not_a_wildcard_run() {
        assert_eq!(ilike_term("5*"), "5_");
        assert_eq!(ilike_term("a_*%"), "a\\__\\%");

        let params = predicate_params(&Predicate {
            search: Some("**".to_string()),
            ..Predicate::default()
        });
        assert_eq!(
            params[0].1,
            "(content.ilike.\"*__*\",author.ilike.\"*__*\",category.ilike.\"*__*\")"
        );
    }

    #[test]
    fn content_range_total_is_parsed() {
        assert_eq!(parse_content_range_total("0-3/17").unwrap(), 17);
        assert_eq!(parse_content_range_total("*/0").unwrap(), 0);
        assert!(parse_content_range_total("0-3/*").is_err());
    }

    #[test]
    fn rls_violation_maps_to_permission_denied() {
        let body = r#"{"code":"42501","details":null,"hint":null,"message":"new row violates row-level security policy for table \"quotes\""}"#;
        let error = classify_error(StatusCode::FORBIDDEN, body);
        assert!(error.is_permission_denied());
    }

    #[test]
    fn structured_error_keeps_detail_and_hint() {
        let body = r#"{"code":"22P02","details":"Token \"x\" is invalid.","hint":"Check the id","message":"invalid input syntax for type uuid"}"#;
        match classify_error(StatusCode::BAD_REQUEST, body) {
            Error::Store(failure) => {
                assert_eq!(failure.code.as_deref(), Some("22P02"));
                assert_eq!(failure.hint.as_deref(), Some("Check the id"));
                assert!(failure.detail.unwrap().contains("invalid"));
                assert_eq!(failure.status, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unstructured_error_body_is_compacted() {
        match classify_error(StatusCode::BAD_GATEWAY, "") {
            Error::Store(failure) => assert_eq!(failure.message, "HTTP 502"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
