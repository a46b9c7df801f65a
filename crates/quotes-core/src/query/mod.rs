//! Query composition for the quote list.
//!
//! The list view is driven entirely by the URL query string. [`ListParams`]
//! parses it, [`compose`] turns it (plus the current user) into a store
//! [`Predicate`] and a [`PageWindow`], and [`QuotePage::fetch`] runs the count
//! and page-select against a [`QuoteStore`].

mod pagination;

use serde::{Deserialize, Serialize};

use crate::models::Quote;
use crate::store::QuoteStore;
use crate::Result;

pub use pagination::{page_numbers, total_pages, PageRange, PageWindow, PAGE_SIZE};

/// Query-string value that selects owner-scoped listing.
pub const MY_QUOTES_FILTER: &str = "my-quotes";

/// "All quotes" vs "my quotes".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterMode {
    #[default]
    All,
    Mine,
}

impl FilterMode {
    /// Parse the `filter` query value; anything but `my-quotes` means all.
    #[must_use]
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(MY_QUOTES_FILTER) => Self::Mine,
            _ => Self::All,
        }
    }

    #[must_use]
    pub const fn query_value(self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Mine => Some(MY_QUOTES_FILTER),
        }
    }
}

/// Raw query parameters as they arrive from the URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// Normalized list state: search term, category, filter mode and 1-based page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListParams {
    pub search: String,
    pub category: String,
    pub filter: FilterMode,
    pub page: u64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: String::new(),
            filter: FilterMode::All,
            page: 1,
        }
    }
}

impl ListParams {
    #[must_use]
    pub fn from_query(raw: &RawListQuery) -> Self {
        Self {
            search: raw.search.as_deref().unwrap_or_default().trim().to_string(),
            category: raw.category.as_deref().unwrap_or_default().trim().to_string(),
            filter: FilterMode::parse(raw.filter.as_deref()),
            page: parse_page(raw.page.as_deref()),
        }
    }

    /// Whether any narrowing (search, category or owner filter) is active.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.search.is_empty() || !self.category.is_empty() || self.filter == FilterMode::Mine
    }

    /// Replace the search term and go back to the first page.
    #[must_use]
    pub fn with_search(&self, term: &str) -> Self {
        Self {
            search: term.trim().to_string(),
            page: 1,
            ..self.clone()
        }
    }

    /// Select a category, or clear it when it is already selected.
    #[must_use]
    pub fn toggle_category(&self, category: &str) -> Self {
        let category = category.trim();
        let next = if category.is_empty() || category == self.category {
            String::new()
        } else {
            category.to_string()
        };
        Self {
            category: next,
            page: 1,
            ..self.clone()
        }
    }

    /// Select a filter mode. Re-selecting the active mode resets to all;
    /// switching to "mine" drops any selected category.
    #[must_use]
    pub fn toggle_filter(&self, mode: FilterMode) -> Self {
        let filter = if mode == self.filter {
            FilterMode::All
        } else {
            mode
        };
        let category = if mode == FilterMode::Mine {
            String::new()
        } else {
            self.category.clone()
        };
        Self {
            search: self.search.clone(),
            category,
            filter,
            page: 1,
        }
    }

    #[must_use]
    pub fn with_page(&self, page: u64) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Encode as a query string (without the leading `?`).
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut pairs = Vec::new();
        if !self.search.is_empty() {
            pairs.push(format!("search={}", urlencoding::encode(&self.search)));
        }
        if !self.category.is_empty() {
            pairs.push(format!("category={}", urlencoding::encode(&self.category)));
        }
        if let Some(filter) = self.filter.query_value() {
            pairs.push(format!("filter={filter}"));
        }
        if self.page > 1 {
            pairs.push(format!("page={}", self.page));
        }
        pairs.join("&")
    }

    /// Root-relative link for this state.
    #[must_use]
    pub fn href(&self) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            "/".to_string()
        } else {
            format!("/?{query}")
        }
    }
}

/// Parse a 1-based page number. Missing, non-numeric and non-positive values
/// all mean the first page.
#[must_use]
pub fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .filter(|page| *page > 0)
        .and_then(|page| u64::try_from(page).ok())
        .unwrap_or(1)
}

/// Store-level filter shared by the count and page-select queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    /// Case-insensitive substring over content, author and category.
    pub search: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    /// Owner id to restrict to.
    pub owner_id: Option<String>,
}

impl Predicate {
    /// In-process evaluation with the same semantics the stores apply.
    #[must_use]
    pub fn matches(&self, quote: &Quote) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = quote.content.to_lowercase().contains(&needle)
                || quote.author.to_lowercase().contains(&needle)
                || quote
                    .category
                    .as_deref()
                    .is_some_and(|category| category.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if quote.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(owner_id) = &self.owner_id {
            if quote.user_id.as_deref() != Some(owner_id.as_str()) {
                return false;
            }
        }
        true
    }

    /// `%term%` with LIKE metacharacters escaped by backslash.
    #[must_use]
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|term| format!("%{}%", escape_like(term)))
    }
}

/// Escape `\`, `%` and `_` for a LIKE pattern using `\` as the escape char.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// A composed list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedQuery {
    pub predicate: Predicate,
    pub window: PageWindow,
}

/// Translate list state into a store predicate and page window.
///
/// The owner filter only applies when a user is signed in; an anonymous
/// "my quotes" request lists everything rather than matching a null owner.
#[must_use]
pub fn compose(params: &ListParams, current_user_id: Option<&str>) -> ComposedQuery {
    let owner_id = match (params.filter, current_user_id) {
        (FilterMode::Mine, Some(user_id)) if !user_id.trim().is_empty() => {
            Some(user_id.to_string())
        }
        _ => None,
    };

    ComposedQuery {
        predicate: Predicate {
            search: (!params.search.is_empty()).then(|| params.search.clone()),
            category: (!params.category.is_empty()).then(|| params.category.clone()),
            owner_id,
        },
        window: PageWindow::for_page(params.page),
    }
}

/// One rendered page of the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotePage {
    pub quotes: Vec<Quote>,
    pub page: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl QuotePage {
    /// Run the count and page-select queries for `params`.
    pub async fn fetch(
        store: &dyn QuoteStore,
        params: &ListParams,
        current_user_id: Option<&str>,
    ) -> Result<Self> {
        let composed = compose(params, current_user_id);
        let total_count = store.count_quotes(&composed.predicate).await?;
        let total_pages = total_pages(total_count);

        let quotes = if total_count == 0 {
            Vec::new()
        } else {
            store
                .list_quotes(&composed.predicate, composed.window)
                .await?
        };

        tracing::debug!(
            page = params.page,
            total_count,
            returned = quotes.len(),
            "Fetched quote page"
        );

        Ok(Self {
            quotes,
            page: params.page,
            total_count,
            total_pages,
        })
    }

    /// "Showing X to Y of Z" bounds for this page.
    #[must_use]
    pub fn range(&self) -> PageRange {
        PageRange::new(self.page, self.total_count)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn raw(search: &str, category: &str, filter: &str, page: &str) -> RawListQuery {
        let opt = |value: &str| (!value.is_empty()).then(|| value.to_string());
        RawListQuery {
            search: opt(search),
            category: opt(category),
            filter: opt(filter),
            page: opt(page),
        }
    }

    #[test]
    fn page_parsing_defaults_to_first_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some(" 4 ")), 4);
    }

    #[test]
    fn filter_parsing_recognizes_my_quotes_only() {
        assert_eq!(FilterMode::parse(Some("my-quotes")), FilterMode::Mine);
        assert_eq!(FilterMode::parse(Some("mine")), FilterMode::All);
        assert_eq!(FilterMode::parse(None), FilterMode::All);
    }

    #[test]
    fn compose_builds_all_predicates() {
        let params = ListParams::from_query(&raw(" hope ", "life", "my-quotes", "3"));
        let composed = compose(&params, Some("user-1"));
        assert_eq!(
            composed.predicate,
            Predicate {
                search: Some("hope".to_string()),
                category: Some("life".to_string()),
                owner_id: Some("user-1".to_string()),
            }
        );
        assert_eq!(composed.window, PageWindow { offset: 8, limit: 4 });
    }

    #[test]
    fn compose_skips_owner_filter_without_user() {
        let params = ListParams::from_query(&raw("", "", "my-quotes", ""));
        let composed = compose(&params, None);
        assert_eq!(composed.predicate, Predicate::default());
        assert_eq!(composed.window, PageWindow { offset: 0, limit: 4 });
    }

    #[test]
    fn switching_to_my_quotes_clears_category() {
        let params = ListParams::default().toggle_category("wisdom").with_page(3);
        assert_eq!(params.category, "wisdom");

        let mine = params.toggle_filter(FilterMode::Mine);
        assert_eq!(mine.filter, FilterMode::Mine);
        assert!(mine.category.is_empty());
        assert_eq!(mine.page, 1);
        assert_eq!(mine.to_query_string(), "filter=my-quotes");
    }

    #[test]
    fn toggling_active_filter_and_category_clears_them() {
        let params = ListParams::default()
            .toggle_filter(FilterMode::Mine)
            .toggle_filter(FilterMode::Mine);
        assert_eq!(params.filter, FilterMode::All);

        let params = params.toggle_category("life").toggle_category("life");
        assert!(params.category.is_empty());
    }

    #[test]
    fn query_string_encodes_and_omits_first_page() {
        let params = ListParams::default()
            .with_search("hope & dreams")
            .toggle_category("life")
            .with_page(2);
        assert_eq!(
            params.to_query_string(),
            "search=hope%20%26%20dreams&category=life&page=2"
        );
        assert_eq!(params.with_page(1).href(), "/?search=hope%20%26%20dreams&category=life");
        assert_eq!(ListParams::default().href(), "/");
    }

    #[test]
    fn search_resets_page() {
        let params = ListParams::default().with_page(5).with_search("love");
        assert_eq!(params.page, 1);
        assert!(params.has_filters());
    }

    #[test]
    fn escape_like_escapes_metacharacters() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        let predicate = Predicate {
            search: Some("a_b".to_string()),
            ..Predicate::default()
        };
        assert_eq!(predicate.search_pattern().as_deref(), Some("%a\\_b%"));
    }
}
