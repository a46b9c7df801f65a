use quotes_core::controller::{self, QuoteForm};
use quotes_core::query::{RawListQuery, MY_QUOTES_FILTER};
use quotes_core::session::SessionStore;
use quotes_core::store::QuoteStore;
use quotes_core::{FilterMode, ListParams, Quote, QuotePage};

use crate::commands::common::{
    format_quote_detail, format_quote_line, normalize_content, parse_quote_id, Backend,
};
use crate::error::CliError;

pub const LOGIN_FOR_MINE_MESSAGE: &str = "Please login to see your quotes.";

pub struct ListArgs {
    pub search: Option<String>,
    pub category: Option<String>,
    pub mine: bool,
    pub page: String,
}

impl ListArgs {
    pub fn params(&self) -> ListParams {
        ListParams::from_query(&RawListQuery {
            search: self.search.clone(),
            category: self.category.clone(),
            filter: self.mine.then(|| MY_QUOTES_FILTER.to_string()),
            page: Some(self.page.clone()),
        })
    }
}

/// Fetch one page. "Mine" needs a signed-in user rather than silently listing everything.
pub async fn list_quotes(
    store: &dyn QuoteStore,
    session: &SessionStore,
    params: &ListParams,
) -> Result<QuotePage, CliError> {
    let user = session.current_user();
    if params.filter == FilterMode::Mine && user.is_none() {
        return Err(quotes_core::Error::Unauthenticated(LOGIN_FOR_MINE_MESSAGE.to_string()).into());
    }
    Ok(QuotePage::fetch(store, params, user.as_ref().map(|user| user.id.as_str())).await?)
}

pub fn format_page(page: &QuotePage) -> Vec<String> {
    if page.is_empty() {
        return vec!["No quotes found.".to_string()];
    }
    let mut lines: Vec<String> = page.quotes.iter().map(format_quote_line).collect();
    if page.quotes.is_empty() {
        lines.push(format!(
            "Page {} is past the end ({} pages).",
            page.page, page.total_pages
        ));
        return lines;
    }
    let range = page.range();
    lines.push(String::new());
    lines.push(format!(
        "Showing {} to {} of {} quotes (page {} of {})",
        range.start, range.end, range.total, page.page, page.total_pages
    ));
    lines
}

pub async fn run_list(backend: &Backend, args: &ListArgs, as_json: bool) -> Result<(), CliError> {
    let page = list_quotes(&backend.store, &backend.session, &args.params()).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else {
        for line in format_page(&page) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn find_quote(store: &dyn QuoteStore, raw_id: &str) -> Result<Quote, CliError> {
    let id = parse_quote_id(raw_id)?;
    store
        .get_quote(&id)
        .await?
        .ok_or_else(|| CliError::QuoteNotFound(raw_id.trim().to_string()))
}

pub async fn run_show(backend: &Backend, raw_id: &str, as_json: bool) -> Result<(), CliError> {
    let quote = find_quote(&backend.store, raw_id).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&quote)?);
    } else {
        for line in format_quote_detail(&quote) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn add_quote(
    store: &dyn QuoteStore,
    session: &SessionStore,
    content_parts: &[String],
    author: &str,
    category: Option<&str>,
) -> Result<Quote, CliError> {
    let content = normalize_content(content_parts).unwrap_or_default();
    let form = QuoteForm::new(content, author, category.map(str::to_string));
    Ok(controller::submit_quote(store, session, &form).await?)
}

/// Apply the given fields on top of the stored quote and save it.
pub async fn edit_quote(
    store: &dyn QuoteStore,
    session: &SessionStore,
    raw_id: &str,
    content: Option<&str>,
    author: Option<&str>,
    category: Option<&str>,
) -> Result<Quote, CliError> {
    let existing = find_quote(store, raw_id).await?;
    let mut form = QuoteForm::from_quote(&existing);
    if let Some(content) = content {
        form.content = content.to_string();
    }
    if let Some(author) = author {
        form.author = author.to_string();
    }
    if let Some(category) = category {
        form.category = Some(category.to_string());
    }
    Ok(controller::save_quote_edit(store, session, &existing.id, &form).await?)
}

pub async fn delete_quote(
    store: &dyn QuoteStore,
    session: &SessionStore,
    raw_id: &str,
) -> Result<(), CliError> {
    let id = parse_quote_id(raw_id)?;
    controller::remove_quote(store, session, &id).await?;
    Ok(())
}

pub async fn run_add(
    backend: &Backend,
    content_parts: &[String],
    author: &str,
    category: Option<&str>,
) -> Result<(), CliError> {
    let quote = add_quote(&backend.store, &backend.session, content_parts, author, category).await?;
    println!("{}", quote.id);
    Ok(())
}

pub async fn run_edit(
    backend: &Backend,
    raw_id: &str,
    content: Option<&str>,
    author: Option<&str>,
    category: Option<&str>,
) -> Result<(), CliError> {
    let quote = edit_quote(
        &backend.store,
        &backend.session,
        raw_id,
        content,
        author,
        category,
    )
    .await?;
    println!("Updated {}", format_quote_line(&quote));
    Ok(())
}

pub async fn run_delete(backend: &Backend, raw_id: &str) -> Result<(), CliError> {
    delete_quote(&backend.store, &backend.session, raw_id).await?;
    println!("Deleted {}", raw_id.trim());
    Ok(())
}

pub async fn run_categories(backend: &Backend, as_json: bool) -> Result<(), CliError> {
    let categories = backend.store.list_categories().await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&categories)?);
    } else if categories.is_empty() {
        println!("No categories yet.");
    } else {
        for category in categories {
            println!("{category}");
        }
    }
    Ok(())
}
