use std::sync::Arc;
use std::time::Duration;

use quotes_core::controller::{ResponseGate, SearchDebouncer, SearchTicket};
use quotes_core::session::SessionStore;
use quotes_core::store::QuoteStore;
use quotes_core::{FilterMode, ListParams, QuotePage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::commands::common::Backend;
use crate::commands::quotes::{format_page, list_quotes};
use crate::error::CliError;

type SearchResult = (SearchTicket, String, Result<QuotePage, CliError>);

/// Search as you type: every line read from `input` replaces the search
/// term, a term is only queried once input settles for `debounce`, and a
/// response older than one already shown is dropped.
pub async fn interactive_search<R, F>(
    store: Arc<dyn QuoteStore>,
    session: SessionStore,
    base: ListParams,
    input: R,
    debounce: Duration,
    mut emit: F,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(&str, Result<QuotePage, CliError>),
{
    let (debouncer, mut updates) = SearchDebouncer::new(debounce);
    let mut debouncer = Some(debouncer);
    let mut updates_open = true;
    let (result_sender, mut results) = mpsc::unbounded_channel::<SearchResult>();
    let mut result_sender = Some(result_sender);
    let gate = ResponseGate::new();
    let mut lines = input.lines();

    loop {
        tokio::select! {
            line = lines.next_line(), if debouncer.is_some() => match line? {
                Some(line) => {
                    if let Some(debouncer) = debouncer.as_mut() {
                        debouncer.push(line);
                    }
                }
                None => {
                    if let Some(debouncer) = debouncer.take() {
                        debouncer.finish();
                    }
                }
            },
            update = updates.recv(), if updates_open => match update {
                Some(update) => {
                    if let Some(sender) = &result_sender {
                        let ticket = gate.issue();
                        tracing::debug!(seq = ticket.seq(), term = %update.term, "Searching");
                        let store = Arc::clone(&store);
                        let session = session.clone();
                        let params = base.with_search(&update.term);
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            let page = list_quotes(store.as_ref(), &session, &params).await;
                            // Closed only when the loop has already returned.
                            let _ = sender.send((ticket, update.term, page));
                        });
                    }
                }
                None => {
                    updates_open = false;
                    result_sender = None;
                }
            },
            result = results.recv() => match result {
                Some((ticket, term, page)) => {
                    if gate.accept(ticket) {
                        emit(&term, page);
                    }
                }
                None => break,
            },
        }
    }

    Ok(())
}

pub async fn run_search(
    backend: &Backend,
    category: Option<String>,
    mine: bool,
    debounce_ms: u64,
) -> Result<(), CliError> {
    // "Mine" clears any category, so it is applied first.
    let mut base = ListParams::default();
    if mine {
        base = base.toggle_filter(FilterMode::Mine);
    }
    if let Some(category) = category {
        base = base.toggle_category(&category);
    }

    eprintln!("Type to search; each line replaces the term. Ctrl-D to finish.");
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    interactive_search(
        Arc::new(backend.store.clone()),
        backend.session.clone(),
        base,
        stdin,
        Duration::from_millis(debounce_ms),
        |term, page| {
            if term.is_empty() {
                println!("-- All quotes --");
            } else {
                println!("-- Results for \"{term}\" --");
            }
            match page {
                Ok(page) => {
                    for line in format_page(&page) {
                        println!("{line}");
                    }
                }
                Err(error) => println!("Error: {}", error.user_message()),
            }
        },
    )
    .await
}
