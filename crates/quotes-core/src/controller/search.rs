//! Debounced search input and stale-response dropping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Pause after the last keystroke before a search is issued.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Monotonic sequence number attached to a search and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

impl SearchTicket {
    #[must_use]
    pub const fn seq(self) -> u64 {
        self.0
    }
}

/// A settled search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchUpdate {
    pub ticket: SearchTicket,
    pub term: String,
}

/// Emits a search term once input has been quiet for the configured delay.
///
/// A new push cancels the pending one, so only the latest term is emitted.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    next_seq: u64,
    pending: Option<JoinHandle<()>>,
    sender: mpsc::UnboundedSender<SearchUpdate>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<SearchUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                delay,
                next_seq: 0,
                pending: None,
                sender,
            },
            receiver,
        )
    }

    /// Schedule `term`, superseding anything still waiting.
    pub fn push(&mut self, term: impl Into<String>) -> SearchTicket {
        self.cancel();
        self.next_seq += 1;
        let update = SearchUpdate {
            ticket: SearchTicket(self.next_seq),
            term: term.into().trim().to_string(),
        };
        let ticket = update.ticket;
        let sender = self.sender.clone();
        let delay = self.delay;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The receiver may be gone during shutdown.
            let _ = sender.send(update);
        }));
        ticket
    }

    /// Stop taking input. A term still waiting is emitted, after which the
    /// receiver reports the channel closed.
    pub fn finish(mut self) {
        // Detached rather than aborted; the task owns its own sender.
        self.pending.take();
    }

    /// Drop the pending term, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Accepts a response only when it is newer than the last one applied.
#[derive(Debug, Default)]
pub struct ResponseGate {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl ResponseGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticket for a request about to be sent.
    pub fn issue(&self) -> SearchTicket {
        SearchTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Record `ticket` as applied, or reject it as stale.
    pub fn accept(&self, ticket: SearchTicket) -> bool {
        let accepted = self
            .applied
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |applied| {
                (ticket.0 > applied).then_some(ticket.0)
            })
            .is_ok();
        if !accepted {
            tracing::debug!(seq = ticket.0, "Dropping stale search response");
        }
        accepted
    }

    /// Whether `ticket` is the most recently issued request.
    #[must_use]
    pub fn is_latest(&self, ticket: SearchTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}
