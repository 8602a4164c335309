//! Issues page requests and keeps the displayed page consistent
//!
//! Every request gets a sequence number. When a request resolves it may
//! only touch the displayed state if no newer request was issued in the
//! meantime; otherwise its result is dropped, whatever the arrival order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api_client::{BookPage, BookSource};
use crate::query_state::QueryState;
use crate::services::query_orchestrator::QuerySubscriber;

pub const FETCH_ERROR_MESSAGE: &str = "Request error, please try again or later!";

/// What renderers see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Last successfully fetched page; empty until the first success
    pub page: BookPage,
    /// The latest settled request failed
    pub error: bool,
    /// Sequence number of the latest request that settled
    pub settled: u64,
    /// Sequence number of the latest request issued
    pub issued: u64,
}

impl DisplayState {
    /// A request is still outstanding
    pub fn is_pending(&self) -> bool {
        self.settled < self.issued
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error.then_some(FETCH_ERROR_MESSAGE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The page replaced the displayed one
    Applied,
    /// The request failed and the error flag was set
    Failed,
    /// A newer request was issued first; nothing changed
    Superseded,
}

#[derive(Clone)]
pub struct ResultFetcher {
    source: Arc<dyn BookSource>,
    next_seq: Arc<AtomicU64>,
    display: Arc<watch::Sender<DisplayState>>,
}

impl ResultFetcher {
    pub fn new(source: Arc<dyn BookSource>) -> Self {
        let (display, _) = watch::channel(DisplayState::default());
        Self {
            source,
            next_seq: Arc::new(AtomicU64::new(0)),
            display: Arc::new(display),
        }
    }

    /// Issue a request for `query` on the current runtime.
    ///
    /// Must be called from within a tokio runtime.
    pub fn issue(&self, query: QueryState) -> JoinHandle<FetchOutcome> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.display
            .send_modify(|state| state.issued = state.issued.max(seq));
        info!(target: "fetch", "Issuing request #{}: {}", seq, query);

        let fetcher = self.clone();
        tokio::spawn(async move { fetcher.resolve(seq, query).await })
    }

    async fn resolve(&self, seq: u64, query: QueryState) -> FetchOutcome {
        let result = self.source.fetch_page(&query).await;
        let mut outcome = FetchOutcome::Superseded;

        self.display.send_if_modified(|state| {
            let latest = self.next_seq.load(Ordering::SeqCst);
            if seq != latest {
                debug!(target: "fetch", "Dropping request #{} (latest is #{})", seq, latest);
                return false;
            }

            match result {
                Ok(page) => {
                    info!(
                        target: "fetch",
                        "Request #{} returned {} records",
                        seq,
                        page.items.len()
                    );
                    state.page = page;
                    state.error = false;
                    outcome = FetchOutcome::Applied;
                }
                Err(e) => {
                    warn!(target: "fetch", "Request #{} failed: {}", seq, e);
                    state.error = true;
                    outcome = FetchOutcome::Failed;
                }
            }
            state.settled = seq;
            true
        });

        outcome
    }

    /// Copy of the displayed state
    pub fn snapshot(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    /// Page count reported by the displayed page
    pub fn last_known_page_count(&self) -> u32 {
        self.display.borrow().page.page_count
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    /// Wait until the most recently issued request has settled
    pub async fn settled(&self) -> DisplayState {
        let mut rx = self.display.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.is_pending() {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }
}

impl QuerySubscriber for ResultFetcher {
    fn on_query_changed(&mut self, query: &QueryState) {
        // Outcome is observed through the display state
        drop(self.issue(query.clone()));
    }

    fn name(&self) -> &str {
        "ResultFetcher"
    }
}
