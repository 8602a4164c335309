use tracing::{debug, info};

use crate::query_state::{ChangeRequest, Intent, QueryState};
use crate::result_fetcher::ResultFetcher;

/// Trait for components that react to applied query transitions
pub trait QuerySubscriber {
    /// Called once per applied transition, after the new state is stored
    fn on_query_changed(&mut self, query: &QueryState);

    /// Get subscriber name for debugging
    fn name(&self) -> &str;
}

/// Owns the session's query and turns user changes into fetches
pub struct QueryOrchestrator {
    query: QueryState,
    fetcher: ResultFetcher,

    /// The fetcher is always the first subscriber
    subscribers: Vec<Box<dyn QuerySubscriber>>,

    /// Applied states, oldest first, for debugging
    history: Vec<QueryState>,
    max_history: usize,
}

impl QueryOrchestrator {
    pub fn new(initial: QueryState, fetcher: ResultFetcher) -> Self {
        let subscribers: Vec<Box<dyn QuerySubscriber>> = vec![Box::new(fetcher.clone())];
        Self {
            history: vec![initial.clone()],
            query: initial,
            fetcher,
            subscribers,
            max_history: 100,
        }
    }

    /// Add a subscriber
    pub fn subscribe(&mut self, subscriber: Box<dyn QuerySubscriber>) {
        info!(target: "query", "Adding subscriber: {}", subscriber.name());
        self.subscribers.push(subscriber);
    }

    /// Fetch the initial query. Call once when the view is shown.
    pub fn start(&mut self) {
        info!(target: "query", "Starting with {}", self.query);
        self.notify();
    }

    /// Apply `request` to the current query.
    ///
    /// Returns true when the query changed, in which case every subscriber
    /// has been notified.
    pub fn dispatch(&mut self, request: ChangeRequest) -> bool {
        let page_count = self.fetcher.last_known_page_count();
        let next = self.query.transition(&request, page_count);

        if next == self.query {
            debug!(
                target: "query",
                "Ignoring {:?} against {} (page count {})",
                request,
                self.query,
                page_count
            );
            return false;
        }

        info!(target: "query", "Query changed: {} -> {}", self.query, next);
        self.query = next;
        self.history.push(self.query.clone());
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }

        self.notify();
        true
    }

    pub fn dispatch_intent(&mut self, intent: Intent) -> bool {
        self.dispatch(intent.into())
    }

    fn notify(&mut self) {
        for subscriber in &mut self.subscribers {
            debug!(target: "query", "Notifying subscriber: {}", subscriber.name());
            subscriber.on_query_changed(&self.query);
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn fetcher(&self) -> &ResultFetcher {
        &self.fetcher
    }

    pub fn history(&self) -> &[QueryState] {
        &self.history
    }
}
