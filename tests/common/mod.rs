#![allow(dead_code)]

use async_trait::async_trait;
use book_viewer::api_client::{Book, BookPage, BookSource, FetchError};
use book_viewer::query_state::QueryState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

pub type Gate = oneshot::Sender<Result<BookPage, FetchError>>;

pub fn book(id: i64, title: &str) -> Book {
    Book {
        id,
        title: title.to_string(),
        first_name: "Ursula".to_string(),
        last_name: "Le Guin".to_string(),
        total_copies: 4,
        copies_in_use: 1,
        kind: "Paperback".to_string(),
        isbn: format!("97800000000{:02}", id),
        category: "Science fiction".to_string(),
    }
}

pub fn page(page_count: u32, page_number: u32, titles: &[&str]) -> BookPage {
    BookPage {
        total_count: 5,
        page_count,
        page_number,
        items: titles
            .iter()
            .enumerate()
            .map(|(i, title)| book(i as i64 + 1, title))
            .collect(),
    }
}

/// Source whose answers are released by the test, keyed by search term
#[derive(Default)]
pub struct GatedSource {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<BookPage, FetchError>>>>,
    seen: Mutex<Vec<QueryState>>,
}

impl GatedSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register a gate for queries with this search term. Must be called
    /// before the request is issued.
    pub fn gate(&self, term: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(term.to_string(), rx);
        tx
    }

    pub fn seen(&self) -> Vec<QueryState> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookSource for GatedSource {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookPage, FetchError> {
        self.seen.lock().unwrap().push(query.clone());
        let gate = self.gates.lock().unwrap().remove(&query.search_term);
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Transport("gate dropped".to_string()))),
            None => Err(FetchError::Transport(format!(
                "no gate for '{}'",
                query.search_term
            ))),
        }
    }
}

/// Source answering immediately: a catalogue of `page_count` pages with two
/// records each, or a failure while `failing` is set
pub struct CatalogueSource {
    pub page_count: u32,
    pub failing: Mutex<bool>,
    seen: Mutex<Vec<QueryState>>,
}

impl CatalogueSource {
    pub fn new(page_count: u32) -> Arc<Self> {
        Arc::new(Self {
            page_count,
            failing: Mutex::new(false),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn seen(&self) -> Vec<QueryState> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookSource for CatalogueSource {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookPage, FetchError> {
        self.seen.lock().unwrap().push(query.clone());
        if *self.failing.lock().unwrap() {
            return Err(FetchError::Transport("connection reset".to_string()));
        }
        Ok(page(
            self.page_count,
            query.page_number.max(1),
            &["A Wizard of Earthsea", "The Tombs of Atuan"],
        ))
    }
}
