use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::query_state::QueryState;

pub const DEFAULT_BASE_URL: &str = "https://localhost:7117/book";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "bookId")]
    pub id: i64,
    pub title: String,
    pub first_name: String,
    pub last_name: String,
    pub total_copies: u32,
    pub copies_in_use: u32,
    #[serde(rename = "type")]
    pub kind: String,
    pub isbn: String,
    pub category: String,
}

/// One page of results as reported by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub total_count: u64,
    /// Number of pages. The server calls this `pageSize`, which is not the
    /// page length the client asked for.
    #[serde(rename = "pageSize")]
    pub page_count: u32,
    pub page_number: u32,
    pub items: Vec<Book>,
}

impl BookPage {
    /// Reject pages whose records break `copies_in_use <= total_copies`
    pub fn validate(&self) -> Result<(), FetchError> {
        match self
            .items
            .iter()
            .find(|book| book.copies_in_use > book.total_copies)
        {
            Some(book) => Err(FetchError::InvalidRecord(format!(
                "book {} has {} copies in use but only {} in total",
                book.id, book.copies_in_use, book.total_copies
            ))),
            None => Ok(()),
        }
    }
}

/// Why a fetch failed. Renderers only ever see that it failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned status {0}")]
    Status(StatusCode),

    #[error("Malformed response body: {0}")]
    Decode(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            FetchError::Status(status)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode(err.to_string())
    }
}

/// Anything that can answer a query with a page of books
#[async_trait]
pub trait BookSource: Send + Sync {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookPage, FetchError>;
}

/// Query parameters for `query`, in wire order
pub fn query_params(query: &QueryState) -> Vec<(&'static str, String)> {
    vec![
        ("termSearch", query.search_term.clone()),
        ("pageNumber", query.page_number.to_string()),
        ("pageSize", query.page_size.to_string()),
        ("type", query.field_key().to_string()),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct ApiClientOptions {
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
}

/// HTTP client for the book endpoint
#[derive(Clone)]
pub struct BookApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl BookApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_options(base_url: &str, options: &ApiClientOptions) -> anyhow::Result<Self> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(options.accept_invalid_certs);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BookSource for BookApiClient {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookPage, FetchError> {
        debug!(target: "fetch", "GET {} {}", self.base_url, query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&query_params(query))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "fetch", "Server answered {} for {}", status, query);
            return Err(FetchError::Status(status));
        }

        // Read the body first so parse failures are reported as decode errors
        let body = response.bytes().await?;
        let page: BookPage = serde_json::from_slice(&body)?;
        page.validate()?;

        debug!(
            target: "fetch",
            "Received {} of {} records (page {} of {})",
            page.items.len(),
            page.total_count,
            page.page_number,
            page.page_count
        );
        Ok(page)
    }
}
