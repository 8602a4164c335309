use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use book_viewer::api_client::{ApiClientOptions, BookApiClient, BookSource, FetchError};
use book_viewer::query_state::{QueryState, SearchField};
use book_viewer::result_fetcher::{FetchOutcome, ResultFetcher};

type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

fn record(page_number: u32) -> serde_json::Value {
    json!({
        "bookId": page_number,
        "title": "The Dispossessed",
        "firstName": "Ursula",
        "lastName": "Le Guin",
        "totalCopies": 3,
        "copiesInUse": 2,
        "type": "Paperback",
        "isbn": "9780061054884",
        "category": "Science fiction"
    })
}

async fn books(
    State(seen): State<Seen>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    seen.lock().unwrap().push(params.clone());

    match params.get("termSearch").map(String::as_str) {
        Some("boom") => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        Some("garbage") => "this is not json".into_response(),
        Some("overbooked") => Json(json!({
            "totalCount": 1, "pageSize": 1, "pageNumber": 1,
            "items": [{
                "bookId": 1, "title": "t", "firstName": "f", "lastName": "l",
                "totalCopies": 1, "copiesInUse": 5, "type": "x", "isbn": "i", "category": "c"
            }]
        }))
        .into_response(),
        Some("slow") => {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Json(json!({"totalCount": 0, "pageSize": 0, "pageNumber": 0, "items": []}))
                .into_response()
        }
        _ => {
            let page_number: u32 = params
                .get("pageNumber")
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            Json(json!({
                "totalCount": 5,
                "pageSize": 3,
                "pageNumber": page_number.max(1),
                "items": [record(page_number), record(page_number + 10)]
            }))
            .into_response()
        }
    }
}

async fn spawn_server() -> (String, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/book", get(books))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/book", addr), seen)
}

fn query(term: &str) -> QueryState {
    QueryState {
        search_term: term.to_string(),
        ..QueryState::default()
    }
}

#[tokio::test]
async fn test_sends_all_four_parameters() {
    let (url, seen) = spawn_server().await;
    let client = BookApiClient::new(&url);

    let q = QueryState {
        search_term: "left hand & darkness".to_string(),
        search_field: Some(SearchField::Title),
        page_number: 0,
        page_size: 10,
    };
    let page = client.fetch_page(&q).await.unwrap();
    assert_eq!(page.page_count, 3);
    assert_eq!(page.total_count, 5);
    assert_eq!(page.items.len(), 2);

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params.len(), 4);
    assert_eq!(params["termSearch"], "left hand & darkness");
    assert_eq!(params["pageNumber"], "0");
    assert_eq!(params["pageSize"], "10");
    assert_eq!(params["type"], "title");
}

#[tokio::test]
async fn test_default_query_sends_empty_filter() {
    let (url, seen) = spawn_server().await;
    BookApiClient::new(&url)
        .fetch_page(&QueryState::default())
        .await
        .unwrap();

    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["termSearch"], "");
    assert_eq!(params["type"], "");
    assert_eq!(params["pageNumber"], "1");
    assert_eq!(params["pageSize"], "2");
}

#[tokio::test]
async fn test_error_status_is_a_failure() {
    let (url, _) = spawn_server().await;
    let err = BookApiClient::new(&url)
        .fetch_page(&query("boom"))
        .await
        .unwrap_err();
    // reqwest and axum use different `http` crate versions, compare the number
    match err {
        FetchError::Status(status) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected a status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_body_is_a_failure() {
    let (url, _) = spawn_server().await;
    let err = BookApiClient::new(&url)
        .fetch_page(&query("garbage"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_invalid_record_is_a_failure() {
    let (url, _) = spawn_server().await;
    let err = BookApiClient::new(&url)
        .fetch_page(&query("overbooked"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidRecord(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_a_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = BookApiClient::new(&format!("http://{}/book", addr))
        .fetch_page(&QueryState::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_timeout_is_a_failure() {
    let (url, _) = spawn_server().await;
    let options = ApiClientOptions {
        timeout: Some(Duration::from_millis(50)),
        accept_invalid_certs: false,
    };
    let client = BookApiClient::with_options(&url, &options).unwrap();
    let err = client.fetch_page(&query("slow")).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport(_)));
}

#[tokio::test]
async fn test_fetcher_over_http_keeps_page_on_failure() {
    let (url, _) = spawn_server().await;
    let fetcher = ResultFetcher::new(Arc::new(BookApiClient::new(&url)));

    assert_eq!(
        fetcher.issue(QueryState::default()).await.unwrap(),
        FetchOutcome::Applied
    );
    let good = fetcher.snapshot().page;

    assert_eq!(
        fetcher.issue(query("boom")).await.unwrap(),
        FetchOutcome::Failed
    );
    let state = fetcher.snapshot();
    assert!(state.error);
    assert_eq!(state.page, good);
}
