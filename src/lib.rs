pub mod api_client;
pub mod completer;
pub mod config;
pub mod pagination;
pub mod query_state;
pub mod repl;
pub mod result_fetcher;
pub mod services;
pub mod table_display;
pub mod tui_app;
pub mod utils;
