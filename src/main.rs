use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use book_viewer::api_client::BookApiClient;
use book_viewer::config::Config;
use book_viewer::query_state::QueryState;
use book_viewer::result_fetcher::ResultFetcher;
use book_viewer::services::QueryOrchestrator;
use book_viewer::utils::file_logging::get_file_logger;
use book_viewer::utils::logging::init_tracing;
use book_viewer::{repl, tui_app};

#[derive(Parser)]
#[command(name = "book-viewer", version, about = "Search and page through a book catalogue")]
struct Cli {
    /// Book endpoint (overrides config and BOOK_API_URL)
    #[arg(long)]
    url: Option<String>,

    /// Records per page
    #[arg(long)]
    page_size: Option<u32>,

    /// Use the line-oriented prompt instead of the TUI
    #[arg(long)]
    classic: bool,

    /// Initialize configuration with a wizard
    #[arg(long)]
    init_config: bool,

    /// Write a commented config file with defaults
    #[arg(long)]
    generate_config: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.init_config {
        let config = Config::init_wizard()?;
        println!("\nConfiguration initialized for {}", config.api.base_url);
        return Ok(());
    }

    if cli.generate_config {
        let path = Config::get_config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Config::create_default_with_comments())?;
        println!("Configuration file created at: {:?}", path);
        return Ok(());
    }

    let log_buffer = init_tracing();
    if let Some(file_logger) = get_file_logger() {
        eprintln!("Debug logs: {}", file_logger.log_path().display());
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Could not load config ({}), using defaults", e);
        Config::default()
    });
    config.apply_env();
    if let Some(url) = cli.url {
        config.api.base_url = url;
    }
    if let Some(size) = cli.page_size {
        config.paging.default_page_size = size;
    }

    // Fetches and UI share one thread
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let client = BookApiClient::with_options(&config.api.base_url, &config.api.client_options())?;
        let fetcher = ResultFetcher::new(Arc::new(client));
        let initial = QueryState::new(
            config.paging.default_page_number,
            config.paging.default_page_size,
        );
        let mut orchestrator = QueryOrchestrator::new(initial, fetcher);

        if cli.classic {
            repl::run_classic(&mut orchestrator, &config).await
        } else {
            tui_app::run_tui(orchestrator, &config, Some(log_buffer)).await
        }
    })
}
