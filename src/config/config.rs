use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api_client::{ApiClientOptions, DEFAULT_BASE_URL};
use crate::query_state::{DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "BOOK_API_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub paging: PagingConfig,
    pub display: DisplayConfig,
    pub behavior: BehaviorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Book endpoint queried with termSearch/pageNumber/pageSize/type
    pub base_url: String,

    /// Give up on a request after this many seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Accept self-signed certificates (local development servers)
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub default_page_size: u32,
    pub default_page_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Use Unicode glyphs in the status line
    pub use_glyphs: bool,

    /// Show the log panel when the TUI starts
    pub show_log_panel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Keep command history for the classic prompt
    pub enable_history: bool,

    /// Maximum history entries
    pub max_history_entries: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            accept_invalid_certs: false,
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            default_page_number: DEFAULT_PAGE_NUMBER,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            use_glyphs: true,
            show_log_panel: false,
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            enable_history: true,
            max_history_entries: 500,
        }
    }
}

impl ApiConfig {
    pub fn client_options(&self) -> ApiClientOptions {
        ApiClientOptions {
            timeout: self.timeout_secs.map(Duration::from_secs),
            accept_invalid_certs: self.accept_invalid_certs,
        }
    }
}

impl Config {
    /// Load config from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            // Create default config if it doesn't exist
            let default_config = Self::default();
            default_config.save_to(&config_path)?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("book-viewer").join("config.toml"))
    }

    /// Apply `BOOK_API_URL` if set
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api.base_url = url;
            }
        }
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        format!(
            r#"# Book Viewer Configuration File
# Location: ~/.config/book-viewer/config.toml (Linux)
#           %APPDATA%\book-viewer\config.toml (Windows)

[api]
# Book endpoint. Overridden by the BOOK_API_URL environment variable
base_url = "{base_url}"

# Abort a request after this many seconds (no timeout when unset)
# timeout_secs = 10

# Accept self-signed certificates, handy for local development servers
accept_invalid_certs = false

[paging]
# Records requested per page
default_page_size = {page_size}

# Page requested when the viewer starts
default_page_number = {page_number}

[display]
# Use Unicode glyphs in the status line
use_glyphs = true

# Show the log panel on startup (toggle with F5)
show_log_panel = false

[behavior]
# Keep command history for the classic prompt
enable_history = true

# Maximum number of history entries to keep
max_history_entries = 500
"#,
            base_url = DEFAULT_BASE_URL,
            page_size = DEFAULT_PAGE_SIZE,
            page_number = DEFAULT_PAGE_NUMBER,
        )
    }

    /// Initialize config with a setup wizard
    pub fn init_wizard() -> Result<Self> {
        println!("Book Viewer Configuration Setup");
        println!("===============================");

        let mut config = Config::default();

        print!("Book endpoint [{}]: ", config.api.base_url);
        std::io::Write::flush(&mut std::io::stdout())?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if !input.trim().is_empty() {
            config.api.base_url = input.trim().to_string();
        }

        print!("Records per page [{}]: ", config.paging.default_page_size);
        std::io::Write::flush(&mut std::io::stdout())?;
        input.clear();
        std::io::stdin().read_line(&mut input)?;
        if let Ok(size) = input.trim().parse::<u32>() {
            if size > 0 {
                config.paging.default_page_size = size;
            }
        }

        print!("Does your terminal support Unicode glyphs? (y/n) [y]: ");
        std::io::Write::flush(&mut std::io::stdout())?;
        input.clear();
        std::io::stdin().read_line(&mut input)?;
        config.display.use_glyphs = !input.trim().eq_ignore_ascii_case("n");

        config.save()?;

        println!("\nConfiguration saved to: {:?}", Config::get_config_path()?);
        println!("You can edit this file directly to customize further.");

        Ok(config)
    }
}
