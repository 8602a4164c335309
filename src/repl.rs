//! Line-oriented front-end
//!
//! Each command becomes at most one intent. After an intent changes the
//! query the prompt waits for the latest request to settle and prints the
//! displayed page.

use anyhow::Result;
use crossterm::style::Stylize;
use reedline::{
    default_emacs_keybindings, ColumnarMenu, Emacs, FileBackedHistory, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline,
    ReedlineEvent, ReedlineMenu, Signal,
};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::completer::CommandCompleter;
use crate::config::Config;
use crate::pagination;
use crate::query_state::{Intent, SearchField};
use crate::services::QueryOrchestrator;
use crate::table_display::{export_to_csv, render_display};
use crate::utils::app_paths::AppPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `search <field> <term...>`, or `search <term...>` with no field
    Search {
        field: Option<SearchField>,
        term: String,
    },
    /// Drop the filter
    Clear,
    PageSize(u32),
    /// Press the page button with this label
    Page(u32),
    Show,
    Fields,
    Export(PathBuf),
    Help,
    ClearScreen,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head.to_lowercase().as_str() {
        "search" => {
            if rest.is_empty() {
                return Err("Usage: search <field> <term>".to_string());
            }
            let (first, remainder) = match rest.split_once(char::is_whitespace) {
                Some((first, remainder)) => (first, remainder.trim()),
                None => (rest, ""),
            };
            match first.parse::<SearchField>() {
                Ok(field) if !remainder.is_empty() => Ok(Command::Search {
                    field: Some(field),
                    term: remainder.to_string(),
                }),
                Ok(_) => Err(format!("Missing search term for field '{}'", first)),
                Err(_) => Ok(Command::Search {
                    field: None,
                    term: rest.to_string(),
                }),
            }
        }
        "clear" => Ok(Command::Clear),
        "size" => rest
            .parse::<u32>()
            .ok()
            .filter(|size| *size > 0)
            .map(Command::PageSize)
            .ok_or_else(|| "Usage: size <records per page>".to_string()),
        "page" => rest
            .parse::<u32>()
            .map(Command::Page)
            .map_err(|_| "Usage: page <button>".to_string()),
        "show" => Ok(Command::Show),
        "fields" => Ok(Command::Fields),
        "export" if !rest.is_empty() => Ok(Command::Export(PathBuf::from(rest))),
        "export" => Err("Usage: export <filename.csv>".to_string()),
        "\\help" | "help" => Ok(Command::Help),
        "\\clear" => Ok(Command::ClearScreen),
        "\\quit" | "quit" | "exit" => Ok(Command::Quit),
        _ => Err(format!("Unknown command '{}'. Type \\help for help", head)),
    }
}

struct BookPrompt;

impl Prompt for BookPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Borrowed("books")
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, edit_mode: PromptEditMode) -> Cow<'_, str> {
        match edit_mode {
            PromptEditMode::Default | PromptEditMode::Emacs => "> ".into(),
            PromptEditMode::Vi(vi_mode) => match vi_mode {
                reedline::PromptViMode::Normal => "N> ".into(),
                reedline::PromptViMode::Insert => "I> ".into(),
            },
            PromptEditMode::Custom(str) => format!("{str}> ").into(),
        }
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

pub fn print_help() {
    println!("{}", "Book Viewer - classic mode".blue().bold());
    println!();
    println!("{}", "Commands:".yellow());
    println!(
        "  {} - Filter by a field (see 'fields')",
        "search <field> <term>".green()
    );
    println!("  {}        - Filter without a field", "search <term>".green());
    println!("  {}                - Remove the filter", "clear".green());
    println!("  {}             - Records per page", "size <n>".green());
    println!("  {}             - Press page button n", "page <n>".green());
    println!("  {}                 - Show the current page", "show".green());
    println!("  {}               - List searchable fields", "fields".green());
    println!(
        "  {}    - Export the current page to CSV",
        "export <file>".green()
    );
    println!("  {}                - Clear screen", "\\clear".green());
    println!("  {}                - Exit (or Ctrl+D)", "\\quit".green());
    println!();
}

fn print_fields() {
    for field in SearchField::ALL {
        println!("  {:<12} {}", field.wire_key().green(), field.label());
    }
}

/// Run one command. Returns false when the prompt should exit.
pub async fn execute_command(orchestrator: &mut QueryOrchestrator, command: Command) -> bool {
    let intent = match command {
        Command::Search { field, term } => Intent::SetFilter { term, field },
        Command::Clear => Intent::SetFilter {
            term: String::new(),
            field: None,
        },
        Command::PageSize(size) => Intent::SetPageSize { size },
        Command::Page(label) => {
            let page = orchestrator.fetcher().snapshot().page;
            match pagination::button(&page, label) {
                Some(button) => button.intent(),
                None => {
                    eprintln!(
                        "{}",
                        format!("No page button {} ({})", label, pagination::page_summary(&page))
                            .red()
                    );
                    return true;
                }
            }
        }
        Command::Show => {
            let state = orchestrator.fetcher().settled().await;
            println!("{}", render_display(&state));
            return true;
        }
        Command::Fields => {
            print_fields();
            return true;
        }
        Command::Export(path) => {
            let state = orchestrator.fetcher().snapshot();
            match export_to_csv(&state.page.items, &path) {
                Ok(count) => println!(
                    "{}",
                    format!("Exported {} records to {}", count, path.display()).green()
                ),
                Err(e) => eprintln!("{}", format!("Export error: {}", e).red()),
            }
            return true;
        }
        Command::Help => {
            print_help();
            return true;
        }
        Command::ClearScreen => {
            print!("{esc}[2J{esc}[1;1H", esc = 27 as char);
            return true;
        }
        Command::Quit => return false,
    };

    if !orchestrator.dispatch_intent(intent) {
        println!("{}", "Nothing changed.".dark_grey());
        return true;
    }

    let state = orchestrator.fetcher().settled().await;
    println!("{}", render_display(&state));
    true
}

fn history_path() -> Option<PathBuf> {
    match AppPaths::history_file() {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(target: "repl", "No history file: {}", e);
            None
        }
    }
}

pub async fn run_classic(orchestrator: &mut QueryOrchestrator, config: &Config) -> Result<()> {
    print_help();
    println!(
        "{}",
        format!("Connected to API: {}", config.api.base_url).cyan()
    );

    let mut keybindings = default_emacs_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Menu("command_completion".to_string()),
    );

    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_completion")
            .with_columns(1)
            .with_column_width(None)
            .with_column_padding(2),
    );

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    if config.behavior.enable_history {
        if let Some(path) = history_path() {
            let history =
                FileBackedHistory::with_file(config.behavior.max_history_entries, path)?;
            line_editor = line_editor.with_history(Box::new(history));
        }
    }

    orchestrator.start();
    let state = orchestrator.fetcher().settled().await;
    println!("{}", render_display(&state));

    let prompt = BookPrompt;
    loop {
        match line_editor.read_line(&prompt)? {
            Signal::Success(buffer) => {
                if buffer.trim().is_empty() {
                    continue;
                }

                match parse_command(&buffer) {
                    Ok(command) => {
                        info!(target: "repl", "Command: {:?}", command);
                        if !execute_command(orchestrator, command).await {
                            break;
                        }
                    }
                    Err(message) => eprintln!("{}", message.red()),
                }
            }
            Signal::CtrlD | Signal::CtrlC => {
                break;
            }
        }
    }

    println!("\nGoodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::{Book, BookPage, BookSource, FetchError};
    use crate::query_state::QueryState;
    use crate::result_fetcher::ResultFetcher;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Four pages of one record each, answered at once
    struct ShelfSource {
        seen: Arc<Mutex<Vec<QueryState>>>,
    }

    #[async_trait]
    impl BookSource for ShelfSource {
        async fn fetch_page(&self, query: &QueryState) -> Result<BookPage, FetchError> {
            self.seen.lock().unwrap().push(query.clone());
            Ok(BookPage {
                total_count: 4,
                page_count: 4,
                page_number: query.page_number,
                items: vec![Book {
                    id: 3,
                    title: "Parable of the Sower".into(),
                    first_name: "Octavia".into(),
                    last_name: "Butler".into(),
                    total_copies: 3,
                    copies_in_use: 0,
                    kind: "Hardcover".into(),
                    isbn: "9780941423991".into(),
                    category: "Fiction".into(),
                }],
            })
        }
    }

    async fn started() -> (QueryOrchestrator, Arc<Mutex<Vec<QueryState>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let fetcher = ResultFetcher::new(Arc::new(ShelfSource { seen: seen.clone() }));
        let mut orchestrator = QueryOrchestrator::new(QueryState::default(), fetcher);
        orchestrator.start();
        orchestrator.fetcher().settled().await;
        (orchestrator, seen)
    }

    #[tokio::test]
    async fn test_page_command_requests_previous_index() {
        let (mut orchestrator, seen) = started().await;

        assert!(execute_command(&mut orchestrator, Command::Page(3)).await);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(seen.lock().unwrap()[1].page_number, 2);
        assert_eq!(orchestrator.query().page_number, 2);
        assert!(!orchestrator.fetcher().snapshot().is_pending());
    }

    #[tokio::test]
    async fn test_page_command_beyond_count_is_refused() {
        let (mut orchestrator, seen) = started().await;

        assert!(execute_command(&mut orchestrator, Command::Page(5)).await);
        assert!(execute_command(&mut orchestrator, Command::Page(0)).await);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(orchestrator.query(), &QueryState::default());
    }

    #[tokio::test]
    async fn test_unchanged_query_issues_no_request() {
        let (mut orchestrator, seen) = started().await;

        assert!(execute_command(&mut orchestrator, Command::PageSize(2)).await);
        assert!(execute_command(&mut orchestrator, Command::Clear).await);
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(orchestrator.history().len(), 1);
        assert_eq!(orchestrator.fetcher().snapshot().issued, 1);

        assert!(!execute_command(&mut orchestrator, Command::Quit).await);
    }

    #[test]
    fn test_parse_search_with_field() {
        assert_eq!(
            parse_command("search title the dispossessed"),
            Ok(Command::Search {
                field: Some(SearchField::Title),
                term: "the dispossessed".to_string()
            })
        );
    }

    #[test]
    fn test_parse_search_without_field() {
        assert_eq!(
            parse_command("search dispossessed"),
            Ok(Command::Search {
                field: None,
                term: "dispossessed".to_string()
            })
        );
        assert!(parse_command("search isbn").is_err());
        assert!(parse_command("search").is_err());
    }

    #[test]
    fn test_parse_paging_commands() {
        assert_eq!(parse_command("size 10"), Ok(Command::PageSize(10)));
        assert!(parse_command("size 0").is_err());
        assert!(parse_command("size many").is_err());
        assert_eq!(parse_command("PAGE 2"), Ok(Command::Page(2)));
        assert!(parse_command("page").is_err());
    }

    #[test]
    fn test_parse_misc_commands() {
        assert_eq!(parse_command("clear"), Ok(Command::Clear));
        assert_eq!(parse_command("\\help"), Ok(Command::Help));
        assert_eq!(parse_command("\\quit"), Ok(Command::Quit));
        assert_eq!(
            parse_command("export out/books.csv"),
            Ok(Command::Export(PathBuf::from("out/books.csv")))
        );
        assert!(parse_command("export").is_err());
        assert!(parse_command("sort title").is_err());
    }
}
