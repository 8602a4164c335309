use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::config::Config;
use crate::pagination::{button, page_buttons, page_summary};
use crate::query_state::{Intent, SearchField};
use crate::result_fetcher::DisplayState;
use crate::services::QueryOrchestrator;
use crate::table_display::{book_row, headers};
use crate::utils::logging::LogRingBuffer;

/// How long the loop waits for a fetch to settle before polling keys again
const TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppMode {
    Search,
    Results,
}

pub struct TuiApp {
    orchestrator: QueryOrchestrator,
    display: watch::Receiver<DisplayState>,
    input: Input,
    field: SearchField,
    mode: AppMode,
    table_state: TableState,
    show_help: bool,
    show_logs: bool,
    log_buffer: Option<LogRingBuffer>,
    use_glyphs: bool,
    status_message: String,
    /// Digits typed so far for a page button label
    pending_label: Option<u32>,
}

impl TuiApp {
    pub fn new(
        orchestrator: QueryOrchestrator,
        config: &Config,
        log_buffer: Option<LogRingBuffer>,
    ) -> Self {
        let display = orchestrator.fetcher().subscribe();
        let field = orchestrator
            .query()
            .search_field
            .unwrap_or(SearchField::Id);
        let input = Input::default().with_value(orchestrator.query().search_term.clone());

        Self {
            orchestrator,
            display,
            input,
            field,
            mode: AppMode::Results,
            table_state: TableState::default(),
            show_help: false,
            show_logs: config.display.show_log_panel,
            log_buffer,
            use_glyphs: config.display.use_glyphs,
            status_message: "Ready - press / to search, F1 for help".to_string(),
            pending_label: None,
        }
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.orchestrator.start();

        loop {
            terminal.draw(|f| self.ui(f))?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && !self.handle_key(key) {
                        return Ok(());
                    }
                }
            }

            // Yield to in-flight fetches; wake early when one lands
            tokio::select! {
                _ = self.display.changed() => {}
                _ = tokio::time::sleep(TICK) => {}
            }
        }
    }

    /// Handle a key press. Returns false when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        if self.show_help {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q')) {
                self.show_help = false;
            }
            return true;
        }

        match self.mode {
            AppMode::Search => self.handle_search_key(key),
            AppMode::Results => self.handle_results_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter => {
                self.mode = AppMode::Results;
                self.submit_filter();
            }
            KeyCode::Esc => {
                self.mode = AppMode::Results;
            }
            KeyCode::Tab => self.field = self.field.next(),
            KeyCode::BackTab => self.field = self.field.previous(),
            _ => {
                self.input.handle_event(&Event::Key(key));
            }
        }
        true
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc if self.pending_label.is_some() => {
                self.pending_label = None;
                self.status_message = "Page entry cancelled".to_string();
            }
            KeyCode::Esc | KeyCode::Char('q') => return false,
            KeyCode::Char('/') => {
                self.pending_label = None;
                self.mode = AppMode::Search;
            }
            KeyCode::Tab => self.field = self.field.next(),
            KeyCode::BackTab => self.field = self.field.previous(),
            KeyCode::Char(c @ '0'..='9') => {
                let digit = c.to_digit(10).unwrap_or(0);
                self.type_page_digit(digit);
            }
            KeyCode::Enter => {
                if let Some(label) = self.pending_label.take() {
                    self.press_page_button(label);
                }
            }
            KeyCode::Char('+') => {
                let size = self.orchestrator.query().page_size.saturating_add(1);
                self.dispatch(Intent::SetPageSize { size });
            }
            KeyCode::Char('-') => {
                let size = self.orchestrator.query().page_size.saturating_sub(1);
                self.dispatch(Intent::SetPageSize { size });
            }
            KeyCode::Up | KeyCode::Down => self.navigate_rows(key.code),
            KeyCode::F(1) => self.show_help = true,
            KeyCode::F(5) => self.show_logs = !self.show_logs,
            _ => {}
        }
        true
    }

    fn submit_filter(&mut self) {
        let term = self.input.value().to_string();
        self.dispatch(Intent::SetFilter {
            term,
            field: Some(self.field),
        });
    }

    /// Add a digit to the pending label. The button is pressed as soon as no
    /// further digit could name another button, otherwise on Enter.
    fn type_page_digit(&mut self, digit: u32) {
        let label = self
            .pending_label
            .unwrap_or(0)
            .saturating_mul(10)
            .saturating_add(digit);
        let page_count = self.display.borrow().page.page_count;

        if label == 0 || label.saturating_mul(10) > page_count {
            self.pending_label = None;
            self.press_page_button(label);
        } else {
            self.pending_label = Some(label);
            self.status_message = format!("Page {}_ (Enter to go)", label);
        }
    }

    fn press_page_button(&mut self, label: u32) {
        let page = self.display.borrow().page.clone();
        match button(&page, label) {
            Some(button) => self.dispatch(button.intent()),
            None => self.status_message = format!("No page {} ({})", label, page_summary(&page)),
        }
    }

    fn dispatch(&mut self, intent: Intent) {
        debug!(target: "tui", "Intent: {:?}", intent);
        if self.orchestrator.dispatch_intent(intent) {
            self.table_state.select(None);
            self.status_message = format!("Loading {}", self.orchestrator.query());
        } else {
            self.status_message = "Nothing changed".to_string();
        }
    }

    fn navigate_rows(&mut self, key: KeyCode) {
        let num_rows = self.display.borrow().page.items.len();
        if num_rows == 0 {
            return;
        }

        let current = self.table_state.selected().unwrap_or(0);
        let next = match key {
            KeyCode::Up if current > 0 => current - 1,
            KeyCode::Up => num_rows - 1,
            KeyCode::Down if current + 1 < num_rows => current + 1,
            KeyCode::Down => 0,
            _ => current,
        };
        self.table_state.select(Some(next));
    }

    fn ui(&mut self, f: &mut Frame) {
        let state = self.display.borrow().clone();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Search form
                Constraint::Min(5),    // Results (+ logs)
                Constraint::Length(1), // Error line
                Constraint::Length(1), // Page buttons
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_search_form(f, chunks[0]);

        if self.show_logs {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
                .split(chunks[1]);
            self.render_results(f, parts[0], &state);
            self.render_logs(f, parts[1]);
        } else {
            self.render_results(f, chunks[1], &state);
        }

        if let Some(message) = state.error_message() {
            let error = Paragraph::new(message).style(Style::default().fg(Color::Red));
            f.render_widget(error, chunks[2]);
        }

        f.render_widget(Paragraph::new(Self::button_line(&state)), chunks[3]);
        self.render_status(f, chunks[4], &state);

        if self.show_help {
            self.render_help_popup(f);
        }
    }

    fn render_search_form(&self, f: &mut Frame, area: Rect) {
        let active = self.mode == AppMode::Search;
        let input_style = if active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };

        let prefix = format!("Search by: {:<16} ", format!("<{}>", self.field.label()));
        let line = Line::from(vec![
            Span::styled(prefix.clone(), Style::default().fg(Color::Cyan)),
            Span::styled(self.input.value(), input_style),
        ]);

        let block = Block::default()
            .borders(Borders::ALL)
            .title("Search (/ to edit, Tab to change field, Enter to search)")
            .border_style(input_style);
        f.render_widget(Paragraph::new(line).block(block), area);

        if active {
            f.set_cursor_position((
                area.x + 1 + prefix.chars().count() as u16 + self.input.visual_cursor() as u16,
                area.y + 1,
            ));
        }
    }

    fn render_results(&mut self, f: &mut Frame, area: Rect, state: &DisplayState) {
        if state.page.items.is_empty() {
            let text = if state.is_pending() {
                "Loading..."
            } else {
                "No results found"
            };
            let empty = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title("Books"));
            f.render_widget(empty, area);
            return;
        }

        let header_cells: Vec<Cell> = headers()
            .into_iter()
            .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow)))
            .collect();
        let header = Row::new(header_cells).height(1).bottom_margin(1);

        let rows: Vec<Row> = state
            .page
            .items
            .iter()
            .map(|book| Row::new(book_row(book)).height(1))
            .collect();

        let widths = [
            Constraint::Length(6),
            Constraint::Fill(3),
            Constraint::Fill(2),
            Constraint::Fill(2),
            Constraint::Length(15),
            Constraint::Length(13),
            Constraint::Fill(1),
            Constraint::Length(15),
            Constraint::Fill(2),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Books ({} of {})",
                state.page.items.len(),
                state.page.total_count
            )))
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_logs(&self, f: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        let lines: Vec<Line> = self
            .log_buffer
            .as_ref()
            .map(|buffer| buffer.get_recent(height))
            .unwrap_or_default()
            .into_iter()
            .map(|entry| Line::from(entry.format_for_display()))
            .collect();

        let logs = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Logs (F5)"))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(logs, area);
    }

    fn button_line(state: &DisplayState) -> Line<'static> {
        let mut spans = vec![Span::raw("Pages: ")];
        for button in page_buttons(&state.page) {
            spans.push(Span::styled(
                format!("[{}]", button.label),
                Style::default().fg(Color::Cyan),
            ));
            spans.push(Span::raw(" "));
        }
        Line::from(spans)
    }

    fn render_status(&self, f: &mut Frame, area: Rect, state: &DisplayState) {
        let loading = match (state.is_pending(), self.use_glyphs) {
            (true, true) => "⏳ ",
            (true, false) => "[..] ",
            (false, _) => "",
        };

        let status_line = Line::from(vec![
            Span::styled(loading, Style::default().fg(Color::Yellow)),
            Span::styled(page_summary(&state.page), Style::default().fg(Color::White)),
            Span::raw(" | "),
            Span::raw(format!("size {}", self.orchestrator.query().page_size)),
            Span::raw(" | "),
            Span::styled(&self.status_message, Style::default().fg(Color::White)),
            Span::raw(" | "),
            Span::styled(
                match self.mode {
                    AppMode::Search => "SEARCH",
                    AppMode::Results => "VIEW",
                },
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
        ]);

        let status = Paragraph::new(status_line).style(Style::default().bg(Color::DarkGray));
        f.render_widget(status, area);
    }

    fn render_help_popup(&self, f: &mut Frame) {
        let area = centered_rect(70, 60, f.area());
        f.render_widget(Clear, area);

        let help_text = vec![
            Line::from(vec![Span::styled(
                "Book Viewer Help",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )]),
            Line::from(""),
            Line::from("Search:"),
            Line::from("  /          - Edit the search term"),
            Line::from("  Tab        - Next search field (Shift+Tab previous)"),
            Line::from("  Enter      - Run the search"),
            Line::from("  Esc        - Leave the search box"),
            Line::from(""),
            Line::from("Results:"),
            Line::from("  0-9        - Press page button (Enter ends a partial number)"),
            Line::from("  + / -      - More / fewer records per page"),
            Line::from("  ↑↓         - Select row"),
            Line::from("  F5         - Toggle log panel"),
            Line::from("  q / Esc    - Quit"),
        ];

        let help_popup = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: true });

        f.render_widget(help_popup, area);
    }
}

// Helper function to create a centered rect
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

pub async fn run_tui(
    orchestrator: QueryOrchestrator,
    config: &Config,
    log_buffer: Option<LogRingBuffer>,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!(target: "tui", "Starting TUI against {}", config.api.base_url);
    let mut app = TuiApp::new(orchestrator, config, log_buffer);
    let res = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}
