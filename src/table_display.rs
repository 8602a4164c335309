use anyhow::Result;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::Path;

use crate::api_client::Book;
use crate::pagination::{page_buttons, page_summary};
use crate::query_state::SearchField;
use crate::result_fetcher::DisplayState;

/// Column headers, one per search field
pub fn headers() -> Vec<&'static str> {
    SearchField::ALL.iter().map(|field| field.label()).collect()
}

/// Cell text for one book, in header order
pub fn book_row(book: &Book) -> Vec<String> {
    vec![
        book.id.to_string(),
        book.title.clone(),
        book.first_name.clone(),
        book.last_name.clone(),
        book.total_copies.to_string(),
        format!("{}/{}", book.copies_in_use, book.total_copies),
        book.kind.clone(),
        book.isbn.clone(),
        book.category.clone(),
    ]
}

pub fn render_table(books: &[Book]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    let header_cells: Vec<Cell> = headers()
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
        .collect();
    table.set_header(header_cells);

    for book in books {
        table.add_row(book_row(book));
    }

    table
}

/// Page buttons as a single line, e.g. "[1] [2] [3]"
pub fn render_buttons(state: &DisplayState) -> String {
    page_buttons(&state.page)
        .iter()
        .map(|button| format!("[{}]", button.label))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the classic prompt prints after a command
pub fn render_display(state: &DisplayState) -> String {
    let mut out = String::new();

    if state.page.items.is_empty() {
        out.push_str("No results found.\n");
    } else {
        out.push_str(&render_table(&state.page.items).to_string());
        out.push('\n');
    }

    if let Some(message) = state.error_message() {
        out.push_str(message);
        out.push('\n');
    }

    let buttons = render_buttons(state);
    if !buttons.is_empty() {
        out.push_str(&format!("Pages: {}\n", buttons));
    }
    out.push_str(&page_summary(&state.page));
    out
}

/// Write the books to a CSV file with the table headers
pub fn export_to_csv(books: &[Book], path: &Path) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(headers())?;
    for book in books {
        wtr.write_record(book_row(book))?;
    }

    wtr.flush()?;
    Ok(books.len())
}
