//! Page buttons derived from the server's page metadata
//!
//! Buttons are labelled from 1 but emit a 0-based page index, so button
//! `n` requests page `n - 1`. Clients of the book endpoint have always
//! sent it that way.

use crate::api_client::BookPage;
use crate::query_state::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageButton {
    /// 1-based label shown to the user
    pub label: u32,
}

impl PageButton {
    pub fn page(&self) -> u32 {
        self.label.saturating_sub(1)
    }

    /// Intent emitted when the button is pressed
    pub fn intent(&self) -> Intent {
        Intent::SetPage { page: self.page() }
    }
}

/// One button per page the server reported
pub fn page_buttons(page: &BookPage) -> Vec<PageButton> {
    (1..=page.page_count).map(|label| PageButton { label }).collect()
}

/// Button with the given label, if the server reported that many pages
pub fn button(page: &BookPage, label: u32) -> Option<PageButton> {
    (label >= 1 && label <= page.page_count).then_some(PageButton { label })
}

/// Status line text for the displayed page
pub fn page_summary(page: &BookPage) -> String {
    if page.page_count == 0 {
        return format!("{} records", page.total_count);
    }
    format!(
        "page {} of {}, {} records",
        page.page_number, page.page_count, page.total_count
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(count: u32) -> BookPage {
        BookPage {
            total_count: 5,
            page_count: count,
            page_number: 1,
            items: vec![],
        }
    }

    #[test]
    fn test_buttons_follow_server_page_count() {
        let labels: Vec<u32> = page_buttons(&page(3)).iter().map(|b| b.label).collect();
        assert_eq!(labels, vec![1, 2, 3]);
        assert!(page_buttons(&BookPage::default()).is_empty());
    }

    #[test]
    fn test_button_emits_zero_based_page() {
        let second = button(&page(3), 2).unwrap();
        assert_eq!(second.intent(), Intent::SetPage { page: 1 });
        assert_eq!(button(&page(3), 1).unwrap().page(), 0);
    }

    #[test]
    fn test_button_out_of_range() {
        assert!(button(&page(3), 0).is_none());
        assert!(button(&page(3), 4).is_none());
    }

    #[test]
    fn test_summary() {
        assert_eq!(page_summary(&page(3)), "page 1 of 3, 5 records");
        assert_eq!(page_summary(&BookPage::default()), "0 records");
    }
}
