//! Canonical query state and its transition rules
//!
//! A `QueryState` is what the user currently wants to see: a search term,
//! the field it is matched against, and the page window. It only ever
//! changes through [`QueryState::transition`], which resolves a burst of
//! UI changes into a single new state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Page number sent after a filter or page-size change. The server resolves
/// it to a real page and reports that back.
pub const RESOLVE_PAGE: u32 = 0;

pub const DEFAULT_PAGE_NUMBER: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 2;

/// Book fields a search term can be matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchField {
    Id,
    Title,
    FirstName,
    LastName,
    TotalCopies,
    CopiesInUse,
    Type,
    Isbn,
    Category,
}

impl SearchField {
    pub const ALL: [SearchField; 9] = [
        SearchField::Id,
        SearchField::Title,
        SearchField::FirstName,
        SearchField::LastName,
        SearchField::TotalCopies,
        SearchField::CopiesInUse,
        SearchField::Type,
        SearchField::Isbn,
        SearchField::Category,
    ];

    /// Key used for the `type` query parameter
    pub fn wire_key(self) -> &'static str {
        match self {
            SearchField::Id => "bookId",
            SearchField::Title => "title",
            SearchField::FirstName => "firstName",
            SearchField::LastName => "lastName",
            SearchField::TotalCopies => "totalCopies",
            SearchField::CopiesInUse => "copiesInUse",
            SearchField::Type => "type",
            SearchField::Isbn => "isbn",
            SearchField::Category => "category",
        }
    }

    /// Human readable label, also used as the table column header
    pub fn label(self) -> &'static str {
        match self {
            SearchField::Id => "ID",
            SearchField::Title => "Title",
            SearchField::FirstName => "First name",
            SearchField::LastName => "Last name",
            SearchField::TotalCopies => "Total of copies",
            SearchField::CopiesInUse => "Copies in use",
            SearchField::Type => "Type",
            SearchField::Isbn => "ISBN",
            SearchField::Category => "Category",
        }
    }

    /// Next field in display order, wrapping around
    pub fn next(self) -> SearchField {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> SearchField {
        let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SearchField {
    type Err = String;

    /// Accepts the wire key or the label, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SearchField::ALL
            .iter()
            .copied()
            .find(|field| {
                field.wire_key().eq_ignore_ascii_case(wanted)
                    || field.label().eq_ignore_ascii_case(wanted)
                    || field.label().replace(' ', "").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("Unknown search field '{}'", s))
    }
}

/// A single user intent against the current query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SetFilter {
        term: String,
        field: Option<SearchField>,
    },
    SetPageSize {
        size: u32,
    },
    SetPage {
        page: u32,
    },
}

/// Changes collected from the UI in one go.
///
/// At most one of them is honored by a transition, checked in the order
/// filter, page size, page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    pub filter: Option<(String, Option<SearchField>)>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl ChangeRequest {
    pub fn with_filter(mut self, term: impl Into<String>, field: Option<SearchField>) -> Self {
        self.filter = Some((term.into(), field));
        self
    }

    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filter.is_none() && self.page_size.is_none() && self.page.is_none()
    }
}

impl From<Intent> for ChangeRequest {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::SetFilter { term, field } => ChangeRequest::default().with_filter(term, field),
            Intent::SetPageSize { size } => ChangeRequest::default().with_page_size(size),
            Intent::SetPage { page } => ChangeRequest::default().with_page(page),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryState {
    pub search_term: String,
    /// `None` is the empty field; ignored by the server when the term is empty
    pub search_field: Option<SearchField>,
    /// `RESOLVE_PAGE` or a page index understood by the server
    pub page_number: u32,
    pub page_size: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            search_field: None,
            page_number: DEFAULT_PAGE_NUMBER,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryState {
    /// Initial state with configured paging defaults. A zero page size falls
    /// back to the built-in default.
    pub fn new(page_number: u32, page_size: u32) -> Self {
        Self {
            page_number,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
            ..Self::default()
        }
    }

    /// Resolve `request` against this state.
    ///
    /// `last_known_page_count` is the page count reported by the most
    /// recently displayed server page. Returns an equal state when no
    /// intent's guard passes.
    pub fn transition(&self, request: &ChangeRequest, last_known_page_count: u32) -> QueryState {
        if let Some((term, field)) = &request.filter {
            if *term != self.search_term {
                return QueryState {
                    search_term: term.clone(),
                    search_field: *field,
                    page_number: RESOLVE_PAGE,
                    page_size: self.page_size,
                };
            }
        }

        if let Some(size) = request.page_size {
            if size != self.page_size && size > 0 {
                return QueryState {
                    page_size: size,
                    page_number: RESOLVE_PAGE,
                    ..self.clone()
                };
            }
        }

        if let Some(page) = request.page {
            if page != self.page_number && self.page_number <= last_known_page_count {
                return QueryState {
                    page_number: page,
                    ..self.clone()
                };
            }
        }

        self.clone()
    }

    /// Shorthand for a transition carrying a single intent
    pub fn apply(&self, intent: Intent, last_known_page_count: u32) -> QueryState {
        self.transition(&intent.into(), last_known_page_count)
    }

    /// Wire key for the `type` parameter, empty when no field is selected
    pub fn field_key(&self) -> &'static str {
        self.search_field.map(SearchField::wire_key).unwrap_or("")
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "term='{}' field='{}' page={} size={}",
            self.search_term,
            self.field_key(),
            self.page_number,
            self.page_size
        )
    }
}
