//! List filters shared by the paged endpoints. Changing any filter sends the caller back to the
//! first page.

use derive_more::Display;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum SortDirection {
    #[display("asc")]
    Ascending,
    #[default]
    #[display("desc")]
    Descending,
}

/// Paging, ordering, and free-text search for a paged list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    pub sort: SortDirection,
    pub search: Option<String>,
}

impl Default for PageQuery {
    fn default() -> Self {
        PageQuery {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortDirection::default(),
            search: None,
        }
    }
}

impl PageQuery {
    pub fn go_to_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size;
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortDirection) {
        self.sort = sort;
        self.page = 1;
    }

    /// Sets the search text. Blank text clears the search.
    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = non_blank(search.into());
        self.page = 1;
    }

    /// Query-string pairs for this filter, in the order the server documents them
    pub(crate) fn paging_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            ("pageSize", self.page_size.to_string()),
        ]
    }
}

/// Month being viewed on the expense and task screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MonthFilter {
    pub year: i32,
    pub month: u32,
}

impl MonthFilter {
    pub fn params(&self) -> [(&'static str, String); 2] {
        [("year", self.year.to_string()), ("month", self.month.to_string())]
    }
}

/// Turns an empty or whitespace-only string into [None]
pub(crate) fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
