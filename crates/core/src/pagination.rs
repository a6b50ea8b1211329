//! Page-number pagination over GitLab list endpoints
//!
//! GitLab list endpoints take `page` and `per_page` query parameters. Pages
//! are requested one after another until a page comes back short or empty.

/// Largest page size GitLab accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Default page size
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Clamp a requested page size into the range GitLab accepts
pub fn clamp_page_size(requested: u32) -> u32 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Position in a paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub per_page: u32,
}

impl PageCursor {
    /// Cursor for the first page
    pub fn first(per_page: u32) -> Self {
        Self {
            page: 1,
            per_page: clamp_page_size(per_page),
        }
    }

    /// Cursor for the following page, or `None` once `fetched` shows the
    /// listing is exhausted
    pub fn advance(self, fetched: usize) -> Option<Self> {
        if fetched < self.per_page as usize {
            return None;
        }

        Some(Self {
            page: self.page + 1,
            per_page: self.per_page,
        })
    }

    /// Query parameters for this page
    pub fn query(&self) -> [(&'static str, String); 2] {
        [
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
        ]
    }
}
