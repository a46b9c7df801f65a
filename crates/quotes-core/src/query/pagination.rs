//! Page window and page-number helpers.

use serde::Serialize;

/// Fixed number of quotes per page.
pub const PAGE_SIZE: u64 = 4;

/// Maximum number of numbered page links shown at once.
const MAX_PAGE_LINKS: u64 = 5;

/// Offset/limit for one page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Window for a 1-based page; pages below 1 are treated as 1.
    #[must_use]
    pub const fn for_page(page: u64) -> Self {
        let page = if page == 0 { 1 } else { page };
        Self {
            offset: (page - 1).saturating_mul(PAGE_SIZE),
            limit: PAGE_SIZE,
        }
    }

    /// Inclusive last row index, as range-based APIs expect.
    #[must_use]
    pub const fn last_index(self) -> u64 {
        self.offset.saturating_add(self.limit).saturating_sub(1)
    }
}

/// `ceil(count / PAGE_SIZE)`; zero results means zero pages.
#[must_use]
pub const fn total_pages(count: u64) -> u64 {
    count.div_ceil(PAGE_SIZE)
}

/// Up to five page numbers centred on the current page.
#[must_use]
pub fn page_numbers(current: u64, total: u64) -> Vec<u64> {
    if total == 0 {
        return Vec::new();
    }
    let shown = total.min(MAX_PAGE_LINKS);
    let first = if total <= MAX_PAGE_LINKS || current <= 3 {
        1
    } else if current >= total.saturating_sub(2) {
        total - (MAX_PAGE_LINKS - 1)
    } else {
        current - 2
    };
    (first..first + shown).collect()
}

/// 1-based inclusive bounds of the rows shown on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRange {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl PageRange {
    #[must_use]
    pub fn new(page: u64, total: u64) -> Self {
        let page = page.max(1);
        Self {
            start: (page - 1)
                .saturating_mul(PAGE_SIZE)
                .saturating_add(1)
                .min(total),
            end: page.saturating_mul(PAGE_SIZE).min(total),
            total,
        }
    }
}
