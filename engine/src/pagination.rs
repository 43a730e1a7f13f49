//! FILENAME: engine/src/pagination.rs
//! Pagination Window - clamps the requested page and slices one page out of
//! an ordered sequence of rows, groups or tree nodes.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow {
    /// 1-based, always within `1..=total_pages`.
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
}

impl PageWindow {
    /// Computes the window for `total_count` items. A zero page size falls
    /// back to the default.
    pub fn compute(requested_page: usize, page_size: usize, total_count: usize) -> Self {
        let page_size = if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size };
        let total_pages = total_count.div_ceil(page_size).max(1);
        PageWindow {
            page: requested_page.clamp(1, total_pages),
            page_size,
            total_count,
            total_pages,
        }
    }

    /// Pagination disabled: everything is page 1 of 1.
    pub fn unpaginated(total_count: usize) -> Self {
        PageWindow {
            page: 1,
            page_size: total_count,
            total_count,
            total_pages: 1,
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Index range of this page within a sequence of `len` items.
    pub fn range(&self, len: usize) -> std::ops::Range<usize> {
        let start = self.offset().min(len);
        let end = (start + self.page_size).min(len);
        start..end
    }

    pub fn slice<'s, T>(&self, items: &'s [T]) -> &'s [T] {
        &items[self.range(items.len())]
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Slices `items` into one page. `None` page size means pagination is off.
pub fn paginate<T>(items: Vec<T>, requested_page: usize, page_size: Option<usize>) -> (Vec<T>, PageWindow) {
    match page_size {
        None => {
            let window = PageWindow::unpaginated(items.len());
            (items, window)
        }
        Some(size) => {
            let window = PageWindow::compute(requested_page, size, items.len());
            let range = window.range(items.len());
            let page = items.into_iter().skip(range.start).take(range.len()).collect();
            (page, window)
        }
    }
}
