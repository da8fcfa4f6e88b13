//! Pagination over a tabular artifact.

use crate::model::{CellValue, TabularArtifact};
use std::ops::Range;

pub const PAGE_SIZES: [usize; 4] = [5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Page cursor for one table. The row count is passed on each call so a
/// pager never holds on to a stale artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePager {
    page_size: usize,
    page: usize,
}

impl Default for TablePager {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            page: 0,
        }
    }
}

impl TablePager {
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current page, clamped against `rows`.
    pub fn page(&self, rows: usize) -> usize {
        match self.page_count(rows) {
            0 => 0,
            n => self.page.min(n - 1),
        }
    }

    pub fn page_count(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size)
    }

    /// Jump to `page`, clamped into range. Returns false when the table has
    /// no rows, in which case paging is not permitted.
    pub fn go_to(&mut self, page: usize, rows: usize) -> bool {
        let count = self.page_count(rows);
        if count == 0 {
            self.page = 0;
            return false;
        }
        self.page = page.min(count - 1);
        true
    }

    pub fn next(&mut self, rows: usize) -> bool {
        let page = self.page(rows).saturating_add(1);
        self.go_to(page, rows)
    }

    pub fn prev(&mut self, rows: usize) -> bool {
        let page = self.page(rows).saturating_sub(1);
        self.go_to(page, rows)
    }

    /// Only sizes from [`PAGE_SIZES`] are accepted. Any change resets to the
    /// first page.
    pub fn set_page_size(&mut self, size: usize) -> bool {
        if !PAGE_SIZES.contains(&size) {
            return false;
        }
        self.page_size = size;
        self.page = 0;
        true
    }

    /// Step to the next allowed page size, wrapping around.
    pub fn cycle_page_size(&mut self) {
        let idx = PAGE_SIZES
            .iter()
            .position(|s| *s == self.page_size)
            .map_or(0, |i| (i + 1) % PAGE_SIZES.len());
        self.set_page_size(PAGE_SIZES[idx]);
    }

    /// Visible row indices: `[page*P, min(page*P+P, rows))`.
    pub fn window(&self, rows: usize) -> Range<usize> {
        let start = (self.page(rows) * self.page_size).min(rows);
        let end = (start + self.page_size).min(rows);
        start..end
    }

    pub fn visible_rows<'a>(&self, table: &'a TabularArtifact) -> &'a [Vec<CellValue>] {
        &table.rows()[self.window(table.row_count())]
    }

    pub fn label(&self, rows: usize) -> String {
        if rows == 0 {
            return "No rows".to_string();
        }
        let w = self.window(rows);
        format!("Showing {}–{} of {} rows", w.start + 1, w.end, rows)
    }
}
