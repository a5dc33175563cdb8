//! Page-size adaptation and page arithmetic. Everything here is pure.

use std::ops::Range;

/// Effective page size and page count for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub page_size: usize,
    pub page_count: usize,
}

impl PageLayout {
    /// Shrinks the page size for small batches so they still split into
    /// roughly two pages: when `total < 2 * configured` and `total > min`,
    /// the size becomes `max(min, total / 2)`.
    pub fn compute(total: usize, configured: usize, min: usize) -> Self {
        let configured = configured.max(1);
        let mut page_size = configured;
        if total < configured.saturating_mul(2) && total > min {
            page_size = (total / 2).max(min);
        }
        let page_size = page_size.max(1);

        Self {
            page_size,
            page_count: total.div_ceil(page_size),
        }
    }

    /// Cycling only makes sense with more than one page.
    pub fn cycles(&self) -> bool {
        self.page_count > 1
    }
}

/// Current page over a fixed batch size. Transitions return new values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub current_page: usize,
    pub layout: PageLayout,
    total: usize,
}

impl PaginationState {
    /// Fresh state for a newly received batch, positioned on the first page.
    pub fn reset(total: usize, configured: usize, min: usize) -> Self {
        Self {
            current_page: 0,
            layout: PageLayout::compute(total, configured, min),
            total,
        }
    }

    /// The state after one cycle tick, wrapping to the first page.
    pub fn advanced(self) -> Self {
        let page_count = self.layout.page_count.max(1);
        Self {
            current_page: (self.current_page + 1) % page_count,
            ..self
        }
    }

    pub fn page_count(&self) -> usize {
        self.layout.page_count
    }

    pub fn cycling(&self) -> bool {
        self.layout.cycles()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Indices of the records visible on the current page.
    pub fn page_range(&self) -> Range<usize> {
        let start = self
            .current_page
            .saturating_mul(self.layout.page_size)
            .min(self.total);
        let end = start.saturating_add(self.layout.page_size).min(self.total);
        start..end
    }
}
