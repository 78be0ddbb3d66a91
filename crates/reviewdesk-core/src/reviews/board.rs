//! The manager dashboard's working set: loaded reviews plus the current
//! filters, sort order and page.

use std::collections::BTreeMap;

use tracing::debug;

use super::filters::{sort_reviews, ReviewFilters, ReviewSortColumn, SortOrder};
use crate::models::{Pagination, Review, ReviewStatus};

const DEFAULT_PAGE_SIZE: u32 = 10;

/// One page of the filtered, sorted board.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardPage<'a> {
    pub reviews: Vec<&'a Review>,
    pub pagination: Pagination,
}

pub struct ReviewBoard {
    reviews: Vec<Review>,
    filters: ReviewFilters,
    sort: SortOrder,
    page: u32,
    page_size: u32,
}

impl Default for ReviewBoard {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReviewBoard {
    pub fn new(reviews: Vec<Review>) -> Self {
        Self {
            reviews,
            filters: ReviewFilters::default(),
            sort: SortOrder::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Replace the loaded set, keeping filters and sort.
    pub fn set_reviews(&mut self, reviews: Vec<Review>) {
        debug!(count = reviews.len(), "Board reloaded");
        self.reviews = reviews;
        self.clamp_page();
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn find(&self, id: i64) -> Option<&Review> {
        self.reviews.iter().find(|r| r.id == id)
    }

    // ===== Filters and sort =====

    pub fn filters(&self) -> &ReviewFilters {
        &self.filters
    }

    /// Changing filters returns to the first page.
    pub fn set_filters(&mut self, filters: ReviewFilters) {
        self.filters = filters;
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.set_filters(ReviewFilters::default());
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn sort_by(&mut self, column: ReviewSortColumn) {
        self.sort.toggle(column);
    }

    /// Every review passing the filters, in sort order.
    pub fn visible(&self) -> Vec<&Review> {
        let mut visible = self.filters.apply(&self.reviews);
        sort_reviews(&mut visible, self.sort);
        visible
    }

    // ===== Pagination =====

    pub fn current_page(&self) -> BoardPage<'_> {
        let visible = self.visible();
        let pagination = Pagination::for_total(self.page, self.page_size, visible.len() as u32);
        BoardPage {
            reviews: visible[pagination.range()].to_vec(),
            pagination,
        }
    }

    fn total_pages(&self) -> u32 {
        Pagination::for_total(self.page, self.page_size, self.visible().len() as u32).total_pages
    }

    fn clamp_page(&mut self) {
        self.page = self.page.min(self.total_pages()).max(1);
    }

    /// Jump to a page, clamped to the available range.
    pub fn set_page(&mut self, page: u32) {
        self.page = page;
        self.clamp_page();
    }

    pub fn set_page_size(&mut self, page_size: u32) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn next_page(&mut self) -> bool {
        if self.page < self.total_pages() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    // ===== Summaries and edits =====

    /// Count of loaded reviews per status (every status present, zero or not).
    pub fn status_counts(&self) -> BTreeMap<ReviewStatus, usize> {
        let mut counts: BTreeMap<ReviewStatus, usize> =
            ReviewStatus::ALL.iter().map(|s| (*s, 0)).collect();
        for review in &self.reviews {
            *counts.entry(review.status).or_default() += 1;
        }
        counts
    }

    pub fn flagged(&self) -> Vec<&Review> {
        self.reviews.iter().filter(|r| r.is_flagged()).collect()
    }

    /// Flip website selection for one review, returning the new value.
    pub fn toggle_website_selection(&mut self, id: i64) -> Option<bool> {
        let review = self.reviews.iter_mut().find(|r| r.id == id)?;
        review.is_selected_for_website = !review.is_selected_for_website;
        debug!(id, selected = review.is_selected_for_website, "Website selection toggled");
        Some(review.is_selected_for_website)
    }

    /// Replace a review with the server's updated copy. Returns false if it
    /// is not on the board.
    pub fn apply_update(&mut self, updated: Review) -> bool {
        match self.reviews.iter_mut().find(|r| r.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                self.clamp_page();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::mock;

    fn ids(reviews: &[&Review]) -> Vec<i64> {
        reviews.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_pagination_over_visible_reviews() {
        let mut board = ReviewBoard::new(mock::reviews());
        board.set_page_size(2);

        let first = board.current_page();
        assert_eq!(ids(&first.reviews), vec![7457, 7455]);
        assert_eq!(first.pagination.total_pages, 3);
        assert!(first.pagination.has_next && !first.pagination.has_prev);

        assert!(board.next_page());
        assert!(board.next_page());
        assert!(!board.next_page());
        assert_eq!(ids(&board.current_page().reviews), vec![7453]);

        board.set_page(99);
        assert_eq!(board.current_page().pagination.page, 3);
        assert!(board.prev_page());
        assert_eq!(board.current_page().pagination.page, 2);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut board = ReviewBoard::new(mock::reviews());
        board.set_page_size(2);
        board.set_page(2);
        board.set_filters(ReviewFilters {
            status: Some(ReviewStatus::Approved),
            ..Default::default()
        });
        let page = board.current_page();
        assert_eq!(page.pagination.page, 1);
        assert_eq!(ids(&page.reviews), vec![7457, 7455]);

        board.clear_filters();
        assert_eq!(board.visible().len(), 5);
    }

    #[test]
    fn test_sort_by_toggles() {
        let mut board = ReviewBoard::new(mock::reviews());
        board.sort_by(ReviewSortColumn::Rating);
        assert_eq!(board.visible()[4].id, 7455);
        board.sort_by(ReviewSortColumn::Rating);
        assert_eq!(board.visible()[0].id, 7455);
    }

    #[test]
    fn test_status_counts_and_flagged() {
        let board = ReviewBoard::new(mock::reviews());
        let counts = board.status_counts();
        assert_eq!(counts[&ReviewStatus::Published], 2);
        assert_eq!(counts[&ReviewStatus::Pending], 1);
        assert_eq!(counts[&ReviewStatus::Approved], 2);
        assert_eq!(counts[&ReviewStatus::Rejected], 0);
        assert_eq!(ids(&board.flagged()), vec![7454, 7456]);
    }

    #[test]
    fn test_toggle_and_apply_update() {
        let mut board = ReviewBoard::new(mock::reviews());
        assert_eq!(board.toggle_website_selection(7454), Some(true));
        assert_eq!(board.toggle_website_selection(7454), Some(false));
        assert_eq!(board.toggle_website_selection(1), None);

        let mut updated = board.find(7454).unwrap().clone();
        updated.status = ReviewStatus::Published;
        assert!(board.apply_update(updated));
        assert_eq!(board.find(7454).unwrap().status, ReviewStatus::Published);

        let mut stranger = mock::reviews()[0].clone();
        stranger.id = 1;
        assert!(!board.apply_update(stranger));
    }
}
