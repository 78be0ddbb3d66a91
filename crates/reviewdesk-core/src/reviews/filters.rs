//! Review filtering and sorting.

use std::cmp::Ordering;

use chrono::NaiveDateTime;

use crate::models::{BookingChannel, Review, ReviewStatus};

/// Inclusive rating bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingRange {
    pub min: f64,
    pub max: f64,
}

/// Inclusive submission window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Dashboard filters. Unset fields (and empty strings) match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewFilters {
    pub property_id: Option<String>,
    /// Reviews without an overall rating always pass.
    pub rating: Option<RatingRange>,
    /// Case-insensitive substring of any category name.
    pub category: Option<String>,
    pub channel: Option<BookingChannel>,
    pub status: Option<ReviewStatus>,
    /// Case-insensitive search over guest name, listing name and text.
    pub search: Option<String>,
    /// Reviews with an unparseable date always pass.
    pub date_range: Option<DateRange>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Case-insensitive comparison for display strings.
pub(crate) fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl ReviewFilters {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, review: &Review) -> bool {
        if let Some(ref property) = self.property_id {
            if review.property_id.as_ref() != Some(property) {
                return false;
            }
        }

        if let (Some(range), Some(rating)) = (self.rating, review.rating) {
            if rating < range.min || rating > range.max {
                return false;
            }
        }

        if let Some(category) = non_empty(&self.category) {
            if !review.has_category_like(category) {
                return false;
            }
        }

        if let Some(channel) = self.channel {
            if review.channel != Some(channel) {
                return false;
            }
        }

        if let Some(status) = self.status {
            if review.status != status {
                return false;
            }
        }

        if let Some(search) = non_empty(&self.search) {
            let needle = search.to_lowercase();
            let hit = contains_ignore_case(&review.public_review, &needle)
                || contains_ignore_case(&review.guest_name, &needle)
                || contains_ignore_case(&review.listing_name, &needle);
            if !hit {
                return false;
            }
        }

        if let (Some(range), Some(submitted)) = (self.date_range, review.submitted()) {
            if submitted < range.start || submitted > range.end {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(&self, reviews: &'a [Review]) -> Vec<&'a Review> {
        reviews.iter().filter(|r| self.matches(r)).collect()
    }
}

// Sorting options for the reviews table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewSortColumn {
    GuestName,
    Listing,
    Rating,
    Status,
    Channel,
    #[default]
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: ReviewSortColumn,
    pub ascending: bool,
}

impl Default for SortOrder {
    /// Newest first.
    fn default() -> Self {
        Self {
            column: ReviewSortColumn::Submitted,
            ascending: false,
        }
    }
}

impl SortOrder {
    /// Clicking the active column flips direction; a new column starts
    /// ascending.
    pub fn toggle(&mut self, column: ReviewSortColumn) {
        if self.column == column {
            self.ascending = !self.ascending;
        } else {
            self.column = column;
            self.ascending = true;
        }
    }
}

fn cmp_rating(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Compare by submission time, falling back to the raw string when either
/// side does not parse.
pub(crate) fn cmp_submitted(a: &Review, b: &Review) -> Ordering {
    match (a.submitted(), b.submitted()) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.submitted_at.cmp(&b.submitted_at),
    }
}

pub fn sort_reviews(reviews: &mut [&Review], order: SortOrder) {
    reviews.sort_by(|a, b| {
        let cmp = match order.column {
            ReviewSortColumn::GuestName => cmp_ignore_case(&a.guest_name, &b.guest_name),
            ReviewSortColumn::Listing => cmp_ignore_case(&a.listing_name, &b.listing_name),
            ReviewSortColumn::Rating => cmp_rating(a.rating, b.rating),
            ReviewSortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
            ReviewSortColumn::Channel => a
                .channel
                .map(|c| c.as_str())
                .unwrap_or("")
                .cmp(b.channel.map(|c| c.as_str()).unwrap_or("")),
            ReviewSortColumn::Submitted => cmp_submitted(a, b),
        }
        .then_with(|| a.id.cmp(&b.id));

        if order.ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}
