use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout the review API uses for `submittedAt`.
const SUBMITTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "kebab-case")]
pub enum ReviewType {
    HostToGuest,
    GuestToHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Published,
    Rejected,
}

impl ReviewStatus {
    pub const ALL: [ReviewStatus; 4] = [
        ReviewStatus::Pending,
        ReviewStatus::Approved,
        ReviewStatus::Published,
        ReviewStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Published => "published",
            ReviewStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "Pending"),
            ReviewStatus::Approved => write!(f, "Approved"),
            ReviewStatus::Published => write!(f, "Published"),
            ReviewStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Booking channel a review came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum BookingChannel {
    Airbnb,
    Booking,
    Direct,
    Google,
    #[serde(other)]
    Other,
}

impl BookingChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingChannel::Airbnb => "airbnb",
            BookingChannel::Booking => "booking",
            BookingChannel::Direct => "direct",
            BookingChannel::Google => "google",
            BookingChannel::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ReviewCategory {
    pub category: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: i64,
    #[serde(rename = "type")]
    pub review_type: ReviewType,
    pub status: ReviewStatus,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub public_review: String,
    #[serde(default)]
    pub review_category: Vec<ReviewCategory>,
    pub submitted_at: String,
    #[serde(default)]
    pub guest_name: String,
    #[serde(default)]
    pub listing_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<BookingChannel>,
    #[serde(default)]
    pub is_selected_for_website: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_issues: Vec<String>,
}

impl Review {
    /// Parse `submittedAt`, accepting both the API's space-separated layout
    /// and RFC 3339.
    pub fn submitted(&self) -> Option<NaiveDateTime> {
        let raw = self.submitted_at.trim();
        NaiveDateTime::parse_from_str(raw, SUBMITTED_AT_FORMAT)
            .ok()
            .or_else(|| {
                DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.naive_utc())
            })
    }

    /// `YYYY-MM` of submission, for monthly grouping.
    pub fn month(&self) -> Option<String> {
        self.submitted().map(|dt| dt.format("%Y-%m").to_string())
    }

    pub fn is_flagged(&self) -> bool {
        !self.flagged_issues.is_empty()
    }

    /// Case-insensitive substring match against the category names.
    pub fn has_category_like(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.review_category
            .iter()
            .any(|c| c.category.to_lowercase().contains(&needle))
    }

    pub fn shares_category_with(&self, other: &Review) -> bool {
        self.review_category.iter().any(|mine| {
            other
                .review_category
                .iter()
                .any(|theirs| theirs.category == mine.category)
        })
    }

    /// Mean of the per-category scores, if any were given.
    pub fn category_average(&self) -> Option<f64> {
        if self.review_category.is_empty() {
            return None;
        }
        let total: f64 = self.review_category.iter().map(|c| c.rating).sum();
        Some(total / self.review_category.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    /// Page metadata for `total` items. Page numbers start at 1 and a zero
    /// limit is treated as 1.
    pub fn for_total(page: u32, limit: u32, total: u32) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = total.div_ceil(limit);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Index range of this page within the full list.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = (self.page.saturating_sub(1) as usize).saturating_mul(self.limit as usize);
        let start = start.min(self.total as usize);
        let end = start.saturating_add(self.limit as usize).min(self.total as usize);
        start..end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ReviewPage {
    pub reviews: Vec<Review>,
    pub pagination: Pagination,
}

/// Query parameters for `GET /reviews`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewQuery {
    pub page: u32,
    pub limit: u32,
    pub status: Option<ReviewStatus>,
}

impl Default for ReviewQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub total_reviews: u32,
    pub average_rating: f64,
    #[serde(default)]
    pub pending_reviews: u32,
    #[serde(default)]
    pub approved_reviews: u32,
    #[serde(default)]
    pub published_reviews: u32,
    #[serde(default)]
    pub rejected_reviews: u32,
    #[serde(default)]
    pub flagged_issues: u32,
    #[serde(default)]
    pub properties_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_json(submitted_at: &str) -> String {
        format!(
            r#"{{
                "id": 7454,
                "type": "guest-to-host",
                "status": "pending",
                "rating": 4,
                "publicReview": "Great location",
                "reviewCategory": [{{"category": "wifi", "rating": 6}}],
                "submittedAt": "{}",
                "guestName": "Emma Thompson",
                "listingName": "1B S2 B - 15 Camden Lock",
                "propertyId": "prop_002",
                "channel": "booking",
                "flaggedIssues": ["wifi"]
            }}"#,
            submitted_at
        )
    }

    #[test]
    fn test_review_deserializes_wire_names() {
        let review: Review = serde_json::from_str(&review_json("2024-10-15 14:30:22")).unwrap();
        assert_eq!(review.review_type, ReviewType::GuestToHost);
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.rating, Some(4.0));
        assert_eq!(review.channel, Some(BookingChannel::Booking));
        assert!(!review.is_selected_for_website);
        assert!(review.is_flagged());
        assert!(review.has_category_like("WiFi"));
        assert_eq!(review.month().as_deref(), Some("2024-10"));
    }

    #[test]
    fn test_submitted_accepts_rfc3339() {
        let review: Review =
            serde_json::from_str(&review_json("2024-11-01T11:20:45.000Z")).unwrap();
        assert_eq!(
            review.submitted().unwrap().format("%Y-%m-%d %H:%M").to_string(),
            "2024-11-01 11:20"
        );

        let garbled: Review = serde_json::from_str(&review_json("last tuesday")).unwrap();
        assert_eq!(garbled.submitted(), None);
    }

    #[test]
    fn test_unknown_channel_is_other() {
        let json = review_json("2024-10-15 14:30:22").replace("\"booking\"", "\"vrbo\"");
        let review: Review = serde_json::from_str(&json).unwrap();
        assert_eq!(review.channel, Some(BookingChannel::Other));
    }

    #[test]
    fn test_pagination_for_total() {
        let p = Pagination::for_total(2, 2, 5);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next && p.has_prev);
        assert_eq!(p.range(), 2..4);

        let last = Pagination::for_total(3, 2, 5);
        assert!(!last.has_next);
        assert_eq!(last.range(), 4..5);

        let beyond = Pagination::for_total(9, 2, 5);
        assert_eq!(beyond.range(), 5..5);

        let empty = Pagination::for_total(1, 10, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next && !empty.has_prev);
    }
}
