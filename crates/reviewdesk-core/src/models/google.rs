use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review pulled from a property's Google Places listing. Field names
/// follow the Places API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct GoogleReview {
    pub author_name: String,
    #[serde(default)]
    pub author_url: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub profile_photo_url: String,
    pub rating: f64,
    #[serde(default)]
    pub relative_time_description: String,
    #[serde(default)]
    pub text: String,
    /// Seconds since the Unix epoch.
    pub time: i64,
}

impl GoogleReview {
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_places_review() {
        let json = r#"{
            "author_name": "John Smith",
            "rating": 5,
            "relative_time_description": "2 weeks ago",
            "text": "Excellent service",
            "time": 1699123200
        }"#;
        let review: GoogleReview = serde_json::from_str(json).unwrap();
        assert_eq!(review.author_name, "John Smith");
        assert_eq!(review.rating, 5.0);
        assert!(review.author_url.is_empty());
        assert_eq!(
            review.posted_at().unwrap().format("%Y-%m-%d").to_string(),
            "2023-11-04"
        );
    }
}
