//! Built-in data served when the backend is unavailable and the data policy
//! allows degrading.

use crate::models::{
    BookingChannel, Channel, FormDropdowns, GoogleReview, Pagination, Property, PropertyOption, Review,
    ReviewCategory, ReviewPage, ReviewQuery, ReviewStats, ReviewStatus, ReviewType,
};

fn categories(scores: &[(&str, f64)]) -> Vec<ReviewCategory> {
    scores
        .iter()
        .map(|(category, rating)| ReviewCategory {
            category: category.to_string(),
            rating: *rating,
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn review(
    id: i64,
    review_type: ReviewType,
    status: ReviewStatus,
    rating: Option<f64>,
    text: &str,
    scores: &[(&str, f64)],
    submitted_at: &str,
    guest: &str,
    listing: &str,
    property: &str,
    channel: BookingChannel,
    selected: bool,
    flagged: &[&str],
) -> Review {
    Review {
        id,
        review_type,
        status,
        rating,
        public_review: text.to_string(),
        review_category: categories(scores),
        submitted_at: submitted_at.to_string(),
        guest_name: guest.to_string(),
        listing_name: listing.to_string(),
        property_id: Some(property.to_string()),
        channel: Some(channel),
        is_selected_for_website: selected,
        flagged_issues: flagged.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn reviews() -> Vec<Review> {
    vec![
        review(
            7453,
            ReviewType::HostToGuest,
            ReviewStatus::Published,
            None,
            "Shane and family are wonderful! Would definitely host again :)",
            &[
                ("cleanliness", 10.0),
                ("communication", 10.0),
                ("respect_house_rules", 10.0),
            ],
            "2024-08-21 22:45:14",
            "Shane Finkelstein",
            "2B N1 A - 29 Shoreditch Heights",
            "prop_001",
            BookingChannel::Airbnb,
            true,
            &[],
        ),
        review(
            7454,
            ReviewType::GuestToHost,
            ReviewStatus::Pending,
            Some(4.0),
            "Great location and clean apartment. Host was very responsive. Minor issue with Wi-Fi but overall excellent stay.",
            &[
                ("cleanliness", 9.0),
                ("communication", 10.0),
                ("location", 10.0),
                ("wifi", 6.0),
            ],
            "2024-10-15 14:30:22",
            "Emma Thompson",
            "1B S2 B - 15 Camden Lock",
            "prop_002",
            BookingChannel::Booking,
            false,
            &["wifi"],
        ),
        review(
            7455,
            ReviewType::GuestToHost,
            ReviewStatus::Approved,
            Some(5.0),
            "Absolutely perfect! The apartment exceeded expectations. Everything was spotless and the host went above and beyond.",
            &[
                ("cleanliness", 10.0),
                ("communication", 10.0),
                ("location", 9.0),
                ("value", 9.0),
            ],
            "2024-10-20 09:15:33",
            "Michael Chen",
            "3B E1 C - 42 Canary Wharf Tower",
            "prop_003",
            BookingChannel::Direct,
            true,
            &[],
        ),
        review(
            7456,
            ReviewType::GuestToHost,
            ReviewStatus::Published,
            Some(2.0),
            "Location was good but had several issues. Heating wasn't working properly and cleanliness was below standard.",
            &[
                ("cleanliness", 4.0),
                ("communication", 8.0),
                ("location", 9.0),
                ("heating", 2.0),
            ],
            "2024-09-28 16:45:11",
            "Sarah Wilson",
            "2B N1 A - 29 Shoreditch Heights",
            "prop_001",
            BookingChannel::Airbnb,
            false,
            &["cleanliness", "heating"],
        ),
        review(
            7457,
            ReviewType::GuestToHost,
            ReviewStatus::Approved,
            Some(4.0),
            "Nice place in great location. Check-in was smooth and host was helpful. Would stay again!",
            &[
                ("cleanliness", 8.0),
                ("communication", 9.0),
                ("location", 10.0),
                ("checkin", 9.0),
            ],
            "2024-11-01 11:20:45",
            "David Rodriguez",
            "1B S2 B - 15 Camden Lock",
            "prop_002",
            BookingChannel::Google,
            true,
            &[],
        ),
    ]
}

/// Filter `all` by the query's status and cut out the requested page.
pub fn page_of(all: &[Review], query: &ReviewQuery) -> ReviewPage {
    let matching: Vec<&Review> = all
        .iter()
        .filter(|r| query.status.map_or(true, |status| r.status == status))
        .collect();
    let pagination = Pagination::for_total(query.page, query.limit, matching.len() as u32);
    ReviewPage {
        reviews: matching[pagination.range()].iter().map(|r| (*r).clone()).collect(),
        pagination,
    }
}

pub fn review_page(query: &ReviewQuery) -> ReviewPage {
    page_of(&reviews(), query)
}

pub fn stats() -> ReviewStats {
    ReviewStats {
        total_reviews: 55,
        average_rating: 4.4,
        pending_reviews: 8,
        approved_reviews: 5,
        published_reviews: 42,
        rejected_reviews: 0,
        flagged_issues: 4,
        properties_count: 3,
    }
}

pub fn properties() -> Vec<Property> {
    vec![
        Property {
            id: "prop_001".to_string(),
            name: "2B N1 A - 29 Shoreditch Heights".to_string(),
            location: Some("Shoreditch, London".to_string()),
            rating: Some(4.0),
        },
        Property {
            id: "prop_002".to_string(),
            name: "1B S2 B - 15 Camden Lock".to_string(),
            location: Some("Camden, London".to_string()),
            rating: Some(4.5),
        },
        Property {
            id: "prop_003".to_string(),
            name: "3B E1 C - 42 Canary Wharf Tower".to_string(),
            location: Some("Canary Wharf, London".to_string()),
            rating: Some(4.8),
        },
    ]
}

pub fn channels() -> Vec<Channel> {
    [
        ("airbnb", "Airbnb"),
        ("booking", "Booking.com"),
        ("direct", "Direct"),
        ("google", "Google"),
    ]
    .into_iter()
    .map(|(id, name)| Channel {
        id: id.to_string(),
        name: name.to_string(),
        active: true,
    })
    .collect()
}

/// The same two reviews for any place id.
pub fn google_reviews(_place_id: &str) -> Vec<GoogleReview> {
    vec![
        GoogleReview {
            author_name: "John Smith".to_string(),
            author_url: "https://www.google.com/maps/contrib/123".to_string(),
            language: "en".to_string(),
            profile_photo_url: "https://via.placeholder.com/40".to_string(),
            rating: 5.0,
            relative_time_description: "2 weeks ago".to_string(),
            text: "Excellent service and beautiful property. Highly recommend!".to_string(),
            time: 1_699_123_200,
        },
        GoogleReview {
            author_name: "Lisa Johnson".to_string(),
            author_url: "https://www.google.com/maps/contrib/456".to_string(),
            language: "en".to_string(),
            profile_photo_url: "https://via.placeholder.com/40".to_string(),
            rating: 4.0,
            relative_time_description: "1 month ago".to_string(),
            text: "Great location and clean facilities. Minor issues with parking.".to_string(),
            time: 1_696_531_200,
        },
    ]
}

pub fn dropdowns() -> FormDropdowns {
    FormDropdowns {
        statuses: ReviewStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
        channels: channels().into_iter().map(|c| c.id).collect(),
        properties: properties()
            .into_iter()
            .map(|p| PropertyOption { id: p.id, name: p.name })
            .collect(),
        categories: [
            "cleanliness",
            "communication",
            "location",
            "value",
            "checkin",
            "wifi",
            "heating",
            "respect_house_rules",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_reviews_are_consistent() {
        let all = reviews();
        assert_eq!(all.len(), 5);
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7453, 7454, 7455, 7456, 7457]);
        assert!(all.iter().all(|r| r.submitted().is_some()));
        assert_eq!(all.iter().filter(|r| r.is_flagged()).count(), 2);
    }

    #[test]
    fn test_review_page_filters_and_paginates() {
        let published = review_page(&ReviewQuery {
            page: 1,
            limit: 10,
            status: Some(ReviewStatus::Published),
        });
        assert_eq!(published.pagination.total, 2);
        assert!(published.reviews.iter().all(|r| r.status == ReviewStatus::Published));

        let second = review_page(&ReviewQuery {
            page: 2,
            limit: 2,
            status: None,
        });
        assert_eq!(
            second.reviews.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![7455, 7456]
        );
        assert!(second.pagination.has_next);
    }

    #[test]
    fn test_dropdowns_cover_catalog() {
        let dropdowns = dropdowns();
        assert_eq!(dropdowns.statuses.len(), 4);
        assert_eq!(dropdowns.properties.len(), properties().len());
        assert!(dropdowns.channels.contains(&"google".to_string()));
    }
}
