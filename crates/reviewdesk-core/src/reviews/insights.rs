//! Derived views over loaded reviews: the public display sets, related
//! reviews and the dashboard aggregates.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::filters::cmp_submitted;
use crate::models::{BookingChannel, Review, ReviewStats, ReviewStatus};

/// At most this many related reviews are suggested.
const SIMILAR_LIMIT: usize = 3;

/// Rating change between the older and newer half of a property's reviews
/// that counts as a trend.
const TREND_THRESHOLD: f64 = 0.25;

/// Restrictions offered on the public reviews page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayFilter {
    pub property_id: Option<String>,
    pub min_rating: Option<f64>,
    pub channel: Option<BookingChannel>,
}

fn newest_first(mut reviews: Vec<&Review>) -> Vec<&Review> {
    reviews.sort_by(|a, b| cmp_submitted(b, a).then_with(|| b.id.cmp(&a.id)));
    reviews
}

/// Reviews curated for the website, newest first. A minimum rating excludes
/// unrated reviews.
pub fn public_display<'a>(reviews: &'a [Review], filter: &DisplayFilter) -> Vec<&'a Review> {
    newest_first(
        reviews
            .iter()
            .filter(|r| r.is_selected_for_website)
            .filter(|r| {
                filter
                    .property_id
                    .as_ref()
                    .map_or(true, |p| r.property_id.as_ref() == Some(p))
            })
            .filter(|r| {
                filter
                    .min_rating
                    .map_or(true, |min| r.rating.is_some_and(|rating| rating >= min))
            })
            .filter(|r| filter.channel.map_or(true, |c| r.channel == Some(c)))
            .collect(),
    )
}

/// Published, website-selected reviews of one property, newest first.
pub fn property_page<'a>(reviews: &'a [Review], property_id: &str) -> Vec<&'a Review> {
    newest_first(
        reviews
            .iter()
            .filter(|r| r.property_id.as_deref() == Some(property_id))
            .filter(|r| r.status == ReviewStatus::Published && r.is_selected_for_website)
            .collect(),
    )
}

/// Up to three other reviews of the same property or sharing a category.
pub fn similar<'a>(reviews: &'a [Review], review: &Review) -> Vec<&'a Review> {
    reviews
        .iter()
        .filter(|other| other.id != review.id)
        .filter(|other| {
            (review.property_id.is_some() && other.property_id == review.property_id)
                || other.shares_category_with(review)
        })
        .take(SIMILAR_LIMIT)
        .collect()
}

/// Mean overall rating of the rated reviews.
pub fn average_rating<'a, I>(reviews: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a Review>,
{
    let (sum, count) = reviews
        .into_iter()
        .filter_map(|r| r.rating)
        .fold((0.0, 0u32), |(sum, count), rating| (sum + rating, count + 1));
    (count > 0).then(|| sum / count as f64)
}

pub fn property_count(reviews: &[Review]) -> usize {
    reviews
        .iter()
        .filter_map(|r| r.property_id.as_deref())
        .collect::<BTreeSet<_>>()
        .len()
}

/// Dashboard counters computed from the loaded set.
pub fn summarize(reviews: &[Review]) -> ReviewStats {
    let count = |status: ReviewStatus| reviews.iter().filter(|r| r.status == status).count() as u32;
    ReviewStats {
        total_reviews: reviews.len() as u32,
        average_rating: average_rating(reviews).unwrap_or(0.0),
        pending_reviews: count(ReviewStatus::Pending),
        approved_reviews: count(ReviewStatus::Approved),
        published_reviews: count(ReviewStatus::Published),
        rejected_reviews: count(ReviewStatus::Rejected),
        flagged_issues: reviews.iter().filter(|r| r.is_flagged()).count() as u32,
        properties_count: property_count(reviews) as u32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct PropertyPerformance {
    pub property_id: String,
    pub property_name: String,
    pub average_rating: Option<f64>,
    pub total_reviews: u32,
    pub reviews_by_channel: BTreeMap<String, u32>,
    pub category_averages: BTreeMap<String, f64>,
    pub recent_trend: Trend,
    pub flagged_issues_count: u32,
    pub selected_for_website_count: u32,
}

/// Compare the older and newer halves of the rated reviews (oldest first).
fn trend_of(chronological: &[&Review]) -> Trend {
    let ratings: Vec<f64> = chronological.iter().filter_map(|r| r.rating).collect();
    if ratings.len() < 2 {
        return Trend::Stable;
    }
    let (older, newer) = ratings.split_at(ratings.len() / 2);
    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let delta = mean(newer) - mean(older);
    if delta > TREND_THRESHOLD {
        Trend::Up
    } else if delta < -TREND_THRESHOLD {
        Trend::Down
    } else {
        Trend::Stable
    }
}

/// Per-property aggregates, ordered by property id. Reviews without a
/// property are skipped.
pub fn property_performance(reviews: &[Review]) -> Vec<PropertyPerformance> {
    let mut by_property: BTreeMap<&str, Vec<&Review>> = BTreeMap::new();
    for review in reviews {
        if let Some(ref id) = review.property_id {
            by_property.entry(id.as_str()).or_default().push(review);
        }
    }

    by_property
        .into_iter()
        .map(|(property_id, mut group)| {
            group.sort_by(|a, b| cmp_submitted(a, b));

            let mut reviews_by_channel: BTreeMap<String, u32> = BTreeMap::new();
            let mut category_totals: BTreeMap<String, (f64, u32)> = BTreeMap::new();
            for review in &group {
                if let Some(channel) = review.channel {
                    *reviews_by_channel.entry(channel.as_str().to_string()).or_default() += 1;
                }
                for category in &review.review_category {
                    let entry = category_totals
                        .entry(category.category.clone())
                        .or_insert((0.0, 0));
                    entry.0 += category.rating;
                    entry.1 += 1;
                }
            }

            PropertyPerformance {
                property_id: property_id.to_string(),
                property_name: group
                    .first()
                    .map(|r| r.listing_name.clone())
                    .unwrap_or_default(),
                average_rating: average_rating(group.iter().copied()),
                total_reviews: group.len() as u32,
                reviews_by_channel,
                category_averages: category_totals
                    .into_iter()
                    .map(|(name, (sum, count))| (name, sum / count as f64))
                    .collect(),
                recent_trend: trend_of(&group),
                flagged_issues_count: group.iter().filter(|r| r.is_flagged()).count() as u32,
                selected_for_website_count: group
                    .iter()
                    .filter(|r| r.is_selected_for_website)
                    .count() as u32,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// `YYYY-MM`.
    pub period: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub flagged_count: u32,
}

/// Monthly rating and counts, oldest month first. Undated reviews are
/// skipped.
pub fn monthly_trend(reviews: &[Review]) -> Vec<TrendPoint> {
    let mut by_month: BTreeMap<String, Vec<&Review>> = BTreeMap::new();
    for review in reviews {
        if let Some(month) = review.month() {
            by_month.entry(month).or_default().push(review);
        }
    }

    by_month
        .into_iter()
        .map(|(period, group)| TrendPoint {
            period,
            rating: average_rating(group.iter().copied()),
            review_count: group.len() as u32,
            flagged_count: group.iter().filter(|r| r.is_flagged()).count() as u32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reviews::mock;

    fn ids(reviews: &[&Review]) -> Vec<i64> {
        reviews.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_public_display() {
        let all = mock::reviews();
        assert_eq!(
            ids(&public_display(&all, &DisplayFilter::default())),
            vec![7457, 7455, 7453]
        );

        let rated = DisplayFilter {
            min_rating: Some(4.5),
            ..Default::default()
        };
        assert_eq!(ids(&public_display(&all, &rated)), vec![7455]);

        let camden_google = DisplayFilter {
            property_id: Some("prop_002".to_string()),
            channel: Some(BookingChannel::Google),
            ..Default::default()
        };
        assert_eq!(ids(&public_display(&all, &camden_google)), vec![7457]);
    }

    #[test]
    fn test_property_page_needs_published_and_selected() {
        let mut all = mock::reviews();
        assert_eq!(ids(&property_page(&all, "prop_001")), vec![7453]);
        assert!(property_page(&all, "prop_003").is_empty());

        all[2].status = ReviewStatus::Published;
        assert_eq!(ids(&property_page(&all, "prop_003")), vec![7455]);
    }

    #[test]
    fn test_similar_limits_to_three() {
        let all = mock::reviews();
        let related = similar(&all, &all[1]);
        assert_eq!(related.len(), 3);
        assert!(related.iter().all(|r| r.id != 7454));

        let mut loner = all[0].clone();
        loner.id = 1;
        loner.property_id = Some("prop_999".to_string());
        loner.review_category.clear();
        assert!(similar(&all, &loner).is_empty());
    }

    #[test]
    fn test_aggregates() {
        let all = mock::reviews();
        assert_eq!(average_rating(&all), Some(3.75));
        assert_eq!(average_rating(&Vec::<Review>::new()), None);
        assert_eq!(property_count(&all), 3);

        let stats = summarize(&all);
        assert_eq!(stats.total_reviews, 5);
        assert_eq!(stats.published_reviews, 2);
        assert_eq!(stats.flagged_issues, 2);
        assert_eq!(stats.properties_count, 3);
    }

    #[test]
    fn test_property_performance() {
        let all = mock::reviews();
        let performance = property_performance(&all);
        assert_eq!(performance.len(), 3);

        let shoreditch = &performance[0];
        assert_eq!(shoreditch.property_id, "prop_001");
        assert_eq!(shoreditch.property_name, "2B N1 A - 29 Shoreditch Heights");
        assert_eq!(shoreditch.total_reviews, 2);
        assert_eq!(shoreditch.average_rating, Some(2.0));
        assert_eq!(shoreditch.reviews_by_channel["airbnb"], 2);
        assert_eq!(shoreditch.category_averages["cleanliness"], 7.0);
        assert_eq!(shoreditch.recent_trend, Trend::Stable);
        assert_eq!(shoreditch.flagged_issues_count, 1);
        assert_eq!(shoreditch.selected_for_website_count, 1);

        let camden = &performance[1];
        assert_eq!(camden.average_rating, Some(4.0));
        assert_eq!(camden.recent_trend, Trend::Stable);
    }

    #[test]
    fn test_trend_direction() {
        let mut all = mock::reviews();
        // prop_002: 7454 (October) then 7457 (November)
        all[4].rating = Some(5.0);
        all[1].rating = Some(3.0);
        let camden = property_performance(&all).remove(1);
        assert_eq!(camden.recent_trend, Trend::Up);

        all[4].rating = Some(2.0);
        let camden = property_performance(&all).remove(1);
        assert_eq!(camden.recent_trend, Trend::Down);
    }

    #[test]
    fn test_monthly_trend() {
        let all = mock::reviews();
        let trend = monthly_trend(&all);
        let periods: Vec<&str> = trend.iter().map(|t| t.period.as_str()).collect();
        assert_eq!(periods, vec!["2024-08", "2024-09", "2024-10", "2024-11"]);

        let october = &trend[2];
        assert_eq!(october.review_count, 2);
        assert_eq!(october.rating, Some(4.5));
        assert_eq!(october.flagged_count, 1);
        assert_eq!(trend[0].rating, None);
    }
}
