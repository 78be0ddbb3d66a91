//! Typed client for the review endpoints.
//!
//! Every call goes through the [`RequestAuthenticator`]. What happens on
//! failure depends on the [`DataPolicy`]: strict callers get the error,
//! degrading callers get the last cached copy or the built-in mock data.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::mock;
use crate::api::{ApiError, ApiRequest, RequestAuthenticator};
use crate::cache::{CacheManager, CachedData};
use crate::config::DataPolicy;
use crate::models::{
    ApiEnvelope, Channel, FormDropdowns, GoogleReview, Property, Review, ReviewPage, ReviewQuery,
    ReviewStats, ReviewStatus, StatusEnvelope,
};

/// Maximum review pages fetched at once when loading everything.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Page size used when loading the full review set.
const FULL_LOAD_PAGE_SIZE: u32 = 100;

/// Moderation actions exposed as `PATCH /reviews/{id}/{action}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Publish,
    Reject,
}

impl ReviewAction {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Publish => "publish",
            ReviewAction::Reject => "reject",
        }
    }

    pub fn resulting_status(&self) -> ReviewStatus {
        match self {
            ReviewAction::Approve => ReviewStatus::Approved,
            ReviewAction::Publish => ReviewStatus::Published,
            ReviewAction::Reject => ReviewStatus::Rejected,
        }
    }
}

/// Everything the manager dashboard shows on first paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub reviews: Vec<Review>,
    pub stats: ReviewStats,
    pub dropdowns: FormDropdowns,
}

pub struct ReviewService {
    api: Arc<RequestAuthenticator>,
    policy: DataPolicy,
    cache: Option<CacheManager>,
    /// Mock set served while degraded; status changes apply here.
    fallback: Mutex<Vec<Review>>,
}

impl ReviewService {
    pub fn new(api: Arc<RequestAuthenticator>, policy: DataPolicy) -> Self {
        Self {
            api,
            policy,
            cache: None,
            fallback: Mutex::new(mock::reviews()),
        }
    }

    /// Keep last-known-good copies of successful responses.
    pub fn with_cache(mut self, cache: CacheManager) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn policy(&self) -> DataPolicy {
        self.policy
    }

    /// Drop cached responses and undo degraded-mode edits.
    pub fn forget(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.clear() {
                warn!(error = %e, "Failed to clear response cache");
            }
        }
        *self.fallback() = mock::reviews();
    }

    fn fallback(&self) -> MutexGuard<'_, Vec<Review>> {
        self.fallback.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn fetch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.api.ensure_fresh().await?;
        self.api
            .send_json::<ApiEnvelope<T>>(request)
            .await?
            .into_data()
    }

    async fn fetch_status<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.api.ensure_fresh().await?;
        self.api
            .send_json::<StatusEnvelope<T>>(request)
            .await?
            .into_data()
    }

    fn remember<F>(&self, what: &str, save: F)
    where
        F: FnOnce(&CacheManager) -> anyhow::Result<()>,
    {
        if let Some(cache) = &self.cache {
            if let Err(e) = save(cache) {
                warn!(endpoint = what, error = %e, "Failed to cache response");
            }
        }
    }

    /// Apply the data policy to a failed fetch.
    fn degrade<T, C, M>(&self, what: &str, err: ApiError, cached: C, mock: M) -> Result<T, ApiError>
    where
        C: FnOnce(&CacheManager) -> anyhow::Result<Option<CachedData<T>>>,
        M: FnOnce() -> T,
    {
        if self.policy == DataPolicy::Strict {
            return Err(err);
        }
        if let Some(cache) = &self.cache {
            match cached(cache) {
                Ok(Some(copy)) => {
                    warn!(endpoint = what, error = %err, age = %copy.age_display(), "Backend unavailable, serving cached copy");
                    return Ok(copy.data);
                }
                Ok(None) => {}
                Err(e) => debug!(endpoint = what, error = %e, "Ignoring unreadable cache"),
            }
        }
        warn!(endpoint = what, error = %err, "Backend unavailable, serving mock data");
        Ok(mock())
    }

    // ===== Reviews =====

    pub async fn list_reviews(&self, query: &ReviewQuery) -> Result<ReviewPage, ApiError> {
        let mut request = ApiRequest::get("/reviews")
            .query("page", query.page)
            .query("limit", query.limit);
        if let Some(status) = query.status {
            request = request.query("status", status.as_str());
        }

        match self.fetch::<ReviewPage>(request).await {
            Ok(page) => {
                debug!(count = page.reviews.len(), total = page.pagination.total, "Reviews fetched");
                self.remember("reviews", |c| c.save_review_page(query, &page));
                Ok(page)
            }
            Err(e) => self.degrade(
                "reviews",
                e,
                |c| c.load_review_page(query),
                || mock::page_of(&self.fallback(), query),
            ),
        }
    }

    /// Every review matching `status`, fetching the remaining pages
    /// concurrently once the first page reports the total.
    pub async fn all_reviews(&self, status: Option<ReviewStatus>) -> Result<Vec<Review>, ApiError> {
        let first_query = ReviewQuery {
            page: 1,
            limit: FULL_LOAD_PAGE_SIZE,
            status,
        };
        let first = self.list_reviews(&first_query).await?;
        let total_pages = first.pagination.total_pages;
        let mut reviews = first.reviews;

        if total_pages > 1 {
            let rest: Vec<ReviewPage> = stream::iter(2..=total_pages)
                .map(|page| {
                    let query = ReviewQuery { page, ..first_query };
                    async move { self.list_reviews(&query).await }
                })
                .buffered(MAX_CONCURRENT_REQUESTS)
                .try_collect()
                .await?;
            reviews.extend(rest.into_iter().flat_map(|page| page.reviews));
        }
        Ok(reviews)
    }

    /// One review. A 404 from the server is final; other failures fall back
    /// to the cache and the mock set when degrading.
    pub async fn get_review(&self, id: i64) -> Result<Review, ApiError> {
        match self.fetch::<Review>(ApiRequest::get(format!("/reviews/{}", id))).await {
            Ok(review) => {
                self.remember("review", |c| c.save_review(&review));
                Ok(review)
            }
            Err(e @ ApiError::NotFound(_)) => Err(e),
            Err(e) if self.policy == DataPolicy::Strict => Err(e),
            Err(e) => {
                if let Some(cache) = &self.cache {
                    if let Ok(Some(copy)) = cache.load_review(id) {
                        warn!(id, error = %e, "Backend unavailable, serving cached review");
                        return Ok(copy.data);
                    }
                }
                let found = self.fallback().iter().find(|r| r.id == id).cloned();
                match found {
                    Some(review) => {
                        warn!(id, error = %e, "Backend unavailable, serving mock review");
                        Ok(review)
                    }
                    None => Err(ApiError::NotFound(format!("review {}", id))),
                }
            }
        }
    }

    pub async fn update_status(&self, id: i64, action: ReviewAction) -> Result<Review, ApiError> {
        let request = ApiRequest::patch(format!("/reviews/{}/{}", id, action.path_segment()));
        match self.fetch::<Review>(request).await {
            Ok(review) => {
                info!(id, status = %review.status, "Review status updated");
                self.remember("review", |c| c.save_review(&review));
                Ok(review)
            }
            Err(e) if self.policy == DataPolicy::Strict => Err(e),
            Err(e) => {
                let mut fallback = self.fallback();
                match fallback.iter_mut().find(|r| r.id == id) {
                    Some(review) => {
                        warn!(id, error = %e, "Backend unavailable, updating mock review");
                        review.status = action.resulting_status();
                        Ok(review.clone())
                    }
                    None => Err(ApiError::NotFound(format!("review {}", id))),
                }
            }
        }
    }

    pub async fn approve(&self, id: i64) -> Result<Review, ApiError> {
        self.update_status(id, ReviewAction::Approve).await
    }

    pub async fn publish(&self, id: i64) -> Result<Review, ApiError> {
        self.update_status(id, ReviewAction::Publish).await
    }

    pub async fn reject(&self, id: i64) -> Result<Review, ApiError> {
        self.update_status(id, ReviewAction::Reject).await
    }

    // ===== Stats and catalog =====

    pub async fn stats(&self) -> Result<ReviewStats, ApiError> {
        match self.fetch::<ReviewStats>(ApiRequest::get("/reviews/stats")).await {
            Ok(stats) => {
                self.remember("stats", |c| c.save_stats(&stats));
                Ok(stats)
            }
            Err(e) => self.degrade("stats", e, |c| c.load_stats(), mock::stats),
        }
    }

    pub async fn dropdowns(&self) -> Result<FormDropdowns, ApiError> {
        match self.fetch::<FormDropdowns>(ApiRequest::get("/form/dropdowns")).await {
            Ok(dropdowns) => {
                self.remember("dropdowns", |c| c.save_dropdowns(&dropdowns));
                Ok(dropdowns)
            }
            Err(e) => self.degrade("dropdowns", e, |c| c.load_dropdowns(), mock::dropdowns),
        }
    }

    pub async fn channels(&self) -> Result<Vec<Channel>, ApiError> {
        match self.fetch_status::<Vec<Channel>>(ApiRequest::get("/channels")).await {
            Ok(channels) => {
                self.remember("channels", |c| c.save_channels(&channels));
                Ok(channels)
            }
            Err(e) => self.degrade("channels", e, |c| c.load_channels(), mock::channels),
        }
    }

    pub async fn properties(&self) -> Result<Vec<Property>, ApiError> {
        match self.fetch_status::<Vec<Property>>(ApiRequest::get("/properties")).await {
            Ok(properties) => {
                self.remember("properties", |c| c.save_properties(&properties));
                Ok(properties)
            }
            Err(e) => self.degrade("properties", e, |c| c.load_properties(), mock::properties),
        }
    }

    /// Google Places reviews for a property's listing, shown beside the
    /// guest reviews on the public pages.
    pub async fn google_reviews(&self, place_id: &str) -> Result<Vec<GoogleReview>, ApiError> {
        let request = ApiRequest::get("/reviews/google").query("placeId", place_id);
        match self.fetch::<Vec<GoogleReview>>(request).await {
            Ok(reviews) => {
                debug!(place_id, count = reviews.len(), "Google reviews fetched");
                self.remember("google_reviews", |c| c.save_google_reviews(place_id, &reviews));
                Ok(reviews)
            }
            Err(e) => self.degrade(
                "google_reviews",
                e,
                |c| c.load_google_reviews(place_id),
                || mock::google_reviews(place_id),
            ),
        }
    }

    /// Load reviews, stats and dropdowns concurrently.
    pub async fn dashboard(&self) -> Result<Dashboard, ApiError> {
        let (reviews, stats, dropdowns) =
            futures::join!(self.all_reviews(None), self.stats(), self.dropdowns());
        Ok(Dashboard {
            reviews: reviews?,
            stats: stats?,
            dropdowns: dropdowns?,
        })
    }
}
