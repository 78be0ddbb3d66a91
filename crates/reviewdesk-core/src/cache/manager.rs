use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    Channel, FormDropdowns, GoogleReview, Property, Review, ReviewPage, ReviewQuery, ReviewStats,
};

/// Cached copies older than this are still served when degrading, but
/// reported as stale.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// Short human age such as `"just now"`, `"15m ago"`, `"2h ago"`.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

/// Last-known-good copies of API responses, one JSON file per endpoint.
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;

        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;

        debug!(name, age = %cached.age_display(), "Loaded cached copy");
        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        Ok(())
    }

    /// Remove every cached response (used on sign out).
    pub fn clear(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        Ok(())
    }

    fn page_name(query: &ReviewQuery) -> String {
        format!(
            "reviews_p{}_l{}_{}",
            query.page,
            query.limit,
            query.status.map(|s| s.as_str()).unwrap_or("all")
        )
    }

    /// Place ids come from outside; keep only filename-safe characters.
    fn google_name(place_id: &str) -> String {
        let safe: String = place_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("google_{}", safe)
    }

    // ===== Review pages =====

    pub fn load_review_page(&self, query: &ReviewQuery) -> Result<Option<CachedData<ReviewPage>>> {
        self.load(&Self::page_name(query))
    }

    pub fn save_review_page(&self, query: &ReviewQuery, page: &ReviewPage) -> Result<()> {
        self.save(&Self::page_name(query), page)
    }

    // ===== Single reviews =====

    pub fn load_review(&self, id: i64) -> Result<Option<CachedData<Review>>> {
        self.load(&format!("review_{}", id))
    }

    pub fn save_review(&self, review: &Review) -> Result<()> {
        self.save(&format!("review_{}", review.id), review)
    }

    // ===== Stats =====

    pub fn load_stats(&self) -> Result<Option<CachedData<ReviewStats>>> {
        self.load("stats")
    }

    pub fn save_stats(&self, stats: &ReviewStats) -> Result<()> {
        self.save("stats", stats)
    }

    // ===== Catalog =====

    pub fn load_dropdowns(&self) -> Result<Option<CachedData<FormDropdowns>>> {
        self.load("dropdowns")
    }

    pub fn save_dropdowns(&self, dropdowns: &FormDropdowns) -> Result<()> {
        self.save("dropdowns", dropdowns)
    }

    pub fn load_channels(&self) -> Result<Option<CachedData<Vec<Channel>>>> {
        self.load("channels")
    }

    pub fn save_channels(&self, channels: &[Channel]) -> Result<()> {
        self.save("channels", &channels)
    }

    pub fn load_properties(&self) -> Result<Option<CachedData<Vec<Property>>>> {
        self.load("properties")
    }

    pub fn save_properties(&self, properties: &[Property]) -> Result<()> {
        self.save("properties", &properties)
    }

    // ===== Google reviews =====

    pub fn load_google_reviews(&self, place_id: &str) -> Result<Option<CachedData<Vec<GoogleReview>>>> {
        self.load(&Self::google_name(place_id))
    }

    pub fn save_google_reviews(&self, place_id: &str, reviews: &[GoogleReview]) -> Result<()> {
        self.save(&Self::google_name(place_id), &reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewStatus;
    use crate::reviews::mock;

    #[test]
    fn test_age_display() {
        let mut cached = CachedData::new(());
        assert_eq!(cached.age_display(), "just now");
        assert!(!cached.is_stale());

        cached.cached_at = Utc::now() - chrono::Duration::minutes(90);
        assert_eq!(cached.age_display(), "1h ago");
        assert!(cached.is_stale());

        cached.cached_at = Utc::now() - chrono::Duration::days(3);
        assert_eq!(cached.age_display(), "3d ago");
    }

    #[test]
    fn test_review_pages_are_keyed_by_query() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().join("cache")).unwrap();
        let query = ReviewQuery::default();
        let pending = ReviewQuery {
            status: Some(ReviewStatus::Pending),
            ..ReviewQuery::default()
        };

        assert!(cache.load_review_page(&query).unwrap().is_none());
        cache.save_review_page(&query, &mock::review_page(&query)).unwrap();

        let loaded = cache.load_review_page(&query).unwrap().unwrap();
        assert_eq!(loaded.data.reviews.len(), 5);
        assert!(cache.load_review_page(&pending).unwrap().is_none());
    }

    #[test]
    fn test_google_reviews_are_keyed_by_safe_place_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache
            .save_google_reviews("../ChIJ/x", &mock::google_reviews("x"))
            .unwrap();

        assert!(dir.path().join("google____ChIJ_x.json").exists());
        let loaded = cache.load_google_reviews("../ChIJ/x").unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert!(cache.load_google_reviews("other").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_an_error_and_clear_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        std::fs::write(dir.path().join("stats.json"), "{not json").unwrap();
        assert!(cache.load_stats().is_err());

        cache.save_channels(&mock::channels()).unwrap();
        cache.clear().unwrap();
        assert!(cache.load_stats().unwrap().is_none());
        assert!(cache.load_channels().unwrap().is_none());
    }
}
