//! LRU cache for rendered PDF pages

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::types::RenderedPage;

/// Cache key for rendered pages
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Document generation the page belongs to
    pub generation: u64,
    /// Page number (0-indexed)
    pub page: usize,
    /// Scale factor (stored as thousandths for stable hashing)
    pub scale_millis: u32,
}

impl CacheKey {
    #[must_use]
    pub fn new(generation: u64, page: usize, scale: f32) -> Self {
        Self {
            generation,
            page,
            scale_millis: (scale * 1000.0).round() as u32,
        }
    }
}

/// LRU cache for rendered page data
pub struct PageCache {
    cache: LruCache<CacheKey, Arc<RenderedPage>>,
}

impl PageCache {
    /// Create a new cache with the given capacity
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Get a cached page, promoting it in the LRU order
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedPage>> {
        self.cache.get(key).cloned()
    }

    /// Check if a key is in the cache without promoting it
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.cache.contains(key)
    }

    pub fn insert(&mut self, key: CacheKey, data: Arc<RenderedPage>) {
        self.cache.put(key, data);
    }

    /// Clear all cached pages
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use image::RgbImage;

    use super::*;

    fn page(page: usize) -> Arc<RenderedPage> {
        Arc::new(RenderedPage {
            page,
            scale: 1.0,
            image: RgbImage::new(4, 4),
        })
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = PageCache::new(10);
        let key = CacheKey::new(1, 0, 1.0);

        cache.insert(key.clone(), page(0));

        assert!(cache.contains(&key));
        assert!(cache.get(&key).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_lru_eviction() {
        let mut cache = PageCache::new(2);

        for i in 0..3 {
            cache.insert(CacheKey::new(1, i, 1.0), page(i));
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&CacheKey::new(1, 0, 1.0)));
        assert!(cache.contains(&CacheKey::new(1, 1, 1.0)));
        assert!(cache.contains(&CacheKey::new(1, 2, 1.0)));
    }

    #[test]
    fn keys_distinguish_scale_and_generation() {
        let mut cache = PageCache::new(10);
        cache.insert(CacheKey::new(1, 0, 1.0), page(0));

        assert!(!cache.contains(&CacheKey::new(1, 0, 1.25)));
        assert!(!cache.contains(&CacheKey::new(2, 0, 1.0)));
    }

    #[test]
    fn cache_invalidate_all() {
        let mut cache = PageCache::new(10);
        for i in 0..5 {
            cache.insert(CacheKey::new(1, i, 1.0), page(i));
        }

        cache.invalidate_all();
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_capacity_holds_one_page() {
        let mut cache = PageCache::new(0);
        cache.insert(CacheKey::new(1, 0, 1.0), page(0));
        cache.insert(CacheKey::new(1, 1, 1.0), page(1));
        assert_eq!(cache.len(), 1);
    }
}
