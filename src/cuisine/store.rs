use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::data_loader::load_cuisine_catalog;
use crate::meal_model::CulturalCuisineData;

/// The cultural-cache-fetch collaborator of the ranking pipeline. The
/// pipeline only ever reads through this seam; population and invalidation
/// belong to the implementation behind it.
#[async_trait]
pub trait CuisineSource: Send + Sync {
    /// Cached cuisine data for the requested cultures, keyed by the
    /// requested culture name. Cultures with no available data are simply
    /// absent from the map; that is not an error.
    async fn cultural_cuisine(
        &self,
        user_id: &str,
        cultures: &[String],
    ) -> Result<HashMap<String, CulturalCuisineData>>;
}

struct CacheEntry {
    data: CulturalCuisineData,
    fetched_at: Instant,
    access_count: u64,
}

/// Catalog-backed production implementation of `CuisineSource`.
///
/// Entries are cached per (user, culture) with a TTL; the cache is
/// consulted before the backing catalog, and an expired entry is refetched
/// and its access count restarted. Access counts exist for cache telemetry
/// and tests; the ranking pipeline itself never looks at them.
pub struct CuisineStore {
    /// Lowercased culture name -> catalog data.
    catalog: HashMap<String, CulturalCuisineData>,
    cache: Mutex<HashMap<(String, String), CacheEntry>>,
    ttl: Duration,
}

impl CuisineStore {
    pub fn from_catalog(catalog_data: Vec<CulturalCuisineData>, ttl: Duration) -> Self {
        let catalog = catalog_data
            .into_iter()
            .map(|data| (data.culture.to_lowercase(), data))
            .collect();
        CuisineStore {
            catalog,
            cache: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn from_csv_path(csv_path: &Path, ttl: Duration) -> Result<Self> {
        let catalog = load_cuisine_catalog(csv_path)?;
        Ok(Self::from_catalog(catalog, ttl))
    }

    pub fn culture_count(&self) -> usize {
        self.catalog.len()
    }

    /// How many times a (user, culture) pair has been served from cache
    /// since its entry was last (re)fetched.
    pub fn access_count(&self, user_id: &str, culture: &str) -> u64 {
        let cache = self.lock_cache();
        cache
            .get(&(user_id.to_string(), culture.to_lowercase()))
            .map(|entry| entry.access_count)
            .unwrap_or(0)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), CacheEntry>> {
        // Entries are replaced wholesale, so a poisoned lock still holds
        // coherent data.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CuisineSource for CuisineStore {
    async fn cultural_cuisine(
        &self,
        user_id: &str,
        cultures: &[String],
    ) -> Result<HashMap<String, CulturalCuisineData>> {
        let mut result = HashMap::new();
        let mut cache = self.lock_cache();

        for culture in cultures {
            let key = (user_id.to_string(), culture.to_lowercase());

            let fresh = cache
                .get(&key)
                .map(|entry| entry.fetched_at.elapsed() < self.ttl)
                .unwrap_or(false);

            if fresh {
                if let Some(entry) = cache.get_mut(&key) {
                    entry.access_count += 1;
                    result.insert(culture.clone(), entry.data.clone());
                }
                continue;
            }

            // Cache miss or expired entry: fetch from the backing catalog.
            if let Some(data) = self.catalog.get(&key.1) {
                cache.insert(
                    key,
                    CacheEntry {
                        data: data.clone(),
                        fetched_at: Instant::now(),
                        access_count: 1,
                    },
                );
                result.insert(culture.clone(), data.clone());
            }
        }

        Ok(result)
    }
}
