use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;
use tracing::debug;

use super::geo::Coordinates;
use super::{PlaceCandidate, PlaceSearch};
use crate::error::IntegrationError;

/// Entries kept per upstream call before the least recently used one is evicted.
pub const UPSTREAM_CACHE_CAPACITY: usize = 100;

type SearchKey = (String, Option<(u64, u64)>);

/// Memoizes successful text searches and geocodes of the wrapped provider.
///
/// Failures are never cached, so a transient upstream error is retried on the
/// next request.
pub struct CachedPlaces<P> {
    inner: P,
    searches: Mutex<LruCache<SearchKey, Vec<PlaceCandidate>>>,
    geocodes: Mutex<LruCache<String, Option<Coordinates>>>,
}

impl<P> CachedPlaces<P> {
    pub fn new(inner: P) -> Self {
        Self::with_capacity(inner, UPSTREAM_CACHE_CAPACITY)
    }

    /// A zero capacity is raised to one.
    pub fn with_capacity(inner: P, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            searches: Mutex::new(LruCache::new(capacity)),
            geocodes: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

fn search_key(text: &str, bias: Option<Coordinates>) -> SearchKey {
    (
        text.to_string(),
        bias.map(|point| (point.lat.to_bits(), point.lng.to_bits())),
    )
}

fn cached<K: Hash + Eq, V: Clone>(cache: &Mutex<LruCache<K, V>>, key: &K) -> Option<V> {
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned()
}

fn remember<K: Hash + Eq, V>(cache: &Mutex<LruCache<K, V>>, key: K, value: V) {
    cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .put(key, value);
}

impl<P: PlaceSearch> PlaceSearch for CachedPlaces<P> {
    async fn search_text(
        &self,
        text: &str,
        bias: Option<Coordinates>,
    ) -> Result<Vec<PlaceCandidate>, IntegrationError> {
        let key = search_key(text, bias);
        if let Some(candidates) = cached(&self.searches, &key) {
            debug!(query = %text, "place search served from cache");
            return Ok(candidates);
        }

        let candidates = self.inner.search_text(text, bias).await?;
        remember(&self.searches, key, candidates.clone());
        Ok(candidates)
    }

    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, IntegrationError> {
        let key = address.to_string();
        if let Some(coordinates) = cached(&self.geocodes, &key) {
            debug!(address, "geocode served from cache");
            return Ok(coordinates);
        }

        let coordinates = self.inner.geocode(address).await?;
        remember(&self.geocodes, key, coordinates);
        Ok(coordinates)
    }
}
