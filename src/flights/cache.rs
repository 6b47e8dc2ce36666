//! Area-keyed cache for flight feed responses.
//!
//! The feed is the only paid, rate-limited dependency of the engine, so
//! repeated scans of the same area within the TTL reuse the previous
//! response. Keys are the bounding-box corners alone; the observer, the
//! selected targets, and the thresholds do not affect what the feed
//! returns for an area and are deliberately left out of the key.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::api::{AircraftState, BoundingBox};

const DEFAULT_TTL: Duration = Duration::from_secs(600);
const DEFAULT_MAX_ENTRIES: usize = 100;

struct CacheEntry {
    flights: Vec<AircraftState>,
    inserted_at: Instant,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Cache usage snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
    /// Hits over total lookups, 0.0 when nothing was looked up yet.
    pub hit_rate: f64,
}

/// TTL cache of flight lists, keyed by search area.
///
/// A single mutex guards the map and the counters; every operation is a
/// short critical section, so contention is not a concern at the engine's
/// polling cadence.
pub struct FlightCache {
    inner: Mutex<(HashMap<String, CacheEntry>, Counters)>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for FlightCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

impl FlightCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            inner: Mutex::new((HashMap::new(), Counters::default())),
            ttl,
            max_entries,
        }
    }

    /// Key with corners at 4 decimal places (~11 m), so float noise from
    /// repeated requests of the same area still hits.
    fn key(bbox: &BoundingBox) -> String {
        format!(
            "{:.4},{:.4},{:.4},{:.4}",
            bbox.lat_lower_left, bbox.lon_lower_left, bbox.lat_upper_right, bbox.lon_upper_right
        )
    }

    /// Look up a fresh entry for `bbox`, counting a hit or a miss.
    ///
    /// An expired entry is dropped on the spot and counts as a miss.
    pub fn get(&self, bbox: &BoundingBox) -> Option<Vec<AircraftState>> {
        let key = Self::key(bbox);
        let mut guard = self.inner.lock();
        let (map, counters) = &mut *guard;

        match map.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                counters.hits += 1;
                debug!(area = %key, flights = entry.flights.len(), "flight cache hit");
                Some(entry.flights.clone())
            }
            Some(_) => {
                map.remove(&key);
                counters.misses += 1;
                counters.evictions += 1;
                debug!(area = %key, "flight cache entry expired");
                None
            }
            None => {
                counters.misses += 1;
                None
            }
        }
    }

    /// Store the feed response for `bbox`, replacing any previous entry.
    pub fn insert(&self, bbox: &BoundingBox, flights: Vec<AircraftState>) {
        let key = Self::key(bbox);
        let mut guard = self.inner.lock();
        let (map, counters) = &mut *guard;

        if map.len() >= self.max_entries && !map.contains_key(&key) {
            let expired: Vec<String> = map
                .iter()
                .filter(|(_, e)| e.inserted_at.elapsed() >= self.ttl)
                .map(|(k, _)| k.clone())
                .collect();
            counters.evictions += expired.len() as u64;
            for k in expired {
                map.remove(&k);
            }

            // Still at capacity after the sweep: drop the oldest entry
            if map.len() >= self.max_entries {
                if let Some(oldest) = map
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| k.clone())
                {
                    map.remove(&oldest);
                    counters.evictions += 1;
                }
            }
        }

        map.insert(
            key,
            CacheEntry {
                flights,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn stats(&self) -> CacheStats {
        let guard = self.inner.lock();
        let (map, counters) = &*guard;
        let total = counters.hits + counters.misses;
        CacheStats {
            hits: counters.hits,
            misses: counters.misses,
            evictions: counters.evictions,
            entries: map.len(),
            hit_rate: if total == 0 {
                0.0
            } else {
                counters.hits as f64 / total as f64
            },
        }
    }

    /// Drop all entries. Counters are preserved.
    pub fn clear(&self) {
        self.inner.lock().0.clear();
    }
}
