//! Flight data: the live feed client and its area-keyed cache.

pub mod aeroapi;
pub mod cache;

use async_trait::async_trait;

use crate::api::{AircraftState, BoundingBox};
use crate::error::EngineResult;

pub use aeroapi::AeroApiClient;
pub use cache::{CacheStats, FlightCache};

/// Source of live aircraft states for a geographic area.
///
/// One implementation talks to the real feed; tests substitute a canned
/// source. The orchestrator only ever issues one fetch per scan.
#[async_trait]
pub trait FlightDataSource: Send + Sync {
    /// All aircraft currently reported inside `bbox`.
    ///
    /// # Errors
    /// Returns `EngineError::FlightFeed` when the upstream feed is
    /// unreachable, rejects the request, or returns an unparseable body.
    async fn flights_in_area(&self, bbox: &BoundingBox) -> EngineResult<Vec<AircraftState>>;
}
