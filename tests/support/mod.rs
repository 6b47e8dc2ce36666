//! Shared test doubles and fixtures for the integration tests.

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use skytransit::api::{
    AircraftState, BoundingBox, CelestialBody, HorizontalCoordinates, ObserverPosition,
};
use skytransit::ephemeris::EphemerisProvider;
use skytransit::error::{EngineError, EngineResult};
use skytransit::flights::FlightDataSource;

/// Ephemeris double with one fixed position per body.
pub struct FixedEphemeris {
    pub sun: HorizontalCoordinates,
    pub moon: HorizontalCoordinates,
}

impl EphemerisProvider for FixedEphemeris {
    fn horizontal_position(
        &self,
        body: CelestialBody,
        _observer: &ObserverPosition,
        _instant: DateTime<Utc>,
    ) -> EngineResult<HorizontalCoordinates> {
        Ok(match body {
            CelestialBody::Sun => self.sun,
            CelestialBody::Moon => self.moon,
        })
    }
}

/// Flight source double returning a canned list and counting requests.
pub struct StaticFlights {
    flights: Vec<AircraftState>,
    fetches: AtomicU32,
    fail: bool,
}

impl StaticFlights {
    pub fn new(flights: Vec<AircraftState>) -> Self {
        Self {
            flights,
            fetches: AtomicU32::new(0),
            fail: false,
        }
    }

    /// A source whose every request fails, for error-path tests.
    pub fn failing() -> Self {
        Self {
            flights: Vec::new(),
            fetches: AtomicU32::new(0),
            fail: true,
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FlightDataSource for StaticFlights {
    async fn flights_in_area(&self, _bbox: &BoundingBox) -> EngineResult<Vec<AircraftState>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::FlightFeed("feed unavailable".to_string()));
        }
        Ok(self.flights.clone())
    }
}

pub fn observer() -> ObserverPosition {
    ObserverPosition::new(22.0, -102.0, 1800.0).unwrap()
}

pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 17, 18, 0, 0).unwrap()
}

pub fn search_area() -> BoundingBox {
    BoundingBox::new(20.0, -104.0, 24.0, -100.0).unwrap()
}

pub fn cruising_flight(id: &str, lat: f64, lon: f64, speed_kmh: f64, heading_deg: f64) -> AircraftState {
    AircraftState {
        id: id.to_string(),
        origin: "Mexico City".to_string(),
        destination: "Tijuana".to_string(),
        latitude: lat,
        longitude: lon,
        elevation_m: 11_000.0,
        speed_kmh,
        heading_deg,
        climb: None,
        aircraft_type: Some("B738".to_string()),
    }
}
