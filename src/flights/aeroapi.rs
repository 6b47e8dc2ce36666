//! FlightAware AeroAPI client.
//!
//! Issues a single `/flights/search` query for a bounding box and maps
//! the wire payload into `AircraftState`, converting the feed's aviation
//! units (knots, hundreds of feet) into the metric units the rest of the
//! engine works in.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{AircraftState, BoundingBox, ClimbState};
use crate::config::FlightFeedSettings;
use crate::error::{EngineError, EngineResult};
use crate::flights::FlightDataSource;

const KNOTS_TO_KMH: f64 = 1.852;
const HUNDREDS_OF_FEET_TO_M: f64 = 30.48;

/// HTTP client for the AeroAPI flight search endpoint.
pub struct AeroApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl AeroApiClient {
    /// Build a client with the feed key baked into the default headers.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` when the key is not a valid
    /// header value, `EngineError::FlightFeed` when the HTTP client
    /// cannot be constructed.
    pub fn new(settings: &FlightFeedSettings, api_key: &str) -> EngineResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json; charset=UTF-8"));
        let mut key_value = HeaderValue::from_str(api_key).map_err(|_| {
            EngineError::Configuration("flight feed API key is not a valid header value".to_string())
        })?;
        key_value.set_sensitive(true);
        headers.insert("x-apikey", key_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(EngineError::from)?;

        Ok(Self {
            http,
            base_url: settings.base_url.clone(),
        })
    }
}

#[async_trait]
impl FlightDataSource for AeroApiClient {
    async fn flights_in_area(&self, bbox: &BoundingBox) -> EngineResult<Vec<AircraftState>> {
        let query = format!(
            "-latlong \"{} {} {} {}\"",
            bbox.lat_lower_left, bbox.lon_lower_left, bbox.lat_upper_right, bbox.lon_upper_right
        );

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("query", query.as_str()), ("max_pages", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EngineError::FlightFeed(format!(
                "flight feed returned {}",
                status
            )));
        }

        let payload: SearchResponse = response.json().await?;
        let total = payload.flights.len();
        let states: Vec<AircraftState> = payload
            .flights
            .into_iter()
            .filter_map(WireFlight::into_state)
            .collect();
        if states.len() < total {
            warn!(
                dropped = total - states.len(),
                "flights without a position report were skipped"
            );
        }
        debug!(flights = states.len(), "flight feed query complete");
        Ok(states)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    flights: Vec<WireFlight>,
}

#[derive(Debug, Deserialize)]
struct WireFlight {
    ident: Option<String>,
    fa_flight_id: Option<String>,
    aircraft_type: Option<String>,
    origin: Option<WireAirport>,
    destination: Option<WireAirport>,
    last_position: Option<WirePosition>,
}

#[derive(Debug, Deserialize)]
struct WireAirport {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePosition {
    latitude: f64,
    longitude: f64,
    /// Degrees clockwise from north
    heading: Option<f64>,
    /// Knots over the ground
    groundspeed: Option<f64>,
    /// Hundreds of feet
    altitude: Option<f64>,
    /// "C" climbing, "D" descending, "-" level
    altitude_change: Option<String>,
}

impl WireFlight {
    /// Map the wire payload to an engine state; flights with no position
    /// report cannot be projected and are dropped.
    fn into_state(self) -> Option<AircraftState> {
        let position = self.last_position?;
        let id = self
            .ident
            .or(self.fa_flight_id)
            .unwrap_or_else(|| "unknown".to_string());
        let city = |airport: Option<WireAirport>| {
            airport
                .and_then(|a| a.city)
                .unwrap_or_else(|| "Unknown".to_string())
        };

        Some(AircraftState {
            id,
            origin: city(self.origin),
            destination: city(self.destination),
            latitude: position.latitude,
            longitude: position.longitude,
            elevation_m: position.altitude.unwrap_or(0.0) * HUNDREDS_OF_FEET_TO_M,
            speed_kmh: position.groundspeed.unwrap_or(0.0) * KNOTS_TO_KMH,
            heading_deg: position.heading.unwrap_or(0.0),
            climb: position
                .altitude_change
                .as_deref()
                .and_then(ClimbState::from_code),
            aircraft_type: self.aircraft_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_flight_unit_conversions() {
        let json = r#"{
            "ident": "AMX123",
            "fa_flight_id": "AMX123-1729180800-schedule-0001",
            "aircraft_type": "B738",
            "origin": {"city": "Mexico City"},
            "destination": {"city": "Tijuana"},
            "last_position": {
                "latitude": 22.15,
                "longitude": -102.29,
                "heading": 315,
                "groundspeed": 470,
                "altitude": 360,
                "altitude_change": "-"
            }
        }"#;
        let wire: WireFlight = serde_json::from_str(json).unwrap();
        let state = wire.into_state().unwrap();

        assert_eq!(state.id, "AMX123");
        assert_eq!(state.origin, "Mexico City");
        assert_eq!(state.destination, "Tijuana");
        // 470 kt = 870.44 km/h
        assert!((state.speed_kmh - 870.44).abs() < 0.01);
        // FL360 = 36000 ft = 10972.8 m
        assert!((state.elevation_m - 10_972.8).abs() < 0.01);
        assert_eq!(state.climb, Some(ClimbState::Level));
        assert_eq!(state.aircraft_type.as_deref(), Some("B738"));
    }

    #[test]
    fn test_flight_without_position_is_dropped() {
        let json = r#"{"ident": "AMX123"}"#;
        let wire: WireFlight = serde_json::from_str(json).unwrap();
        assert!(wire.into_state().is_none());
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let json = r#"{
            "last_position": {"latitude": 22.0, "longitude": -102.0}
        }"#;
        let wire: WireFlight = serde_json::from_str(json).unwrap();
        let state = wire.into_state().unwrap();

        assert_eq!(state.id, "unknown");
        assert_eq!(state.origin, "Unknown");
        assert_eq!(state.destination, "Unknown");
        assert_eq!(state.speed_kmh, 0.0);
        assert_eq!(state.elevation_m, 0.0);
        assert_eq!(state.heading_deg, 0.0);
        assert!(state.climb.is_none());
    }

    #[test]
    fn test_empty_search_response() {
        let payload: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(payload.flights.is_empty());
    }

    #[test]
    fn test_climb_codes() {
        for (code, expected) in [
            ("C", Some(ClimbState::Climbing)),
            ("D", Some(ClimbState::Descending)),
            ("-", Some(ClimbState::Level)),
            ("X", None),
        ] {
            assert_eq!(ClimbState::from_code(code), expected, "code {}", code);
        }
    }
}
