//! Public data model for the transit prediction engine.
//!
//! This file consolidates the typed records that flow through the engine:
//! observer/bounding-box geometry, aircraft state as parsed from the
//! flight feed, and the `TransitCandidate` output record consumed by
//! display and notification layers. All types derive Serialize/Deserialize
//! for JSON interop at the external boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Observer-relative horizontal coordinates.
///
/// Altitude is degrees above the horizon (negative = below), azimuth is
/// degrees clockwise from north in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalCoordinates {
    /// Altitude in degrees above the horizon
    pub altitude_deg: f64,
    /// Azimuth in degrees clockwise from north
    pub azimuth_deg: f64,
}

impl HorizontalCoordinates {
    pub fn new(altitude_deg: f64, azimuth_deg: f64) -> Self {
        Self {
            altitude_deg,
            azimuth_deg,
        }
    }
}

/// Fixed ground observer position (latitude, longitude, elevation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverPosition {
    /// Latitude in decimal degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub longitude: f64,
    /// Elevation in meters above sea level
    #[serde(default)]
    pub elevation_m: f64,
}

impl ObserverPosition {
    /// Create a validated observer position.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidInput` if latitude or longitude is out
    /// of range.
    pub fn new(latitude: f64, longitude: f64, elevation_m: f64) -> Result<Self, EngineError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(EngineError::InvalidInput(format!(
                "latitude {} out of range [-90, 90]",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(EngineError::InvalidInput(format!(
                "longitude {} out of range [-180, 180]",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            elevation_m,
        })
    }
}

/// Lat/lon rectangle used to scope a flight-data query.
///
/// Corners are (lower-left, upper-right) in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_lower_left: f64,
    pub lon_lower_left: f64,
    pub lat_upper_right: f64,
    pub lon_upper_right: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidInput` if a corner is out of range or
    /// the lower-left corner is not south-west of the upper-right corner.
    pub fn new(
        lat_lower_left: f64,
        lon_lower_left: f64,
        lat_upper_right: f64,
        lon_upper_right: f64,
    ) -> Result<Self, EngineError> {
        for (name, lat) in [
            ("lat_lower_left", lat_lower_left),
            ("lat_upper_right", lat_upper_right),
        ] {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(EngineError::InvalidInput(format!(
                    "{} {} out of range [-90, 90]",
                    name, lat
                )));
            }
        }
        for (name, lon) in [
            ("lon_lower_left", lon_lower_left),
            ("lon_upper_right", lon_upper_right),
        ] {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(EngineError::InvalidInput(format!(
                    "{} {} out of range [-180, 180]",
                    name, lon
                )));
            }
        }
        if lat_lower_left >= lat_upper_right || lon_lower_left >= lon_upper_right {
            return Err(EngineError::InvalidInput(
                "bounding box lower-left corner must be south-west of upper-right".to_string(),
            ));
        }
        Ok(Self {
            lat_lower_left,
            lon_lower_left,
            lat_upper_right,
            lon_upper_right,
        })
    }

    /// Check whether a position lies inside the box (inclusive edges).
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        (self.lat_lower_left..=self.lat_upper_right).contains(&latitude)
            && (self.lon_lower_left..=self.lon_upper_right).contains(&longitude)
    }
}

/// Celestial body a transit can be predicted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CelestialBody {
    Sun,
    Moon,
}

impl CelestialBody {
    pub fn name(&self) -> &'static str {
        match self {
            CelestialBody::Sun => "sun",
            CelestialBody::Moon => "moon",
        }
    }
}

impl fmt::Display for CelestialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which targets an orchestration call should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSelector {
    Sun,
    Moon,
    Both,
}

impl TargetSelector {
    /// The candidate bodies covered by this selector.
    pub fn bodies(&self) -> &'static [CelestialBody] {
        match self {
            TargetSelector::Sun => &[CelestialBody::Sun],
            TargetSelector::Moon => &[CelestialBody::Moon],
            TargetSelector::Both => &[CelestialBody::Sun, CelestialBody::Moon],
        }
    }
}

impl FromStr for TargetSelector {
    type Err = EngineError;

    /// Parse a target selector, rejecting unknown names outright.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sun" => Ok(TargetSelector::Sun),
            "moon" => Ok(TargetSelector::Moon),
            "both" => Ok(TargetSelector::Both),
            other => Err(EngineError::UnknownTarget(other.to_string())),
        }
    }
}

/// Vertical trend reported by the flight feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClimbState {
    Climbing,
    Descending,
    Level,
}

impl ClimbState {
    /// Decode the feed's single-letter altitude-change code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "C" => Some(ClimbState::Climbing),
            "D" => Some(ClimbState::Descending),
            "-" => Some(ClimbState::Level),
            _ => None,
        }
    }
}

/// A single aircraft position report, read-only within the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftState {
    /// Flight identifier (callsign / ident)
    pub id: String,
    /// Origin airport or city, if known
    #[serde(default)]
    pub origin: String,
    /// Destination airport or city, if known
    #[serde(default)]
    pub destination: String,
    /// Current latitude in decimal degrees
    pub latitude: f64,
    /// Current longitude in decimal degrees
    pub longitude: f64,
    /// Barometric altitude in meters
    pub elevation_m: f64,
    /// Ground speed in km/h
    pub speed_kmh: f64,
    /// Track heading in degrees clockwise from north
    pub heading_deg: f64,
    /// Vertical trend, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climb: Option<ClimbState>,
    /// Aircraft type designator, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
}

/// Ordered transit confidence tier.
///
/// Tiers are totally ordered (`Unlikely < Low < Medium < High`) so callers
/// can gate notifications on `>= Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PossibilityLevel {
    Unlikely,
    Low,
    Medium,
    High,
}

/// Diagnostics for the moment of minimum angular separation.
///
/// Populated whenever the search window had at least one sample, even when
/// no reporting threshold was met.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestApproach {
    /// Minutes from the reference instant to the closest approach
    pub minutes: f64,
    /// Aircraft altitude at closest approach, degrees
    pub aircraft_alt_deg: f64,
    /// Aircraft azimuth at closest approach, degrees
    pub aircraft_az_deg: f64,
    /// Target altitude at closest approach, degrees
    pub target_alt_deg: f64,
    /// Target azimuth at closest approach, degrees
    pub target_az_deg: f64,
    /// Absolute altitude difference, degrees (always >= 0)
    pub alt_diff_deg: f64,
    /// Absolute azimuth difference wrapped to [0, 180], degrees
    pub az_diff_deg: f64,
    /// Combined angular separation, degrees
    pub separation_deg: f64,
}

/// Result record for one (aircraft, target) pair.
///
/// Exactly one candidate exists per pair per orchestration call; immutable
/// after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitCandidate {
    /// The celestial target this candidate was scored against
    pub target: CelestialBody,
    /// Raw kinematic fields echoed through from the feed
    #[serde(flatten)]
    pub aircraft: AircraftState,
    /// Current great-circle distance from the observer, nautical miles
    pub distance_nm: f64,
    /// Closest-approach diagnostics, if the window produced any sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closest: Option<ClosestApproach>,
    /// Whether the reporting gate was satisfied at the closest approach
    pub is_possible_transit: bool,
    /// Classification tier for the recorded separation
    pub possibility_level: PossibilityLevel,
}

impl TransitCandidate {
    /// Separation sort key; candidates with no diagnostics sort last.
    pub fn separation_key(&self) -> f64 {
        self.closest.map(|c| c.separation_deg).unwrap_or(f64::MAX)
    }

    /// Minutes-to-approach sort key; missing diagnostics sort last.
    pub fn minutes_key(&self) -> f64 {
        self.closest.map(|c| c.minutes).unwrap_or(f64::MAX)
    }
}

/// Parameters for one orchestration call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Fixed observer position for the lifetime of the call
    pub observer: ObserverPosition,
    /// Which targets to consider
    pub selector: TargetSelector,
    /// Reporting gate on the altitude difference, degrees
    pub alt_gate_deg: f64,
    /// Reporting gate on the azimuth difference, degrees
    pub az_gate_deg: f64,
    /// Targets below this altitude are excluded from the flight search
    pub min_trackable_altitude_deg: f64,
    /// Caller-supplied search area; falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl ScanRequest {
    /// Create a request with the default gates (5° altitude, 10° azimuth)
    /// and minimum trackable altitude (15°).
    pub fn new(observer: ObserverPosition, selector: TargetSelector) -> Self {
        Self {
            observer,
            selector,
            alt_gate_deg: 5.0,
            az_gate_deg: 10.0,
            min_trackable_altitude_deg: 15.0,
            bounding_box: None,
        }
    }

    pub fn with_gates(mut self, alt_gate_deg: f64, az_gate_deg: f64) -> Self {
        self.alt_gate_deg = alt_gate_deg;
        self.az_gate_deg = az_gate_deg;
        self
    }

    pub fn with_min_trackable_altitude(mut self, deg: f64) -> Self {
        self.min_trackable_altitude_deg = deg;
        self
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }
}

/// Aggregated output of one orchestration (or recalculation) call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitReport {
    /// The single "now" captured at the start of the call
    pub generated_at: DateTime<Utc>,
    /// Candidates, sorted most-likely / closest first
    pub candidates: Vec<TransitCandidate>,
    /// Current coordinates for every considered target, trackable or not
    pub target_coordinates: BTreeMap<CelestialBody, HorizontalCoordinates>,
    /// Targets that were above the minimum trackable altitude
    pub tracked_targets: Vec<CelestialBody>,
    /// Effective search area; `None` on the recalculation path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Recommended seconds until the next poll
    pub next_poll_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_position_validation() {
        assert!(ObserverPosition::new(45.0, -120.0, 300.0).is_ok());
        assert!(ObserverPosition::new(90.5, 0.0, 0.0).is_err());
        assert!(ObserverPosition::new(0.0, 181.0, 0.0).is_err());
    }

    #[test]
    fn test_bounding_box_validation() {
        assert!(BoundingBox::new(20.0, -104.0, 24.0, -101.0).is_ok());
        // Inverted corners
        assert!(BoundingBox::new(24.0, -104.0, 20.0, -101.0).is_err());
        assert!(BoundingBox::new(20.0, -101.0, 24.0, -104.0).is_err());
        // Out of range
        assert!(BoundingBox::new(-95.0, 0.0, 10.0, 10.0).is_err());
    }

    #[test]
    fn test_bounding_box_contains() {
        let bbox = BoundingBox::new(20.0, -104.0, 24.0, -101.0).unwrap();
        assert!(bbox.contains(22.0, -102.5));
        assert!(bbox.contains(20.0, -104.0)); // edges are inclusive
        assert!(!bbox.contains(25.0, -102.5));
        assert!(!bbox.contains(22.0, -100.0));
    }

    #[test]
    fn test_target_selector_parsing() {
        assert_eq!("sun".parse::<TargetSelector>().unwrap(), TargetSelector::Sun);
        assert_eq!("Moon".parse::<TargetSelector>().unwrap(), TargetSelector::Moon);
        assert_eq!(" both ".parse::<TargetSelector>().unwrap(), TargetSelector::Both);
        assert!(matches!(
            "mars".parse::<TargetSelector>(),
            Err(EngineError::UnknownTarget(_))
        ));
    }

    #[test]
    fn test_selector_bodies() {
        assert_eq!(TargetSelector::Sun.bodies(), &[CelestialBody::Sun]);
        assert_eq!(
            TargetSelector::Both.bodies(),
            &[CelestialBody::Sun, CelestialBody::Moon]
        );
    }

    #[test]
    fn test_climb_state_codes() {
        assert_eq!(ClimbState::from_code("C"), Some(ClimbState::Climbing));
        assert_eq!(ClimbState::from_code("D"), Some(ClimbState::Descending));
        assert_eq!(ClimbState::from_code("-"), Some(ClimbState::Level));
        assert_eq!(ClimbState::from_code("X"), None);
    }

    #[test]
    fn test_possibility_level_ordering() {
        assert!(PossibilityLevel::Unlikely < PossibilityLevel::Low);
        assert!(PossibilityLevel::Low < PossibilityLevel::Medium);
        assert!(PossibilityLevel::Medium < PossibilityLevel::High);
    }
}
