//! Closest-approach search and transit classification.
//!
//! For one (aircraft, target) pair this scans a discretized look-ahead
//! window, projecting the aircraft forward and comparing its observer
//! alt/az against the target's, tracks the minimum angular separation,
//! and classifies the result into an ordered possibility tier.
//!
//! Known limitation: the early-exit heuristic assumes a single minimum
//! inside the window. Once separation has diverged for the configured
//! number of consecutive samples the scan stops, so a theoretical second
//! local minimum further out is never examined.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::api::{
    AircraftState, ClosestApproach, ObserverPosition, PossibilityLevel, TransitCandidate,
};
use crate::config::SearchSettings;
use crate::ephemeris::CelestialTarget;
use crate::error::{EngineError, EngineResult};
use crate::services::kinematics::{
    geographic_to_horizontal, haversine_distance_nm, predict_position,
};

/// Discretized look-ahead window: ascending minute offsets from "now".
///
/// Regenerated per call and stateless; the default is a 1-second step over
/// a 15-minute horizon (901 samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    horizon_minutes: u32,
    step_seconds: u32,
    no_improve_minutes: u32,
}

impl SearchWindow {
    /// Create a window.
    ///
    /// # Errors
    /// Returns `EngineError::Configuration` for a degenerate window
    /// (zero horizon, zero step, or a step above one minute).
    pub fn new(
        horizon_minutes: u32,
        step_seconds: u32,
        no_improve_minutes: u32,
    ) -> EngineResult<Self> {
        if horizon_minutes == 0 {
            return Err(EngineError::Configuration(
                "search window horizon must be at least one minute".to_string(),
            ));
        }
        if step_seconds == 0 || step_seconds > 60 {
            return Err(EngineError::Configuration(
                "search window step must be between 1 and 60 seconds".to_string(),
            ));
        }
        Ok(Self {
            horizon_minutes,
            step_seconds,
            no_improve_minutes,
        })
    }

    pub fn from_settings(settings: &SearchSettings) -> EngineResult<Self> {
        Self::new(
            settings.horizon_minutes,
            settings.step_seconds,
            settings.no_improve_minutes,
        )
    }

    /// Offsets in minutes, ascending, starting at 0.
    pub fn offsets_minutes(&self) -> impl Iterator<Item = f64> {
        let step = self.step_seconds;
        let samples = self.horizon_minutes * 60 / step;
        (0..=samples).map(move |i| f64::from(i * step) / 60.0)
    }

    /// Number of samples in the window.
    pub fn len(&self) -> usize {
        (self.horizon_minutes * 60 / self.step_seconds) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false // a valid window always contains the t=0 sample
    }

    /// Consecutive non-improving samples tolerated before the scan bails.
    fn no_improve_limit(&self) -> u32 {
        self.no_improve_minutes * (60 / self.step_seconds).max(1)
    }
}

/// Map a combined angular separation to a possibility tier.
///
/// Policy: fixed degree bands on the Euclidean alt/az separation,
/// independent of target altitude. The Sun and Moon subtend ~0.5 deg, so
/// 1 deg covers a direct transit plus margin; 2 deg is a near miss worth
/// recording; 6 deg is still useful for near-miss display. Boundary
/// values take the stricter tier (exactly 1.0 deg is still High).
pub fn classify_separation(separation_deg: f64) -> PossibilityLevel {
    if separation_deg <= 1.0 {
        PossibilityLevel::High
    } else if separation_deg <= 2.0 {
        PossibilityLevel::Medium
    } else if separation_deg <= 6.0 {
        PossibilityLevel::Low
    } else {
        PossibilityLevel::Unlikely
    }
}

/// Azimuth difference on the circle, wrapped to [0, 180].
fn azimuth_difference_deg(a: f64, b: f64) -> f64 {
    let raw = (a - b).abs() % 360.0;
    raw.min(360.0 - raw)
}

/// Search the window for the closest approach between one aircraft and
/// one target, and classify it.
///
/// The target is refreshed once per crossed whole-minute boundary rather
/// than at every sample; target motion over one minute is small relative
/// to the body's angular size. Never fails for well-formed input —
/// a target below the horizon is tolerated and simply cannot pass the
/// reporting gate's above-horizon test.
///
/// # Errors
/// Only propagates ephemeris provider failures.
pub fn check_transit(
    flight: &AircraftState,
    window: &SearchWindow,
    ref_time: DateTime<Utc>,
    observer: &ObserverPosition,
    target: &mut CelestialTarget<'_>,
    alt_gate_deg: f64,
    az_gate_deg: f64,
) -> EngineResult<TransitCandidate> {
    target.update_position(ref_time)?;

    let mut best: Option<ClosestApproach> = None;
    let mut gated_best: Option<ClosestApproach> = None;
    let mut no_improve: u32 = 0;
    let no_improve_limit = window.no_improve_limit();
    let mut last_refresh_minute: i64 = 0;

    for offset in window.offsets_minutes() {
        let minute_floor = offset.floor() as i64;
        if minute_floor > last_refresh_minute {
            last_refresh_minute = minute_floor;
            target.update_position(ref_time + Duration::seconds(minute_floor * 60))?;
        }

        let (lat, lon) = predict_position(
            flight.latitude,
            flight.longitude,
            flight.speed_kmh,
            flight.heading_deg,
            offset,
        );
        let aircraft = geographic_to_horizontal(lat, lon, flight.elevation_m, observer);
        let target_pos = target.coordinates();

        let alt_diff = (aircraft.altitude_deg - target_pos.altitude_deg).abs();
        let az_diff = azimuth_difference_deg(aircraft.azimuth_deg, target_pos.azimuth_deg);
        let separation = (alt_diff * alt_diff + az_diff * az_diff).sqrt();

        let improved = best.map(|b| separation < b.separation_deg).unwrap_or(true);
        if improved {
            no_improve = 0;
            let sample = ClosestApproach {
                minutes: offset,
                aircraft_alt_deg: aircraft.altitude_deg,
                aircraft_az_deg: aircraft.azimuth_deg,
                target_alt_deg: target_pos.altitude_deg,
                target_az_deg: target_pos.azimuth_deg,
                alt_diff_deg: alt_diff,
                az_diff_deg: az_diff,
                separation_deg: separation,
            };
            best = Some(sample);

            // Permissive reporting gate: looser than the classification
            // bands, only decides whether this is worth reporting at all
            if aircraft.altitude_deg > 0.0 && alt_diff < alt_gate_deg && az_diff < az_gate_deg {
                gated_best = Some(sample);
            }
        } else {
            no_improve += 1;
            if no_improve >= no_improve_limit {
                debug!(
                    flight = %flight.id,
                    target = %target.body(),
                    minute = offset,
                    "separation diverging, stopping scan early"
                );
                break;
            }
        }
    }

    let distance_nm = haversine_distance_nm(
        observer.latitude,
        observer.longitude,
        flight.latitude,
        flight.longitude,
    );

    let candidate = match gated_best {
        Some(sample) => TransitCandidate {
            target: target.body(),
            aircraft: flight.clone(),
            distance_nm,
            closest: Some(sample),
            is_possible_transit: true,
            possibility_level: classify_separation(sample.separation_deg),
        },
        None => TransitCandidate {
            target: target.body(),
            aircraft: flight.clone(),
            distance_nm,
            closest: best,
            is_possible_transit: false,
            possibility_level: PossibilityLevel::Unlikely,
        },
    };

    Ok(candidate)
}
