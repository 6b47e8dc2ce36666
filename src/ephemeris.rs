//! Celestial target adapter over the ephemeris provider.
//!
//! The engine only ever needs one question answered: where is the Sun or
//! Moon, in observer-relative alt/az, at a given instant. `EphemerisProvider`
//! is that seam; `PaEphemeris` implements it with precise Sun/Moon RA/Dec
//! from practical-astronomy-rust converted through GMST/LST and the hour
//! angle. `CelestialTarget` caches the last answer so the search loop can
//! refresh at a coarse (once per simulated minute) cadence.

use chrono::{DateTime, Datelike, Timelike, Utc};
use practical_astronomy_rust::{moon as pa_moon, sun as pa_sun};

use crate::api::{CelestialBody, HorizontalCoordinates, ObserverPosition};
use crate::error::EngineResult;

/// Source of observer-relative positions for the tracked bodies.
pub trait EphemerisProvider {
    /// Altitude/azimuth of `body` as seen from `observer` at `instant`.
    ///
    /// Altitude is degrees above the horizon (negative below), azimuth is
    /// degrees clockwise from north — the same convention the aircraft-side
    /// transform uses, so differences are directly comparable.
    fn horizontal_position(
        &self,
        body: CelestialBody,
        observer: &ObserverPosition,
        instant: DateTime<Utc>,
    ) -> EngineResult<HorizontalCoordinates>;
}

/// Ephemeris provider backed by practical-astronomy-rust.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaEphemeris;

impl PaEphemeris {
    pub fn new() -> Self {
        PaEphemeris
    }

    /// Equatorial RA/Dec of the body at `instant`, in degrees.
    fn equatorial(body: CelestialBody, instant: DateTime<Utc>) -> (f64, f64) {
        let year = instant.year() as u32;
        let month = instant.month();
        let day = instant.day();
        let hh = instant.hour() as f64;
        let mm = instant.minute() as f64;
        let ss = instant.second() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1.0e6;

        match body {
            CelestialBody::Sun => {
                let (ra_h, ra_m, ra_s, dec_d, dec_m, dec_s) =
                    pa_sun::precise_position_of_sun(hh, mm, ss, day as f64, month, year, false, 0);
                (hms_to_deg(ra_h, ra_m, ra_s), dms_to_deg(dec_d, dec_m, dec_s))
            }
            CelestialBody::Moon => {
                let (ra_h, ra_m, ra_s, dec_d, dec_m, dec_s, _el, _par) =
                    pa_moon::precise_position_of_moon(hh, mm, ss, false, 0, day as f64, month, year);
                (hms_to_deg(ra_h, ra_m, ra_s), dms_to_deg(dec_d, dec_m, dec_s))
            }
        }
    }
}

impl EphemerisProvider for PaEphemeris {
    fn horizontal_position(
        &self,
        body: CelestialBody,
        observer: &ObserverPosition,
        instant: DateTime<Utc>,
    ) -> EngineResult<HorizontalCoordinates> {
        let (ra_deg, dec_deg) = Self::equatorial(body, instant);
        Ok(equatorial_to_horizontal(
            ra_deg,
            dec_deg,
            observer.latitude,
            observer.longitude,
            instant,
        ))
    }
}

/// Convert equatorial RA/Dec to observer alt/az at a given instant.
///
/// Uses LST = GMST + east longitude and the standard hour-angle formulas.
fn equatorial_to_horizontal(
    ra_deg: f64,
    dec_deg: f64,
    lat_deg: f64,
    lon_deg: f64,
    instant: DateTime<Utc>,
) -> HorizontalCoordinates {
    let gmst = gmst_deg(instant);
    let lst = unwind_deg(gmst + lon_deg);
    let hour_angle = unwind_deg(lst - ra_deg).to_radians();

    let lat = lat_deg.to_radians();
    let dec = dec_deg.to_radians();

    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
    let altitude = sin_alt.asin();

    let azimuth = (-dec.cos() * hour_angle.sin())
        .atan2(dec.sin() * lat.cos() - dec.cos() * lat.sin() * hour_angle.cos());

    HorizontalCoordinates::new(
        altitude.to_degrees(),
        unwind_deg(azimuth.to_degrees()),
    )
}

/// Greenwich mean sidereal time in degrees.
fn gmst_deg(instant: DateTime<Utc>) -> f64 {
    let (year, month, day) = (instant.year(), instant.month(), instant.day());
    let second =
        instant.second() as f64 + f64::from(instant.timestamp_subsec_micros()) / 1.0e6;

    let a = (14 - month as i32) / 12;
    let y = year + 4800 - a;
    let m = month as i32 + 12 * a - 3;
    let jdn =
        day as i32 + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045;
    let dayfrac =
        (instant.hour() as f64 + instant.minute() as f64 / 60.0 + second / 3600.0) / 24.0;
    let jd = f64::from(jdn) + dayfrac - 0.5;

    let d = jd - 2451545.0;
    let t = d / 36525.0;
    let gmst = 280.46061837 + 360.98564736629 * d + 0.000387933 * t * t - t * t * t / 38710000.0;
    unwind_deg(gmst)
}

fn unwind_deg(mut x: f64) -> f64 {
    x %= 360.0;
    if x < 0.0 {
        x += 360.0;
    }
    x
}

fn hms_to_deg(h: f64, m: f64, s: f64) -> f64 {
    (h + m / 60.0 + s / 3600.0) * 15.0
}

fn dms_to_deg(d: f64, m: f64, s: f64) -> f64 {
    let sign = if d < 0.0 { -1.0 } else { 1.0 };
    sign * (d.abs() + m / 60.0 + s / 3600.0)
}

/// A tracked body with its last sampled observer-relative position.
///
/// Owned by one search/orchestration call; re-sampled whenever simulated
/// time advances past a refresh boundary. `update_position` is idempotent
/// for a repeated instant, so minute-cadence refreshes cost one ephemeris
/// call per simulated minute rather than one per sample.
pub struct CelestialTarget<'a> {
    body: CelestialBody,
    observer: ObserverPosition,
    provider: &'a dyn EphemerisProvider,
    position: HorizontalCoordinates,
    as_of: DateTime<Utc>,
}

impl<'a> CelestialTarget<'a> {
    /// Create a target and sample its position at `instant`.
    pub fn new(
        body: CelestialBody,
        observer: ObserverPosition,
        provider: &'a dyn EphemerisProvider,
        instant: DateTime<Utc>,
    ) -> EngineResult<Self> {
        let position = provider.horizontal_position(body, &observer, instant)?;
        Ok(Self {
            body,
            observer,
            provider,
            position,
            as_of: instant,
        })
    }

    /// Refresh the cached position. No-op when `instant` is unchanged.
    pub fn update_position(&mut self, instant: DateTime<Utc>) -> EngineResult<()> {
        if instant == self.as_of {
            return Ok(());
        }
        self.position = self
            .provider
            .horizontal_position(self.body, &self.observer, instant)?;
        self.as_of = instant;
        Ok(())
    }

    pub fn body(&self) -> CelestialBody {
        self.body
    }

    /// The last sampled position.
    pub fn coordinates(&self) -> HorizontalCoordinates {
        self.position
    }

    /// The instant of the last sample.
    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }
}
