//! Dead-reckoning and coordinate transforms.
//!
//! Pure functions, no state: great-circle position projection for a
//! moving aircraft and the geodetic -> observer alt/az transform used at
//! every search sample. Both aircraft and observer are fixed to the
//! rotating Earth frame, so the alt/az transform needs no time argument.

use crate::api::{HorizontalCoordinates, ObserverPosition};

/// Mean Earth radius in kilometers, used for great-circle math.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// WGS-84 equatorial radius in kilometers.
const WGS84_A_KM: f64 = 6378.137;

/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

const KM_TO_NAUTICAL_MILES: f64 = 0.539_957;

/// Project an aircraft's position `minutes` ahead along its current track.
///
/// Great-circle dead reckoning: the aircraft is assumed to hold speed and
/// heading for the whole projection. Returns `(latitude, longitude)` in
/// decimal degrees.
///
/// Preconditions: `speed_kmh >= 0` and `minutes >= 0`; behavior is
/// undefined for negative speed and callers must not pass it.
pub fn predict_position(
    lat: f64,
    lon: f64,
    speed_kmh: f64,
    heading_deg: f64,
    minutes: f64,
) -> (f64, f64) {
    let distance_km = speed_kmh / 60.0 * minutes;
    let angular = distance_km / EARTH_RADIUS_KM;

    let bearing = heading_deg.to_radians();
    let lat1 = lat.to_radians();

    let new_lat = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let new_lon = lon.to_radians()
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * new_lat.sin());

    (new_lat.to_degrees(), new_lon.to_degrees())
}

/// Great-circle distance between two points, in kilometers (haversine).
pub fn haversine_distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Same distance in nautical miles, for candidate display fields.
pub fn haversine_distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_distance_km(lat1, lon1, lat2, lon2) * KM_TO_NAUTICAL_MILES
}

/// Convert an absolute geographic position to the observer's horizontal
/// frame.
///
/// Geodetic -> ECEF (WGS-84) for both points, then the difference vector
/// projected onto the observer's east/north/up axes. O(1), called once per
/// search sample.
pub fn geographic_to_horizontal(
    lat: f64,
    lon: f64,
    elevation_m: f64,
    observer: &ObserverPosition,
) -> HorizontalCoordinates {
    let (ax, ay, az) = geodetic_to_ecef_km(lat, lon, elevation_m);
    let (ox, oy, oz) = geodetic_to_ecef_km(
        observer.latitude,
        observer.longitude,
        observer.elevation_m,
    );

    let dx = ax - ox;
    let dy = ay - oy;
    let dz = az - oz;

    let lat_r = observer.latitude.to_radians();
    let lon_r = observer.longitude.to_radians();
    let (sin_lat, cos_lat) = lat_r.sin_cos();
    let (sin_lon, cos_lon) = lon_r.sin_cos();

    let east = -sin_lon * dx + cos_lon * dy;
    let north = -sin_lat * cos_lon * dx - sin_lat * sin_lon * dy + cos_lat * dz;
    let up = cos_lat * cos_lon * dx + cos_lat * sin_lon * dy + sin_lat * dz;

    let range = (east * east + north * north + up * up).sqrt();
    if range == 0.0 {
        // Co-located points have no defined direction; report zenith
        return HorizontalCoordinates::new(90.0, 0.0);
    }

    let altitude = (up / range).asin().to_degrees();
    let mut azimuth = east.atan2(north).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }

    HorizontalCoordinates::new(altitude, azimuth)
}

/// WGS-84 geodetic coordinates to Earth-centered Earth-fixed, in km.
fn geodetic_to_ecef_km(lat_deg: f64, lon_deg: f64, elevation_m: f64) -> (f64, f64, f64) {
    let e2 = WGS84_F * (2.0 - WGS84_F);

    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();

    let n = WGS84_A_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let elevation_km = elevation_m / 1000.0;

    let x = (n + elevation_km) * cos_lat * lon.cos();
    let y = (n + elevation_km) * cos_lat * lon.sin();
    let z = (n * (1.0 - e2) + elevation_km) * sin_lat;

    (x, y, z)
}
