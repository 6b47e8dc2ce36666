//! Scan orchestration across targets, flights, and the cache.
//!
//! `TransitEngine` owns the wiring: it captures a single reference
//! instant, decides which targets are worth tracking, fetches (or
//! reuses) the flight list for the search area, runs the
//! closest-approach search for every (aircraft, target) pair, and
//! assembles the sorted report with a recommended next-poll interval.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::api::{
    AircraftState, BoundingBox, CelestialBody, HorizontalCoordinates, PossibilityLevel,
    ScanRequest, TransitCandidate, TransitReport,
};
use crate::config::EngineConfig;
use crate::ephemeris::{CelestialTarget, EphemerisProvider};
use crate::error::{EngineError, EngineResult};
use crate::flights::{CacheStats, FlightCache, FlightDataSource};
use crate::services::transit_search::{check_transit, SearchWindow};

/// The prediction engine: ephemeris, flight feed, cache, and tuning.
///
/// Generic over its two upstream seams so tests can substitute canned
/// providers for both.
pub struct TransitEngine<E, F> {
    config: EngineConfig,
    ephemeris: E,
    flights: F,
    cache: FlightCache,
}

impl<E, F> TransitEngine<E, F>
where
    E: EphemerisProvider,
    F: FlightDataSource,
{
    /// Build an engine; the flight cache is sized from the configuration.
    pub fn new(config: EngineConfig, ephemeris: E, flights: F) -> Self {
        let cache = FlightCache::new(
            Duration::from_secs(config.cache.ttl_seconds),
            config.cache.max_entries,
        );
        Self {
            config,
            ephemeris,
            flights,
            cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The flight data source backing this engine.
    pub fn flight_source(&self) -> &F {
        &self.flights
    }

    /// Run a full scan against the current instant.
    ///
    /// # Errors
    /// Fails fast on invalid request parameters or a missing search
    /// area, and propagates ephemeris and flight-feed failures.
    pub async fn scan(&self, request: &ScanRequest) -> EngineResult<TransitReport> {
        self.scan_at(request, Utc::now()).await
    }

    /// Run a full scan against an explicit reference instant.
    ///
    /// The instant is captured once; every target position, projection,
    /// and report timestamp derives from it, so a slow feed response
    /// cannot skew the geometry.
    pub async fn scan_at(
        &self,
        request: &ScanRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<TransitReport> {
        validate_request(request)?;
        let bbox = self.resolve_bounding_box(request)?;
        let window = SearchWindow::from_settings(&self.config.search)?;

        let (target_coordinates, tracked) = self.survey_targets(request, now)?;
        if tracked.is_empty() {
            info!(selector = ?request.selector, "no target above the trackable altitude, skipping flight search");
            return Ok(TransitReport {
                generated_at: now,
                candidates: Vec::new(),
                target_coordinates,
                tracked_targets: tracked,
                bounding_box: Some(bbox),
                next_poll_seconds: self.config.poll.default_seconds,
            });
        }

        let flights = self.fetch_flights(&bbox).await?;
        let in_area: Vec<AircraftState> = flights
            .into_iter()
            .filter(|f| bbox.contains(f.latitude, f.longitude))
            .collect();
        info!(
            flights = in_area.len(),
            targets = tracked.len(),
            "scanning for transits"
        );

        let mut candidates =
            self.evaluate_pairs(request, &tracked, &in_area, &window, now)?;
        sort_candidates(&mut candidates);
        let next_poll_seconds = self.next_poll_seconds(&candidates);

        Ok(TransitReport {
            generated_at: now,
            candidates,
            target_coordinates,
            tracked_targets: tracked,
            bounding_box: Some(bbox),
            next_poll_seconds,
        })
    }

    /// Re-score a previously fetched flight list against the current
    /// instant.
    ///
    /// No feed traffic: target positions move on, flights are re-projected
    /// from their last known state. The report carries no bounding box
    /// because no area query was made.
    pub fn recalculate(
        &self,
        request: &ScanRequest,
        flights: &[AircraftState],
    ) -> EngineResult<TransitReport> {
        self.recalculate_at(request, flights, Utc::now())
    }

    pub fn recalculate_at(
        &self,
        request: &ScanRequest,
        flights: &[AircraftState],
        now: DateTime<Utc>,
    ) -> EngineResult<TransitReport> {
        validate_request(request)?;
        let window = SearchWindow::from_settings(&self.config.search)?;

        let (target_coordinates, tracked) = self.survey_targets(request, now)?;
        let mut candidates = if tracked.is_empty() {
            Vec::new()
        } else {
            self.evaluate_pairs(request, &tracked, flights, &window, now)?
        };
        sort_candidates(&mut candidates);
        let next_poll_seconds = self.next_poll_seconds(&candidates);

        Ok(TransitReport {
            generated_at: now,
            candidates,
            target_coordinates,
            tracked_targets: tracked,
            bounding_box: None,
            next_poll_seconds,
        })
    }

    /// Current position of every selected body, and the trackable subset.
    fn survey_targets(
        &self,
        request: &ScanRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<(BTreeMap<CelestialBody, HorizontalCoordinates>, Vec<CelestialBody>)> {
        let mut coordinates = BTreeMap::new();
        let mut tracked = Vec::new();
        for &body in request.selector.bodies() {
            let position = self
                .ephemeris
                .horizontal_position(body, &request.observer, now)?;
            if position.altitude_deg >= request.min_trackable_altitude_deg {
                tracked.push(body);
            } else {
                debug!(
                    target = %body,
                    altitude = position.altitude_deg,
                    "target below trackable altitude"
                );
            }
            coordinates.insert(body, position);
        }
        Ok((coordinates, tracked))
    }

    /// The flight list for `bbox`, from cache when fresh. At most one
    /// feed request per call.
    async fn fetch_flights(&self, bbox: &BoundingBox) -> EngineResult<Vec<AircraftState>> {
        if let Some(cached) = self.cache.get(bbox) {
            return Ok(cached);
        }
        let flights = self.flights.flights_in_area(bbox).await?;
        self.cache.insert(bbox, flights.clone());
        Ok(flights)
    }

    fn evaluate_pairs(
        &self,
        request: &ScanRequest,
        tracked: &[CelestialBody],
        flights: &[AircraftState],
        window: &SearchWindow,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<TransitCandidate>> {
        let mut candidates = Vec::with_capacity(tracked.len() * flights.len());
        for &body in tracked {
            let mut target =
                CelestialTarget::new(body, request.observer, &self.ephemeris, now)?;
            for flight in flights {
                candidates.push(check_transit(
                    flight,
                    window,
                    now,
                    &request.observer,
                    &mut target,
                    request.alt_gate_deg,
                    request.az_gate_deg,
                )?);
            }
        }
        Ok(candidates)
    }

    fn resolve_bounding_box(&self, request: &ScanRequest) -> EngineResult<BoundingBox> {
        if let Some(bbox) = request.bounding_box {
            return Ok(bbox);
        }
        self.config.default_bounding_box()?.ok_or_else(|| {
            EngineError::InvalidInput(
                "no search area: the request carries no bounding box and none is configured"
                    .to_string(),
            )
        })
    }

    /// Poll interval from the most imminent high/medium candidate.
    fn next_poll_seconds(&self, candidates: &[TransitCandidate]) -> u64 {
        let soonest = candidates
            .iter()
            .filter(|c| {
                c.is_possible_transit && c.possibility_level >= PossibilityLevel::Medium
            })
            .filter_map(|c| c.closest.map(|cl| cl.minutes))
            .fold(f64::INFINITY, f64::min);

        if soonest < 2.0 {
            30
        } else if soonest < 5.0 {
            60
        } else if soonest < 10.0 {
            120
        } else {
            self.config.poll.default_seconds
        }
    }
}

fn validate_request(request: &ScanRequest) -> EngineResult<()> {
    if request.alt_gate_deg <= 0.0 || request.az_gate_deg <= 0.0 {
        return Err(EngineError::InvalidInput(
            "reporting gates must be positive".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&request.min_trackable_altitude_deg) {
        return Err(EngineError::InvalidInput(format!(
            "min_trackable_altitude_deg {} out of range [-90, 90]",
            request.min_trackable_altitude_deg
        )));
    }
    Ok(())
}

/// Sort contract: reportable candidates first, then by separation, then
/// by time to approach, with the flight id as the final tiebreaker so
/// identical scans produce identical reports.
fn sort_candidates(candidates: &mut [TransitCandidate]) {
    candidates.sort_by(|a, b| {
        b.is_possible_transit
            .cmp(&a.is_possible_transit)
            .then_with(|| {
                a.separation_key()
                    .partial_cmp(&b.separation_key())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                a.minutes_key()
                    .partial_cmp(&b.minutes_key())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.aircraft.id.cmp(&b.aircraft.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ClosestApproach, ObserverPosition, TargetSelector};
    use crate::services::kinematics::geographic_to_horizontal;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

    /// Provider with one fixed position per body.
    struct TwoBodyEphemeris {
        sun: HorizontalCoordinates,
        moon: HorizontalCoordinates,
    }

    impl EphemerisProvider for TwoBodyEphemeris {
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

    /// Canned flight source that counts feed requests.
    struct StaticFlights {
        flights: Vec<AircraftState>,
        fetches: AtomicU32,
    }

    impl StaticFlights {
        fn new(flights: Vec<AircraftState>) -> Self {
            Self {
                flights,
                fetches: AtomicU32::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl FlightDataSource for StaticFlights {
        async fn flights_in_area(
            &self,
            _bbox: &BoundingBox,
        ) -> EngineResult<Vec<AircraftState>> {
            self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(self.flights.clone())
        }
    }

    fn observer() -> ObserverPosition {
        ObserverPosition::new(22.0, -102.0, 1800.0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 10, 17, 18, 0, 0).unwrap()
    }

    fn area() -> BoundingBox {
        BoundingBox::new(20.0, -104.0, 24.0, -100.0).unwrap()
    }

    fn flight(id: &str, lat: f64, lon: f64) -> AircraftState {
        AircraftState {
            id: id.to_string(),
            origin: "MEX".to_string(),
            destination: "TIJ".to_string(),
            latitude: lat,
            longitude: lon,
            elevation_m: 11_000.0,
            speed_kmh: 0.1,
            heading_deg: 0.0,
            climb: None,
            aircraft_type: None,
        }
    }

    fn request() -> ScanRequest {
        ScanRequest::new(observer(), TargetSelector::Both).with_bounding_box(area())
    }

    fn engine(
        sun: HorizontalCoordinates,
        moon: HorizontalCoordinates,
        flights: Vec<AircraftState>,
    ) -> TransitEngine<TwoBodyEphemeris, StaticFlights> {
        TransitEngine::new(
            EngineConfig::default(),
            TwoBodyEphemeris { sun, moon },
            StaticFlights::new(flights),
        )
    }

    fn candidate(
        id: &str,
        possible: bool,
        separation: f64,
        minutes: f64,
    ) -> TransitCandidate {
        TransitCandidate {
            target: CelestialBody::Sun,
            aircraft: flight(id, 22.0, -102.0),
            distance_nm: 10.0,
            closest: Some(ClosestApproach {
                minutes,
                aircraft_alt_deg: 40.0,
                aircraft_az_deg: 180.0,
                target_alt_deg: 40.0,
                target_az_deg: 180.0,
                alt_diff_deg: 0.0,
                az_diff_deg: 0.0,
                separation_deg: separation,
            }),
            is_possible_transit: possible,
            possibility_level: if possible {
                PossibilityLevel::High
            } else {
                PossibilityLevel::Unlikely
            },
        }
    }

    #[test]
    fn test_sort_contract() {
        let mut candidates = vec![
            candidate("D", false, 0.1, 1.0),
            candidate("C", true, 3.0, 2.0),
            candidate("B", true, 0.5, 8.0),
            candidate("A", true, 0.5, 3.0),
        ];
        sort_candidates(&mut candidates);
        let ids: Vec<&str> = candidates.iter().map(|c| c.aircraft.id.as_str()).collect();
        // Reportable first, then tighter separation, then sooner approach
        assert_eq!(ids, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_sort_is_deterministic_on_ties() {
        let mut candidates = vec![
            candidate("B", true, 1.0, 5.0),
            candidate("A", true, 1.0, 5.0),
        ];
        sort_candidates(&mut candidates);
        assert_eq!(candidates[0].aircraft.id, "A");
    }

    #[test]
    fn test_poll_interval_bands() {
        let engine = engine(
            HorizontalCoordinates::new(40.0, 180.0),
            HorizontalCoordinates::new(40.0, 180.0),
            vec![],
        );
        assert_eq!(engine.next_poll_seconds(&[candidate("A", true, 0.5, 1.0)]), 30);
        assert_eq!(engine.next_poll_seconds(&[candidate("A", true, 0.5, 4.0)]), 60);
        assert_eq!(engine.next_poll_seconds(&[candidate("A", true, 0.5, 9.0)]), 120);
        assert_eq!(engine.next_poll_seconds(&[candidate("A", true, 0.5, 12.0)]), 600);
        // Non-reportable candidates never shorten the interval
        assert_eq!(engine.next_poll_seconds(&[candidate("A", false, 0.5, 1.0)]), 600);
        assert_eq!(engine.next_poll_seconds(&[]), 600);
    }

    #[tokio::test]
    async fn test_low_sun_is_surveyed_but_not_tracked() {
        // Sun at 5 deg, Moon at 40 deg, minimum trackable 15 deg
        let engine = engine(
            HorizontalCoordinates::new(5.0, 250.0),
            HorizontalCoordinates::new(40.0, 120.0),
            vec![flight("AMX1", 22.1, -102.0)],
        );

        let report = engine.scan_at(&request(), now()).await.unwrap();

        assert_eq!(report.tracked_targets, vec![CelestialBody::Moon]);
        // Both bodies still appear in the coordinate table
        assert_eq!(report.target_coordinates.len(), 2);
        assert!(report
            .candidates
            .iter()
            .all(|c| c.target == CelestialBody::Moon));
    }

    #[tokio::test]
    async fn test_no_trackable_target_skips_flight_fetch() {
        let engine = engine(
            HorizontalCoordinates::new(-10.0, 250.0),
            HorizontalCoordinates::new(5.0, 120.0),
            vec![flight("AMX1", 22.1, -102.0)],
        );

        let report = engine.scan_at(&request(), now()).await.unwrap();

        assert!(report.tracked_targets.is_empty());
        assert!(report.candidates.is_empty());
        assert_eq!(report.next_poll_seconds, 600);
        assert_eq!(engine.flights.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_repeat_scan_hits_cache() {
        let engine = engine(
            HorizontalCoordinates::new(40.0, 180.0),
            HorizontalCoordinates::new(40.0, 180.0),
            vec![flight("AMX1", 22.1, -102.0)],
        );

        engine.scan_at(&request(), now()).await.unwrap();
        engine.scan_at(&request(), now()).await.unwrap();

        assert_eq!(engine.flights.fetch_count(), 1);
        let stats = engine.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_flights_outside_area_are_filtered() {
        let engine = engine(
            HorizontalCoordinates::new(40.0, 180.0),
            HorizontalCoordinates::new(5.0, 120.0),
            vec![
                flight("INSIDE", 22.1, -102.0),
                flight("OUTSIDE", 30.0, -102.0),
            ],
        );

        let report = engine.scan_at(&request(), now()).await.unwrap();

        assert_eq!(report.candidates.len(), 1);
        assert_eq!(report.candidates[0].aircraft.id, "INSIDE");
    }

    #[tokio::test]
    async fn test_overhead_flight_reported_as_transit() {
        let obs = observer();
        // Pin the sun exactly where a slow aircraft sits
        let aircraft_pos = geographic_to_horizontal(22.05, -102.0, 11_000.0, &obs);
        let engine = engine(
            aircraft_pos,
            HorizontalCoordinates::new(-20.0, 0.0),
            vec![flight("AMX1", 22.05, -102.0)],
        );

        let report = engine.scan_at(&request(), now()).await.unwrap();

        assert_eq!(report.candidates.len(), 1);
        let c = &report.candidates[0];
        assert!(c.is_possible_transit);
        assert_eq!(c.possibility_level, PossibilityLevel::High);
        assert_eq!(report.next_poll_seconds, 30);
        assert_eq!(report.bounding_box, Some(area()));
    }

    #[tokio::test]
    async fn test_recalculate_matches_scan_without_fetch() {
        let obs = observer();
        let aircraft_pos = geographic_to_horizontal(22.05, -102.0, 11_000.0, &obs);
        let flights = vec![flight("AMX1", 22.05, -102.0)];
        let engine = engine(
            aircraft_pos,
            HorizontalCoordinates::new(-20.0, 0.0),
            flights.clone(),
        );

        let scanned = engine.scan_at(&request(), now()).await.unwrap();
        let fetches_after_scan = engine.flights.fetch_count();
        let recalculated = engine.recalculate_at(&request(), &flights, now()).unwrap();

        assert_eq!(engine.flights.fetch_count(), fetches_after_scan);
        assert_eq!(recalculated.bounding_box, None);
        assert_eq!(recalculated.candidates, scanned.candidates);
        assert_eq!(recalculated.tracked_targets, scanned.tracked_targets);
        assert_eq!(recalculated.next_poll_seconds, scanned.next_poll_seconds);
    }

    #[tokio::test]
    async fn test_missing_search_area_is_rejected() {
        let engine = engine(
            HorizontalCoordinates::new(40.0, 180.0),
            HorizontalCoordinates::new(40.0, 180.0),
            vec![],
        );
        let request = ScanRequest::new(observer(), TargetSelector::Sun);

        assert!(matches!(
            engine.scan_at(&request, now()).await,
            Err(EngineError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_nonpositive_gate_is_rejected() {
        let engine = engine(
            HorizontalCoordinates::new(40.0, 180.0),
            HorizontalCoordinates::new(40.0, 180.0),
            vec![],
        );
        let request = request().with_gates(0.0, 10.0);

        assert!(matches!(
            engine.scan_at(&request, now()).await,
            Err(EngineError::InvalidInput(_))
        ));
    }
}
