//! One-shot transit scan, printing the report as JSON.
//!
//! Observer position comes from `SKYTRANSIT_LAT` / `SKYTRANSIT_LON` /
//! `SKYTRANSIT_ELEVATION_M`, the target selector from the first CLI
//! argument (`sun`, `moon`, or `both`; defaults to `both`), engine
//! tuning from `skytransit.toml`, and the feed key from
//! `AEROAPI_API_KEY`.

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skytransit::api::ObserverPosition;
use skytransit::config::{flight_feed_api_key, EngineConfig};
use skytransit::ephemeris::PaEphemeris;
use skytransit::flights::AeroApiClient;
use skytransit::{ScanRequest, TargetSelector, TransitEngine};

fn env_f64(name: &str) -> anyhow::Result<f64> {
    let raw = env::var(name).with_context(|| format!("{} is not set", name))?;
    raw.parse()
        .with_context(|| format!("{} is not a number: {:?}", name, raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let selector = match env::args().nth(1) {
        Some(arg) => TargetSelector::from_str(&arg)?,
        None => TargetSelector::Both,
    };

    let observer = ObserverPosition::new(
        env_f64("SKYTRANSIT_LAT")?,
        env_f64("SKYTRANSIT_LON")?,
        env::var("SKYTRANSIT_ELEVATION_M")
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
            .context("SKYTRANSIT_ELEVATION_M is not a number")?
            .unwrap_or(0.0),
    )?;

    let config = EngineConfig::from_default_location()?;
    let api_key = flight_feed_api_key()
        .ok_or_else(|| anyhow!("AEROAPI_API_KEY is not set"))?;
    let feed = AeroApiClient::new(&config.flight_feed, &api_key)?;

    let mut request = ScanRequest::new(observer, selector)
        .with_gates(
            config.thresholds.alt_gate_deg,
            config.thresholds.az_gate_deg,
        )
        .with_min_trackable_altitude(config.thresholds.min_trackable_altitude_deg);
    if let Some(bbox) = config.default_bounding_box()? {
        request = request.with_bounding_box(bbox);
    }

    let engine = TransitEngine::new(config, PaEphemeris::new(), feed);
    let report = engine.scan(&request).await?;

    info!(
        candidates = report.candidates.len(),
        tracked = report.tracked_targets.len(),
        next_poll_seconds = report.next_poll_seconds,
        "scan complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
