//! Sun/Moon aircraft transit prediction engine.
//!
//! Given a fixed ground observer, the engine fetches aircraft in a
//! surrounding area from a live flight feed, dead-reckons each aircraft
//! over a short look-ahead window, and scores how closely its apparent
//! path approaches the Sun or the Moon in the observer's sky. The output
//! is a sorted list of [`api::TransitCandidate`] records plus a
//! recommended next-poll interval, so a caller can tighten its polling
//! as a photogenic transit gets close.
//!
//! Entry point: build a [`services::TransitEngine`] from an
//! [`config::EngineConfig`], an ephemeris provider, and a flight data
//! source, then call `scan` (or `recalculate` to re-score cached
//! flights without feed traffic).

pub mod api;
pub mod config;
pub mod ephemeris;
pub mod error;
pub mod flights;
pub mod services;

pub use api::{ScanRequest, TargetSelector, TransitReport};
pub use error::{EngineError, EngineResult};
pub use services::TransitEngine;
