//! Service layer for the prediction engine.
//!
//! This module contains the engine logic proper: dead-reckoning and
//! coordinate transforms, the closest-approach search with its
//! classifier, and the orchestrator that drives a full scan across
//! tracked targets.

pub mod kinematics;

pub mod orchestrator;

pub mod transit_search;

pub use orchestrator::TransitEngine;
pub use transit_search::{check_transit, classify_separation, SearchWindow};
