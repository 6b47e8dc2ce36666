//! Error types for the transit prediction engine.
//!
//! One error enum covers the whole engine so callers can match on the
//! failure class: bad input is reported before any search work starts,
//! and upstream failures (ephemeris, flight feed) stay distinct from
//! "no transits found".

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Error type for transit engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid caller input: observer coordinates, bounding box, or
    /// request parameters out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A celestial target name that the engine does not know.
    /// Raised immediately rather than defaulting to a body silently.
    #[error("unknown celestial target: {0:?} (expected \"sun\", \"moon\" or \"both\")")]
    UnknownTarget(String),

    /// The ephemeris provider failed to produce a position.
    #[error("ephemeris error: {0}")]
    Ephemeris(String),

    /// The flight-data feed failed (HTTP error, timeout, malformed body).
    #[error("flight feed error: {0}")]
    FlightFeed(String),

    /// Malformed or missing configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::FlightFeed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = EngineError::InvalidInput("latitude out of range".to_string());
        assert_eq!(err.to_string(), "invalid input: latitude out of range");

        let err = EngineError::UnknownTarget("mars".to_string());
        assert!(err.to_string().contains("mars"));
        assert!(err.to_string().contains("expected"));
    }
}
