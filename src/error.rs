/// Error taxonomy for the data-acquisition layer.
///
/// Errors are layered the same way the pipeline is:
///
/// - `TransportError` — one request failed (network, timeout, caller cancel).
/// - `FetchError`     — the resilient fetch gave up after every attempt.
/// - `ShapeError`     — a 200 response that is not the structure we asked for.
/// - `SourceError`    — anything a single upstream source (a cascade tier,
///                      the rainfall client) can fail with.
/// - `DelineationError` / `RainfallError` / `LandCoverError` — the outermost
///   combinators. Their messages are suitable for direct display.

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Single request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("request was cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Network(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Resilient fetch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// Every attempt failed. `status` is the last HTTP status seen, if the
    /// last failure was a response rather than a transport error.
    #[error("request failed after {attempts} attempt(s): {detail}")]
    Exhausted {
        attempts: u32,
        status: Option<u16>,
        detail: String,
    },

    #[error("request was cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShapeError {
    #[error("response is not valid JSON (content-type {content_type}): {preview}")]
    NotJson {
        content_type: String,
        preview: String,
    },

    #[error("expected a FeatureCollection but found {found}: {preview}")]
    NotFeatureCollection { found: String, preview: String },

    #[error("FeatureCollection is missing its features array: {preview}")]
    MissingFeatures { preview: String },

    #[error("no result named '{wanted}' and no entry carrying a FeatureCollection")]
    NoNamedResult { wanted: String },

    #[error("GeoJSON could not be decoded: {0}")]
    InvalidGeoJson(String),
}

// ---------------------------------------------------------------------------
// Upstream sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    #[error("{source_name}: {error}")]
    Fetch {
        source_name: &'static str,
        error: FetchError,
    },

    #[error("{source_name}: {error}")]
    Shape {
        source_name: &'static str,
        error: ShapeError,
    },

    #[error("{source_name}: {message}")]
    NotFound {
        source_name: &'static str,
        message: String,
    },

    #[error("{source_name}: {message}")]
    Invalid {
        source_name: &'static str,
        message: String,
    },
}

impl SourceError {
    pub fn fetch(source_name: &'static str, error: FetchError) -> Self {
        SourceError::Fetch { source_name, error }
    }

    pub fn shape(source_name: &'static str, error: ShapeError) -> Self {
        SourceError::Shape { source_name, error }
    }

    pub fn not_found(source_name: &'static str, message: impl Into<String>) -> Self {
        SourceError::NotFound {
            source_name,
            message: message.into(),
        }
    }

    pub fn invalid(source_name: &'static str, message: impl Into<String>) -> Self {
        SourceError::Invalid {
            source_name,
            message: message.into(),
        }
    }

    /// True when the caller's cancel signal fired somewhere underneath.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SourceError::Fetch {
                error: FetchError::Cancelled,
                ..
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Outermost combinators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DelineationError {
    #[error("invalid coordinate ({lat}, {lon}): latitude must be within ±90 and longitude within ±180")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Unable to delineate a basin: {0}")]
    Exhausted(String),

    #[error("delineation was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RainfallError {
    #[error("invalid coordinate ({lat}, {lon}): latitude and longitude must be finite")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Rainfall lookup failed after attempting NOAA and synthetic fallbacks: {0}")]
    Exhausted(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LandCoverError {
    #[error("land cover sampling was cancelled")]
    Cancelled,
}

/// A session step that could not run. The message is what lands in the
/// session's `last_error`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Delineation(#[from] DelineationError),

    #[error(transparent)]
    Rainfall(#[from] RainfallError),

    #[error(transparent)]
    LandCover(#[from] LandCoverError),

    #[error("no watershed delineated yet")]
    NotDelineated,

    #[error("no rainfall depth selected")]
    NoRainfall,

    #[error("rainfall table has no duration '{0}'")]
    UnknownDuration(String),

    #[error("rainfall table has no recurrence interval '{0}'")]
    UnknownInterval(String),

    #[error("no saved scenario with id '{0}'")]
    UnknownScenario(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}
