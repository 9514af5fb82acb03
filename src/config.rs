/// Service configuration loader - parses watershed.toml
///
/// Keeps upstream endpoints, retry policy, cache location and sampling
/// parameters out of the code. Every field has a default, so a missing file
/// (or a file with only a few overrides) yields a working configuration.
///
/// Environment overrides, read after `.env` is loaded:
///   WATERSHED_CONFIG       path to the TOML file (default `watershed.toml`)
///   WATERSHED_CACHE_DIR    replaces `[cache].dir`
///   WATERSHED_PROXY_BASE   replaces `[http].proxy_base` (empty disables the proxy)

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::ingest::{geocode, hydrography, hydroshare, nlcd, nldi, noaa, streamstats};

pub const DEFAULT_CONFIG_PATH: &str = "watershed.toml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub http: HttpConfig,
    pub endpoints: EndpointConfig,
    pub rainfall: RainfallConfig,
    pub cache: CacheConfig,
    pub delineation: DelineationConfig,
    pub landcover: LandCoverConfig,
}

/// Resilient fetch policy.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    /// CORS-bridging proxy; empty string disables wrapping.
    pub proxy_base: String,
    /// Try each target directly before the proxy fallback.
    pub direct_first: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_ms: 60_000,
            retries: 2,
            backoff_ms: 300,
            proxy_base: "https://api.allorigins.win/get".to_string(),
            direct_first: true,
            user_agent: concat!("watershed_service/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn proxy(&self) -> Option<String> {
        let trimmed = self.proxy_base.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Upstream base URLs. Overridable so tests and mirrors can point elsewhere.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub noaa: String,
    pub streamstats: String,
    pub geocode: String,
    pub nldi: String,
    pub nldi_processes: String,
    pub hydrography: String,
    pub hydroshare: String,
    pub nlcd: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            noaa: noaa::NOAA_BASE_URL.to_string(),
            streamstats: streamstats::STREAMSTATS_BASE_URL.to_string(),
            geocode: geocode::GEOCODE_BASE_URL.to_string(),
            nldi: nldi::NLDI_BASE_URL.to_string(),
            nldi_processes: nldi::NLDI_PROCESSES_URL.to_string(),
            hydrography: hydrography::HYDROGRAPHY_WFS_URL.to_string(),
            hydroshare: hydroshare::HYDROSHARE_WFS_URL.to_string(),
            nlcd: nlcd::NLCD_WMS_URL.to_string(),
        }
    }
}

impl EndpointConfig {
    /// `(label, url)` pairs probed by the health check.
    pub fn probe_targets(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("NOAA Atlas 14", self.noaa.as_str()),
            ("StreamStats", self.streamstats.as_str()),
            ("Reverse geocoder", self.geocode.as_str()),
            ("NLDI", self.nldi.as_str()),
            ("NLDI processes", self.nldi_processes.as_str()),
            ("Flowline network", self.hydrography.as_str()),
            ("HydroShare", self.hydroshare.as_str()),
            ("NLCD", self.nlcd.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RainfallConfig {
    /// Serve the smooth lat/lon approximation when NOAA fails.
    pub synthetic_fallback: bool,
}

impl Default for RainfallConfig {
    fn default() -> Self {
        RainfallConfig {
            synthetic_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub namespace: String,
    pub max_entries: usize,
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            dir: PathBuf::from(".watershed-cache"),
            namespace: "rainfall".to_string(),
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
            ttl_hours: 30 * 24,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours.saturating_mul(3600))
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DelineationConfig {
    /// Half-width of the flowline search box around the clicked point.
    pub search_radius_m: f64,
    /// Network matches farther than this fall through to the position lookup.
    pub max_snap_distance_m: f64,
    pub synthetic_half_width_m: f64,
    /// Whether the square-buffer placeholder is allowed to end the cascade.
    pub synthetic_fallback: bool,
}

impl Default for DelineationConfig {
    fn default() -> Self {
        DelineationConfig {
            search_radius_m: 1000.0,
            max_snap_distance_m: 500.0,
            synthetic_half_width_m: 500.0,
            synthetic_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LandCoverConfig {
    pub samples: usize,
    /// Concurrent classification queries per batch.
    pub batch_size: usize,
}

impl Default for LandCoverConfig {
    fn default() -> Self {
        LandCoverConfig {
            samples: 20,
            batch_size: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn parse_config(contents: &str, path: &str) -> Result<ServiceConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Reads `path`; a missing file is the default configuration.
pub fn load_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let display = path.display().to_string();
    match fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents, &display),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ServiceConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: display,
            source,
        }),
    }
}

/// Loads `.env`, resolves the config path (explicit argument, then
/// `WATERSHED_CONFIG`, then `watershed.toml`) and applies env overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    dotenv::dotenv().ok();

    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => env::var("WATERSHED_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    };

    let mut config = load_from(&path)?;
    apply_overrides(&mut config, |key| env::var(key).ok());
    Ok(config)
}

/// Applies environment overrides through `lookup` so tests need not touch
/// the process environment.
pub fn apply_overrides(config: &mut ServiceConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(dir) = lookup("WATERSHED_CACHE_DIR").filter(|d| !d.trim().is_empty()) {
        config.cache.dir = PathBuf::from(dir);
    }
    if let Some(proxy) = lookup("WATERSHED_PROXY_BASE") {
        config.http.proxy_base = proxy;
    }
}
