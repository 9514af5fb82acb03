/// Reverse geocoding for StreamStats region codes.
///
/// StreamStats keys its basin service by state ("rcode"). The state is taken
/// from the BigDataCloud client reverse-geocoding endpoint, which reports it
/// as an ISO 3166-2 subdivision code such as `US-PA`.

use serde::Deserialize;

use super::{fetch_json, with_query};
use crate::error::SourceError;
use crate::http::{CancelSignal, Fetcher};

pub const GEOCODE_BASE_URL: &str = "https://api.bigdatacloud.net/data/reverse-geocode-client";

const SOURCE: &str = "Reverse geocoder";

#[derive(Debug, Deserialize)]
struct ReverseGeocode {
    #[serde(rename = "principalSubdivisionCode", default)]
    principal_subdivision_code: Option<String>,
}

pub fn build_reverse_geocode_url(base: &str, lat: f64, lon: f64) -> String {
    with_query(
        base,
        &[
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("localityLanguage", "en".to_string()),
        ],
    )
}

/// `"US-PA"` → `"PA"`. Subdivisions outside the US have no StreamStats region.
pub fn region_code_from_subdivision(code: &str) -> Option<String> {
    let state = code.trim().strip_prefix("US-")?;
    let valid = state.len() == 2 && state.chars().all(|c| c.is_ascii_alphabetic());
    valid.then(|| state.to_ascii_uppercase())
}

/// `Ok(None)` when the point resolves but not to a US state.
pub async fn fetch_region_code(
    fetcher: &Fetcher,
    base: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<Option<String>, SourceError> {
    let url = build_reverse_geocode_url(base, lat, lon);
    let value = fetch_json(fetcher, SOURCE, &url, cancel).await?;
    let parsed: ReverseGeocode = serde_json::from_value(value)
        .map_err(|e| SourceError::invalid(SOURCE, e.to_string()))?;

    Ok(parsed
        .principal_subdivision_code
        .as_deref()
        .and_then(region_code_from_subdivision))
}
