/// USGS Network-Linked Data Index (NLDI) client.
///
///   https://api.water.usgs.gov/nldi/linked-data
///   https://api.water.usgs.gov/nldi/pygeoapi/processes
///
/// Four calls are used:
/// - `comid/position`        coarse flowline snap for a WKT point
/// - `comid/{id}/basin`      upstream basin for a reach
/// - `nldi-splitcatchment`   catchment split at a point on the flowline (POST)
/// - `comid/{id}/navigate/UT/flowlines`  upstream tributary trace

use serde_json::{Value, json};

use super::{GEOJSON_ACCEPT, fetch_body, fetch_feature_collection, with_query};
use crate::error::SourceError;
use crate::http::normalize::{into_feature_collection, normalize_json, select_features_by_id, select_named_result};
use crate::http::{CancelSignal, Fetcher, RequestInit};
use crate::model::{BasinCollection, BasinSource, FlowlineRef, SnapMethod};

pub const NLDI_BASE_URL: &str = "https://api.water.usgs.gov/nldi/linked-data";
pub const NLDI_PROCESSES_URL: &str = "https://api.water.usgs.gov/nldi/pygeoapi/processes";

/// Split-catchment outputs in order of preference.
const SPLIT_FEATURE_IDS: [&str; 2] = ["drainageBasin", "splitCatchment"];

pub const DEFAULT_TRACE_DISTANCE_KM: f64 = 25.0;

// ---------------------------------------------------------------------------
// Position snap
// ---------------------------------------------------------------------------

pub fn build_position_url(base: &str, lat: f64, lon: f64) -> String {
    with_query(
        &format!("{}/comid/position", base),
        &[("f", "json".to_string()), ("coords", format!("POINT({} {})", lon, lat))],
    )
}

/// First feature carrying a line geometry and a reach identifier.
pub fn parse_position(fc: &geojson::FeatureCollection) -> Result<FlowlineRef, SourceError> {
    const SOURCE: &str = "NLDI position";
    if fc.features.is_empty() {
        return Err(SourceError::not_found(SOURCE, "no flowline near the selected location"));
    }
    fc.features
        .iter()
        .find_map(|f| FlowlineRef::from_feature(f, SnapMethod::PositionLookup))
        .ok_or_else(|| SourceError::invalid(SOURCE, "flowline is missing its reach identifier"))
}

pub async fn fetch_flowline_at(
    fetcher: &Fetcher,
    base: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<FlowlineRef, SourceError> {
    let url = build_position_url(base, lat, lon);
    let fc = fetch_feature_collection(fetcher, "NLDI position", &url, cancel).await?;
    parse_position(&fc)
}

// ---------------------------------------------------------------------------
// Basin by reach id
// ---------------------------------------------------------------------------

pub fn build_basin_url(base: &str, comid: &str) -> String {
    format!(
        "{}/comid/{}/basin?f=json&simplified=true&splitCatchment=false",
        base,
        urlencoding::encode(comid)
    )
}

pub async fn fetch_basin(
    fetcher: &Fetcher,
    base: &str,
    comid: &str,
    cancel: Option<&CancelSignal>,
) -> Result<BasinCollection, SourceError> {
    let url = build_basin_url(base, comid);
    let fc = fetch_feature_collection(fetcher, "NLDI basin", &url, cancel).await?;
    Ok(BasinCollection::from_geojson(&fc, BasinSource::Nldi, Some(comid)))
}

// ---------------------------------------------------------------------------
// Split catchment
// ---------------------------------------------------------------------------

pub fn build_split_catchment_url(processes_base: &str) -> String {
    format!("{}/nldi-splitcatchment/execution", processes_base)
}

pub fn split_catchment_body(lat: f64, lon: f64) -> String {
    json!({
        "inputs": [
            { "id": "lat", "type": "text/plain", "value": lat.to_string() },
            { "id": "lon", "type": "text/plain", "value": lon.to_string() },
            { "id": "upstream", "type": "text/plain", "value": "true" }
        ]
    })
    .to_string()
}

/// The process answers either with a FeatureCollection whose features are
/// tagged `catchment` / `splitCatchment` / `drainageBasin`, or with those
/// collections listed as named outputs.
pub fn parse_split_catchment(value: &Value) -> Result<BasinCollection, SourceError> {
    const SOURCE: &str = "NLDI split catchment";

    let collection = SPLIT_FEATURE_IDS
        .iter()
        .find_map(|id| select_named_result(value, id).ok())
        .ok_or_else(|| SourceError::not_found(SOURCE, "no catchment in process output"))?;
    let preferred = select_features_by_id(&collection, &SPLIT_FEATURE_IDS).unwrap_or(collection);

    let fc = into_feature_collection(preferred).map_err(|e| SourceError::shape(SOURCE, e))?;
    Ok(BasinCollection::from_geojson(&fc, BasinSource::NldiSplit, None))
}

/// Runs the split at `(lat, lon)`, which should already sit on a flowline.
pub async fn fetch_split_catchment(
    fetcher: &Fetcher,
    processes_base: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<BasinCollection, SourceError> {
    const SOURCE: &str = "NLDI split catchment";
    let url = build_split_catchment_url(processes_base);
    let mut init = RequestInit::post_json(split_catchment_body(lat, lon));
    init.headers.retain(|(k, _)| k != "Accept");
    init.headers.push(("Accept".to_string(), GEOJSON_ACCEPT.to_string()));

    let response = fetch_body(fetcher, SOURCE, &url, init, cancel).await?;
    let value = normalize_json(&response.body, response.content_type.as_deref())
        .map_err(|e| SourceError::shape(SOURCE, e))?;
    parse_split_catchment(&value)
}

// ---------------------------------------------------------------------------
// Upstream trace
// ---------------------------------------------------------------------------

pub fn build_upstream_url(base: &str, comid: &str, distance_km: f64) -> String {
    format!(
        "{}/comid/{}/navigate/UT/flowlines?distance={}&f=json",
        base,
        urlencoding::encode(comid),
        distance_km
    )
}

/// Flowlines upstream of `comid` along all tributaries, up to `distance_km`.
pub async fn upstream_flowlines(
    fetcher: &Fetcher,
    base: &str,
    comid: &str,
    distance_km: f64,
    cancel: Option<&CancelSignal>,
) -> Result<Vec<FlowlineRef>, SourceError> {
    let url = build_upstream_url(base, comid, distance_km);
    let fc = fetch_feature_collection(fetcher, "NLDI upstream trace", &url, cancel).await?;
    Ok(fc
        .features
        .iter()
        .filter_map(|f| FlowlineRef::from_feature(f, SnapMethod::PositionLookup))
        .collect())
}
