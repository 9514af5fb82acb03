/// USGS StreamStats watershed delineation client.
///
///   https://streamstats.usgs.gov/streamstatsservices/watershed.geojson
///
/// The service does not return a bare FeatureCollection. It returns a list of
/// named results under `featurecollection`, one of which (`globalwatershed`)
/// holds the basin polygon; another (`globalwatershedpoint`) holds the
/// pour point. See `fixtures.rs`.

use super::{fetch_json, with_query};
use crate::error::SourceError;
use crate::http::normalize::{into_feature_collection, select_named_result};
use crate::http::{CancelSignal, Fetcher};
use crate::model::{BasinCollection, BasinSource};

pub const STREAMSTATS_BASE_URL: &str = "https://streamstats.usgs.gov/streamstatsservices/watershed.geojson";

/// Named result carrying the basin polygon.
pub const WATERSHED_RESULT: &str = "globalwatershed";

const SOURCE: &str = "StreamStats";

pub fn build_watershed_url(base: &str, rcode: &str, lat: f64, lon: f64) -> String {
    with_query(
        base,
        &[
            ("rcode", rcode.to_string()),
            ("xlocation", lon.to_string()),
            ("ylocation", lat.to_string()),
            ("crs", "4326".to_string()),
            ("includeparameters", "false".to_string()),
            ("includefeatures", "true".to_string()),
            ("simplify", "true".to_string()),
        ],
    )
}

/// Picks the basin out of a watershed response. An empty collection means
/// the service answered but had no polygon for this point.
pub fn parse_watershed(value: &serde_json::Value) -> Result<BasinCollection, SourceError> {
    let named = select_named_result(value, WATERSHED_RESULT).map_err(|e| SourceError::shape(SOURCE, e))?;
    let fc = into_feature_collection(named).map_err(|e| SourceError::shape(SOURCE, e))?;
    Ok(BasinCollection::from_geojson(&fc, BasinSource::StreamStats, None))
}

pub async fn fetch_watershed(
    fetcher: &Fetcher,
    base: &str,
    rcode: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<BasinCollection, SourceError> {
    let url = build_watershed_url(base, rcode, lat, lon);
    let value = fetch_json(fetcher, SOURCE, &url, cancel).await?;
    parse_watershed(&value)
}
