/// HydroShare NHDPlus HR catchment WFS client.
///
///   https://geoserver.hydroshare.org/geoserver/NHDPlus_HR/wfs
///
/// Catchments are looked up by `FEATUREID`, which matches the reach
/// identifier found during snapping. The filter is an integer comparison, so
/// identifiers that are not integers cannot be queried.

use super::{fetch_feature_collection, with_query};
use crate::error::SourceError;
use crate::http::{CancelSignal, Fetcher};
use crate::model::{BasinCollection, BasinSource};

pub const HYDROSHARE_WFS_URL: &str = "https://geoserver.hydroshare.org/geoserver/NHDPlus_HR/wfs";

pub const CATCHMENT_LAYER: &str = "NHDPlus_HR:NHDPlusCatchment";

const SOURCE: &str = "HydroShare catchment";

/// `None` when `comid` is not an integer.
pub fn build_catchment_url(base: &str, comid: &str) -> Option<String> {
    let featureid: i64 = comid.trim().parse().ok()?;
    Some(with_query(
        base,
        &[
            ("service", "WFS".to_string()),
            ("version", "2.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeNames", CATCHMENT_LAYER.to_string()),
            ("outputFormat", "application/json".to_string()),
            ("cql_filter", format!("FEATUREID={}", featureid)),
        ],
    ))
}

pub async fn fetch_catchment(
    fetcher: &Fetcher,
    base: &str,
    comid: &str,
    cancel: Option<&CancelSignal>,
) -> Result<BasinCollection, SourceError> {
    let url = build_catchment_url(base, comid)
        .ok_or_else(|| SourceError::invalid(SOURCE, format!("reach id '{}' is not an integer", comid)))?;
    let fc = fetch_feature_collection(fetcher, SOURCE, &url, cancel).await?;
    Ok(BasinCollection::from_geojson(&fc, BasinSource::HydroShare, Some(comid)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::fixture_hydroshare_catchment;

    #[test]
    fn test_catchment_url_filters_by_integer_id() {
        let url = build_catchment_url(HYDROSHARE_WFS_URL, "13297246").unwrap();
        assert!(url.contains("cql_filter=FEATUREID%3D13297246"));
        assert!(url.contains("typeNames=NHDPlus_HR%3ANHDPlusCatchment"));
        assert!(build_catchment_url(HYDROSHARE_WFS_URL, "abc").is_none());
    }

    #[test]
    fn test_fixture_normalizes_to_basin() {
        let fc: geojson::FeatureCollection = serde_json::from_str(fixture_hydroshare_catchment()).unwrap();
        let basin = BasinCollection::from_geojson(&fc, BasinSource::HydroShare, Some("13297246"));
        assert_eq!(basin.features.len(), 1);
        assert_eq!(basin.features[0].comid.as_deref(), Some("13297246"));
    }
}
