/// NHDPlus flowline network WFS client, used for fine-grained snapping.
///
///   https://api.water.usgs.gov/geoserver/wmadata/ows
///
/// A bounding-box GetFeature against `wmadata:nhdflowline_network` returns
/// every reach near the clicked point with its `comid`; the snapping module
/// then picks the closest one.

use super::{fetch_feature_collection, with_query};
use crate::error::SourceError;
use crate::geometry::BoundingBox;
use crate::http::{CancelSignal, Fetcher};
use crate::model::{FlowlineRef, SnapMethod};

pub const HYDROGRAPHY_WFS_URL: &str = "https://api.water.usgs.gov/geoserver/wmadata/ows";

pub const FLOWLINE_LAYER: &str = "wmadata:nhdflowline_network";

/// Upper bound on reaches returned for one search box.
const MAX_FEATURES: u32 = 50;

const SOURCE: &str = "Flowline network";

/// WFS 1.0.0 keeps the bbox in lon/lat order for EPSG:4326.
pub fn build_flowline_query_url(base: &str, bbox: &BoundingBox) -> String {
    with_query(
        base,
        &[
            ("service", "WFS".to_string()),
            ("version", "1.0.0".to_string()),
            ("request", "GetFeature".to_string()),
            ("typeName", FLOWLINE_LAYER.to_string()),
            ("outputFormat", "application/json".to_string()),
            ("srsName", "EPSG:4326".to_string()),
            ("maxFeatures", MAX_FEATURES.to_string()),
            (
                "bbox",
                format!(
                    "{:.6},{:.6},{:.6},{:.6}",
                    bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
                ),
            ),
        ],
    )
}

/// Reaches intersecting `bbox`. Features without a `comid` are dropped.
pub async fn query_flowlines(
    fetcher: &Fetcher,
    base: &str,
    bbox: &BoundingBox,
    cancel: Option<&CancelSignal>,
) -> Result<Vec<FlowlineRef>, SourceError> {
    let url = build_flowline_query_url(base, bbox);
    let fc = fetch_feature_collection(fetcher, SOURCE, &url, cancel).await?;
    Ok(fc
        .features
        .iter()
        .filter_map(|f| FlowlineRef::from_feature(f, SnapMethod::NetworkQuery))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::fixture_flowline_network;

    #[test]
    fn test_query_url_bbox_order() {
        let bbox = BoundingBox {
            min_lon: -80.1,
            min_lat: 40.0,
            max_lon: -79.9,
            max_lat: 40.2,
        };
        let url = build_flowline_query_url(HYDROGRAPHY_WFS_URL, &bbox);
        assert!(url.contains("typeName=wmadata%3Anhdflowline_network"));
        assert!(url.contains("bbox=-80.100000%2C40.000000%2C-79.900000%2C40.200000"));
    }

    #[test]
    fn test_fixture_flowlines_decode() {
        let fc: geojson::FeatureCollection = serde_json::from_str(fixture_flowline_network()).unwrap();
        let flowlines: Vec<FlowlineRef> = fc
            .features
            .iter()
            .filter_map(|f| FlowlineRef::from_feature(f, SnapMethod::NetworkQuery))
            .collect();
        assert_eq!(flowlines.len(), 2);
        assert_eq!(flowlines[0].comid, "13297246");
        assert_eq!(flowlines[0].name.as_deref(), Some("Chartiers Creek"));
        assert_eq!(flowlines[1].method, SnapMethod::NetworkQuery);
    }
}
