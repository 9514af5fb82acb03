/// MRLC NLCD 2021 land cover WMS client.
///
///   https://www.mrlc.gov/geoserver/mrlc_display/NLCD_2021_Land_Cover_L48/wms
///
/// A GetFeatureInfo over a 2×2 pixel window centred on the point returns the
/// land cover class as `PALETTE_INDEX` on the first feature.

use serde_json::Value;

use super::{fetch_json, with_query};
use crate::error::SourceError;
use crate::http::{CancelSignal, Fetcher};

pub const NLCD_WMS_URL: &str = "https://www.mrlc.gov/geoserver/mrlc_display/NLCD_2021_Land_Cover_L48/wms";
pub const NLCD_LAYER: &str = "NLCD_2021_Land_Cover_L48";

/// Half-width of the query window, degrees.
const WINDOW_DEG: f64 = 0.0001;

const SOURCE: &str = "NLCD land cover";

pub fn build_feature_info_url(base: &str, lat: f64, lon: f64) -> String {
    let bbox = format!(
        "{},{},{},{}",
        lon - WINDOW_DEG,
        lat - WINDOW_DEG,
        lon + WINDOW_DEG,
        lat + WINDOW_DEG
    );
    let fixed = |s: &str| s.to_string();
    with_query(
        base,
        &[
            ("SERVICE", fixed("WMS")),
            ("VERSION", fixed("1.1.1")),
            ("REQUEST", fixed("GetFeatureInfo")),
            ("FORMAT", fixed("image/png")),
            ("TRANSPARENT", fixed("true")),
            ("QUERY_LAYERS", fixed(NLCD_LAYER)),
            ("LAYERS", fixed(NLCD_LAYER)),
            ("INFO_FORMAT", fixed("application/json")),
            ("SRS", fixed("EPSG:4326")),
            ("BBOX", bbox),
            ("WIDTH", fixed("2")),
            ("HEIGHT", fixed("2")),
            ("X", fixed("1")),
            ("Y", fixed("1")),
        ],
    )
}

/// `features[0].properties.PALETTE_INDEX`, accepting numbers or numeric strings.
pub fn parse_palette_index(value: &Value) -> Option<u32> {
    let index = value
        .get("features")?
        .as_array()?
        .first()?
        .get("properties")?
        .get("PALETTE_INDEX")?;
    match index {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// TR-55 land use category for an NLCD class. Classes with no runoff
/// analogue (water, barren, ice) are unmapped.
pub fn category_for_class(class: u32) -> Option<&'static str> {
    let category = match class {
        21 => "open_space_good",
        22 => "residential_1_2",
        23 => "residential_1_8",
        24 => "impervious",
        41..=43 => "woods_good",
        52 => "woods_poor",
        71 | 81 => "pasture_good",
        82 | 95 => "meadow",
        90 => "woods_fair",
        _ => return None,
    };
    Some(category)
}

/// Land cover class at a point; `Ok(None)` when the service has no pixel there.
pub async fn fetch_class(
    fetcher: &Fetcher,
    base: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<Option<u32>, SourceError> {
    let url = build_feature_info_url(base, lat, lon);
    let value = fetch_json(fetcher, SOURCE, &url, cancel).await?;
    Ok(parse_palette_index(&value))
}
