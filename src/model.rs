/// Shared data types for the watershed pipeline.
///
/// Types here are produced by the ingest layer and consumed by the
/// delineation cascade, the rainfall combinator, the land-cover sampler and
/// the hydrology collaborators. Conversions from raw GeoJSON live next to the
/// types they produce so every provider normalizes the same way.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::geometry::{self, Polygonal, Position};

// ---------------------------------------------------------------------------
// Basin geometry
// ---------------------------------------------------------------------------

/// Which provider produced a basin geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasinSource {
    /// Primary hydrologic basin service (USGS StreamStats).
    StreamStats,
    /// NLDI split-catchment process at the snapped point.
    NldiSplit,
    /// NLDI basin keyed by reach id.
    Nldi,
    /// HydroShare NHDPlus HR catchment WFS.
    HydroShare,
    /// Square buffer placeholder; not real hydrology.
    Synthetic,
}

impl BasinSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasinSource::StreamStats => "streamstats",
            BasinSource::NldiSplit => "nldi-split",
            BasinSource::Nldi => "nldi",
            BasinSource::HydroShare => "hydroshare",
            BasinSource::Synthetic => "synthetic",
        }
    }

    /// Everything except the synthetic placeholder came from a real service.
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, BasinSource::Synthetic)
    }
}

impl fmt::Display for BasinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One polygonal feature of a basin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinFeature {
    pub geometry: Polygonal,
    pub source: BasinSource,
    /// Linked reach / catchment identifier when the provider supplies one.
    pub comid: Option<String>,
    /// Remaining provider properties, passed through untouched.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Ordered set of polygonal features, each tagged with its provider.
///
/// A collection with zero features means "no result" for the provider that
/// produced it; callers check `is_empty()` rather than treating it as an
/// error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasinCollection {
    pub features: Vec<BasinFeature>,
}

impl BasinCollection {
    /// Keeps only Polygon / MultiPolygon features with geometry; everything
    /// else a provider returned (points, lines, null geometry) is dropped.
    pub fn from_geojson(
        fc: &geojson::FeatureCollection,
        source: BasinSource,
        fallback_comid: Option<&str>,
    ) -> Self {
        let features = fc
            .features
            .iter()
            .filter_map(|feature| {
                let geometry = Polygonal::from_geojson(&feature.geometry.as_ref()?.value)?;
                let properties = feature.properties.clone().unwrap_or_default();
                let comid = extract_comid(&properties).or_else(|| fallback_comid.map(String::from));
                Some(BasinFeature {
                    geometry,
                    source,
                    comid,
                    properties,
                })
            })
            .collect();
        BasinCollection { features }
    }

    pub fn single(geometry: Polygonal, source: BasinSource, comid: Option<String>) -> Self {
        BasinCollection {
            features: vec![BasinFeature {
                geometry,
                source,
                comid,
                properties: Map::new(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Polygonal> {
        self.features.iter().map(|f| &f.geometry)
    }

    pub fn area_sq_meters(&self) -> f64 {
        self.shapes().map(Polygonal::area_sq_meters).sum::<f64>().max(0.0)
    }

    pub fn area_acres(&self) -> f64 {
        geometry::sq_meters_to_acres(self.area_sq_meters())
    }

    pub fn contains(&self, point: Position) -> bool {
        self.shapes().any(|s| s.contains(point))
    }

    /// Renders back to GeoJSON with `source` and `comid` written into each
    /// feature's properties.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let mut properties = f.properties.clone();
                properties.insert("source".to_string(), Value::from(f.source.as_str()));
                if let Some(comid) = &f.comid {
                    properties.insert("comid".to_string(), Value::from(comid.as_str()));
                }
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(f.geometry.to_geojson())),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Reads a reach identifier from the property names the NHDPlus-family
/// services use, in priority order. Numbers and strings are both accepted.
pub fn extract_comid(properties: &Map<String, Value>) -> Option<String> {
    ["identifier", "comid", "featureid", "featureId", "FEATUREID", "nhdplus_comid"]
        .iter()
        .filter_map(|key| properties.get(*key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

// ---------------------------------------------------------------------------
// Flowlines
// ---------------------------------------------------------------------------

/// How a flowline was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapMethod {
    /// Nearest segment from a vector hydrography network query.
    NetworkQuery,
    /// Coarse position-indexed NLDI lookup.
    PositionLookup,
}

impl fmt::Display for SnapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapMethod::NetworkQuery => f.write_str("network-query"),
            SnapMethod::PositionLookup => f.write_str("position-lookup"),
        }
    }
}

/// A stream reach with its stable identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowlineRef {
    pub comid: String,
    pub name: Option<String>,
    pub reachcode: Option<String>,
    /// Line parts (`LineString` = one part, `MultiLineString` = several).
    pub lines: Vec<Vec<Position>>,
    pub method: SnapMethod,
}

impl FlowlineRef {
    /// Builds a reference from a flowline feature. Features without a line
    /// geometry or without a reach identifier yield `None`.
    pub fn from_feature(feature: &geojson::Feature, method: SnapMethod) -> Option<Self> {
        let lines = line_parts(&feature.geometry.as_ref()?.value);
        if lines.iter().all(|l| l.is_empty()) {
            return None;
        }
        let empty = Map::new();
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| properties.get(*k).and_then(Value::as_str))
                .filter(|s| !s.trim().is_empty())
                .map(String::from)
        };

        Some(FlowlineRef {
            comid: extract_comid(properties)?,
            name: text(&["name", "gnis_name", "GNIS_NAME"]),
            reachcode: text(&["reachcode", "REACHCODE"]),
            lines,
            method,
        })
    }
}

/// Reads every line part out of a GeoJSON geometry.
pub fn line_parts(value: &geojson::Value) -> Vec<Vec<Position>> {
    let to_line = |coords: &Vec<Vec<f64>>| -> Vec<Position> {
        coords.iter().filter(|p| p.len() >= 2).map(|p| [p[0], p[1]]).collect()
    };
    match value {
        geojson::Value::LineString(coords) => vec![to_line(coords)],
        geojson::Value::MultiLineString(parts) => parts.iter().map(to_line).collect(),
        _ => Vec::new(),
    }
}

/// Result of snapping a clicked point onto the stream network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    pub flowline: FlowlineRef,
    pub snapped_lat: f64,
    pub snapped_lon: f64,
    /// Distance from the input point to the snapped point, meters.
    pub distance_m: f64,
}

// ---------------------------------------------------------------------------
// Rainfall
// ---------------------------------------------------------------------------

/// Depth-duration-frequency table (inches).
///
/// `intervals` are recurrence-interval labels in years, in source order.
/// Each row's `depths` is aligned position-for-position with `intervals`;
/// cells that could not be parsed hold NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallTable {
    pub intervals: Vec<String>,
    pub rows: Vec<RainfallRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RainfallRow {
    pub duration: String,
    #[serde(with = "nan_as_null")]
    pub depths: Vec<f64>,
}

impl RainfallTable {
    /// At least one interval and at least one row with a parseable value.
    pub fn is_valid(&self) -> bool {
        !self.intervals.is_empty()
            && self
                .rows
                .iter()
                .any(|row| row.depths.iter().any(|d| d.is_finite()))
    }

    pub fn row(&self, duration: &str) -> Option<&RainfallRow> {
        self.rows.iter().find(|r| r.duration == duration)
    }

    /// Depth for a duration/interval pair. `Some(NaN)` when the cell exists
    /// but could not be parsed.
    pub fn depth(&self, duration: &str, interval: &str) -> Option<f64> {
        let col = self.intervals.iter().position(|i| i == interval)?;
        self.row(duration)?.depths.get(col).copied()
    }

    pub fn durations(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.duration.as_str()).collect()
    }
}

/// NaN cannot be represented in JSON; cells round-trip through `null`.
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_finite() { Some(*v) } else { None })
            .collect();
        cells.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let cells = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(cells.into_iter().map(|c| c.unwrap_or(f64::NAN)).collect())
    }
}

// ---------------------------------------------------------------------------
// Land use
// ---------------------------------------------------------------------------

/// Hydrologic soil group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Hsg {
    A,
    B,
    #[default]
    C,
    D,
}

impl fmt::Display for Hsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Hsg::A => "A",
            Hsg::B => "B",
            Hsg::C => "C",
            Hsg::D => "D",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Hsg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Hsg::A),
            "B" => Ok(Hsg::B),
            "C" => Ok(Hsg::C),
            "D" => Ok(Hsg::D),
            other => Err(format!("unknown hydrologic soil group '{}'", other)),
        }
    }
}

/// Share of a watershed in one land-use category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandUseShare {
    pub category_id: String,
    pub hsg: Hsg,
    pub percentage: i32,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
