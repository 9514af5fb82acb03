/// Planar and spherical helpers for watershed polygons.
///
/// Coordinates are always `[lon, lat]` in WGS84 degrees, matching GeoJSON
/// position order. Nothing here is a GIS engine: area, bounding boxes,
/// outer-ring containment, a square buffer, and nearest-point-on-line are
/// the only operations the pipeline needs.

use serde::{Deserialize, Serialize};

/// `[lon, lat]`
pub type Position = [f64; 2];

/// Closed ring, first position repeated last (GeoJSON convention).
pub type Ring = Vec<Position>;

/// Equatorial radius used by GeoJSON area conventions (WGS84 semi-major axis).
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Meters per degree of latitude used by the square buffer.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const ACRES_PER_SQ_METER: f64 = 0.000247105;

// ---------------------------------------------------------------------------
// Polygonal geometry
// ---------------------------------------------------------------------------

/// The only geometry kinds a basin feature may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Polygonal {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Polygonal {
    /// Converts a GeoJSON geometry value, returning `None` for anything that
    /// is not a Polygon or MultiPolygon.
    pub fn from_geojson(value: &geojson::Value) -> Option<Self> {
        match value {
            geojson::Value::Polygon(rings) => Some(Polygonal::Polygon(convert_rings(rings))),
            geojson::Value::MultiPolygon(polys) => Some(Polygonal::MultiPolygon(
                polys.iter().map(|rings| convert_rings(rings)).collect(),
            )),
            _ => None,
        }
    }

    pub fn to_geojson(&self) -> geojson::Value {
        match self {
            Polygonal::Polygon(rings) => geojson::Value::Polygon(rings_to_geojson(rings)),
            Polygonal::MultiPolygon(polys) => geojson::Value::MultiPolygon(
                polys.iter().map(|rings| rings_to_geojson(rings)).collect(),
            ),
        }
    }

    /// Each polygon as a slice of rings (outer ring first).
    pub fn polygons(&self) -> Vec<&[Ring]> {
        match self {
            Polygonal::Polygon(rings) => vec![rings.as_slice()],
            Polygonal::MultiPolygon(polys) => polys.iter().map(|p| p.as_slice()).collect(),
        }
    }

    pub fn area_sq_meters(&self) -> f64 {
        self.polygons().into_iter().map(polygon_area_sq_meters).sum()
    }

    /// Ray-casting containment against each polygon's outer ring. Holes are
    /// ignored.
    pub fn contains(&self, point: Position) -> bool {
        self.polygons()
            .into_iter()
            .any(|rings| rings.first().is_some_and(|outer| point_in_ring(point, outer)))
    }
}

fn convert_rings(rings: &[Vec<Vec<f64>>]) -> Vec<Ring> {
    rings
        .iter()
        .map(|ring| {
            ring.iter()
                .filter(|p| p.len() >= 2)
                .map(|p| [p[0], p[1]])
                .collect()
        })
        .collect()
}

fn rings_to_geojson(rings: &[Ring]) -> Vec<Vec<Vec<f64>>> {
    rings
        .iter()
        .map(|ring| ring.iter().map(|p| vec![p[0], p[1]]).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Area
// ---------------------------------------------------------------------------

/// Outer ring minus holes, never negative.
pub fn polygon_area_sq_meters(rings: &[Ring]) -> f64 {
    let Some((outer, holes)) = rings.split_first() else {
        return 0.0;
    };
    let mut area = ring_area_sq_meters(outer);
    for hole in holes {
        area -= ring_area_sq_meters(hole);
    }
    area.max(0.0)
}

/// Ring area on the sphere by spherical-excess summation
/// (Chamberlain & Duquette, "Some Algorithms for Polygons on a Sphere").
pub fn ring_area_sq_meters(ring: &[Position]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let p1 = ring[i];
        let p2 = ring[(i + 1) % n];
        total += (p2[0] - p1[0]).to_radians()
            * (2.0 + p1[1].to_radians().sin() + p2[1].to_radians().sin());
    }
    (total * EARTH_RADIUS_M * EARTH_RADIUS_M / 2.0).abs()
}

pub fn sq_meters_to_acres(sq_m: f64) -> f64 {
    sq_m * ACRES_PER_SQ_METER
}

// ---------------------------------------------------------------------------
// Bounding box & containment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn empty() -> Self {
        BoundingBox {
            min_lon: f64::INFINITY,
            min_lat: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.min_lon <= self.max_lon && self.min_lat <= self.max_lat)
    }

    pub fn extend(&mut self, p: Position) {
        self.min_lon = self.min_lon.min(p[0]);
        self.min_lat = self.min_lat.min(p[1]);
        self.max_lon = self.max_lon.max(p[0]);
        self.max_lat = self.max_lat.max(p[1]);
    }

    /// Box of `radius_m` around a point.
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let (d_lat, d_lon) = meters_to_degrees(lat, radius_m);
        BoundingBox {
            min_lon: lon - d_lon,
            min_lat: lat - d_lat,
            max_lon: lon + d_lon,
            max_lat: lat + d_lat,
        }
    }
}

/// Bounding box over the outer rings of every polygon.
pub fn outer_bbox<'a>(shapes: impl IntoIterator<Item = &'a Polygonal>) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    for shape in shapes {
        for rings in shape.polygons() {
            if let Some(outer) = rings.first() {
                for p in outer {
                    bbox.extend(*p);
                }
            }
        }
    }
    bbox
}

pub fn point_in_ring(point: Position, ring: &[Position]) -> bool {
    let [x, y] = point;
    let mut inside = false;
    let n = ring.len();
    if n == 0 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ---------------------------------------------------------------------------
// Square buffer
// ---------------------------------------------------------------------------

/// `(degrees of latitude, degrees of longitude)` spanned by `meters` at `lat`.
fn meters_to_degrees(lat: f64, meters: f64) -> (f64, f64) {
    let per_deg_lon = lat.to_radians().cos() * METERS_PER_DEGREE;
    let d_lat = meters / METERS_PER_DEGREE;
    let d_lon = if per_deg_lon.abs() > f64::EPSILON {
        meters / per_deg_lon
    } else {
        0.0
    };
    (d_lat, d_lon)
}

/// Axis-aligned square of half-width `half_size_m` centred on the point.
pub fn buffer_point_square(lat: f64, lon: f64, half_size_m: f64) -> Polygonal {
    let (d_lat, d_lon) = meters_to_degrees(lat, half_size_m);
    let (north, south) = (lat + d_lat, lat - d_lat);
    let (east, west) = (lon + d_lon, lon - d_lon);

    Polygonal::Polygon(vec![vec![
        [west, south],
        [west, north],
        [east, north],
        [east, south],
        [west, south],
    ]])
}

// ---------------------------------------------------------------------------
// Nearest point on a polyline
// ---------------------------------------------------------------------------

/// Closest point on a set of polylines to `(lat, lon)`.
///
/// Distances are computed in a local equirectangular frame centred on the
/// query point, which is accurate to well under a percent at snapping scale
/// (hundreds of meters). Returns `(closest [lon, lat], distance in meters)`.
pub fn nearest_point_on_lines(lat: f64, lon: f64, lines: &[Vec<Position>]) -> Option<(Position, f64)> {
    let kx = lat.to_radians().cos() * METERS_PER_DEGREE;
    let ky = METERS_PER_DEGREE;
    let to_xy = |p: Position| ((p[0] - lon) * kx, (p[1] - lat) * ky);

    let mut best: Option<(Position, f64)> = None;
    for line in lines {
        let candidates: Vec<(Position, Position)> = match line.len() {
            0 => continue,
            1 => vec![(line[0], line[0])],
            _ => line.windows(2).map(|w| (w[0], w[1])).collect(),
        };

        for (a, b) in candidates {
            let (ax, ay) = to_xy(a);
            let (bx, by) = to_xy(b);
            let (dx, dy) = (bx - ax, by - ay);
            let len_sq = dx * dx + dy * dy;
            let t = if len_sq > 0.0 {
                ((-ax * dx - ay * dy) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let (px, py) = (ax + t * dx, ay + t * dy);
            let dist = (px * px + py * py).sqrt();

            if best.is_none_or(|(_, d)| dist < d) {
                let snapped = [a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])];
                best = Some((snapped, dist));
            }
        }
    }
    best
}

pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_buffer_area_is_positive_and_bounded() {
        let square = buffer_point_square(40.44, -79.99, 500.0);
        let area = square.area_sq_meters();
        assert!(area > 0.0, "area must be positive, got {}", area);
        assert!(area < 5_000_000.0, "500 m half-width square is ~1 km², got {}", area);
        // 1000 m x 1000 m within a couple of percent
        assert!((area - 1_000_000.0).abs() < 30_000.0, "got {}", area);
    }

    #[test]
    fn test_square_buffer_is_closed_ring() {
        let Polygonal::Polygon(rings) = buffer_point_square(10.0, 20.0, 100.0) else {
            panic!("buffer must be a Polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].first(), rings[0].last());
        assert_eq!(rings[0].len(), 5);
    }

    #[test]
    fn test_hole_is_subtracted() {
        let outer = vec![[0.0, 0.0], [0.0, 0.02], [0.02, 0.02], [0.02, 0.0], [0.0, 0.0]];
        let hole = vec![[0.005, 0.005], [0.005, 0.01], [0.01, 0.01], [0.01, 0.005], [0.005, 0.005]];
        let with_hole = polygon_area_sq_meters(&[outer.clone(), hole]);
        let without = polygon_area_sq_meters(&[outer]);
        assert!(with_hole < without);
        assert!(with_hole > 0.0);
    }

    #[test]
    fn test_oversized_hole_clamps_to_zero() {
        let outer = vec![[0.0, 0.0], [0.0, 0.01], [0.01, 0.01], [0.01, 0.0], [0.0, 0.0]];
        let hole = vec![[0.0, 0.0], [0.0, 0.03], [0.03, 0.03], [0.03, 0.0], [0.0, 0.0]];
        assert_eq!(polygon_area_sq_meters(&[outer, hole]), 0.0);
    }

    #[test]
    fn test_ring_winding_does_not_change_area() {
        let ccw = vec![[0.0, 0.0], [0.01, 0.0], [0.01, 0.01], [0.0, 0.01], [0.0, 0.0]];
        let cw: Vec<Position> = ccw.iter().rev().cloned().collect();
        let a = ring_area_sq_meters(&ccw);
        let b = ring_area_sq_meters(&cw);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_multipolygon_area_sums_parts() {
        let Polygonal::Polygon(a) = buffer_point_square(40.0, -80.0, 200.0) else { unreachable!() };
        let Polygonal::Polygon(b) = buffer_point_square(41.0, -80.0, 200.0) else { unreachable!() };
        let single = Polygonal::Polygon(a.clone()).area_sq_meters();
        let multi = Polygonal::MultiPolygon(vec![a, b]).area_sq_meters();
        assert!(multi > single * 1.9);
    }

    #[test]
    fn test_point_in_ring_inside_and_outside() {
        let ring = vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        assert!(point_in_ring([0.5, 0.5], &ring));
        assert!(!point_in_ring([1.5, 0.5], &ring));
        assert!(!point_in_ring([0.5, -0.1], &ring));
    }

    #[test]
    fn test_contains_ignores_holes() {
        let outer = vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
        let hole = vec![[0.4, 0.4], [0.4, 0.6], [0.6, 0.6], [0.6, 0.4], [0.4, 0.4]];
        let poly = Polygonal::Polygon(vec![outer, hole]);
        assert!(poly.contains([0.5, 0.5]), "holes are not considered for sampling");
    }

    #[test]
    fn test_outer_bbox_covers_all_parts() {
        let a = buffer_point_square(40.0, -80.0, 100.0);
        let b = buffer_point_square(41.0, -79.0, 100.0);
        let bbox = outer_bbox([&a, &b]);
        assert!(bbox.min_lat < 40.0 && bbox.max_lat > 41.0);
        assert!(bbox.min_lon < -80.0 && bbox.max_lon > -79.0);
        assert!(!bbox.is_empty());
        assert!(BoundingBox::empty().is_empty());
    }

    #[test]
    fn test_nearest_point_on_horizontal_line() {
        // East-west line 0.001° north of the query point (~111 m)
        let line = vec![[-80.01, 40.001], [-79.99, 40.001]];
        let (snapped, dist) = nearest_point_on_lines(40.0, -80.0, &[line]).unwrap();
        assert!((snapped[0] + 80.0).abs() < 1e-9);
        assert!((snapped[1] - 40.001).abs() < 1e-9);
        assert!((dist - 111.32).abs() < 0.5, "got {}", dist);
    }

    #[test]
    fn test_nearest_point_clamps_to_segment_end() {
        let line = vec![[-79.99, 40.0], [-79.98, 40.0]];
        let (snapped, _) = nearest_point_on_lines(40.0, -80.0, &[line]).unwrap();
        assert_eq!(snapped, [-79.99, 40.0]);
    }

    #[test]
    fn test_nearest_point_on_no_lines_is_none() {
        assert!(nearest_point_on_lines(40.0, -80.0, &[]).is_none());
        assert!(nearest_point_on_lines(40.0, -80.0, &[vec![]]).is_none());
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(is_valid_coordinate(40.0, -80.0));
        assert!(!is_valid_coordinate(f64::NAN, -80.0));
        assert!(!is_valid_coordinate(91.0, 0.0));
        assert!(!is_valid_coordinate(0.0, 181.0));
    }

    #[test]
    fn test_geojson_round_trip_keeps_polygon() {
        let square = buffer_point_square(40.0, -80.0, 250.0);
        let back = Polygonal::from_geojson(&square.to_geojson()).unwrap();
        assert_eq!(square, back);
        let line = geojson::Value::LineString(vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
        assert!(Polygonal::from_geojson(&line).is_none());
    }
}
