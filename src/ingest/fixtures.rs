/// Test fixtures: representative payloads from every upstream service.
///
/// These are structurally complete but trimmed to the minimum needed to
/// exercise the parsers. Geometry is synthetic (small squares and short
/// lines around Chartiers Creek near Pittsburgh, PA) so areas and distances
/// are easy to reason about.
///
/// Response shapes:
///   NOAA HDSC        — plain text: citation block, `ARI` header, `<duration>: <depths>` rows,
///                      then repeated sections for the 90% confidence bounds
///   StreamStats      — `{ featurecollection: [ { name, feature: FeatureCollection } ] }`
///   NLDI position    — FeatureCollection of one LineString, reach id in `identifier`
///   NLDI split       — FeatureCollection with features tagged by `id`
///   Flowline WFS     — FeatureCollection of LineStrings, reach id in `comid` (number)
///   HydroShare WFS   — FeatureCollection of MultiPolygons, no reach id (the caller supplies it)
///   NLCD WMS         — FeatureCollection, class in `properties.PALETTE_INDEX`

/// Full HDSC text response with citation noise, dates and a second
/// (upper-bound) table that must not be merged into the first.
#[cfg(test)]
pub(crate) fn fixture_noaa_pittsburgh() -> &'static str {
    "POINT PRECIPITATION FREQUENCY ESTIMATES
Sanja Perica, Sarah Dietz, Sarah Heim, Lillian Hiner, Kazungu Maitaria, Deborah Martin, Sandra Pavlovic
NOAA, National Weather Service, Silver Spring, Maryland
PF tabular | PF graphical | Maps & aerials
PDS-based depth-duration-frequency (DDF) curves
Latitude: 40.4400°, Longitude: -79.9900°
Datum: NAD 83
Date/Time (UTC): 27-Nov-2025 20:00:00

Average recurrence interval (ARI) (years): 1, 2, 5, 10, 25, 50, 100, 200, 500, 1000
5-min:, 0.35, 0.42, 0.50, 0.57, 0.66, 0.73, 0.81, 0.89, 0.99, 1.07
10-min:, 0.54, 0.64, 0.76, 0.86, 0.99, 1.10, 1.21, 1.33, 1.48, 1.60
1-hr:, 1.10, 1.31, 1.62, 1.87, 2.22, 2.50, 2.80, 3.11, 3.55, 3.90
24-hr:, 2.00, 2.50, 3.30, 4.00, 4.50, 5.00, 6.00, 7.00, 8.00, 9.00

Upper bound of the 90% confidence interval
Average recurrence interval (ARI) (years): 1, 2, 5, 10, 25, 50, 100, 200, 500, 1000
5-min:, 0.40, 0.48, 0.57, 0.65, 0.76, 0.84, 0.93, 1.03, 1.15, 1.25
24-hr:, 2.30, 2.88, 3.80, 4.60, 5.20, 5.80, 6.90, 8.10, 9.30, 10.50
"
}

/// StreamStats response: pour point first, basin second.
#[cfg(test)]
pub(crate) fn fixture_streamstats_watershed() -> &'static str {
    r#"{
      "workspaceID": "PA20251127200000123",
      "featurecollection": [
        {
          "name": "globalwatershedpoint",
          "feature": {
            "type": "FeatureCollection",
            "features": [
              { "type": "Feature", "geometry": { "type": "Point", "coordinates": [-79.99, 40.44] }, "properties": {} }
            ]
          }
        },
        {
          "name": "globalwatershed",
          "feature": {
            "type": "FeatureCollection",
            "features": [
              {
                "type": "Feature",
                "geometry": {
                  "type": "Polygon",
                  "coordinates": [[[-80.02, 40.42], [-79.96, 40.42], [-79.96, 40.46], [-80.02, 40.46], [-80.02, 40.42]]]
                },
                "properties": { "Name": "globalwatershed" }
              }
            ]
          }
        }
      ],
      "parameters": [],
      "messages": ["Delineation complete"]
    }"#
}

/// NLDI `comid/position` response.
#[cfg(test)]
pub(crate) fn fixture_nldi_position() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "geometry": {
            "type": "LineString",
            "coordinates": [[-79.995, 40.435], [-79.990, 40.440], [-79.985, 40.445]]
          },
          "properties": {
            "identifier": "13297246",
            "navigation": "https://api.water.usgs.gov/nldi/linked-data/comid/13297246/navigation",
            "source": "comid",
            "sourceName": "NHDPlus comid"
          }
        }
      ]
    }"#
}

/// NLDI split-catchment process output.
#[cfg(test)]
pub(crate) fn fixture_nldi_split_catchment() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "catchment",
          "geometry": { "type": "Polygon", "coordinates": [[[-80.0, 40.43], [-79.98, 40.43], [-79.98, 40.45], [-80.0, 40.43]]] },
          "properties": { "kind": "catchment" }
        },
        {
          "type": "Feature",
          "id": "splitCatchment",
          "geometry": { "type": "Polygon", "coordinates": [[[-79.995, 40.435], [-79.985, 40.435], [-79.985, 40.445], [-79.995, 40.435]]] },
          "properties": { "kind": "split" }
        },
        {
          "type": "Feature",
          "id": "drainageBasin",
          "geometry": { "type": "Polygon", "coordinates": [[[-80.05, 40.40], [-79.95, 40.40], [-79.95, 40.48], [-80.05, 40.48], [-80.05, 40.40]]] },
          "properties": { "kind": "drainage" }
        }
      ]
    }"#
}

/// Flowline network WFS response: one named reach, one unnamed, one without
/// a comid (dropped).
#[cfg(test)]
pub(crate) fn fixture_flowline_network() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "totalFeatures": 3,
      "features": [
        {
          "type": "Feature",
          "id": "nhdflowline_network.1",
          "geometry": { "type": "MultiLineString", "coordinates": [[[-79.995, 40.4405], [-79.985, 40.4405]]] },
          "properties": { "comid": 13297246, "gnis_name": "Chartiers Creek", "reachcode": "05030101000123" }
        },
        {
          "type": "Feature",
          "id": "nhdflowline_network.2",
          "geometry": { "type": "LineString", "coordinates": [[-79.995, 40.4450], [-79.985, 40.4450]] },
          "properties": { "comid": 13297250, "gnis_name": null }
        },
        {
          "type": "Feature",
          "id": "nhdflowline_network.3",
          "geometry": { "type": "LineString", "coordinates": [[-79.995, 40.4420], [-79.985, 40.4420]] },
          "properties": { "gnis_name": "Orphan Run" }
        }
      ]
    }"#
}

/// HydroShare NHDPlus HR catchment WFS response.
#[cfg(test)]
pub(crate) fn fixture_hydroshare_catchment() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "NHDPlusCatchment.8812",
          "geometry": {
            "type": "MultiPolygon",
            "coordinates": [[[[-80.0, 40.43], [-79.98, 40.43], [-79.98, 40.45], [-80.0, 40.45], [-80.0, 40.43]]]]
          },
          "properties": { "GRIDCODE": 8812, "SOURCEFC": "NHDFlowline", "AreaSqKM": 3.4 }
        }
      ],
      "numberReturned": 1
    }"#
}

/// NLCD GetFeatureInfo response for a deciduous forest pixel.
#[cfg(test)]
pub(crate) fn fixture_nlcd_feature_info() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "features": [
        {
          "type": "Feature",
          "id": "",
          "geometry": null,
          "properties": { "PALETTE_INDEX": 41, "RED": 104, "GREEN": 171, "BLUE": 95 }
        }
      ],
      "totalFeatures": "unknown",
      "numberReturned": 1
    }"#
}
