/// Integration tests for response normalization through the public API.
///
/// Run with: cargo test --test response_shapes

use serde_json::json;
use watershed_service::error::ShapeError;
use watershed_service::http::normalize::{
    expect_feature_collection, normalize_json, normalize_text, parse_feature_collection, select_named_result,
};

#[test]
fn test_features_must_be_an_array() {
    let raw = r#"{"type":"FeatureCollection","features":"not-an-array"}"#;
    let err = parse_feature_collection(raw, Some("application/json")).unwrap_err();
    assert!(matches!(err, ShapeError::MissingFeatures { .. }));
    assert!(err.to_string().contains("features array"));

    let wrapped = json!({ "contents": raw }).to_string();
    let err = parse_feature_collection(&wrapped, Some("application/json")).unwrap_err();
    assert!(err.to_string().contains("features array"));
}

#[test]
fn test_double_envelope_unwraps() {
    let inner = r#"{"type":"FeatureCollection","features":[]}"#;
    let once = json!({ "contents": inner }).to_string();
    let twice = json!({ "contents": once }).to_string();

    let value = normalize_json(&twice, Some("application/json")).unwrap();
    expect_feature_collection(&value).unwrap();
}

#[test]
fn test_html_error_page_is_not_json() {
    let err = normalize_json("<html><body>502 Bad Gateway</body></html>", Some("text/html")).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("text/html"));
    assert!(message.contains("502 Bad Gateway"));
}

#[test]
fn test_wrapped_text_table() {
    let table = "Average recurrence interval (ARI) (years): 1, 2\n24-hr:, 2.0, 2.5\n";
    let wrapped = json!({ "contents": table }).to_string();
    assert_eq!(normalize_text(&wrapped), table);
    assert_eq!(normalize_text(table), table);
}

#[test]
fn test_named_result_lookup() {
    let value = json!({
        "featurecollection": [
            { "name": "globalwatershedpoint", "feature": { "type": "FeatureCollection", "features": [] } },
            { "name": "globalwatershed", "feature": { "type": "FeatureCollection", "features": [
                { "type": "Feature", "geometry": null, "properties": { "marker": 1 } }
            ] } }
        ]
    });
    let selected = select_named_result(&value, "globalwatershed").unwrap();
    assert_eq!(selected["features"][0]["properties"]["marker"], 1);

    let missing = json!({ "featurecollection": [] });
    assert!(select_named_result(&missing, "globalwatershed").is_err());
}
