/// Response normalizer.
///
/// Upstream bodies arrive in several disguises: raw JSON, JSON wrapped by the
/// CORS proxy as `{"contents": "<original body>"}` (sometimes twice), HTML
/// error pages served with a 200, or a FeatureCollection buried inside a list
/// of named process outputs. Everything here turns those into either a
/// validated value or a `ShapeError` carrying a body preview.

use serde_json::Value;
use tracing::debug;

use super::fetch::preview;
use crate::error::ShapeError;

/// Nested proxy envelopes unwrapped before giving up.
pub const MAX_ENVELOPE_DEPTH: usize = 4;

/// Keys under which processing services list their named outputs.
const RESULT_LIST_KEYS: [&str; 3] = ["featurecollection", "outputs", "results"];

/// Parses a JSON body and unwraps proxy envelopes.
///
/// `content_type` is only a hint: proxies mislabel payloads, so parsing is
/// always attempted and the claimed type only shows up in the error.
pub fn normalize_json(body: &str, content_type: Option<&str>) -> Result<Value, ShapeError> {
    let claimed = content_type.unwrap_or("unknown");
    let not_json = |text: &str| ShapeError::NotJson {
        content_type: claimed.to_string(),
        preview: preview(text),
    };

    let mut value: Value = serde_json::from_str(strip_bom(body)).map_err(|_| not_json(body))?;

    for _ in 0..MAX_ENVELOPE_DEPTH {
        let Some(inner) = envelope_contents(&value) else {
            break;
        };
        let inner = inner.to_string();
        value = serde_json::from_str(strip_bom(&inner)).map_err(|_| not_json(&inner))?;
    }

    Ok(value)
}

/// Text payloads (rainfall tables) may also come back wrapped by the proxy.
pub fn normalize_text(body: &str) -> String {
    let mut text = strip_bom(body).to_string();
    for _ in 0..MAX_ENVELOPE_DEPTH {
        if !text.trim_start().starts_with('{') {
            break;
        }
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            break;
        };
        match envelope_contents(&value) {
            Some(inner) => text = strip_bom(inner).to_string(),
            None => break,
        }
    }
    text
}

fn envelope_contents(value: &Value) -> Option<&str> {
    value.as_object()?.get("contents")?.as_str()
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn is_feature_collection(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("FeatureCollection")
}

/// Asserts `type == "FeatureCollection"` and that `features` is an array.
pub fn expect_feature_collection(value: &Value) -> Result<(), ShapeError> {
    if !is_feature_collection(value) {
        let found = match value.get("type").and_then(Value::as_str) {
            Some(t) => format!("type '{}'", t),
            None => describe_kind(value).to_string(),
        };
        return Err(ShapeError::NotFeatureCollection {
            found,
            preview: preview(&value.to_string()),
        });
    }
    if !value.get("features").is_some_and(Value::is_array) {
        return Err(ShapeError::MissingFeatures {
            preview: preview(&value.to_string()),
        });
    }
    Ok(())
}

fn describe_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object without a type",
    }
}

/// Validates and decodes a FeatureCollection. Individual features that fail
/// to decode are dropped rather than failing the whole collection.
pub fn into_feature_collection(value: Value) -> Result<geojson::FeatureCollection, ShapeError> {
    expect_feature_collection(&value)?;

    let raw_features = match value {
        Value::Object(mut obj) => match obj.remove("features") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let features = raw_features
        .into_iter()
        .filter_map(|raw| match serde_json::from_value::<geojson::Feature>(raw) {
            Ok(feature) => Some(feature),
            Err(err) => {
                debug!(error = %err, "dropping undecodable feature");
                None
            }
        })
        .collect();

    Ok(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

/// Body → unwrapped JSON → validated FeatureCollection.
pub fn parse_feature_collection(
    body: &str,
    content_type: Option<&str>,
) -> Result<geojson::FeatureCollection, ShapeError> {
    into_feature_collection(normalize_json(body, content_type)?)
}

/// Finds the FeatureCollection a processing service returned under `wanted`.
///
/// Entries are read from `featurecollection`, `outputs` or `results`; each
/// entry names itself with `name` or `id` and carries its payload in
/// `feature` or `value`. An exact name match wins; otherwise the first entry
/// whose payload is a FeatureCollection.
pub fn select_named_result(value: &Value, wanted: &str) -> Result<Value, ShapeError> {
    if is_feature_collection(value) {
        return Ok(value.clone());
    }

    let entries: Vec<&Value> = RESULT_LIST_KEYS
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_array))
        .flatten()
        .collect();

    let entry_name = |entry: &Value| -> Option<String> {
        ["name", "id"]
            .iter()
            .find_map(|k| entry.get(*k).and_then(Value::as_str))
            .map(String::from)
    };
    let payload = |entry: &'_ Value| -> Option<Value> {
        ["feature", "value"]
            .iter()
            .find_map(|k| entry.get(*k))
            .map(unwrap_string_payload)
    };

    if let Some(found) = entries
        .iter()
        .filter(|e| entry_name(e).as_deref() == Some(wanted))
        .find_map(|e| payload(e))
    {
        return Ok(found);
    }

    entries
        .iter()
        .filter_map(|e| payload(e))
        .find(is_feature_collection)
        .ok_or_else(|| ShapeError::NoNamedResult {
            wanted: wanted.to_string(),
        })
}

/// Some services return the payload as a JSON string.
fn unwrap_string_payload(payload: &Value) -> Value {
    match payload {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| payload.clone()),
        other => other.clone(),
    }
}

/// Keeps only the features whose `id` equals the first id in `preferred`
/// that occurs at all. Returns `None` when none of them occur.
pub fn select_features_by_id(value: &Value, preferred: &[&str]) -> Option<Value> {
    let features = value.get("features")?.as_array()?;
    let id_of = |f: &Value| f.get("id").and_then(Value::as_str).map(String::from);

    let chosen = preferred
        .iter()
        .find(|id| features.iter().any(|f| id_of(f).as_deref() == Some(**id)))?;

    let kept: Vec<Value> = features
        .iter()
        .filter(|f| id_of(f).as_deref() == Some(*chosen))
        .cloned()
        .collect();

    let mut out = value.clone();
    if let Some(obj) = out.as_object_mut() {
        obj.insert("features".to_string(), Value::Array(kept));
    }
    Some(out)
}
