/// NOAA Atlas 14 precipitation frequency client.
///
/// Handles URL construction and text parsing for the HDSC point
/// precipitation frequency service:
///   https://hdsc.nws.noaa.gov/cgi-bin/new/fe_text_mean.csv
///
/// The service returns a loosely structured text document: several lines of
/// citation and metadata, a header carrying the recurrence intervals, then
/// one `<duration>: <depth>, <depth>, ...` row per duration. See `fixtures.rs`
/// for a representative response.

use std::sync::LazyLock;

use regex::Regex;

use super::{TEXT_ACCEPT, fetch_body};
use crate::error::SourceError;
use crate::http::normalize::normalize_text;
use crate::http::{CancelSignal, Fetcher, RequestInit};
use crate::model::{RainfallRow, RainfallTable};

pub const NOAA_BASE_URL: &str = "https://hdsc.nws.noaa.gov/cgi-bin/new/fe_text_mean.csv";

const SOURCE: &str = "NOAA Atlas 14";

static ARI_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bARI\b|average recurrence interval").expect("regex pattern is valid")
});

static DURATION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\d+(\.\d+)?\s*[- ]?\s*(min|minute|minutes|hr|hour|hours|day|days)\s*:?$")
        .expect("regex pattern is valid")
});

static LABELED_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:,]+?):\s*(.+)$").expect("regex pattern is valid"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("regex pattern is valid"));

static VALUE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("regex pattern is valid"));

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Coordinates are written with six decimals.
pub fn build_rainfall_url(base: &str, lat: f64, lon: f64) -> String {
    format!(
        "{}?data=depth&lat={:.6}&lon={:.6}&series=pds&units=english",
        base, lat, lon
    )
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

pub fn is_duration_label(label: &str) -> bool {
    DURATION_LABEL.is_match(label.trim())
}

/// Splits a `<label>: <values>` line. The label is trimmed of whitespace and
/// trailing colons.
fn split_row(line: &str) -> Option<(&str, &str)> {
    let caps = LABELED_ROW.captures(line)?;
    let label = caps.get(1)?.as_str().trim().trim_end_matches(':').trim();
    let values = caps.get(2)?.as_str().trim();
    Some((label, values))
}

fn value_tokens(values: &str) -> Vec<&str> {
    VALUE_SEPARATOR.split(values).filter(|t| !t.is_empty()).collect()
}

fn parse_cell(token: &str) -> f64 {
    token.parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(f64::NAN)
}

/// Parses a precipitation frequency text document.
///
/// The header line is found by its recurrence-interval marker, but it may
/// also carry unrelated numbers (dates, "90% confidence"). The first duration
/// row below it decides how many data columns exist, and the header's last
/// that-many numbers become the interval labels.
///
/// Returns `None` when there is no header, no duration row to size the
/// columns, or no row with a parseable depth.
pub fn parse_rainfall_text(text: &str) -> Option<RainfallTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let header_idx = lines.iter().position(|l| ARI_HEADER.is_match(l))?;
    let body = &lines[header_idx + 1..];

    let column_count = body
        .iter()
        .filter_map(|l| split_row(l))
        .find(|(label, _)| is_duration_label(label))
        .map(|(_, values)| {
            value_tokens(values)
                .into_iter()
                .filter(|t| parse_cell(t).is_finite())
                .count()
        })
        .filter(|n| *n > 0)?;

    let header_numbers: Vec<&str> = NUMBER
        .find_iter(lines[header_idx])
        .map(|m| m.as_str())
        .collect();
    let skip = header_numbers.len().saturating_sub(column_count);
    let intervals: Vec<String> = header_numbers[skip..].iter().map(|s| s.to_string()).collect();
    if intervals.is_empty() {
        return None;
    }

    let mut rows: Vec<RainfallRow> = Vec::new();
    for line in body {
        // A second header starts the confidence-bound tables; keep only the first.
        if ARI_HEADER.is_match(line) && !rows.is_empty() {
            break;
        }
        let Some((label, values)) = split_row(line) else {
            continue;
        };
        if !is_duration_label(label) || rows.iter().any(|r| r.duration == label) {
            continue;
        }

        let tokens = value_tokens(values);
        let depths = (0..intervals.len())
            .map(|i| tokens.get(i).map(|t| parse_cell(t)).unwrap_or(f64::NAN))
            .collect();
        rows.push(RainfallRow {
            duration: label.to_string(),
            depths,
        });
    }

    let table = RainfallTable { intervals, rows };
    table.is_valid().then_some(table)
}

/// Hours represented by a duration label such as `"15-min"`, `"24-hr"` or
/// `"2 day"`.
pub fn duration_hours(label: &str) -> Option<f64> {
    let caps = DURATION_LABEL.captures(label.trim())?;
    let amount: f64 = NUMBER.find(label)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let hours = match unit.as_str() {
        "min" | "minute" | "minutes" => amount / 60.0,
        "hr" | "hour" | "hours" => amount,
        "day" | "days" => amount * 24.0,
        _ => return None,
    };
    (hours > 0.0).then_some(hours)
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Fetches and parses the table for a point. A body that parses to nothing
/// is a `NotFound` for this source.
pub async fn fetch_rainfall_table(
    fetcher: &Fetcher,
    base: &str,
    lat: f64,
    lon: f64,
    cancel: Option<&CancelSignal>,
) -> Result<RainfallTable, SourceError> {
    let url = build_rainfall_url(base, lat, lon);
    let init = RequestInit {
        headers: vec![("Accept".to_string(), TEXT_ACCEPT.to_string())],
        ..RequestInit::default()
    };
    let response = fetch_body(fetcher, SOURCE, &url, init, cancel).await?;
    let text = normalize_text(&response.body);

    parse_rainfall_text(&text).ok_or_else(|| {
        SourceError::not_found(
            SOURCE,
            format!(
                "no recurrence-interval table in response: {}",
                crate::http::preview(&text)
            ),
        )
    })
}
