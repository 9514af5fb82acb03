/// Upstream service clients, one file per API.
///
/// Each client owns its URL construction and response parsing, and goes
/// through the shared `Fetcher` for the network call itself. Failures are
/// reported as `SourceError`s named after the service so the cascade and
/// combinator layers can log and aggregate them.
pub mod geocode;
pub mod hydrography;
pub mod hydroshare;
pub mod nlcd;
pub mod nldi;
pub mod noaa;
pub mod streamstats;

#[cfg(test)]
pub(crate) mod fixtures;

use serde_json::Value;

use crate::error::SourceError;
use crate::http::normalize::{normalize_json, parse_feature_collection};
use crate::http::{CancelSignal, Fetcher, HttpResponse, RequestInit};

pub(crate) const GEOJSON_ACCEPT: &str = "application/geo+json, application/json;q=0.9, */*;q=0.5";
pub(crate) const TEXT_ACCEPT: &str = "text/plain, text/csv, text/html;q=0.8, */*;q=0.5";

fn accept(value: &str) -> RequestInit {
    RequestInit {
        headers: vec![("Accept".to_string(), value.to_string())],
        ..RequestInit::default()
    }
}

/// Resilient fetch with the fetcher's defaults, errors tagged with `source`.
pub(crate) async fn fetch_body(
    fetcher: &Fetcher,
    source: &'static str,
    url: &str,
    init: RequestInit,
    cancel: Option<&CancelSignal>,
) -> Result<HttpResponse, SourceError> {
    let options = fetcher
        .options_for(url)
        .with_init(init)
        .with_cancel(cancel.cloned());
    fetcher
        .fetch(url, &options)
        .await
        .map_err(|e| SourceError::fetch(source, e))
}

/// GET → envelope-unwrapped JSON.
pub(crate) async fn fetch_json(
    fetcher: &Fetcher,
    source: &'static str,
    url: &str,
    cancel: Option<&CancelSignal>,
) -> Result<Value, SourceError> {
    let response = fetch_body(fetcher, source, url, accept(GEOJSON_ACCEPT), cancel).await?;
    normalize_json(&response.body, response.content_type.as_deref())
        .map_err(|e| SourceError::shape(source, e))
}

/// GET → validated FeatureCollection.
pub(crate) async fn fetch_feature_collection(
    fetcher: &Fetcher,
    source: &'static str,
    url: &str,
    cancel: Option<&CancelSignal>,
) -> Result<geojson::FeatureCollection, SourceError> {
    let response = fetch_body(fetcher, source, url, accept(GEOJSON_ACCEPT), cancel).await?;
    parse_feature_collection(&response.body, response.content_type.as_deref())
        .map_err(|e| SourceError::shape(source, e))
}

/// Builds `base?k=v&...` with every value percent-encoded.
pub(crate) fn with_query(base: &str, params: &[(&str, String)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{}", base, query)
}
