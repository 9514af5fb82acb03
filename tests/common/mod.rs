//! Shared harness for integration tests: an in-memory `HttpTransport` that
//! answers by URL substring and records every request it sees.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use watershed_service::config::ServiceConfig;
use watershed_service::context::Context;
use watershed_service::error::TransportError;
use watershed_service::http::{CancelHandle, HttpRequest, HttpResponse, HttpTransport};

pub const NOAA: &str = "https://noaa.test/fe_text_mean.csv";
pub const STREAMSTATS: &str = "https://streamstats.test/watershed.geojson";
pub const GEOCODE: &str = "https://geocode.test/reverse";
pub const NLDI: &str = "https://nldi.test/linked-data";
pub const NLDI_PROCESSES: &str = "https://processes.test/processes";
pub const HYDROGRAPHY: &str = "https://flowlines.test/ows";
pub const HYDROSHARE: &str = "https://hydroshare.test/wfs";
pub const NLCD: &str = "https://nlcd.test/wms";

#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str, String),
    Fail,
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Reply::Status(200, "application/json", body.into())
    }

    pub fn text(body: impl Into<String>) -> Self {
        Reply::Status(200, "text/plain", body.into())
    }

    pub fn status(code: u16) -> Self {
        Reply::Status(code, "text/html", format!("<html><body>{}</body></html>", code))
    }
}

/// Routes are checked in registration order; the first whose pattern occurs
/// in the URL answers. Each route plays its replies in order and repeats the
/// last one. Unrouted URLs fail like a refused connection.
#[derive(Default)]
pub struct RoutedTransport {
    routes: Mutex<Vec<(String, VecDeque<Reply>)>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl RoutedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(RoutedTransport::default())
    }

    pub fn route(&self, pattern: &str, replies: Vec<Reply>) {
        self.routes
            .lock()
            .unwrap()
            .push((pattern.to_string(), replies.into()));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn count(&self, pattern: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(pattern))
            .count()
    }
}

#[async_trait]
impl HttpTransport for RoutedTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());

        let reply = {
            let mut routes = self.routes.lock().unwrap();
            routes
                .iter_mut()
                .find(|(pattern, _)| request.url.contains(pattern.as_str()))
                .and_then(|(_, replies)| {
                    if replies.len() > 1 {
                        replies.pop_front()
                    } else {
                        replies.front().cloned()
                    }
                })
        };

        match reply {
            Some(Reply::Status(status, content_type, body)) => Ok(HttpResponse {
                status,
                content_type: Some(content_type.to_string()),
                body,
            }),
            Some(Reply::Fail) | None => Err(TransportError::Network(format!("connection refused: {}", request.url))),
        }
    }
}

/// Wraps a `RoutedTransport`, holding every reply for `delay` and recording
/// the most requests it ever had open at once. Optionally fires a cancel
/// handle when the `n`th request whose URL contains a pattern arrives.
pub struct MeteredTransport {
    inner: Arc<RoutedTransport>,
    delay: Duration,
    open: AtomicUsize,
    peak: AtomicUsize,
    trip: Mutex<Option<(String, usize, CancelHandle)>>,
    tripped: AtomicUsize,
    started: AtomicUsize,
}

impl MeteredTransport {
    pub fn new(inner: Arc<RoutedTransport>, delay: Duration) -> Self {
        MeteredTransport {
            inner,
            delay,
            open: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            trip: Mutex::new(None),
            tripped: AtomicUsize::new(0),
            started: AtomicUsize::new(0),
        }
    }

    pub fn cancel_on(self, pattern: &str, nth: usize, handle: CancelHandle) -> Self {
        *self.trip.lock().unwrap() = Some((pattern.to_string(), nth, handle));
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Requests received, including ones abandoned before their reply.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for MeteredTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        {
            let trip = self.trip.lock().unwrap();
            if let Some((pattern, nth, handle)) = trip.as_ref() {
                if request.url.contains(pattern.as_str()) && self.tripped.fetch_add(1, Ordering::SeqCst) + 1 == *nth {
                    handle.cancel();
                }
            }
        }

        tokio::time::sleep(self.delay).await;
        let reply = self.inner.send(request).await;
        self.open.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Test endpoints, no proxy, one fallback attempt, short backoff.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.http.proxy_base = String::new();
    config.http.retries = 0;
    config.http.backoff_ms = 1;
    config.http.timeout_ms = 5_000;

    config.endpoints.noaa = NOAA.to_string();
    config.endpoints.streamstats = STREAMSTATS.to_string();
    config.endpoints.geocode = GEOCODE.to_string();
    config.endpoints.nldi = NLDI.to_string();
    config.endpoints.nldi_processes = NLDI_PROCESSES.to_string();
    config.endpoints.hydrography = HYDROGRAPHY.to_string();
    config.endpoints.hydroshare = HYDROSHARE.to_string();
    config.endpoints.nlcd = NLCD.to_string();
    config
}

pub fn context(transport: Arc<RoutedTransport>, config: ServiceConfig) -> Context {
    Context::with_transport(transport, config)
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

pub fn geocode_pa() -> String {
    r#"{ "countryCode": "US", "principalSubdivision": "Pennsylvania", "principalSubdivisionCode": "US-PA" }"#.to_string()
}

pub fn geocode_offshore() -> String {
    r#"{ "countryCode": "", "principalSubdivisionCode": "" }"#.to_string()
}

pub fn square_fc(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64, properties: &str) -> String {
    format!(
        r#"{{ "type": "FeatureCollection", "features": [ {{ "type": "Feature",
            "geometry": {{ "type": "Polygon", "coordinates": [[[{a}, {b}], [{c}, {b}], [{c}, {d}], [{a}, {d}], [{a}, {b}]]] }},
            "properties": {props} }} ] }}"#,
        a = min_lon,
        b = min_lat,
        c = max_lon,
        d = max_lat,
        props = properties
    )
}

pub fn streamstats_basin() -> String {
    format!(
        r#"{{ "featurecollection": [
            {{ "name": "globalwatershedpoint", "feature": {{ "type": "FeatureCollection", "features": [] }} }},
            {{ "name": "globalwatershed", "feature": {} }}
        ] }}"#,
        square_fc(-80.02, 40.42, -79.96, 40.46, "{}")
    )
}

pub fn empty_fc() -> String {
    r#"{ "type": "FeatureCollection", "features": [] }"#.to_string()
}

/// One reach passing ~55 m north of (40.44, -79.99).
pub fn flowline_network() -> String {
    r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature",
          "geometry": { "type": "LineString", "coordinates": [[-79.995, 40.4405], [-79.985, 40.4405]] },
          "properties": { "comid": 13297246, "gnis_name": "Chartiers Creek" } }
    ] }"#
        .to_string()
}

pub fn nldi_position() -> String {
    r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature",
          "geometry": { "type": "LineString", "coordinates": [[-79.995, 40.435], [-79.985, 40.445]] },
          "properties": { "identifier": "13297246" } }
    ] }"#
        .to_string()
}

pub fn split_catchment() -> String {
    r#"{ "type": "FeatureCollection", "features": [
        { "type": "Feature", "id": "catchment",
          "geometry": { "type": "Polygon", "coordinates": [[[-80.0, 40.43], [-79.98, 40.43], [-79.98, 40.45], [-80.0, 40.43]]] },
          "properties": {} },
        { "type": "Feature", "id": "drainageBasin",
          "geometry": { "type": "Polygon", "coordinates": [[[-80.05, 40.40], [-79.95, 40.40], [-79.95, 40.48], [-80.05, 40.48], [-80.05, 40.40]]] },
          "properties": {} }
    ] }"#
        .to_string()
}

pub fn nlcd_class(class: u32) -> String {
    format!(
        r#"{{ "type": "FeatureCollection", "features": [ {{ "type": "Feature", "geometry": null, "properties": {{ "PALETTE_INDEX": {} }} }} ] }}"#,
        class
    )
}

pub fn noaa_text() -> String {
    "POINT PRECIPITATION FREQUENCY ESTIMATES
Latitude: 40.4400, Longitude: -79.9900
Date/Time (UTC): 27-Nov-2025 20:00:00

Average recurrence interval (ARI) (years): 1, 2, 5, 10, 25, 50, 100
5-min:, 0.35, 0.42, 0.50, 0.57, 0.66, 0.73, 0.81
1-hr:, 1.10, 1.31, 1.62, 1.87, 2.22, 2.50, 2.80
24-hr:, 2.00, 2.50, 3.30, 4.00, 4.50, 5.00, 6.00
"
    .to_string()
}
