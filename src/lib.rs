/// watershed_service: point-and-click watershed runoff screening.
///
/// Given an outlet coordinate, the service delineates the contributing
/// basin, pulls the NOAA Atlas 14 rainfall-frequency table, samples NLCD
/// land cover into a TR-55 curve number, and estimates runoff. Every
/// upstream call goes through one resilient fetch path (direct attempt,
/// proxy fallback, retries, cancellation) and every data source has a
/// fallback, so a run degrades rather than fails.
///
/// # Module structure
///
/// ```text
/// watershed_service
/// ├── config      — watershed.toml loader with .env overrides
/// ├── context     — fetcher + configuration + cancel signal bundle
/// ├── logging     — tracing subscriber setup
/// ├── error       — error taxonomy (transport → fetch → source → combinator)
/// ├── model       — shared data types (BasinCollection, FlowlineRef, RainfallTable, …)
/// ├── geometry    — area, bounding boxes, point-in-polygon, square buffer, nearest point
/// ├── cache       — bounded, expiring key/value cache over a pluggable store
/// ├── http
/// │   ├── fetch     — resilient fetch: direct, proxy fallback, retries, cancel
/// │   └── normalize — proxy envelope unwrapping and response shape checks
/// ├── ingest
/// │   ├── noaa        — Atlas 14 rainfall-frequency text: URL + parser
/// │   ├── streamstats — USGS StreamStats basin delineation
/// │   ├── geocode     — reverse geocoding to a state code
/// │   ├── nldi        — NLDI position snap, basin, split catchment, upstream trace
/// │   ├── hydrography — NHDPlus flowline network query
/// │   ├── hydroshare  — HydroShare catchment WFS
/// │   ├── nlcd        — NLCD land cover point classification
/// │   └── fixtures (test only) — representative API response payloads
/// ├── snapping    — two-tier flowline snap
/// ├── delineation — tiered basin cascade ending in a synthetic buffer
/// ├── rainfall    — live → synthetic → stale-cache rainfall lookup
/// ├── landcover   — random sampling, batched classification, percentages
/// ├── hydrology
/// │   ├── curve_number — TR-55 curve number table and compositing
/// │   ├── runoff       — NRCS CN depth, volume, rational peak
/// │   └── swmm         — minimal SWMM .inp export
/// ├── health      — upstream heartbeat probe
/// └── session     — stateful step-by-step workflow with scenarios
/// ```

/// Public modules
pub mod cache;
pub mod config;
pub mod context;
pub mod delineation;
pub mod error;
pub mod geometry;
pub mod health;
pub mod http;
pub mod hydrology;
pub mod ingest;
pub mod landcover;
pub mod logging;
pub mod model;
pub mod rainfall;
pub mod session;
pub mod snapping;
