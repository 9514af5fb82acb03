/// End-to-end session run against scripted upstreams: delineate, rainfall,
/// land cover, runoff, SWMM export and scenarios.
///
/// Run with: cargo test --test session_workflow

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MeteredTransport, Reply, RoutedTransport, context, test_config};
use watershed_service::cache::MemoryStore;
use watershed_service::context::Context;
use watershed_service::error::{LandCoverError, SessionError};
use watershed_service::geometry::buffer_point_square;
use watershed_service::http::cancel_pair;
use watershed_service::landcover::{classify_points, sample_land_use};
use watershed_service::model::{BasinCollection, BasinSource};
use watershed_service::rainfall::{RainfallCache, RainfallSource};
use watershed_service::session::Session;

fn online() -> Arc<RoutedTransport> {
    let transport = RoutedTransport::new();
    transport.route("flowlines.test", vec![Reply::json(common::flowline_network())]);
    transport.route("geocode.test", vec![Reply::json(common::geocode_pa())]);
    transport.route("streamstats.test", vec![Reply::json(common::streamstats_basin())]);
    transport.route("noaa.test", vec![Reply::text(common::noaa_text())]);
    transport.route("nlcd.test", vec![Reply::json(common::nlcd_class(41))]);
    transport
}

fn session(transport: Arc<RoutedTransport>) -> Session {
    let cache = RainfallCache::with_defaults("rainfall", Arc::new(MemoryStore::new()));
    Session::new(context(transport, test_config()), cache)
}

#[tokio::test(start_paused = true)]
async fn test_full_run() {
    let transport = online();
    let mut session = session(transport.clone());
    assert!(session.set_point(40.44, -79.99));

    let source = session.delineate().await.unwrap().source;
    assert_eq!(source, BasinSource::StreamStats);
    assert!(session.area_ac() > 1000.0);

    let rainfall_source = session.fetch_rainfall().await.unwrap().source;
    assert_eq!(rainfall_source, RainfallSource::Noaa);
    assert_eq!(session.selected_duration(), Some("5-min"));
    assert_eq!(session.selected_interval(), Some("1"));

    session.select_duration("24-hr").unwrap();
    session.select_interval("100").unwrap();
    assert_eq!(session.rainfall_depth_in(), Some(6.0));
    assert_eq!(session.rainfall_intensity_in_hr(), Some(0.25));

    let shares = session.sample_land_use().await.unwrap().to_vec();
    assert_eq!(shares.len(), 1);
    assert_eq!(shares[0].category_id, "woods_good");
    assert_eq!(shares[0].percentage, 100);
    assert_eq!(session.curve_number(), 70.0);
    assert!(transport.count("nlcd.test") > 0);

    let runoff = session.compute_runoff().unwrap();
    assert!(runoff.depth_in > 0.0 && runoff.depth_in < 6.0);
    assert!(runoff.volume_ac_ft > 0.0);
    assert!(runoff.peak_cfs > 0.0);

    let inp = session.export_swmm().unwrap();
    assert!(inp.starts_with("[TITLE]"));
    assert!(inp.contains("S1\tRG1\tOut1\t"));
    assert!(inp.contains("S1\t70.0\t0.5\t7"));

    let id = session.add_scenario().unwrap().id.clone();
    assert_eq!(session.scenarios().len(), 1);
    assert_eq!(session.scenarios()[0].label, "100-yr / 24-hr");
    assert!(session.last_error().is_none());

    session.set_curve_number(90.0);
    session.load_scenario(&id).unwrap();
    assert_eq!(session.curve_number(), 70.0);
    assert_eq!(session.rainfall_depth_in(), Some(6.0));
    assert!(session.delineation().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_offline_run_degrades() {
    let mut session = session(RoutedTransport::new());

    let source = session.delineate().await.unwrap().source;
    assert_eq!(source, BasinSource::Synthetic);
    assert_eq!(session.fetch_rainfall().await.unwrap().source, RainfallSource::Synthetic);

    let before = session.curve_number();
    assert!(session.sample_land_use().await.unwrap().is_empty());
    assert_eq!(session.curve_number(), before);

    assert!(session.compute_runoff().is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_classification_drops_unmapped_classes() {
    let transport = RoutedTransport::new();
    transport.route(
        "nlcd.test",
        vec![
            Reply::json(common::nlcd_class(41)),
            Reply::json(common::nlcd_class(82)),
            Reply::json(common::nlcd_class(41)),
            Reply::json(common::nlcd_class(11)),
        ],
    );
    let ctx = context(transport.clone(), test_config());
    let points = [[-79.99, 40.44], [-79.98, 40.44], [-79.99, 40.45], [-79.98, 40.45]];

    let shares = classify_points(&ctx, &points).await.unwrap();

    let pct = |id: &str| shares.iter().find(|s| s.category_id == id).map(|s| s.percentage);
    assert_eq!(pct("woods_good"), Some(67));
    assert_eq!(pct("meadow"), Some(33));
    assert_eq!(shares.iter().map(|s| s.percentage).sum::<i32>(), 100);
    assert_eq!(transport.requests().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_sampling_stops_when_cancelled() {
    let transport = RoutedTransport::new();
    transport.route("nlcd.test", vec![Reply::json(common::nlcd_class(41))]);
    let (handle, signal) = cancel_pair();
    handle.cancel();
    let ctx = context(transport.clone(), test_config()).with_cancel(signal);

    let basin = BasinCollection::single(buffer_point_square(40.44, -79.99, 500.0), BasinSource::Synthetic, None);
    let err = sample_land_use(&ctx, &basin).await.unwrap_err();

    assert_eq!(err, LandCoverError::Cancelled);
    assert!(transport.requests().is_empty());
}

fn grid(n: usize) -> Vec<[f64; 2]> {
    (0..n).map(|i| [-79.99 + i as f64 * 0.001, 40.44]).collect()
}

#[tokio::test(start_paused = true)]
async fn test_batches_bound_concurrent_queries() {
    let routes = RoutedTransport::new();
    routes.route("nlcd.test", vec![Reply::json(common::nlcd_class(41))]);
    let metered = Arc::new(MeteredTransport::new(routes.clone(), Duration::from_millis(100)));
    let config = test_config();
    let batch_size = config.landcover.batch_size;
    let ctx = Context::with_transport(metered.clone(), config);

    let shares = classify_points(&ctx, &grid(20)).await.unwrap();

    assert_eq!(batch_size, 5);
    assert_eq!(metered.peak_in_flight(), batch_size);
    assert_eq!(metered.started(), 20);
    assert_eq!(routes.requests().len(), 20);
    assert_eq!(shares[0].percentage, 100);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_sampling_discards_partial_tally() {
    let routes = RoutedTransport::new();
    routes.route("nlcd.test", vec![Reply::json(common::nlcd_class(41))]);
    let (handle, signal) = cancel_pair();
    let metered = Arc::new(MeteredTransport::new(routes, Duration::from_millis(100)).cancel_on("nlcd.test", 5, handle));
    let ctx = Context::with_transport(metered.clone(), test_config()).with_cancel(signal);

    let err = classify_points(&ctx, &grid(20)).await.unwrap_err();

    assert_eq!(err, LandCoverError::Cancelled);
    assert_eq!(metered.started(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_sampling_keeps_curve_number() {
    let (handle, signal) = cancel_pair();
    let metered = Arc::new(MeteredTransport::new(online(), Duration::from_millis(100)).cancel_on("nlcd.test", 5, handle));
    let ctx = Context::with_transport(metered.clone(), test_config()).with_cancel(signal);
    let cache = RainfallCache::with_defaults("rainfall", Arc::new(MemoryStore::new()));
    let mut session = Session::new(ctx, cache);
    assert!(session.set_point(40.44, -79.99));
    session.delineate().await.unwrap();
    let before = session.curve_number();

    let err = session.sample_land_use().await.unwrap_err();

    assert_eq!(err, SessionError::LandCover(LandCoverError::Cancelled));
    assert_eq!(session.curve_number(), before);
    assert!(session.land_use().is_empty());
    assert_eq!(session.last_error(), Some("land cover sampling was cancelled"));
    assert!(!session.progress_log().any(|line| line.contains("Land use data loaded")));
}
