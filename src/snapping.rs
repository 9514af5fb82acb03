/// Flowline snapping: move a clicked point onto the nearest stream reach.
///
/// Two tiers:
///   1. Network query - every reach in a search box around the point, nearest
///      segment wins, rejected if farther than the maximum snap distance.
///   2. Position lookup - NLDI's own nearest-reach index. Coarser, but it
///      answers anywhere in NHDPlus coverage.
///
/// A reach without an identifier is useless downstream, so it is a failure
/// rather than a partial success.

use tracing::{info, warn};

use crate::context::Context;
use crate::error::SourceError;
use crate::geometry::{BoundingBox, nearest_point_on_lines};
use crate::ingest::{hydrography, nldi};
use crate::model::{FlowlineRef, SnapResult};

pub async fn snap_to_flowline(ctx: &Context, lat: f64, lon: f64) -> Result<SnapResult, SourceError> {
    match snap_by_network(ctx, lat, lon).await {
        Ok(Some(snap)) => return Ok(snap),
        Ok(None) => info!(lat, lon, "no flowline within snap distance, using position lookup"),
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => warn!(error = %e, "flowline network query failed, using position lookup"),
    }
    snap_by_position(ctx, lat, lon).await
}

/// `Ok(None)` when no reach lies within the maximum snap distance.
pub async fn snap_by_network(ctx: &Context, lat: f64, lon: f64) -> Result<Option<SnapResult>, SourceError> {
    let settings = &ctx.config.delineation;
    let bbox = BoundingBox::around(lat, lon, settings.search_radius_m);
    let flowlines = hydrography::query_flowlines(
        &ctx.fetcher,
        &ctx.config.endpoints.hydrography,
        &bbox,
        ctx.cancel(),
    )
    .await?;

    let Some((flowline, point, distance_m)) = closest(flowlines, lat, lon) else {
        return Ok(None);
    };
    if distance_m > settings.max_snap_distance_m {
        info!(comid = %flowline.comid, distance_m, "nearest flowline is beyond the snap limit");
        return Ok(None);
    }

    Ok(Some(SnapResult {
        flowline,
        snapped_lat: point[1],
        snapped_lon: point[0],
        distance_m,
    }))
}

pub async fn snap_by_position(ctx: &Context, lat: f64, lon: f64) -> Result<SnapResult, SourceError> {
    let flowline = nldi::fetch_flowline_at(&ctx.fetcher, &ctx.config.endpoints.nldi, lat, lon, ctx.cancel()).await?;

    let (snapped_lon, snapped_lat, distance_m) = match nearest_point_on_lines(lat, lon, &flowline.lines) {
        Some((p, d)) => (p[0], p[1], d),
        None => (lon, lat, 0.0),
    };
    Ok(SnapResult {
        flowline,
        snapped_lat,
        snapped_lon,
        distance_m,
    })
}

/// Reach with the nearest point to `(lat, lon)`, that point, and its distance.
fn closest(flowlines: Vec<FlowlineRef>, lat: f64, lon: f64) -> Option<(FlowlineRef, [f64; 2], f64)> {
    flowlines
        .into_iter()
        .filter_map(|f| {
            let (point, distance) = nearest_point_on_lines(lat, lon, &f.lines)?;
            Some((f, point, distance))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
}
