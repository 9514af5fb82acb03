/// Land-cover sampling over a watershed.
///
/// Random points inside the basin are classified against the NLCD raster
/// service and tallied into TR-55 land use percentages. Queries run in small
/// concurrent batches; a batch starts only after the previous one resolved.
///
/// Points are drawn uniformly from the bounding box of the outer rings and
/// kept if they fall inside any outer ring (holes are ignored). Attempts are
/// capped at ten times the sample count, so a sliver-shaped basin yields
/// fewer samples rather than spinning.

use futures::future::join_all;
use rand::Rng;
use tracing::{debug, info};

use crate::context::Context;
use crate::error::LandCoverError;
use crate::geometry::{Position, outer_bbox};
use crate::ingest::nlcd;
use crate::model::{BasinCollection, Hsg, LandUseShare};

/// Attempt budget per requested sample.
const ATTEMPTS_PER_SAMPLE: usize = 10;

/// Samples `[landcover].samples` points with the thread RNG.
pub async fn sample_land_use(ctx: &Context, basin: &BasinCollection) -> Result<Vec<LandUseShare>, LandCoverError> {
    let points = {
        let mut rng = rand::thread_rng();
        sample_points(basin, ctx.config.landcover.samples, &mut rng)
    };
    classify_points(ctx, &points).await
}

/// Uniform points inside the basin, at most `count`.
pub fn sample_points<R: Rng>(basin: &BasinCollection, count: usize, rng: &mut R) -> Vec<Position> {
    let bbox = outer_bbox(basin.shapes());
    if bbox.is_empty() || count == 0 {
        return Vec::new();
    }

    let max_attempts = count.saturating_mul(ATTEMPTS_PER_SAMPLE);
    let mut points = Vec::with_capacity(count);
    let mut attempts = 0;
    while points.len() < count && attempts < max_attempts {
        attempts += 1;
        let lon = bbox.min_lon + rng.gen_range(0.0..1.0) * (bbox.max_lon - bbox.min_lon);
        let lat = bbox.min_lat + rng.gen_range(0.0..1.0) * (bbox.max_lat - bbox.min_lat);
        if basin.contains([lon, lat]) {
            points.push([lon, lat]);
        }
    }
    debug!(requested = count, accepted = points.len(), attempts, "sampled land cover points");
    points
}

/// Classifies every point and aggregates the mapped categories. Failed,
/// empty and unmapped classifications are dropped from the denominator.
///
/// A cancel signal seen before or during any batch discards the partial
/// tally and returns `LandCoverError::Cancelled`.
pub async fn classify_points(ctx: &Context, points: &[Position]) -> Result<Vec<LandUseShare>, LandCoverError> {
    let batch_size = ctx.config.landcover.batch_size.max(1);
    let base = ctx.config.endpoints.nlcd.as_str();
    let mut categories: Vec<&'static str> = Vec::new();

    for batch in points.chunks(batch_size) {
        if ctx.is_cancelled() {
            info!(valid = categories.len(), "land cover sampling cancelled");
            return Err(LandCoverError::Cancelled);
        }
        let queries = batch
            .iter()
            .map(|p| nlcd::fetch_class(&ctx.fetcher, base, p[1], p[0], ctx.cancel()));
        let results = join_all(queries).await;
        if ctx.is_cancelled() {
            info!(valid = categories.len(), "land cover sampling cancelled");
            return Err(LandCoverError::Cancelled);
        }
        for result in results {
            match result {
                Ok(Some(class)) => match nlcd::category_for_class(class) {
                    Some(category) => categories.push(category),
                    None => debug!(class, "unmapped land cover class"),
                },
                Ok(None) => debug!("no land cover class at sample point"),
                Err(e) => debug!(error = %e, "land cover query failed"),
            }
        }
    }

    info!(points = points.len(), valid = categories.len(), "land cover sampling finished");
    Ok(aggregate(&categories))
}

/// Percentages per category in first-seen order, summing to exactly 100.
///
/// The rounding remainder goes to the first category. When rounding
/// overshoots by more than the first share holds, that share drops to zero
/// and the rest comes off the largest shares; zero shares are removed.
pub fn aggregate(categories: &[&str]) -> Vec<LandUseShare> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for category in categories {
        match counts.iter_mut().find(|(c, _)| c == category) {
            Some((_, n)) => *n += 1,
            None => counts.push((*category, 1)),
        }
    }
    if counts.is_empty() {
        return Vec::new();
    }

    let total = categories.len() as f64;
    let mut shares: Vec<LandUseShare> = counts
        .iter()
        .map(|(category, n)| LandUseShare {
            category_id: category.to_string(),
            hsg: Hsg::C,
            percentage: ((*n as f64 / total) * 100.0).round() as i32,
        })
        .collect();

    let sum: i32 = shares.iter().map(|s| s.percentage).sum();
    let first = &mut shares[0];
    let adjusted = (first.percentage + 100 - sum).max(0);
    let mut excess = sum - 100 + adjusted - first.percentage;
    first.percentage = adjusted;

    while excess > 0 {
        let Some(largest) = shares.iter_mut().max_by_key(|s| s.percentage) else {
            break;
        };
        largest.percentage -= 1;
        excess -= 1;
    }
    shares.retain(|s| s.percentage > 0);
    shares
}
