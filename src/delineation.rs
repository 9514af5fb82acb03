/// Watershed delineation cascade.
///
/// After snapping the point to a flowline, tiers run strictly in order and
/// the first non-empty basin wins:
///
/// ```text
/// PrimaryBasin        StreamStats, keyed by the state found by reverse geocoding
/// SplitCatchment      NLDI split-catchment at the snapped point
/// BasinByReach        NLDI basin for the snapped reach id
/// AlternateCatchment  HydroShare catchment WFS for the same reach id
/// SyntheticBuffer     square around the input point (placeholder, not hydrology)
/// ```
///
/// A tier that errors, finds nothing, or lacks its input (no region code, no
/// snap) is logged and skipped. Only when every tier is exhausted does the
/// caller see an error, carrying every tier's reason in one message.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::context::Context;
use crate::error::{DelineationError, SourceError};
use crate::geometry::{buffer_point_square, is_valid_coordinate};
use crate::ingest::{geocode, hydroshare, nldi, streamstats};
use crate::model::{BasinCollection, BasinSource, SnapResult};
use crate::snapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    PrimaryBasin,
    SplitCatchment,
    BasinByReach,
    AlternateCatchment,
    SyntheticBuffer,
}

impl Tier {
    pub const CASCADE: [Tier; 5] = [
        Tier::PrimaryBasin,
        Tier::SplitCatchment,
        Tier::BasinByReach,
        Tier::AlternateCatchment,
        Tier::SyntheticBuffer,
    ];

    pub fn source(&self) -> BasinSource {
        match self {
            Tier::PrimaryBasin => BasinSource::StreamStats,
            Tier::SplitCatchment => BasinSource::NldiSplit,
            Tier::BasinByReach => BasinSource::Nldi,
            Tier::AlternateCatchment => BasinSource::HydroShare,
            Tier::SyntheticBuffer => BasinSource::Synthetic,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Tier::PrimaryBasin => "StreamStats basin",
            Tier::SplitCatchment => "NLDI split catchment",
            Tier::BasinByReach => "NLDI basin",
            Tier::AlternateCatchment => "HydroShare catchment",
            Tier::SyntheticBuffer => "synthetic buffer",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of a successful cascade.
#[derive(Debug, Clone, Serialize)]
pub struct Delineation {
    pub basin: BasinCollection,
    pub source: BasinSource,
    /// Reach the basin drains to, when known.
    pub comid: Option<String>,
    pub snap: Option<SnapResult>,
}

impl Delineation {
    pub fn area_sq_meters(&self) -> f64 {
        self.basin.area_sq_meters()
    }

    pub fn area_acres(&self) -> f64 {
        self.basin.area_acres()
    }

    pub fn is_authoritative(&self) -> bool {
        self.source.is_authoritative()
    }
}

/// Why a tier produced nothing.
enum Outcome {
    Found(BasinCollection),
    Empty,
    Skipped(&'static str),
}

/// Tiers in cascade order, honoring `[delineation].synthetic_fallback`.
pub fn cascade_tiers(ctx: &Context) -> Vec<Tier> {
    Tier::CASCADE
        .into_iter()
        .filter(|t| *t != Tier::SyntheticBuffer || ctx.config.delineation.synthetic_fallback)
        .collect()
}

pub async fn delineate(ctx: &Context, lat: f64, lon: f64) -> Result<Delineation, DelineationError> {
    if !is_valid_coordinate(lat, lon) {
        return Err(DelineationError::InvalidCoordinate { lat, lon });
    }

    let mut reasons: Vec<String> = Vec::new();

    let snap = match snapping::snap_to_flowline(ctx, lat, lon).await {
        Ok(snap) => {
            info!(comid = %snap.flowline.comid, distance_m = snap.distance_m, method = %snap.flowline.method, "snapped to flowline");
            Some(snap)
        }
        Err(e) if e.is_cancelled() => return Err(DelineationError::Cancelled),
        Err(e) => {
            warn!(error = %e, "flowline snap failed, reach-based tiers will be skipped");
            reasons.push(format!("flowline snap failed ({})", e));
            None
        }
    };

    for tier in cascade_tiers(ctx) {
        if ctx.is_cancelled() {
            return Err(DelineationError::Cancelled);
        }

        match run_tier(ctx, tier, lat, lon, snap.as_ref()).await {
            Ok(Outcome::Found(basin)) => {
                info!(tier = %tier, features = basin.features.len(), "basin delineated");
                let comid = snap
                    .as_ref()
                    .map(|s| s.flowline.comid.clone())
                    .or_else(|| basin.features.iter().find_map(|f| f.comid.clone()));
                return Ok(Delineation {
                    basin,
                    source: tier.source(),
                    comid,
                    snap,
                });
            }
            Ok(Outcome::Empty) => {
                info!(tier = %tier, "tier returned no geometry");
                reasons.push(format!("{} returned no geometry", tier));
            }
            Ok(Outcome::Skipped(why)) => {
                info!(tier = %tier, reason = why, "tier skipped");
                reasons.push(format!("{} skipped ({})", tier, why));
            }
            Err(e) if e.is_cancelled() => return Err(DelineationError::Cancelled),
            Err(e) => {
                warn!(tier = %tier, error = %e, "tier failed");
                reasons.push(e.to_string());
            }
        }
    }

    Err(DelineationError::Exhausted(reasons.join("; ")))
}

async fn run_tier(
    ctx: &Context,
    tier: Tier,
    lat: f64,
    lon: f64,
    snap: Option<&SnapResult>,
) -> Result<Outcome, SourceError> {
    let endpoints = &ctx.config.endpoints;
    let fetcher = &ctx.fetcher;
    let cancel = ctx.cancel();
    let comid = snap.map(|s| s.flowline.comid.as_str());

    let basin = match tier {
        Tier::PrimaryBasin => {
            let Some(rcode) = geocode::fetch_region_code(fetcher, &endpoints.geocode, lat, lon, cancel).await? else {
                return Ok(Outcome::Skipped("no region code for this location"));
            };
            streamstats::fetch_watershed(fetcher, &endpoints.streamstats, &rcode, lat, lon, cancel).await?
        }
        Tier::SplitCatchment => {
            let Some(snap) = snap else {
                return Ok(Outcome::Skipped("no snapped point"));
            };
            nldi::fetch_split_catchment(fetcher, &endpoints.nldi_processes, snap.snapped_lat, snap.snapped_lon, cancel)
                .await?
        }
        Tier::BasinByReach => {
            let Some(comid) = comid else {
                return Ok(Outcome::Skipped("no reach id"));
            };
            nldi::fetch_basin(fetcher, &endpoints.nldi, comid, cancel).await?
        }
        Tier::AlternateCatchment => {
            let Some(comid) = comid else {
                return Ok(Outcome::Skipped("no reach id"));
            };
            if comid.trim().parse::<i64>().is_err() {
                return Ok(Outcome::Skipped("reach id is not an integer"));
            }
            hydroshare::fetch_catchment(fetcher, &endpoints.hydroshare, comid, cancel).await?
        }
        Tier::SyntheticBuffer => BasinCollection::single(
            buffer_point_square(lat, lon, ctx.config.delineation.synthetic_half_width_m),
            BasinSource::Synthetic,
            comid.map(String::from),
        ),
    };

    Ok(if basin.is_empty() {
        Outcome::Empty
    } else {
        Outcome::Found(basin)
    })
}
