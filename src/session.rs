/// Interactive working state for one outlet point.
///
/// A `Session` strings the pipeline together the way an analyst steps
/// through it: delineate, pull rainfall, pick a duration and recurrence
/// interval, sample land cover into a curve number, compute runoff, export.
/// Each step reads what earlier steps left behind. Failures are returned and
/// also kept as `last_error`, and every step leaves a timestamped line in the
/// progress log.

use std::collections::VecDeque;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::Context;
use crate::delineation::{self, Delineation};
use crate::error::SessionError;
use crate::hydrology::{RunoffResult, SwmmSubcatchment, composite_curve_number, compute_runoff, format_inp};
use crate::ingest::noaa;
use crate::landcover;
use crate::model::LandUseShare;
use crate::rainfall::{self, RainfallCache, RainfallResult};

/// Downtown Pittsburgh, at the Point.
pub const DEFAULT_LAT: f64 = 40.4406;
pub const DEFAULT_LON: f64 = -79.9959;
pub const DEFAULT_CURVE_NUMBER: f64 = 75.0;
/// Oldest progress lines are dropped past this many.
pub const PROGRESS_LOG_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
    pub area_ac: f64,
    pub cn: f64,
    pub rainfall_depth_in: f64,
    pub interval: String,
    pub duration: String,
    pub land_use: Vec<LandUseShare>,
}

pub struct Session {
    ctx: Context,
    cache: RainfallCache,

    lat: f64,
    lon: f64,
    delineation: Option<Delineation>,
    area_ac: f64,

    rainfall: Option<RainfallResult>,
    selected_duration: Option<String>,
    selected_interval: Option<String>,
    rainfall_depth_in: Option<f64>,
    rainfall_intensity_in_hr: Option<f64>,

    cn: f64,
    land_use: Vec<LandUseShare>,
    runoff: Option<RunoffResult>,

    scenarios: Vec<Scenario>,
    next_scenario: u32,
    progress: VecDeque<String>,
    last_error: Option<String>,
}

impl Session {
    pub fn new(ctx: Context, cache: RainfallCache) -> Self {
        Session {
            ctx,
            cache,
            lat: DEFAULT_LAT,
            lon: DEFAULT_LON,
            delineation: None,
            area_ac: 0.0,
            rainfall: None,
            selected_duration: None,
            selected_interval: None,
            rainfall_depth_in: None,
            rainfall_intensity_in_hr: None,
            cn: DEFAULT_CURVE_NUMBER,
            land_use: Vec::new(),
            runoff: None,
            scenarios: Vec::new(),
            next_scenario: 1,
            progress: VecDeque::new(),
            last_error: None,
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn point(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn delineation(&self) -> Option<&Delineation> {
        self.delineation.as_ref()
    }

    pub fn area_ac(&self) -> f64 {
        self.area_ac
    }

    pub fn rainfall(&self) -> Option<&RainfallResult> {
        self.rainfall.as_ref()
    }

    pub fn selected_duration(&self) -> Option<&str> {
        self.selected_duration.as_deref()
    }

    pub fn selected_interval(&self) -> Option<&str> {
        self.selected_interval.as_deref()
    }

    pub fn rainfall_depth_in(&self) -> Option<f64> {
        self.rainfall_depth_in
    }

    pub fn rainfall_intensity_in_hr(&self) -> Option<f64> {
        self.rainfall_intensity_in_hr
    }

    pub fn curve_number(&self) -> f64 {
        self.cn
    }

    pub fn land_use(&self) -> &[LandUseShare] {
        &self.land_use
    }

    pub fn runoff(&self) -> Option<&RunoffResult> {
        self.runoff.as_ref()
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Most recent `PROGRESS_LOG_LIMIT` lines, oldest first.
    pub fn progress_log(&self) -> impl Iterator<Item = &str> {
        self.progress.iter().map(String::as_str)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // -----------------------------------------------------------------------
    // Point and delineation
    // -----------------------------------------------------------------------

    /// Moves the outlet. Anything derived from the old point is dropped.
    /// Non-finite input is ignored and reported as `false`.
    pub fn set_point(&mut self, lat: f64, lon: f64) -> bool {
        if !lat.is_finite() || !lon.is_finite() {
            return false;
        }
        if (lat, lon) != (self.lat, self.lon) {
            self.lat = lat;
            self.lon = lon;
            self.delineation = None;
            self.area_ac = 0.0;
            self.reset_rainfall();
            self.runoff = None;
        }
        true
    }

    pub async fn delineate(&mut self) -> Result<&Delineation, SessionError> {
        self.log("Delineating watershed...");
        let result = delineation::delineate(&self.ctx, self.lat, self.lon).await;
        match result {
            Ok(d) => {
                self.area_ac = d.area_acres();
                self.log(&format!(
                    "Delineation complete: {} ({:.1} ac).",
                    d.source, self.area_ac
                ));
                self.last_error = None;
                Ok(self.delineation.insert(d))
            }
            Err(e) => self.fail("Delineation", e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Rainfall
    // -----------------------------------------------------------------------

    /// Loads the table and selects its first duration and first interval.
    pub async fn fetch_rainfall(&mut self) -> Result<&RainfallResult, SessionError> {
        self.reset_rainfall();
        self.log("Fetching rainfall data...");
        let result = rainfall::fetch_rainfall(&self.ctx, &self.cache, self.lat, self.lon).await;
        match result {
            Ok(r) => {
                self.selected_duration = r.table.rows.first().map(|row| row.duration.clone());
                self.selected_interval = r.table.intervals.first().cloned();
                let stale = if r.stale { " (stale)" } else { "" };
                self.log(&format!("Rainfall data loaded from {}{}.", r.source, stale));
                self.last_error = None;
                self.rainfall = Some(r);
                self.refresh_depth();
                self.rainfall.as_ref().ok_or(SessionError::NoRainfall)
            }
            Err(e) => self.fail("Rainfall lookup", e.into()),
        }
    }

    pub fn select_duration(&mut self, duration: &str) -> Result<(), SessionError> {
        if let Some(r) = &self.rainfall {
            if r.table.row(duration).is_none() {
                return self.fail("Duration selection", SessionError::UnknownDuration(duration.to_string()));
            }
        }
        self.selected_duration = Some(duration.to_string());
        self.refresh_depth();
        Ok(())
    }

    pub fn select_interval(&mut self, interval: &str) -> Result<(), SessionError> {
        if let Some(r) = &self.rainfall {
            if !r.table.intervals.iter().any(|i| i == interval) {
                return self.fail("Interval selection", SessionError::UnknownInterval(interval.to_string()));
            }
        }
        self.selected_interval = Some(interval.to_string());
        self.refresh_depth();
        Ok(())
    }

    /// Depth for the current selection; intensity is depth over the
    /// duration's length in hours.
    fn refresh_depth(&mut self) {
        let (Some(r), Some(d), Some(i)) = (&self.rainfall, &self.selected_duration, &self.selected_interval) else {
            return;
        };
        self.rainfall_depth_in = r.table.depth(d, i).filter(|v| v.is_finite());
        self.rainfall_intensity_in_hr = match (self.rainfall_depth_in, noaa::duration_hours(d)) {
            (Some(depth), Some(hours)) => Some(depth / hours),
            _ => None,
        };
    }

    fn reset_rainfall(&mut self) {
        self.rainfall = None;
        self.selected_duration = None;
        self.selected_interval = None;
        self.rainfall_depth_in = None;
        self.rainfall_intensity_in_hr = None;
    }

    // -----------------------------------------------------------------------
    // Land use and curve number
    // -----------------------------------------------------------------------

    pub fn set_curve_number(&mut self, cn: f64) {
        self.cn = cn;
    }

    /// Replaces the land use table. A non-empty table recomputes the curve
    /// number; an empty one leaves it alone.
    pub fn apply_land_use(&mut self, shares: Vec<LandUseShare>) {
        if let Some(cn) = composite_curve_number(&shares) {
            self.cn = f64::from(cn);
        }
        self.land_use = shares;
    }

    /// A cancelled run is reported as a failure and leaves the curve number
    /// and land use table as they were.
    pub async fn sample_land_use(&mut self) -> Result<&[LandUseShare], SessionError> {
        self.log("Fetching land use data...");
        let Some(d) = &self.delineation else {
            return self.fail("Land use sampling", SessionError::NotDelineated);
        };
        let result = landcover::sample_land_use(&self.ctx, &d.basin).await;
        let shares = match result {
            Ok(shares) => shares,
            Err(e) => return self.fail("Land use sampling", e.into()),
        };
        if shares.is_empty() {
            self.log("No classifiable land cover samples; curve number unchanged.");
        } else {
            self.log("Land use data loaded.");
        }
        self.apply_land_use(shares);
        Ok(&self.land_use)
    }

    // -----------------------------------------------------------------------
    // Runoff and export
    // -----------------------------------------------------------------------

    pub fn compute_runoff(&mut self) -> Result<RunoffResult, SessionError> {
        self.log("Computing runoff values...");
        let Some(depth) = self.rainfall_depth_in.filter(|d| *d > 0.0) else {
            return self.fail("Runoff", SessionError::NoRainfall);
        };
        if self.area_ac <= 0.0 {
            return self.fail("Runoff", SessionError::NotDelineated);
        }
        let result = compute_runoff(depth, self.rainfall_intensity_in_hr, self.cn, self.area_ac);
        info!(depth_in = result.depth_in, volume_ac_ft = result.volume_ac_ft, peak_cfs = result.peak_cfs, "runoff computed");
        self.runoff = Some(result);
        Ok(result)
    }

    /// SWMM `.inp` text for the current area and curve number.
    pub fn export_swmm(&mut self) -> Result<String, SessionError> {
        self.log("Exporting SWMM file...");
        if self.area_ac <= 0.0 {
            return self.fail("SWMM export", SessionError::NotDelineated);
        }
        Ok(format_inp(&SwmmSubcatchment::from_area(self.area_ac, self.cn)))
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    /// Snapshots the current inputs, newest first.
    pub fn add_scenario(&mut self) -> Result<&Scenario, SessionError> {
        self.log("Saving scenario...");
        if self.area_ac <= 0.0 {
            return self.fail("Saving scenario", SessionError::NotDelineated);
        }
        let Some(depth) = self.rainfall_depth_in else {
            return self.fail("Saving scenario", SessionError::NoRainfall);
        };
        let interval = self.selected_interval.clone().unwrap_or_default();
        let duration = self.selected_duration.clone().unwrap_or_default();
        let scenario = Scenario {
            id: format!("scenario-{}", self.next_scenario),
            label: format!("{}-yr / {}", interval, duration),
            lat: self.lat,
            lon: self.lon,
            area_ac: self.area_ac,
            cn: self.cn,
            rainfall_depth_in: depth,
            interval,
            duration,
            land_use: self.land_use.clone(),
        };
        self.next_scenario += 1;
        self.scenarios.insert(0, scenario);
        Ok(&self.scenarios[0])
    }

    /// Restores a snapshot's inputs. The rainfall table and basin geometry
    /// are not part of a snapshot, so they are cleared.
    pub fn load_scenario(&mut self, id: &str) -> Result<(), SessionError> {
        let Some(scenario) = self.scenarios.iter().find(|s| s.id == id).cloned() else {
            return self.fail("Loading scenario", SessionError::UnknownScenario(id.to_string()));
        };
        self.log(&format!("Loading scenario: {}", scenario.label));
        self.lat = scenario.lat;
        self.lon = scenario.lon;
        self.delineation = None;
        self.area_ac = scenario.area_ac;
        self.reset_rainfall();
        self.selected_duration = Some(scenario.duration.clone());
        self.selected_interval = Some(scenario.interval.clone());
        self.rainfall_depth_in = Some(scenario.rainfall_depth_in);
        self.rainfall_intensity_in_hr = noaa::duration_hours(&scenario.duration).map(|h| scenario.rainfall_depth_in / h);
        self.cn = scenario.cn;
        self.land_use = scenario.land_use;
        self.runoff = None;
        Ok(())
    }

    /// `false` if no scenario had that id.
    pub fn delete_scenario(&mut self, id: &str) -> bool {
        let before = self.scenarios.len();
        self.scenarios.retain(|s| s.id != id);
        self.scenarios.len() != before
    }

    // -----------------------------------------------------------------------
    // Progress
    // -----------------------------------------------------------------------

    pub fn log(&mut self, message: &str) {
        info!("{}", message);
        if self.progress.len() == PROGRESS_LOG_LIMIT {
            self.progress.pop_front();
        }
        self.progress.push_back(format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
    }

    fn fail<T>(&mut self, stage: &str, err: SessionError) -> Result<T, SessionError> {
        let message = err.to_string();
        self.log(&format!("{} failed: {}", stage, message));
        self.last_error = Some(message);
        Err(err)
    }
}
