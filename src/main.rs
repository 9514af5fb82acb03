//! Watershed Service - command line front end
//!
//! Runs the screening pipeline for one outlet point:
//! 1. Delineates the basin (StreamStats → NLDI → HydroShare → synthetic)
//! 2. Looks up NOAA Atlas 14 rainfall depths (live → synthetic → cache)
//! 3. Samples NLCD land cover into a TR-55 curve number
//! 4. Estimates runoff and optionally writes a SWMM input file
//!
//! Usage:
//!   watershed run --lat 40.4406 --lon -79.9959 --swmm basin.inp
//!   watershed delineate --lat 40.4406 --lon -79.9959 --geojson basin.geojson
//!   watershed rainfall --lat 40.4406 --lon -79.9959
//!   watershed health
//!
//! Environment:
//!   WATERSHED_CONFIG     - path to watershed.toml
//!   WATERSHED_CACHE_DIR  - rainfall cache directory
//!   WATERSHED_PROXY_BASE - fallback proxy ("" disables it)
//!   RUST_LOG             - tracing filter, overrides -v

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::warn;

use watershed_service::config::load_config;
use watershed_service::context::Context;
use watershed_service::delineation::{self, Delineation};
use watershed_service::health;
use watershed_service::http::cancel_pair;
use watershed_service::hydrology::composite_curve_number;
use watershed_service::ingest::nldi;
use watershed_service::landcover;
use watershed_service::logging;
use watershed_service::model::{LandUseShare, RainfallTable};
use watershed_service::rainfall::{self, RainfallResult};
use watershed_service::session::Session;

#[derive(Parser, Debug)]
#[command(
    version,
    name = "watershed",
    about = "Watershed delineation, design rainfall and runoff screening for a single outlet point"
)]
struct Args {
    /// Configuration file (defaults to ./watershed.toml or $WATERSHED_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Point {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in decimal degrees (negative west)
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Delineate the basin draining to a point
    Delineate {
        #[command(flatten)]
        point: Point,
        /// Write the basin as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Show the rainfall depth-frequency table for a point
    Rainfall {
        #[command(flatten)]
        point: Point,
    },
    /// Delineate, then sample land cover and derive a curve number
    Landuse {
        #[command(flatten)]
        point: Point,
    },
    /// Full pipeline: basin, rainfall, land cover, runoff
    Run {
        #[command(flatten)]
        point: Point,
        /// Rainfall duration, e.g. "24-hr" (defaults to the first row)
        #[arg(long)]
        duration: Option<String>,
        /// Recurrence interval in years, e.g. "100" (defaults to the first column)
        #[arg(long)]
        interval: Option<String>,
        /// Skip land cover sampling and use this curve number
        #[arg(long)]
        cn: Option<f64>,
        /// Write a SWMM input file
        #[arg(long)]
        swmm: Option<PathBuf>,
        /// Write the basin as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// List flowlines upstream of a reach
    Trace {
        /// NHDPlus reach id (COMID)
        comid: String,
        /// Navigation distance in kilometers
        #[arg(long, default_value_t = nldi::DEFAULT_TRACE_DISTANCE_KM)]
        distance_km: f64,
    },
    /// Probe every configured upstream service
    Health,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = match Context::from_config(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Failed to build HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl+C fires the cancel signal; in-flight requests end as cancelled.
    let (handle, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹  Cancelling...");
            handle.cancel();
        }
    });
    let ctx = ctx.with_cancel(signal);

    let ok = match args.command {
        Command::Delineate { point, geojson } => cmd_delineate(&ctx, point, geojson.as_deref()).await,
        Command::Rainfall { point } => cmd_rainfall(&ctx, point).await,
        Command::Landuse { point } => cmd_landuse(&ctx, point).await,
        Command::Run {
            point,
            duration,
            interval,
            cn,
            swmm,
            geojson,
        } => {
            let opts = RunOptions {
                duration,
                interval,
                cn,
                swmm,
                geojson,
            };
            cmd_run(ctx, point, opts).await
        }
        Command::Trace { comid, distance_km } => cmd_trace(&ctx, &comid, distance_km).await,
        Command::Health => cmd_health(&ctx).await,
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ---------------------------------------------------------------------------
// Subcommands
// ---------------------------------------------------------------------------

async fn cmd_delineate(ctx: &Context, point: Point, geojson: Option<&Path>) -> bool {
    banner("🗺  Watershed Delineation");
    println!("📍 Outlet: {:.5}, {:.5}\n", point.lat, point.lon);

    match delineation::delineate(ctx, point.lat, point.lon).await {
        Ok(d) => {
            print_delineation(&d);
            geojson.is_none_or(|path| write_geojson(path, &d))
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            false
        }
    }
}

async fn cmd_rainfall(ctx: &Context, point: Point) -> bool {
    banner("🌧  Design Rainfall");
    println!("📍 Point: {:.5}, {:.5}\n", point.lat, point.lon);

    let cache = rainfall::open_cache(&ctx.config.cache);
    match rainfall::fetch_rainfall(ctx, &cache, point.lat, point.lon).await {
        Ok(result) => {
            print_rainfall(&result);
            true
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            false
        }
    }
}

async fn cmd_landuse(ctx: &Context, point: Point) -> bool {
    banner("🌲 Land Cover");
    let d = match delineation::delineate(ctx, point.lat, point.lon).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("❌ {}", e);
            return false;
        }
    };
    print_delineation(&d);

    println!("📥 Sampling {} points...", ctx.config.landcover.samples);
    match landcover::sample_land_use(ctx, &d.basin).await {
        Ok(shares) => {
            print_land_use(&shares);
            true
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            false
        }
    }
}

struct RunOptions {
    duration: Option<String>,
    interval: Option<String>,
    cn: Option<f64>,
    swmm: Option<PathBuf>,
    geojson: Option<PathBuf>,
}

async fn cmd_run(ctx: Context, point: Point, opts: RunOptions) -> bool {
    banner("🌊 Watershed Runoff Screening");
    let cache = rainfall::open_cache(&ctx.config.cache);
    let mut session = Session::new(ctx, cache);
    if !session.set_point(point.lat, point.lon) {
        eprintln!("❌ Coordinates must be finite numbers");
        return false;
    }

    println!("📊 Delineating...");
    match session.delineate().await {
        Ok(d) => print_delineation(d),
        Err(e) => {
            eprintln!("❌ {}", e);
            return false;
        }
    }
    if let (Some(path), Some(d)) = (&opts.geojson, session.delineation()) {
        if !write_geojson(path, d) {
            return false;
        }
    }

    println!("📊 Fetching rainfall...");
    match session.fetch_rainfall().await {
        Ok(r) => print_rainfall(r),
        Err(e) => {
            eprintln!("❌ {}", e);
            return false;
        }
    }
    if let Some(duration) = &opts.duration {
        if let Err(e) = session.select_duration(duration) {
            eprintln!("❌ {}", e);
            return false;
        }
    }
    if let Some(interval) = &opts.interval {
        if let Err(e) = session.select_interval(interval) {
            eprintln!("❌ {}", e);
            return false;
        }
    }

    match opts.cn {
        Some(cn) => session.set_curve_number(cn),
        None => {
            println!("📊 Sampling land cover...");
            match session.sample_land_use().await {
                Ok(shares) => print_land_use(shares),
                Err(e) => warn!(error = %e, "land cover sampling failed, keeping default curve number"),
            }
        }
    }

    let runoff = match session.compute_runoff() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("❌ {}", e);
            return false;
        }
    };

    println!("\n💧 Runoff");
    println!(
        "   Storm:       {}-yr / {}",
        session.selected_interval().unwrap_or("?"),
        session.selected_duration().unwrap_or("?")
    );
    println!("   Rainfall:    {:.2} in", session.rainfall_depth_in().unwrap_or(0.0));
    if let Some(i) = session.rainfall_intensity_in_hr() {
        println!("   Intensity:   {:.2} in/hr", i);
    }
    println!("   CN:          {:.0}", session.curve_number());
    println!("   Depth:       {:.2} in", runoff.depth_in);
    println!("   Volume:      {:.2} ac-ft", runoff.volume_ac_ft);
    println!("   Coefficient: {:.3}", runoff.coefficient);
    println!("   Peak (Q=CiA): {:.1} cfs", runoff.peak_cfs);

    if let Some(path) = &opts.swmm {
        let inp = match session.export_swmm() {
            Ok(inp) => inp,
            Err(e) => {
                eprintln!("❌ {}", e);
                return false;
            }
        };
        if let Err(e) = fs::write(path, inp) {
            eprintln!("❌ Failed to write {}: {}", path.display(), e);
            return false;
        }
        println!("\n✓ SWMM input written to {}", path.display());
    }
    println!();
    true
}

async fn cmd_trace(ctx: &Context, comid: &str, distance_km: f64) -> bool {
    banner("🧭 Upstream Trace");
    println!("   Reach {}, {} km upstream\n", comid, distance_km);

    match nldi::upstream_flowlines(&ctx.fetcher, &ctx.config.endpoints.nldi, comid, distance_km, ctx.cancel()).await {
        Ok(flowlines) => {
            for f in &flowlines {
                println!("   {:>12}  {}", f.comid, f.name.as_deref().unwrap_or("(unnamed)"));
            }
            println!("\n✓ {} flowlines", flowlines.len());
            true
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            false
        }
    }
}

async fn cmd_health(ctx: &Context) -> bool {
    banner("🩺 Upstream Health");
    let results = health::check_all(ctx).await;
    for r in &results {
        let icon = match r.status {
            health::ApiHealth::Online => "✓",
            health::ApiHealth::Degraded => "⚠",
            health::ApiHealth::Offline => "✗",
        };
        println!("   {} {:<18} {:<9} {}", icon, r.label, r.status, r.url);
    }
    println!();
    results.iter().all(|r| r.status == health::ApiHealth::Online)
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn banner(title: &str) {
    println!("{}", title);
    println!("{}\n", "=".repeat(title.chars().count() + 2));
}

fn print_delineation(d: &Delineation) {
    println!("✓ Basin from {}", d.source);
    if !d.is_authoritative() {
        println!("   ⚠ Placeholder geometry, not a hydrologic boundary");
    }
    if let Some(comid) = &d.comid {
        println!("   Reach:  {}", comid);
    }
    if let Some(snap) = &d.snap {
        println!(
            "   Snap:   {:.5}, {:.5} ({:.0} m, {})",
            snap.snapped_lat, snap.snapped_lon, snap.distance_m, snap.flowline.method
        );
        if let Some(name) = &snap.flowline.name {
            println!("   Stream: {}", name);
        }
    }
    println!("   Area:   {:.1} ac ({:.3} km²)\n", d.area_acres(), d.area_sq_meters() / 1.0e6);
}

fn print_rainfall(result: &RainfallResult) {
    let stale = if result.stale { " (stale)" } else { "" };
    println!("✓ Rainfall table from {}{}", result.source, stale);
    print_table(&result.table);
}

fn print_table(table: &RainfallTable) {
    print!("   {:<10}", "Duration");
    for interval in &table.intervals {
        print!("{:>8}", format!("{}-yr", interval));
    }
    println!();
    for row in &table.rows {
        print!("   {:<10}", row.duration);
        for depth in &row.depths {
            if depth.is_finite() {
                print!("{:>8.2}", depth);
            } else {
                print!("{:>8}", "-");
            }
        }
        println!();
    }
    println!();
}

fn print_land_use(shares: &[LandUseShare]) {
    if shares.is_empty() {
        println!("   ⚠ No classifiable samples\n");
        return;
    }
    for s in shares {
        println!("   {:>3}%  {:<20} HSG {}", s.percentage, s.category_id, s.hsg);
    }
    if let Some(cn) = composite_curve_number(shares) {
        println!("   Composite CN: {}", cn);
    }
    println!();
}

fn write_geojson(path: &Path, d: &Delineation) -> bool {
    let text = match serde_json::to_string_pretty(&d.basin.to_geojson()) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("❌ Failed to encode basin: {}", e);
            return false;
        }
    };
    match fs::write(path, text) {
        Ok(()) => {
            println!("✓ Basin written to {}\n", path.display());
            true
        }
        Err(e) => {
            eprintln!("❌ Failed to write {}: {}", path.display(), e);
            false
        }
    }
}
