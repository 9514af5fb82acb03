/// Hydrologic calculations that sit downstream of the data pipeline.
///
/// None of these touch the network: they take a delineated area, a rainfall
/// depth and land use shares, and turn them into a curve number, runoff
/// estimates and a minimal SWMM input file. Routing and timing effects are
/// out of scope; export to SWMM for that.

pub mod curve_number;
pub mod runoff;
pub mod swmm;

pub use curve_number::{LandUseCategory, TR55_CATEGORIES, composite_curve_number, curve_number, find_category};
pub use runoff::{RunoffResult, compute_runoff, rational_peak_cfs, runoff_depth_in, runoff_volume_ac_ft};
pub use swmm::{SwmmSubcatchment, format_inp};
