/// NRCS curve number runoff and the rational method.
///
/// Units are US customary throughout: inches of rainfall, acres of basin,
/// acre-feet of volume, cubic feet per second of peak flow.

use serde::Serialize;

/// Q = C·i·A in cfs, with i in in/hr and A in acres (1 ac·in/hr ≈ 1.008 cfs).
pub const RATIONAL_CONVERSION: f64 = 1.008;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RunoffResult {
    pub depth_in: f64,
    pub volume_ac_ft: f64,
    /// Runoff depth over rainfall depth.
    pub coefficient: f64,
    /// Zero when no intensity was supplied.
    pub peak_cfs: f64,
}

/// Runoff depth in inches for rainfall depth `p` (inches) and curve number
/// `cn`.
///
/// S = 1000/CN - 10, Ia = 0.2·S, Q = (P - Ia)² / (P - Ia + S) when P > Ia.
/// A curve number outside (0, 100] or a non-finite depth yields zero runoff;
/// CN 100 turns all rainfall into runoff.
pub fn runoff_depth_in(p: f64, cn: f64) -> f64 {
    if !p.is_finite() || !cn.is_finite() || cn <= 0.0 || cn > 100.0 || p <= 0.0 {
        return 0.0;
    }
    if cn == 100.0 {
        return p;
    }
    let s = 1000.0 / cn - 10.0;
    let ia = 0.2 * s;
    if p <= ia {
        return 0.0;
    }
    (p - ia).powi(2) / (p - ia + s)
}

pub fn runoff_volume_ac_ft(area_ac: f64, depth_in: f64) -> f64 {
    area_ac * depth_in / 12.0
}

/// Zero for any non-finite input.
pub fn rational_peak_cfs(intensity_in_hr: f64, coefficient: f64, area_ac: f64) -> f64 {
    if !intensity_in_hr.is_finite() || !coefficient.is_finite() || !area_ac.is_finite() {
        return 0.0;
    }
    intensity_in_hr * coefficient * area_ac * RATIONAL_CONVERSION
}

/// Depth, volume and coefficient from the curve number method; peak from the
/// rational method using that coefficient when an intensity is known.
pub fn compute_runoff(p: f64, intensity_in_hr: Option<f64>, cn: f64, area_ac: f64) -> RunoffResult {
    let depth_in = runoff_depth_in(p, cn);
    let coefficient = if p > 0.0 { depth_in / p } else { 0.0 };
    RunoffResult {
        depth_in,
        volume_ac_ft: runoff_volume_ac_ft(area_ac, depth_in),
        coefficient,
        peak_cfs: intensity_in_hr.map_or(0.0, |i| rational_peak_cfs(i, coefficient, area_ac)),
    }
}
