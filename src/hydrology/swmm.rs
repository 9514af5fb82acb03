/// Minimal EPA SWMM 5 input file: one subcatchment draining to one free
/// outfall, curve number infiltration, a single volume rain gage.
///
/// Sections are tab-delimited with a `;;` header row under each tag, which
/// is what the SWMM GUI writes and re-reads.

use serde::Serialize;

pub const RAIN_GAGE: &str = "RG1";
pub const DEFAULT_OUTLET: &str = "Out1";
pub const DEFAULT_SUBCATCHMENT: &str = "S1";
pub const DEFAULT_SLOPE: f64 = 0.02;
pub const MAX_PERCENT_IMPERVIOUS: f64 = 99.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwmmSubcatchment {
    pub name: String,
    pub area_ac: f64,
    pub pct_imperv: f64,
    pub width: f64,
    pub slope: f64,
    pub outlet: String,
    pub cn: f64,
}

impl SwmmSubcatchment {
    /// Derives the subcatchment from basin area and curve number:
    /// width = √area × 100, imperviousness scaled linearly from CN 30 (0%)
    /// to CN 100, clamped to [0, 99].
    pub fn from_area(area_ac: f64, cn: f64) -> Self {
        let pct_imperv = ((cn - 30.0) / 70.0 * 100.0).clamp(0.0, MAX_PERCENT_IMPERVIOUS);
        SwmmSubcatchment {
            name: DEFAULT_SUBCATCHMENT.to_string(),
            area_ac,
            pct_imperv,
            width: area_ac.max(0.0).sqrt() * 100.0,
            slope: DEFAULT_SLOPE,
            outlet: DEFAULT_OUTLET.to_string(),
            cn,
        }
    }
}

const OPTIONS: [(&str, &str); 18] = [
    ("FLOW_UNITS", "CFS"),
    ("INFILTRATION", "CURVE_NUMBER"),
    ("FLOW_ROUTING", "KINWAVE"),
    ("LINK_OFFSETS", "DEPTH"),
    ("START_DATE", "01/01/2024"),
    ("START_TIME", "00:00:00"),
    ("REPORT_START_DATE", "01/01/2024"),
    ("REPORT_START_TIME", "00:00:00"),
    ("END_DATE", "01/02/2024"),
    ("END_TIME", "00:00:00"),
    ("SWEEP_START", "01/01"),
    ("SWEEP_END", "12/31"),
    ("DRY_DAYS", "0"),
    ("REPORT_STEP", "00:15:00"),
    ("WET_STEP", "00:05:00"),
    ("DRY_STEP", "01:00:00"),
    ("ROUTING_STEP", "0:00:30"),
    ("ALLOW_PONDING", "NO"),
];

/// Renders the `.inp` text. Lines are `\n`-separated with no trailing newline.
pub fn format_inp(sub: &SwmmSubcatchment) -> String {
    let mut lines: Vec<String> = Vec::new();

    section(&mut lines, "TITLE", "Project Title");
    lines.push("Watershed Service Export".to_string());
    lines.push(String::new());

    section(&mut lines, "OPTIONS", "Option\tValue");
    lines.extend(OPTIONS.iter().map(|(k, v)| format!("{}\t{}", k, v)));
    lines.push(String::new());

    section(
        &mut lines,
        "SUBCATCHMENTS",
        "Name\tRain Gage\tOutlet\tArea\t%Imperv\tWidth\tSlope\tCurbLen\tSnowPack",
    );
    lines.push(format!(
        "{}\t{}\t{}\t{:.3}\t{:.1}\t{:.1}\t{:.3}\t0\t0",
        sub.name, RAIN_GAGE, sub.outlet, sub.area_ac, sub.pct_imperv, sub.width, sub.slope
    ));
    lines.push(String::new());

    section(
        &mut lines,
        "SUBAREAS",
        "Subcatchment\tN-Imperv\tN-Perv\tS-Imperv\tS-Perv\tPctZero\tRouteTo\tPctRouted",
    );
    lines.push(format!("{}\t0.01\t0.1\t0.05\t0.05\t25\tOUTLET\t", sub.name));
    lines.push(String::new());

    section(&mut lines, "INFILTRATION", "Subcatchment\tCurveNum\tConductivity\tDryTime");
    lines.push(format!("{}\t{:.1}\t0.5\t7", sub.name, sub.cn));
    lines.push(String::new());

    section(&mut lines, "OUTFALLS", "Name\tElevation\tType\tStage Data\tGated\tRoute To");
    lines.push(format!("{}\t0\tFREE\t\tNO\t", sub.outlet));
    lines.push(String::new());

    section(&mut lines, "RAINGAGES", "Name\tFormat\tInterval\tSCF\tSource");
    lines.push(format!("{}\tVOLUME\t5:00\t1.0\t0", RAIN_GAGE));

    lines.join("\n")
}

fn section(lines: &mut Vec<String>, tag: &str, header: &str) {
    lines.push(format!("[{}]", tag));
    lines.push(format!(";;{}", header));
}
