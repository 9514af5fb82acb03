/// NRCS TR-55 runoff curve numbers for urban and agricultural cover types.
///
/// Each category carries one curve number per hydrologic soil group, in
/// A, B, C, D order. Ids are stable: the land cover sampler and saved
/// scenarios refer to categories by id.

use serde::Serialize;

use crate::model::{Hsg, LandUseShare};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LandUseCategory {
    pub id: &'static str,
    pub label: &'static str,
    /// Curve numbers for HSG A, B, C, D.
    pub cn: [u32; 4],
}

impl LandUseCategory {
    pub fn curve_number(&self, hsg: Hsg) -> u32 {
        let index = match hsg {
            Hsg::A => 0,
            Hsg::B => 1,
            Hsg::C => 2,
            Hsg::D => 3,
        };
        self.cn[index]
    }
}

const fn category(id: &'static str, label: &'static str, cn: [u32; 4]) -> LandUseCategory {
    LandUseCategory { id, label, cn }
}

pub const TR55_CATEGORIES: [LandUseCategory; 24] = [
    category("open_space_poor", "Open space (lawns, parks) - Poor condition (<50% grass)", [68, 79, 86, 89]),
    category("open_space_fair", "Open space (lawns, parks) - Fair condition (50-75% grass)", [49, 69, 79, 84]),
    category("open_space_good", "Open space (lawns, parks) - Good condition (>75% grass)", [39, 61, 74, 80]),
    category("impervious", "Impervious (paved parking, roofs, driveways)", [98, 98, 98, 98]),
    category("streets_paved_curb", "Streets and roads - Paved with curbs & sewers", [98, 98, 98, 98]),
    category("streets_paved_ditch", "Streets and roads - Paved with open ditches", [83, 89, 92, 93]),
    category("streets_gravel", "Streets and roads - Gravel", [76, 85, 89, 91]),
    category("streets_dirt", "Streets and roads - Dirt", [72, 82, 87, 89]),
    category("commercial", "Urban - Commercial and business", [89, 92, 94, 95]),
    category("industrial", "Urban - Industrial", [81, 88, 91, 93]),
    category("residential_1_8", "Residential - 1/8 acre or less (65% imp)", [77, 85, 90, 92]),
    category("residential_1_4", "Residential - 1/4 acre (38% imp)", [61, 75, 83, 87]),
    category("residential_1_3", "Residential - 1/3 acre (30% imp)", [57, 72, 81, 86]),
    category("residential_1_2", "Residential - 1/2 acre (25% imp)", [54, 70, 80, 85]),
    category("residential_1", "Residential - 1 acre (20% imp)", [51, 68, 79, 84]),
    category("residential_2", "Residential - 2 acres (12% imp)", [46, 65, 77, 82]),
    category("newly_graded", "Developing urban - Newly graded areas", [77, 86, 91, 94]),
    category("meadow", "Agriculture - Meadow (continuous grass)", [30, 58, 71, 78]),
    category("woods_poor", "Woods - Poor (forest litter, small trees, brush)", [45, 66, 77, 83]),
    category("woods_fair", "Woods - Fair (grazed but not burned)", [36, 60, 73, 79]),
    category("woods_good", "Woods - Good (protected from grazing)", [30, 55, 70, 77]),
    category("pasture_poor", "Pasture - Poor (<50% ground cover)", [68, 79, 86, 89]),
    category("pasture_fair", "Pasture - Fair (50-75% ground cover)", [49, 69, 79, 84]),
    category("pasture_good", "Pasture - Good (>75% ground cover)", [39, 61, 74, 80]),
];

pub fn find_category(id: &str) -> Option<&'static LandUseCategory> {
    TR55_CATEGORIES.iter().find(|c| c.id == id)
}

/// `None` for an unknown category id.
pub fn curve_number(category_id: &str, hsg: Hsg) -> Option<u32> {
    find_category(category_id).map(|c| c.curve_number(hsg))
}

/// Percentage-weighted curve number, rounded to the nearest integer.
///
/// Unknown categories contribute a curve number of 0 but still count toward
/// the total percentage, so a typo drags the composite down instead of
/// silently disappearing. Returns `None` when there is nothing to weight.
pub fn composite_curve_number(shares: &[LandUseShare]) -> Option<u32> {
    let total: f64 = shares.iter().map(|s| f64::from(s.percentage)).sum();
    if shares.is_empty() || total <= 0.0 {
        return None;
    }
    let weighted: f64 = shares
        .iter()
        .map(|s| f64::from(curve_number(&s.category_id, s.hsg).unwrap_or(0)) * f64::from(s.percentage))
        .sum();
    Some((weighted / total).round() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::nlcd;

    fn share(id: &str, hsg: Hsg, percentage: i32) -> LandUseShare {
        LandUseShare {
            category_id: id.to_string(),
            hsg,
            percentage,
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(curve_number("woods_good", Hsg::C), Some(70));
        assert_eq!(curve_number("impervious", Hsg::A), Some(98));
        assert_eq!(curve_number("meadow", Hsg::D), Some(78));
        assert_eq!(curve_number("parking_on_mars", Hsg::B), None);
    }

    #[test]
    fn test_ids_are_unique() {
        for (i, c) in TR55_CATEGORIES.iter().enumerate() {
            assert!(TR55_CATEGORIES[i + 1..].iter().all(|o| o.id != c.id), "duplicate id {}", c.id);
        }
    }

    #[test]
    fn test_every_land_cover_category_has_curve_numbers() {
        for class in [21, 22, 23, 24, 41, 42, 43, 52, 71, 81, 82, 90, 95] {
            let id = nlcd::category_for_class(class).unwrap();
            assert!(find_category(id).is_some(), "class {} maps to unknown category {}", class, id);
        }
    }

    #[test]
    fn test_composite_weighting() {
        // 0.5 * 70 + 0.5 * 98 = 84
        let shares = vec![share("woods_good", Hsg::C, 50), share("impervious", Hsg::C, 50)];
        assert_eq!(composite_curve_number(&shares), Some(84));

        // (67 * 70 + 33 * 71) / 100 = 70.33
        let shares = vec![share("woods_good", Hsg::C, 67), share("meadow", Hsg::C, 33)];
        assert_eq!(composite_curve_number(&shares), Some(70));
    }

    #[test]
    fn test_composite_unknown_category_counts_as_zero() {
        let shares = vec![share("impervious", Hsg::B, 50), share("unknown", Hsg::B, 50)];
        assert_eq!(composite_curve_number(&shares), Some(49));
    }

    #[test]
    fn test_composite_empty() {
        assert_eq!(composite_curve_number(&[]), None);
        assert_eq!(composite_curve_number(&[share("meadow", Hsg::C, 0)]), None);
    }
}
