//! Classification legends: source codes mapped onto the solver's class set.
//!
//! The simulation consumes PREVAH land-use classes. Source datasets publish
//! their own classification (the federal land-cover statistics use the LC_27
//! nomenclature), so the provider carries a closed mapping from source code
//! to PREVAH class and refuses codes it does not know.

use crate::{LandCoverError, Result};
use a3dprep_grid::Legend;
use std::collections::BTreeMap;

/// PREVAH class codes and names used by the simulation.
const PREVAH_CLASSES: &[(i32, &str)] = &[
    (1, "water"),
    (2, "settlement"),
    (3, "coniferous forest"),
    (4, "deciduous forest"),
    (5, "mixed forest"),
    (6, "cereals"),
    (7, "pasture"),
    (8, "bush"),
    (11, "road"),
    (13, "firn"),
    (14, "bare ice"),
    (15, "rock"),
    (18, "fruit"),
    (19, "vegetables"),
    (20, "wheat"),
    (21, "alpine vegetation"),
    (22, "wetlands"),
    (23, "rough pasture"),
    (24, "subalpine meadow"),
    (25, "alpine meadow"),
    (26, "bare soil vegetation"),
    (28, "corn"),
    (29, "grapes"),
];

/// Closed mapping from a source classification to PREVAH classes.
#[derive(Debug, Clone)]
pub struct ClassMap {
    source_to_prevah: BTreeMap<i32, i32>,
}

impl ClassMap {
    /// Mapping for the LC_27 land-cover nomenclature.
    ///
    /// LC_27 groups: 11-17 built-up, 21 grassland, 31-35 shrubs and
    /// permanent crops, 41-47 forest, 51-53 rock, 61-64 water and wetlands.
    pub fn lc27() -> Self {
        let entries = [
            // Built-up
            (11, 11), // sealed surfaces -> road
            (12, 2),  // buildings -> settlement
            (13, 2),  // greenhouses -> settlement
            (14, 19), // garden beds -> vegetables
            (15, 7),  // lawns -> pasture
            (16, 8),  // trees on artificial surfaces -> bush
            (17, 2),  // mixed small structures -> settlement
            // Grassland
            (21, 7), // grass and herb vegetation -> pasture
            // Shrubs and permanent crops
            (31, 8),  // shrubs -> bush
            (32, 8),  // overgrown areas -> bush
            (33, 18), // fruit trees -> fruit
            (34, 29), // vines -> grapes
            (35, 19), // horticultural crops -> vegetables
            // Forest
            (41, 5), // closed stands -> mixed forest
            (42, 5), // forest corners -> mixed forest
            (43, 5), // forest strips -> mixed forest
            (44, 5), // open stands -> mixed forest
            (45, 8), // shrub forest -> bush
            (46, 5), // linear stands -> mixed forest
            (47, 5), // tree groups -> mixed forest
            // Rock
            (51, 15), // exposed rock -> rock
            (52, 15), // loose rock -> rock
            (53, 15), // stony areas -> rock
            // Water and wetlands
            (61, 1),  // water -> water
            (62, 13), // glacier, firn -> firn
            (63, 22), // wet sites -> wetlands
            (64, 22), // reed stands -> wetlands
        ];
        Self {
            source_to_prevah: entries.into_iter().collect(),
        }
    }

    /// Identity mapping over the PREVAH classes themselves, for sources that
    /// already publish PREVAH codes (e.g. the constant-class source).
    pub fn prevah_identity() -> Self {
        Self {
            source_to_prevah: PREVAH_CLASSES.iter().map(|(c, _)| (*c, *c)).collect(),
        }
    }

    /// Resolve a source code to its PREVAH class.
    ///
    /// Unknown codes are an error: the solver's class set is closed and a
    /// silently dropped class would corrupt the simulation surface.
    pub fn resolve(&self, source_code: i32) -> Result<i32> {
        self.source_to_prevah
            .get(&source_code)
            .copied()
            .ok_or(LandCoverError::UnknownCode(source_code))
    }

    /// Whether a source code is mapped.
    pub fn contains(&self, source_code: i32) -> bool {
        self.source_to_prevah.contains_key(&source_code)
    }

    /// Legend over the PREVAH classes this mapping can produce.
    pub fn legend(&self) -> Legend {
        let mut produced: Vec<i32> = self.source_to_prevah.values().copied().collect();
        produced.sort_unstable();
        produced.dedup();
        Legend::from_entries(produced.into_iter().map(|code| {
            let name = PREVAH_CLASSES
                .iter()
                .find(|(c, _)| *c == code)
                .map(|(_, n)| *n)
                .unwrap_or("unclassified");
            (code, name)
        }))
    }

    /// Name of a PREVAH class.
    pub fn class_name(prevah_code: i32) -> Option<&'static str> {
        PREVAH_CLASSES
            .iter()
            .find(|(c, _)| *c == prevah_code)
            .map(|(_, n)| *n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forest_codes_resolve_to_mixed_forest() {
        let map = ClassMap::lc27();
        for code in [41, 42, 43, 44, 46, 47] {
            assert_eq!(map.resolve(code).unwrap(), 5, "LC_27 code {code}");
        }
    }

    #[test]
    fn unknown_code_is_an_error() {
        let map = ClassMap::lc27();
        let err = map.resolve(99).unwrap_err();
        assert!(matches!(err, LandCoverError::UnknownCode(99)));
    }

    #[test]
    fn legend_covers_every_produced_class() {
        let map = ClassMap::lc27();
        let legend = map.legend();
        for source_code in [11, 12, 21, 34, 41, 51, 61, 62, 63] {
            let prevah = map.resolve(source_code).unwrap();
            assert!(legend.contains(prevah), "missing legend entry for {prevah}");
        }
        assert_eq!(legend.class_name(5), Some("mixed forest"));
        assert_eq!(legend.class_name(13), Some("firn"));
    }

    #[test]
    fn identity_map_accepts_prevah_codes() {
        let map = ClassMap::prevah_identity();
        assert_eq!(map.resolve(15).unwrap(), 15);
        assert!(map.resolve(99).is_err());
    }
}
