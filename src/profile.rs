use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};

/// Dominant colors of one beer label.
///
/// `colors`, `presence` and `palette_flags` are parallel: entry `i` of each
/// describes the same cluster. `palette_flags` stays `None` until the color
/// has been classified against a [`ReferencePalette`](crate::ReferencePalette).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeerColorProfile {
    pub colors: Vec<Srgb>,
    pub presence: Vec<f32>,
    pub palette_flags: Vec<Option<usize>>,
}

impl BeerColorProfile {
    pub fn new(colors: Vec<Srgb>, presence: Vec<f32>) -> Self {
        let palette_flags = vec![None; colors.len()];
        Self {
            colors,
            presence,
            palette_flags,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// Color profiles of many beers keyed by bid. Iteration follows bid order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeerColors(BTreeMap<String, BeerColorProfile>);

impl BeerColors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bid: impl Into<String>, profile: BeerColorProfile) {
        self.0.insert(bid.into(), profile);
    }

    pub fn get(&self, bid: &str) -> Option<&BeerColorProfile> {
        self.0.get(bid)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BeerColorProfile)> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut BeerColorProfile)> {
        self.0.iter_mut()
    }

    /// Every dominant color of every beer, flattened in bid order.
    pub fn all_colors(&self) -> Vec<Srgb> {
        self.0.values().flat_map(|p| p.colors.iter().copied()).collect()
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| LabelError::Data {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|source| LabelError::Data {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|e| LabelError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_profile_starts_unclassified() {
        let profile = BeerColorProfile::new(vec![Srgb::new(0.1, 0.2, 0.3); 3], vec![0.5, 0.25, 0.25]);
        assert_eq!(profile.len(), 3);
        assert!(profile.palette_flags.iter().all(Option::is_none));
    }

    #[test]
    fn all_colors_flattens_in_bid_order() {
        let mut beers = BeerColors::new();
        beers.insert("b", BeerColorProfile::new(vec![Srgb::new(0.0, 0.0, 1.0)], vec![1.0]));
        beers.insert(
            "a",
            BeerColorProfile::new(
                vec![Srgb::new(1.0, 0.0, 0.0), Srgb::new(0.0, 1.0, 0.0)],
                vec![0.5, 0.5],
            ),
        );

        assert_eq!(
            beers.all_colors(),
            vec![
                Srgb::new(1.0, 0.0, 0.0),
                Srgb::new(0.0, 1.0, 0.0),
                Srgb::new(0.0, 0.0, 1.0),
            ]
        );
    }
}
