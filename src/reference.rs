//! Fixed reference palette and rating aggregation.
//!
//! Each dominant color of a beer is snapped to the nearest of 14 reference
//! colors in YUV space and the beer's rating is credited to that entry. The
//! palette file written by [`ReferencePalette::write_to_file`] can be loaded
//! again to skip rebuilding, and [`ReferencePalette::write_csv`] exports the
//! table consumed by the color picker.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info, warn};
use palette::Srgb;
use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};
use crate::profile::{BeerColorProfile, BeerColors};
use crate::progress::Progress;
use crate::records::BeerRecords;

pub const PALETTE_SIZE: usize = 14;

/// Reference colors in 0-255 sRGB: 12 hues, then white and black.
pub const REFERENCE_COLORS: [[u8; 3]; PALETTE_SIZE] = [
    [254, 82, 9],
    [251, 153, 2],
    [247, 189, 1],
    [255, 254, 53],
    [209, 233, 51],
    [102, 177, 49],
    [2, 145, 205],
    [9, 68, 253],
    [63, 1, 164],
    [134, 2, 172],
    [168, 24, 75],
    [254, 38, 18],
    [255, 255, 255],
    [0, 0, 0],
];

const RGB_TO_YUV: [[f32; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [-0.14713, -0.28886, 0.436],
    [0.615, -0.51499, -0.10001],
];

/// Largest distance between two points of the unit RGB cube, the starting
/// search radius for classification.
const SEARCH_RADIUS: f32 = 1.732_050_8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub color: Srgb,
    pub rating_sum: f64,
    pub votes: u32,
    /// `rating_sum / votes`, or 0 without votes
    pub rating: f64,
}

impl PaletteEntry {
    fn new(color: Srgb) -> Self {
        Self {
            color,
            rating_sum: 0.0,
            votes: 0,
            rating: 0.0,
        }
    }

    /// Lowercase `#rrggbb`, or `None` when a channel is not a finite number.
    pub fn hex(&self) -> Option<String> {
        let rgb = [self.color.red, self.color.green, self.color.blue];
        if !rgb.iter().all(|c| c.is_finite()) {
            return None;
        }
        let c: Srgb<u8> = self.color.into_format();
        Some(format!("#{:02x}{:02x}{:02x}", c.red, c.green, c.blue))
    }
}

/// Outcome of [`ReferencePalette::build`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// Beers whose ratings were aggregated
    pub rated: usize,
    /// Bids without a matching beer record
    pub skipped: Vec<String>,
    /// Dominant colors that could not be classified and did not vote
    pub abstained: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePalette {
    entries: [PaletteEntry; PALETTE_SIZE],
}

impl Default for ReferencePalette {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferencePalette {
    pub fn new() -> Self {
        let entries = REFERENCE_COLORS.map(|rgb| {
            PaletteEntry::new(Srgb::<u8>::new(rgb[0], rgb[1], rgb[2]).into_format())
        });
        Self { entries }
    }

    pub fn entries(&self) -> &[PaletteEntry; PALETTE_SIZE] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&PaletteEntry> {
        self.entries.get(index)
    }

    /// Index of the reference color nearest to `color` in YUV space.
    ///
    /// Ties keep the lower index.
    pub fn classify(&self, color: Srgb) -> Result<usize> {
        let target = to_yuv(color)?;
        let mut closest_distance = SEARCH_RADIUS;
        let mut closest = None;

        for (idx, entry) in self.entries.iter().enumerate() {
            let reference = to_yuv(entry.color)?;
            let distance = reference
                .iter()
                .zip(&target)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>()
                .sqrt();
            if distance < closest_distance {
                closest_distance = distance;
                closest = Some(idx);
            }
        }

        closest.ok_or(LabelError::Unclassified {
            color: [color.red, color.green, color.blue],
        })
    }

    /// Aggregate ratings of every beer in `beers` from scratch.
    ///
    /// Each dominant color credits the beer's full rating to its nearest
    /// reference entry; presence fractions do not weight the vote. Beers with
    /// no record are skipped and listed in the report.
    pub fn build(&mut self, beers: &mut BeerColors, records: &BeerRecords) -> BuildReport {
        info!("Generating the color palette from {} beers", beers.len());
        self.reset();

        let mut report = BuildReport::default();
        let mut progress = Progress::new(beers.len(), "Rating the colors from palette...");

        for (bid, profile) in beers.iter_mut() {
            match records.require(bid) {
                Ok(record) => {
                    report.abstained += self.rate(profile, record.rating);
                    report.rated += 1;
                }
                Err(err) => {
                    warn!("{err}, skipping");
                    report.skipped.push(bid.clone());
                }
            }
            progress.tick();
        }

        self.finalize();
        report
    }

    /// Credit `rating` for every dominant color of one beer and record the
    /// chosen entries on the profile. Returns how many colors abstained.
    ///
    /// Averages are stale until [`finalize`](Self::finalize) runs.
    pub fn rate(&mut self, profile: &mut BeerColorProfile, rating: f64) -> usize {
        let mut abstained = 0;
        for (color, flag) in profile.colors.iter().zip(profile.palette_flags.iter_mut()) {
            match self.classify(*color) {
                Ok(idx) => {
                    *flag = Some(idx);
                    let entry = &mut self.entries[idx];
                    entry.rating_sum += rating;
                    entry.votes += 1;
                }
                Err(err) => {
                    warn!("{err}");
                    *flag = None;
                    abstained += 1;
                }
            }
        }
        abstained
    }

    /// Recompute every entry's average rating.
    pub fn finalize(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.rating = if entry.votes > 0 {
                entry.rating_sum / entry.votes as f64
            } else {
                0.0
            };
        }
    }

    /// Fold another partial aggregation over the same reference colors into
    /// this one.
    pub fn merge(&mut self, other: &ReferencePalette) {
        for (entry, theirs) in self.entries.iter_mut().zip(&other.entries) {
            entry.rating_sum += theirs.rating_sum;
            entry.votes += theirs.votes;
        }
        self.finalize();
    }

    fn reset(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.rating_sum = 0.0;
            entry.votes = 0;
            entry.rating = 0.0;
        }
    }

    pub fn read_from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| LabelError::CorruptPalette {
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

    /// Write `id,HEX,Rating,Votes` rows. Entries whose color cannot be
    /// formatted are left out.
    pub fn write_csv<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        writeln!(out, "id,HEX,Rating,Votes")?;
        for (id, entry) in self.entries.iter().enumerate() {
            match entry.hex() {
                Some(hex) => writeln!(out, "{id},{hex},{},{}", entry.rating, entry.votes)?,
                None => debug!("Skipping palette entry {id} with unformattable color"),
            }
        }
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path).map_err(|e| LabelError::io(path, e))?;
        let mut out = std::io::BufWriter::new(file);
        self.write_csv(&mut out)
            .and_then(|()| out.flush())
            .map_err(|e| LabelError::io(path, e))
    }

    /// Reference indices that received at least one vote.
    pub fn voted(&self) -> BTreeSet<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.votes > 0)
            .map(|(idx, _)| idx)
            .collect()
    }
}

fn to_yuv(color: Srgb) -> Result<[f32; 3]> {
    let rgb = [color.red, color.green, color.blue];
    if !rgb.iter().all(|c| c.is_finite()) {
        return Err(LabelError::Transform { color: rgb });
    }
    Ok(RGB_TO_YUV.map(|row| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::BeerRecord;

    fn record(bid: &str, rating: f64) -> BeerRecord {
        BeerRecord {
            bid: bid.to_string(),
            label: String::new(),
            rating,
        }
    }

    fn single_color(color: Srgb) -> BeerColorProfile {
        BeerColorProfile::new(vec![color], vec![1.0])
    }

    #[test]
    fn white_and_black_match_exactly() {
        let palette = ReferencePalette::new();
        assert_eq!(palette.classify(Srgb::new(1.0, 1.0, 1.0)).unwrap(), 12);
        assert_eq!(palette.classify(Srgb::new(0.0, 0.0, 0.0)).unwrap(), 13);
    }

    #[test]
    fn classify_is_deterministic() {
        let palette = ReferencePalette::new();
        let color = Srgb::new(0.3, 0.6, 0.2);
        let first = palette.classify(color).unwrap();
        assert_eq!(first, palette.classify(color).unwrap());
        assert_eq!(first, 5);
    }

    #[test]
    fn every_reference_color_classifies_to_itself() {
        let palette = ReferencePalette::new();
        for (idx, entry) in palette.entries().iter().enumerate() {
            assert_eq!(palette.classify(entry.color).unwrap(), idx);
        }
    }

    #[test]
    fn non_finite_color_is_a_transform_error() {
        let palette = ReferencePalette::new();
        assert!(matches!(
            palette.classify(Srgb::new(f32::NAN, 0.0, 0.0)),
            Err(LabelError::Transform { .. })
        ));
    }

    #[test]
    fn single_beer_rating_lands_on_its_entry() {
        let mut palette = ReferencePalette::new();
        let mut beers = BeerColors::new();
        beers.insert("123", single_color(Srgb::new(254.0 / 255.0, 82.0 / 255.0, 9.0 / 255.0)));
        let records = BeerRecords::new(vec![record("123", 4.5)]);

        let report = palette.build(&mut beers, &records);

        assert_eq!(report.rated, 1);
        assert!(report.skipped.is_empty());
        let entry = palette.entry(0).unwrap();
        assert_eq!(entry.rating_sum, 4.5);
        assert_eq!(entry.votes, 1);
        assert_eq!(entry.rating, 4.5);
        assert_eq!(beers.get("123").unwrap().palette_flags, vec![Some(0)]);
    }

    #[test]
    fn unmatched_beer_is_skipped_and_reported() {
        let mut palette = ReferencePalette::new();
        let mut beers = BeerColors::new();
        beers.insert("404", single_color(Srgb::new(1.0, 1.0, 1.0)));
        let records = BeerRecords::new(vec![record("1", 3.0)]);

        let report = palette.build(&mut beers, &records);

        assert_eq!(report.skipped, vec!["404".to_string()]);
        assert_eq!(report.rated, 0);
        assert!(palette.voted().is_empty());
        assert_eq!(palette, ReferencePalette::new());
    }

    #[test]
    fn every_dominant_color_votes_with_full_rating() {
        let mut palette = ReferencePalette::new();
        let mut profile = BeerColorProfile::new(
            vec![Srgb::new(1.0, 1.0, 1.0), Srgb::new(0.0, 0.0, 0.0)],
            vec![0.9, 0.1],
        );
        palette.rate(&mut profile, 4.0);
        palette.finalize();

        assert_eq!(palette.entry(12).unwrap().rating_sum, 4.0);
        assert_eq!(palette.entry(13).unwrap().rating_sum, 4.0);
        assert_eq!(profile.palette_flags, vec![Some(12), Some(13)]);
    }

    #[test]
    fn unclassifiable_color_abstains() {
        let mut palette = ReferencePalette::new();
        let mut profile = BeerColorProfile::new(
            vec![Srgb::new(f32::NAN, 0.0, 0.0), Srgb::new(0.0, 0.0, 0.0)],
            vec![0.5, 0.5],
        );
        assert_eq!(palette.rate(&mut profile, 2.0), 1);
        assert_eq!(profile.palette_flags, vec![None, Some(13)]);
        assert_eq!(palette.voted(), BTreeSet::from([13]));
    }

    #[test]
    fn aggregation_ignores_beer_order() {
        let beers = [
            (Srgb::new(1.0, 1.0, 1.0), 4.5),
            (Srgb::new(0.95, 0.95, 0.95), 3.25),
            (Srgb::new(0.0, 0.0, 0.0), 2.0),
            (Srgb::new(0.02, 0.01, 0.0), 1.5),
            (Srgb::new(1.0, 0.3, 0.0), 3.75),
        ];

        let mut forward = ReferencePalette::new();
        for (color, rating) in beers {
            forward.rate(&mut single_color(color), rating);
        }
        forward.finalize();

        let mut backward = ReferencePalette::new();
        for (color, rating) in beers.iter().rev() {
            backward.rate(&mut single_color(*color), *rating);
        }
        backward.finalize();

        assert_eq!(forward, backward);
    }

    #[test]
    fn merged_partials_equal_single_pass() {
        let colors = [
            (Srgb::new(1.0, 1.0, 1.0), 4.0),
            (Srgb::new(0.0, 0.0, 0.0), 2.5),
            (Srgb::new(1.0, 1.0, 1.0), 3.0),
        ];

        let mut whole = ReferencePalette::new();
        for (color, rating) in colors {
            whole.rate(&mut single_color(color), rating);
        }
        whole.finalize();

        let mut left = ReferencePalette::new();
        left.rate(&mut single_color(colors[0].0), colors[0].1);
        let mut right = ReferencePalette::new();
        for (color, rating) in &colors[1..] {
            right.rate(&mut single_color(*color), *rating);
        }
        right.merge(&left);

        assert_eq!(whole, right);
        assert_eq!(right.entry(12).unwrap().rating, 3.5);
    }

    #[test]
    fn csv_has_header_and_lowercase_hex() {
        let mut palette = ReferencePalette::new();
        palette.rate(&mut single_color(Srgb::new(0.0, 0.0, 0.0)), 4.0);
        palette.finalize();

        let mut out = Vec::new();
        palette.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), PALETTE_SIZE + 1);
        assert_eq!(lines[0], "id,HEX,Rating,Votes");
        assert_eq!(lines[1], "0,#fe5209,0,0");
        assert_eq!(lines[11], "10,#a8184b,0,0");
        assert_eq!(lines[14], "13,#000000,4,1");
    }

    #[test]
    fn csv_skips_unformattable_rows() {
        let mut palette = ReferencePalette::new();
        palette.entries[3].color = Srgb::new(f32::NAN, 0.0, 0.0);

        let mut out = Vec::new();
        palette.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), PALETTE_SIZE);
        assert!(!text.lines().any(|l| l.starts_with("3,")));
    }
}
