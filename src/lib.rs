//! # Label Palette
//!
//! Rates colors by how well the beers wearing them are liked.
//!
//! Each label image goes through the same steps:
//! 1. Load it as normalized RGB with a grayscale view ([`LabelImage`]).
//! 2. Crop a white background margin, if there is one ([`CropMask`]).
//! 3. Find its dominant colors with K-means ([`ColorClusterer`]).
//!
//! The resulting [`BeerColorProfile`]s of many beers are then snapped onto a
//! fixed [`ReferencePalette`], which averages the beers' ratings per reference
//! color.
//!
//! ```rust,no_run
//! use label_palette::{AnalysisConfig, BeerRecords, ReferencePalette, analyze_labels};
//! use std::path::Path;
//!
//! let config = AnalysisConfig::default();
//! let records = BeerRecords::from_json_file(Path::new("beers.json"))?;
//! let mut beers = analyze_labels(&records, Path::new("labels/"), &config)?;
//!
//! let mut palette = ReferencePalette::new();
//! let report = palette.build(&mut beers, &records);
//! palette.write_csv_file(Path::new("colorPalette.csv"))?;
//! # Ok::<(), label_palette::LabelError>(())
//! ```

use std::path::Path;

use log::{info, warn};

pub mod cluster;
pub mod config;
pub mod crop;
pub mod download;
pub mod error;
pub mod label_image;
pub mod profile;
pub mod progress;
pub mod records;
pub mod reference;

pub use cluster::ColorClusterer;
pub use config::{AnalysisConfig, CropConfig, KmeansConfig};
pub use crop::{CropMask, MaskUnavailable};
pub use download::{DownloadSummary, LabelFetcher, download_labels, label_file_name};
pub use error::{LabelError, Result};
pub use label_image::LabelImage;
pub use profile::{BeerColorProfile, BeerColors};
pub use progress::Progress;
pub use records::{BeerRecord, BeerRecords};
pub use reference::{BuildReport, PALETTE_SIZE, PaletteEntry, ReferencePalette};

/// Dominant colors of a single label image file.
pub fn analyze_label(path: &Path, config: &AnalysisConfig) -> Result<BeerColorProfile> {
    config.validate()?;
    let image = LabelImage::open(path)?;
    profile_image(&image, config)
}

/// Crop and cluster an already loaded label.
pub fn profile_image(image: &LabelImage, config: &AnalysisConfig) -> Result<BeerColorProfile> {
    let mask = CropMask::detect(image, &config.crop);
    ColorClusterer::new(config.kmeans.clone()).cluster_image(image, &mask, config.n_colors)
}

/// Profile the cached label of every record found in `dir`.
///
/// Beers without a cached label are left out. Labels that fail to load or
/// are not RGB are logged and skipped; only configuration errors abort.
pub fn analyze_labels(
    records: &BeerRecords,
    dir: &Path,
    config: &AnalysisConfig,
) -> Result<BeerColors> {
    config.validate()?;
    info!("Processing labels of {} beers in {}", records.len(), dir.display());

    let mut beers = BeerColors::new();
    let mut progress = Progress::new(records.len(), "Processing images...");

    for record in records.iter() {
        progress.tick();
        let Some(file_name) = label_file_name(record) else {
            continue;
        };
        let path = dir.join(file_name);
        if !path.exists() {
            continue;
        }

        let profile = LabelImage::open(&path).and_then(|image| profile_image(&image, config));
        match profile {
            Ok(profile) => beers.insert(record.bid.clone(), profile),
            Err(err) if err.is_recoverable() => {
                warn!("Skipping label of beer {}: {err}", record.bid);
            }
            Err(err) => return Err(err),
        }
    }

    info!("Profiled {} of {} beers", beers.len(), records.len());
    Ok(beers)
}
