//! Tunable parameters for label analysis.
//!
//! Every field has a default, so a JSON config file only needs to name what it
//! changes:
//!
//! ```no_run
//! use label_palette::AnalysisConfig;
//! use std::path::Path;
//!
//! let config = AnalysisConfig::from_json_file(Path::new("labels.json"))?;
//! # Ok::<(), label_palette::LabelError>(())
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LabelError, Result};

/// Upper bound on clusters per label; `kmeans_colors` stores labels as `u8`.
pub const MAX_COLORS: usize = 255;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of dominant colors extracted per label
    pub n_colors: usize,
    pub crop: CropConfig,
    pub kmeans: KmeansConfig,
}

/// Background detection and margin cropping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Side of the top-left square sampled for a white background
    pub sample_size: usize,
    /// Maximum distance from pure white for the sample to count as background
    pub white_threshold: f32,
    /// Minimum luminance jump between neighbouring columns marking a border
    pub edge_threshold: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmeansConfig {
    pub max_iter: usize,
    /// Convergence threshold on centroid movement
    pub converge: f32,
    pub seed: u64,
    /// Restarts with consecutive seeds; the lowest-score run is kept
    pub runs: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            n_colors: 5,
            crop: CropConfig::default(),
            kmeans: KmeansConfig::default(),
        }
    }
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            sample_size: 5,
            white_threshold: 0.05,
            edge_threshold: 0.05,
        }
    }
}

impl Default for KmeansConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            converge: 1e-4,
            seed: 0,
            runs: 1,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| LabelError::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|source| LabelError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_colors == 0 || self.n_colors > MAX_COLORS {
            return Err(LabelError::invalid("n_colors", self.n_colors));
        }
        if self.kmeans.runs == 0 {
            return Err(LabelError::invalid("kmeans.runs", self.kmeans.runs));
        }
        if self.kmeans.max_iter == 0 {
            return Err(LabelError::invalid("kmeans.max_iter", self.kmeans.max_iter));
        }
        if !(self.crop.white_threshold >= 0.0) {
            return Err(LabelError::invalid("crop.white_threshold", self.crop.white_threshold));
        }
        if !(self.crop.edge_threshold >= 0.0) {
            return Err(LabelError::invalid("crop.edge_threshold", self.crop.edge_threshold));
        }
        Ok(())
    }
}
