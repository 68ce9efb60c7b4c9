use palette::Srgb;

use crate::config::CropConfig;
use crate::label_image::LabelImage;

/// Non-rectangular margin detected around a label printed on a white
/// background.
///
/// A row is cropped from both sides up to the first strong luminance jump;
/// rows with no jump at all are dropped entirely. When the top-left corner is
/// not near-white no cropping happens and every pixel stays included.
#[derive(Debug, Clone, PartialEq)]
pub struct CropMask {
    width: usize,
    height: usize,
    detected: bool,
    boundaries: Vec<bool>,
    excluded: Vec<bool>,
}

/// Why a mask could not be applied. Callers fall back to the full pixel list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskUnavailable {
    /// Background was not white, so no mask was generated
    NotDetected,
    /// Mask and pixel list disagree in size
    ShapeMismatch { mask: usize, pixels: usize },
    /// The mask would leave nothing to cluster
    EverythingExcluded,
}

impl CropMask {
    /// Mask that excludes nothing.
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            detected: false,
            boundaries: vec![false; width * height],
            excluded: vec![false; width * height],
        }
    }

    pub fn detect(image: &LabelImage, config: &CropConfig) -> Self {
        let (width, height) = (image.width(), image.height());
        let mut mask = Self::empty(width, height);

        if image.corner_offset_from_white(config.sample_size) > config.white_threshold {
            return mask;
        }
        mask.detected = true;

        let mut diffs = vec![0.0f32; width];
        for y in 0..height {
            let gray = image.gray_row(y);
            for x in 0..width.saturating_sub(1) {
                diffs[x] = gray[x + 1] - gray[x];
            }
            // diffs[width - 1] stays 0: there is no column to its right.

            let row = y * width;
            if let Some(x) = (0..width.saturating_sub(1)).find(|&x| diffs[x].abs() > config.edge_threshold) {
                mask.boundaries[row + x] = true;
            }
            // The right-hand scan stops at column 1, so column 0 never becomes
            // a right boundary.
            if let Some(x) = (1..width).rev().find(|&x| diffs[x].abs() > config.edge_threshold) {
                mask.boundaries[row + x] = true;
            }
        }

        mask.fill_margins();
        mask
    }

    /// Exclude cells from each edge inward until a boundary column.
    fn fill_margins(&mut self) {
        let width = self.width;
        if width == 0 {
            return;
        }
        for y in 0..self.height {
            let row = y * width;

            let mut x = 0;
            while x < width - 1 && !self.boundaries[row + x] {
                self.excluded[row + x] = true;
                x += 1;
            }

            let mut x = width - 1;
            while x > 0 && !self.boundaries[row + x] {
                self.excluded[row + x] = true;
                x -= 1;
            }
        }
    }

    /// Whether a white background was found and cropping applies.
    pub fn is_detected(&self) -> bool {
        self.detected
    }

    pub fn is_boundary(&self, x: usize, y: usize) -> bool {
        self.boundaries[y * self.width + x]
    }

    pub fn is_excluded(&self, x: usize, y: usize) -> bool {
        self.excluded[y * self.width + x]
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.iter().filter(|&&e| e).count()
    }

    /// Pixels left after cropping, in row-major order.
    pub fn apply(&self, pixels: &[Srgb]) -> Result<Vec<Srgb>, MaskUnavailable> {
        if !self.detected {
            return Err(MaskUnavailable::NotDetected);
        }
        if pixels.len() != self.excluded.len() {
            return Err(MaskUnavailable::ShapeMismatch {
                mask: self.excluded.len(),
                pixels: pixels.len(),
            });
        }
        let kept: Vec<Srgb> = pixels
            .iter()
            .zip(&self.excluded)
            .filter(|(_, excluded)| !**excluded)
            .map(|(p, _)| *p)
            .collect();
        if kept.is_empty() {
            return Err(MaskUnavailable::EverythingExcluded);
        }
        Ok(kept)
    }
}
