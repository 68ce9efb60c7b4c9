use std::path::Path;

use image::{DynamicImage, RgbImage};
use palette::Srgb;

use crate::error::{LabelError, Result};

/// Luminance weights used for border detection. These intentionally differ
/// from Rec. 709 luma.
const GRAY_WEIGHTS: [f32; 3] = [0.21, 0.72, 0.07];

/// A label image normalized to `[0, 1]` RGB with a grayscale view of the same
/// shape. Pixels are stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelImage {
    width: usize,
    height: usize,
    pixels: Vec<Srgb>,
    grayscale: Vec<f32>,
}

impl LabelImage {
    /// Decode an image file. Only 3-channel images are accepted.
    pub fn open(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|source| LabelError::ImageLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_dynamic(&img)
    }

    pub fn from_dynamic(img: &DynamicImage) -> Result<Self> {
        let channels = img.color().channel_count();
        if channels != 3 {
            return Err(LabelError::Format { channels });
        }

        // 8 and 16 bit inputs are both scaled to [0, 1] here.
        let rgb = img.to_rgb32f();
        let pixels: Vec<Srgb> = rgb
            .pixels()
            .map(|p| Srgb::new(p[0], p[1], p[2]))
            .collect();

        Self::from_pixels(rgb.width() as usize, rgb.height() as usize, pixels)
    }

    /// Build from an already normalized row-major pixel list.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<Srgb>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.is_empty() {
            return Err(LabelError::EmptyImage);
        }
        if pixels.len() != width * height {
            return Err(LabelError::invalid(
                "pixels",
                format!("{} for a {width}x{height} image", pixels.len()),
            ));
        }
        let grayscale = pixels.iter().map(|&p| luminance(p)).collect();
        Ok(Self {
            width,
            height,
            pixels,
            grayscale,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Flattened pixel list, the clustering input.
    pub fn pixels(&self) -> &[Srgb] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Srgb {
        self.pixels[y * self.width + x]
    }

    pub fn grayscale(&self) -> &[f32] {
        &self.grayscale
    }

    /// One row of the grayscale view.
    pub fn gray_row(&self, y: usize) -> &[f32] {
        &self.grayscale[y * self.width..(y + 1) * self.width]
    }

    /// Distance of the top-left `size`×`size` block from pure white: the
    /// square root of the summed squared channel deviations from 1.0.
    /// Blocks larger than the image are clipped to it.
    pub fn corner_offset_from_white(&self, size: usize) -> f32 {
        let mut sum = 0.0f32;
        for y in 0..size.min(self.height) {
            for x in 0..size.min(self.width) {
                let p = self.pixel(x, y);
                for c in [p.red, p.green, p.blue] {
                    sum += (1.0 - c) * (1.0 - c);
                }
            }
        }
        sum.sqrt()
    }

    /// Replace every pixel by its nearest color in `colors` (RGB Euclidean,
    /// first minimum wins). The grayscale view is recomputed.
    pub fn quantize(&mut self, colors: &[Srgb]) {
        if colors.is_empty() {
            return;
        }
        for p in self.pixels.iter_mut() {
            let mut best = 0;
            let mut best_dist = f32::INFINITY;
            for (idx, c) in colors.iter().enumerate() {
                let dr = p.red - c.red;
                let dg = p.green - c.green;
                let db = p.blue - c.blue;
                let dist = dr * dr + dg * dg + db * db;
                if dist < best_dist {
                    best_dist = dist;
                    best = idx;
                }
            }
            *p = colors[best];
        }
        self.grayscale = self.pixels.iter().map(|&p| luminance(p)).collect();
    }

    /// 8-bit copy, used when writing quantized labels back to disk.
    pub fn to_rgb8(&self) -> RgbImage {
        let raw: Vec<u8> = self
            .pixels
            .iter()
            .flat_map(|p| {
                let c: Srgb<u8> = p.into_format();
                [c.red, c.green, c.blue]
            })
            .collect();
        // Length always matches width * height * 3.
        RgbImage::from_raw(self.width as u32, self.height as u32, raw).unwrap_or_default()
    }
}

pub fn luminance(p: Srgb) -> f32 {
    GRAY_WEIGHTS[0] * p.red + GRAY_WEIGHTS[1] * p.green + GRAY_WEIGHTS[2] * p.blue
}
