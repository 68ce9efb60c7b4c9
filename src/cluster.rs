use std::collections::HashSet;

use kmeans_colors::{Kmeans, get_kmeans};
use log::debug;
use palette::Srgb;

use crate::config::{KmeansConfig, MAX_COLORS};
use crate::crop::CropMask;
use crate::error::{LabelError, Result};
use crate::label_image::LabelImage;
use crate::profile::BeerColorProfile;

/// Finds the dominant colors of a label with K-means (K-means++ seeding,
/// fixed seed) over RGB pixels.
#[derive(Debug, Clone, Default)]
pub struct ColorClusterer {
    config: KmeansConfig,
}

impl ColorClusterer {
    pub fn new(config: KmeansConfig) -> Self {
        Self { config }
    }

    /// Cluster the label's pixels, leaving out the cropped margin when the
    /// mask can be applied.
    pub fn cluster_image(
        &self,
        image: &LabelImage,
        mask: &CropMask,
        n_colors: usize,
    ) -> Result<BeerColorProfile> {
        match mask.apply(image.pixels()) {
            Ok(pixels) => {
                debug!(
                    "Clustering {} of {} pixels after cropping",
                    pixels.len(),
                    image.pixels().len()
                );
                self.cluster(&pixels, n_colors)
            }
            Err(reason) => {
                debug!("Crop mask unavailable ({reason:?}), clustering all pixels");
                self.cluster(image.pixels(), n_colors)
            }
        }
    }

    /// Partition `pixels` into exactly `n_colors` clusters.
    ///
    /// Returns the cluster centers and the fraction of pixels assigned to
    /// each. When the pixels hold fewer distinct colors than requested, the
    /// missing clusters are filled with zero-presence copies of the first
    /// center.
    pub fn cluster(&self, pixels: &[Srgb], n_colors: usize) -> Result<BeerColorProfile> {
        if n_colors == 0 || n_colors > MAX_COLORS {
            return Err(LabelError::invalid("n_colors", n_colors));
        }
        if pixels.is_empty() {
            return Err(LabelError::EmptyImage);
        }
        if self.config.runs == 0 {
            return Err(LabelError::invalid("kmeans.runs", self.config.runs));
        }

        // K-means++ seeding needs at least k distinct points to pick from.
        let k = n_colors.min(distinct_colors(pixels));

        let best = (0..self.config.runs)
            .map(|run| self.run(k, pixels, self.config.seed.wrapping_add(run as u64)))
            .min_by(|a, b| a.score.total_cmp(&b.score))
            .ok_or_else(|| LabelError::invalid("kmeans.runs", self.config.runs))?;

        let mut counts = vec![0usize; best.centroids.len()];
        for &idx in &best.indices {
            counts[idx as usize] += 1;
        }
        let total = best.indices.len() as f32;

        let mut colors = best.centroids;
        let mut presence: Vec<f32> = counts.iter().map(|&c| c as f32 / total).collect();

        let filler = colors[0];
        colors.resize(n_colors, filler);
        presence.resize(n_colors, 0.0);

        Ok(BeerColorProfile::new(colors, presence))
    }

    fn run(&self, k: usize, pixels: &[Srgb], seed: u64) -> Kmeans<Srgb> {
        get_kmeans(
            k,
            self.config.max_iter,
            self.config.converge,
            false,
            pixels,
            seed,
        )
    }
}

fn distinct_colors(pixels: &[Srgb]) -> usize {
    pixels
        .iter()
        .map(|p| [p.red.to_bits(), p.green.to_bits(), p.blue.to_bits()])
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(n_red: usize, n_blue: usize) -> Vec<Srgb> {
        let mut pixels = vec![Srgb::new(0.9, 0.1, 0.1); n_red];
        pixels.extend(vec![Srgb::new(0.1, 0.1, 0.9); n_blue]);
        pixels
    }

    #[test]
    fn returns_requested_number_of_clusters() {
        let pixels: Vec<Srgb> = (0..200)
            .map(|i| {
                let t = i as f32 / 199.0;
                Srgb::new(t, 1.0 - t, (t * 3.0).fract())
            })
            .collect();
        let clusterer = ColorClusterer::default();

        for n in 1..=6 {
            let profile = clusterer.cluster(&pixels, n).unwrap();
            assert_eq!(profile.colors.len(), n);
            assert_eq!(profile.presence.len(), n);
            let sum: f32 = profile.presence.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "presence sums to {sum} for n = {n}");
        }
    }

    #[test]
    fn presence_matches_cluster_sizes() {
        let pixels = two_tone(75, 25);
        let profile = ColorClusterer::default().cluster(&pixels, 2).unwrap();

        let red = profile
            .colors
            .iter()
            .position(|c| c.red > 0.5)
            .expect("a reddish center");
        assert!((profile.presence[red] - 0.75).abs() < 1e-6);
        assert!((profile.presence[1 - red] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn is_deterministic() {
        let pixels = two_tone(40, 60);
        let clusterer = ColorClusterer::default();
        assert_eq!(
            clusterer.cluster(&pixels, 2).unwrap(),
            clusterer.cluster(&pixels, 2).unwrap()
        );
    }

    #[test]
    fn more_clusters_than_colors_pads_with_empty_clusters() {
        let pixels = two_tone(10, 10);
        let profile = ColorClusterer::default().cluster(&pixels, 5).unwrap();

        assert_eq!(profile.colors.len(), 5);
        assert_eq!(&profile.presence[2..], &[0.0, 0.0, 0.0]);
        let sum: f32 = profile.presence.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rejects_zero_clusters_and_empty_input() {
        let clusterer = ColorClusterer::default();
        assert!(matches!(
            clusterer.cluster(&two_tone(1, 1), 0),
            Err(LabelError::InvalidParameter { .. })
        ));
        assert!(matches!(clusterer.cluster(&[], 3), Err(LabelError::EmptyImage)));
    }

    #[test]
    fn masked_margin_is_left_out() {
        let white = Srgb::new(1.0, 1.0, 1.0);
        let dark = Srgb::new(0.2, 0.3, 0.4);
        let mut pixels = vec![white; 100];
        for y in 5..9 {
            for x in 5..9 {
                pixels[y * 10 + x] = dark;
            }
        }
        let image = LabelImage::from_pixels(10, 10, pixels).unwrap();
        let mask = CropMask::detect(&image, &Default::default());

        let profile = ColorClusterer::default()
            .cluster_image(&image, &mask, 1)
            .unwrap();
        // Only a thin white fringe survives next to the dark square.
        assert!(profile.colors[0].red < 0.9);
    }
}
