//! PCA-projected L2 patch distance.
//!
//! Patches are vectorized, centred on the training mean and projected
//! through a basis of principal directions learned from fully-valid source
//! patches; the distance is the squared norm of the projection difference.
use super::PatchDistance;
use crate::error::PatchMatchError;
use crate::geometry::Region;
use crate::image::ImageRgbF;
use crate::mask::Mask;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::Deserialize;

/// Knobs for the PCA basis training.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct PcaParams {
    /// Number of principal directions kept in the projection basis.
    pub components: usize,
    /// Upper bound on the number of source patches sampled for training.
    pub max_training_samples: usize,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self {
            components: 25,
            max_training_samples: 1000,
        }
    }
}

/// Patch distance in a learned low-dimensional patch space.
pub struct PcaDistance<'a> {
    image: &'a ImageRgbF,
    source_mask: &'a Mask,
    mean: DVector<f32>,
    /// `components x dim` projection, rows are principal directions.
    basis: DMatrix<f32>,
}

impl<'a> PcaDistance<'a> {
    /// Learn a projection basis from fully-valid source patches of `radius`.
    ///
    /// Fails with [`PatchMatchError::NoValidSourceRegions`] when the source
    /// mask admits no patch at all.
    pub fn train(
        image: &'a ImageRgbF,
        source_mask: &'a Mask,
        radius: u32,
        params: &PcaParams,
        rng: &mut Pcg32,
    ) -> Result<Self, PatchMatchError> {
        let candidates = source_mask.fully_valid_patches(radius);
        if candidates.is_empty() {
            return Err(PatchMatchError::NoValidSourceRegions);
        }

        let side = 2 * radius as usize + 1;
        let dim = 3 * side * side;
        let sample_count = candidates.len().min(params.max_training_samples.max(1));
        let mut samples = DMatrix::<f32>::zeros(dim, sample_count);
        for col in 0..sample_count {
            let region = if candidates.len() <= params.max_training_samples {
                &candidates[col]
            } else {
                &candidates[rng.gen_range(0..candidates.len())]
            };
            samples.set_column(col, &patch_vector(image, region, dim));
        }

        let mut mean = DVector::<f32>::zeros(dim);
        for col in 0..sample_count {
            mean += samples.column(col);
        }
        mean /= sample_count as f32;
        for mut col in samples.column_iter_mut() {
            col -= &mean;
        }

        let components = params.components.max(1).min(dim).min(sample_count);
        let svd = samples.svd(true, false);
        let u = svd.u.unwrap_or_else(|| DMatrix::identity(dim, dim));

        // nalgebra does not guarantee singular-value ordering.
        let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
        order.sort_by(|&a, &b| {
            svd.singular_values[b]
                .partial_cmp(&svd.singular_values[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut basis = DMatrix::<f32>::zeros(components, dim);
        for (row, &col) in order.iter().take(components).enumerate() {
            basis.set_row(row, &u.column(col).transpose());
        }

        debug!(
            "PcaDistance::train samples={} dim={} components={}",
            sample_count, dim, components
        );

        Ok(Self {
            image,
            source_mask,
            mean,
            basis,
        })
    }

    fn project(&self, region: &Region) -> DVector<f32> {
        let v = patch_vector(self.image, region, self.mean.len());
        &self.basis * (v - &self.mean)
    }

    fn regions_legal(&self, source: &Region, target: &Region) -> bool {
        source.w == target.w
            && source.h == target.h
            && source.fits_in(self.image.extent())
            && target.fits_in(self.image.extent())
            && self.source_mask.is_valid_region(source)
    }
}

impl PatchDistance for PcaDistance<'_> {
    fn distance(&self, source: &Region, target: &Region) -> f32 {
        if !self.regions_legal(source, target) {
            return f32::INFINITY;
        }
        (self.project(source) - self.project(target)).norm_squared()
    }
}

fn patch_vector(image: &ImageRgbF, region: &Region, dim: usize) -> DVector<f32> {
    let mut v = DVector::<f32>::zeros(dim);
    let mut i = 0;
    for p in region.points() {
        let px = image.at(p);
        v[i] = px[0];
        v[i + 1] = px[1];
        v[i + 2] = px[2];
        i += 3;
    }
    v
}
