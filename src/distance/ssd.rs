//! Sum-of-squared-differences patch distance.
use super::PatchDistance;
use crate::geometry::Region;
use crate::image::ImageRgbF;
use crate::mask::Mask;

/// Mean per-pixel squared L2 distance in color space.
///
/// Rejects (with +infinity) sources that leave the image or overlap the
/// source-mask hole; the target patch only has to be inside the image.
pub struct SsdDistance<'a> {
    image: &'a ImageRgbF,
    source_mask: &'a Mask,
}

impl<'a> SsdDistance<'a> {
    pub fn new(image: &'a ImageRgbF, source_mask: &'a Mask) -> Self {
        Self { image, source_mask }
    }

    fn regions_legal(&self, source: &Region, target: &Region) -> bool {
        source.w == target.w
            && source.h == target.h
            && source.fits_in(self.image.extent())
            && target.fits_in(self.image.extent())
            && self.source_mask.is_valid_region(source)
    }
}

impl PatchDistance for SsdDistance<'_> {
    fn distance(&self, source: &Region, target: &Region) -> f32 {
        self.distance_capped(source, target, f32::INFINITY)
    }

    fn distance_capped(&self, source: &Region, target: &Region, cap: f32) -> f32 {
        if !self.regions_legal(source, target) {
            return f32::INFINITY;
        }

        let total = (source.w * source.h) as f32;
        let mut sum = 0.0f32;
        let mut compared = 0.0f32;
        for dy in 0..source.h as usize {
            let src_row = self.image.row((source.y as usize) + dy);
            let tgt_row = self.image.row((target.y as usize) + dy);
            let sx = source.x as usize;
            let tx = target.x as usize;
            for dx in 0..source.w as usize {
                let s = src_row[sx + dx];
                let t = tgt_row[tx + dx];
                let d0 = s[0] - t[0];
                let d1 = s[1] - t[1];
                let d2 = s[2] - t[2];
                sum += d0 * d0 + d1 * d1 + d2 * d2;
            }
            compared += source.w as f32;
            // Once the partial mean exceeds the incumbent there is no need to
            // finish the patch.
            if sum / compared > cap {
                return f32::INFINITY;
            }
        }
        sum / total
    }
}
