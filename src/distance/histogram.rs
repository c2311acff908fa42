//! Per-channel patch histograms for secondary match verification.
use crate::geometry::Region;
use crate::image::ImageRgbF;

/// Per-channel histogram of a patch, `bins` bins per channel over [0, 1],
/// each channel normalized to sum to one. The region must fit the image.
pub fn patch_histogram(image: &ImageRgbF, region: &Region, bins: usize) -> Vec<f32> {
    let mut hist = vec![0.0f32; 3 * bins];
    let pixels = (region.w * region.h) as f32;
    for p in region.points() {
        let px = image.at(p);
        for (channel, &v) in px.iter().enumerate() {
            let bin = ((v.clamp(0.0, 1.0) * bins as f32) as usize).min(bins - 1);
            hist[channel * bins + bin] += 1.0;
        }
    }
    for v in &mut hist {
        *v /= pixels;
    }
    hist
}

/// L1 difference between two histograms of the same layout. Ranges over
/// [0, 6] for the 3-channel normalized histograms produced above.
pub fn histogram_difference(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "histogram layouts must match");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    #[test]
    fn identical_patches_have_zero_difference() {
        let mut img = ImageRgbF::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                img.set(x, y, [x as f32 / 8.0, y as f32 / 8.0, 0.5]);
            }
        }
        let region = Region::patch_around(Point::new(4, 4), 2);
        let h = patch_histogram(&img, &region, 20);
        assert!(histogram_difference(&h, &h) == 0.0);
        // Each channel sums to one.
        for channel in 0..3 {
            let sum: f32 = h[channel * 20..(channel + 1) * 20].iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn disjoint_intensity_ranges_max_out_the_difference() {
        let mut img = ImageRgbF::new(10, 5);
        for y in 0..5 {
            for x in 0..5 {
                img.set(x, y, [0.0; 3]);
            }
            for x in 5..10 {
                img.set(x, y, [1.0; 3]);
            }
        }
        let dark = patch_histogram(&img, &Region::new(0, 0, 5, 5), 10);
        let bright = patch_histogram(&img, &Region::new(5, 0, 5, 5), 10);
        assert!((histogram_difference(&dark, &bright) - 6.0).abs() < 1e-5);
    }
}
