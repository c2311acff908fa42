//! Random-search refinement with exponentially shrinking windows.
//!
//! For every unconverged target pixel the searcher draws random source
//! patches from windows centered on the query pixel (not the incumbent match
//! center), halving the window from `max(W, H)` down to the patch radius, and
//! submits each legal draw to the acceptance test.
use crate::acceptance::AcceptanceTest;
use crate::cancel::CancelToken;
use crate::distance::PatchDistance;
use crate::error::PatchMatchError;
use crate::geometry::Region;
use crate::mask::Mask;
use crate::nnf::{Match, NearestNeighborField};
use crate::observer::NnfObserver;
use crate::propagate::PassStats;
use log::debug;
use rand_pcg::Pcg32;

/// How many random centers to try per window before shrinking it.
const DRAW_ATTEMPTS_PER_WINDOW: u32 = 5;

/// Exponentially shrinking random-window refinement of the field.
pub struct RandomSearcher<'a> {
    pub patch_radius: u32,
    pub distance: &'a dyn PatchDistance,
    pub acceptance: &'a dyn AcceptanceTest,
    pub source_mask: &'a Mask,
    pub target_mask: &'a Mask,
}

impl RandomSearcher<'_> {
    /// Run one search pass, always traversing the target region in raster
    /// order so that a fixed seed reproduces the draws.
    pub fn search(
        &self,
        nnf: &mut NearestNeighborField,
        rng: &mut Pcg32,
        observer: &mut dyn NnfObserver,
        cancel: &CancelToken,
    ) -> Result<PassStats, PatchMatchError> {
        let mut stats = PassStats::default();
        let Some(bbox) = self.target_mask.valid_bounding_box() else {
            return Ok(stats);
        };

        let extent = nnf.extent();
        let image_region = extent.as_region();
        let initial_window = extent.w.max(extent.h) as u32;

        for p in bbox.points() {
            if cancel.is_cancelled() {
                return Err(PatchMatchError::Cancelled);
            }
            if !self.target_mask.is_valid(p) {
                continue;
            }
            // Only refine pixels that already hold a valid, non-exact match.
            let Some(best) = nnf.best(p).filter(|m| m.is_valid()).copied() else {
                continue;
            };
            if best.ssd_score == 0.0 {
                continue;
            }
            observer.on_pixel_visited(p);

            let target_region = Region::patch_around(p, self.patch_radius);
            if !target_region.fits_in(extent) {
                continue;
            }

            let mut improved = false;
            let mut window = initial_window;
            while window > self.patch_radius {
                let search_region =
                    Region::patch_around(p, window).intersect(&image_region);
                if let Some(candidate_region) = self.source_mask.random_valid_patch_in(
                    &search_region,
                    self.patch_radius,
                    DRAW_ATTEMPTS_PER_WINDOW,
                    rng,
                ) {
                    let incumbent = nnf.get(p).replacement_target();
                    let cap = if incumbent.is_valid() {
                        incumbent.ssd_score
                    } else {
                        f32::INFINITY
                    };
                    let score =
                        self.distance
                            .distance_capped(&candidate_region, &target_region, cap);
                    let candidate = Match::new(candidate_region, score);
                    let verdict = self
                        .acceptance
                        .is_better(&target_region, &incumbent, &candidate);
                    if verdict.accepted {
                        let mut accepted = candidate;
                        accepted.verified = verdict.verified;
                        accepted.verification_score = verdict.verification_score;
                        nnf.get_mut(p).insert(accepted);
                        observer.on_match_accepted(p, &accepted);
                        improved = true;
                    } else {
                        stats.rejected += 1;
                    }
                } else {
                    stats.illegal_candidates += 1;
                }
                window /= 2;
            }
            if improved {
                stats.improved += 1;
            }
        }

        debug!(
            "RandomSearcher::search improved={} rejected={} exhausted_windows={}",
            stats.improved, stats.rejected, stats.illegal_candidates
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptance::SsdBetter;
    use crate::distance::SsdDistance;
    use crate::geometry::Point;
    use crate::image::ImageRgbF;
    use crate::mask::PixelLabel;
    use crate::observer::NoopObserver;
    use rand::SeedableRng;

    fn two_tone_image(w: usize, h: usize) -> ImageRgbF {
        let mut img = ImageRgbF::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 0.2 } else { 0.8 };
                img.set(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn search_improves_a_deliberately_bad_seed() {
        let image = two_tone_image(16, 16);
        let source = Mask::new_filled(16, 16, PixelLabel::Valid);
        let target = Mask::new_filled(16, 16, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        // Seed a dark-side pixel with a bright-side match.
        let mut nnf = NearestNeighborField::new(16, 16, 1);
        let p = Point::new(4, 8);
        let bad_region = Region::patch_around(Point::new(12, 8), 2);
        let bad_score = distance.distance(&bad_region, &Region::patch_around(p, 2));
        nnf.get_mut(p).reset_to(Match::new(bad_region, bad_score));

        let searcher = RandomSearcher {
            patch_radius: 2,
            distance: &distance,
            acceptance: &SsdBetter,
            source_mask: &source,
            target_mask: &target,
        };
        let mut rng = Pcg32::seed_from_u64(1);
        let mut improved = 0usize;
        for _ in 0..3 {
            let stats = searcher
                .search(&mut nnf, &mut rng, &mut NoopObserver, &CancelToken::new())
                .unwrap();
            improved += stats.improved;
        }

        assert!(improved >= 1);
        let refined = nnf.best(p).unwrap();
        assert!(refined.ssd_score < bad_score);
        assert!(source.is_valid_region(&refined.region));
    }

    #[test]
    fn search_is_reproducible_for_a_fixed_seed() {
        let image = two_tone_image(16, 16);
        let source = Mask::new_filled(16, 16, PixelLabel::Valid);
        let target = Mask::new_filled(16, 16, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        let run = |seed: u64| {
            let mut nnf = NearestNeighborField::new(16, 16, 1);
            for y in 2..14 {
                for x in 2..14 {
                    let p = Point::new(x, y);
                    let region = Region::patch_around(Point::new(8, 8), 2);
                    let score = distance.distance(&region, &Region::patch_around(p, 2));
                    nnf.get_mut(p).reset_to(Match::new(region, score));
                }
            }
            let searcher = RandomSearcher {
                patch_radius: 2,
                distance: &distance,
                acceptance: &SsdBetter,
                source_mask: &source,
                target_mask: &target,
            };
            let mut rng = Pcg32::seed_from_u64(seed);
            searcher
                .search(&mut nnf, &mut rng, &mut NoopObserver, &CancelToken::new())
                .unwrap();
            nnf.centers_image().data
        };

        let a = run(3);
        let b = run(3);
        assert!(a.iter().zip(b.iter()).all(|(x, y)| {
            x.iter()
                .zip(y.iter())
                .all(|(u, v)| u == v || (u.is_nan() && v.is_nan()))
        }));
    }

    #[test]
    fn skips_pixels_that_already_converged() {
        let image = two_tone_image(16, 16);
        let source = Mask::new_filled(16, 16, PixelLabel::Valid);
        let target = Mask::new_filled(16, 16, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        let mut nnf = NearestNeighborField::new(16, 16, 1);
        let p = Point::new(8, 8);
        nnf.get_mut(p)
            .reset_to(Match::new(Region::patch_around(p, 2), 0.0));

        let searcher = RandomSearcher {
            patch_radius: 2,
            distance: &distance,
            acceptance: &SsdBetter,
            source_mask: &source,
            target_mask: &target,
        };
        let mut rng = Pcg32::seed_from_u64(0);
        let stats = searcher
            .search(&mut nnf, &mut rng, &mut NoopObserver, &CancelToken::new())
            .unwrap();
        assert_eq!(stats.improved, 0);
        assert_eq!(nnf.best(p).unwrap().region, Region::patch_around(p, 2));
    }
}
