//! Propagation: one forward-or-backward scan over the target pixels.
//!
//! For each processed pixel the scan proposes its neighbors' matches shifted
//! by the inverse offset and keeps whatever the acceptance test prefers. The
//! sequential scan is the reference (Gauss-Seidel) semantics: later pixels in
//! the pass see matches accepted earlier in the same pass. The
//! [`Propagator::propagate_jacobi`] variant trades that coupling for
//! data-parallelism by reading a snapshot of the field.
use crate::acceptance::AcceptanceTest;
use crate::cancel::CancelToken;
use crate::distance::PatchDistance;
use crate::error::PatchMatchError;
use crate::geometry::{Point, Region};
use crate::mask::Mask;
use crate::neighbors::NeighborFunctor;
use crate::nnf::{Match, MatchSet, NearestNeighborField};
use crate::observer::NnfObserver;
use log::debug;
use rayon::prelude::*;

/// Traversal direction of a propagation pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOrder {
    /// Raster order: increasing `y`, then increasing `x`.
    Forward,
    /// Reverse raster order.
    Backward,
}

impl ScanOrder {
    pub fn label(&self) -> &'static str {
        match self {
            ScanOrder::Forward => "forward",
            ScanOrder::Backward => "backward",
        }
    }
}

/// Decide whether a pass works on a pixel.
pub trait ProcessPredicate: Sync {
    fn should_process(&self, pixel: Point, matches: &MatchSet) -> bool;
}

/// The standard predicate: valid in the target mask and not yet converged to
/// an exact match (score 0 cannot improve further).
pub struct TargetUnconverged<'a> {
    target_mask: &'a Mask,
}

impl<'a> TargetUnconverged<'a> {
    pub fn new(target_mask: &'a Mask) -> Self {
        Self { target_mask }
    }
}

impl ProcessPredicate for TargetUnconverged<'_> {
    fn should_process(&self, pixel: Point, matches: &MatchSet) -> bool {
        if !self.target_mask.is_valid(pixel) {
            return false;
        }
        match matches.best() {
            Some(best) if best.is_valid() => best.ssd_score != 0.0,
            _ => true,
        }
    }
}

/// The force-fill predicate: target pixels still lacking a valid match.
pub struct InvalidOnly<'a> {
    target_mask: &'a Mask,
}

impl<'a> InvalidOnly<'a> {
    pub fn new(target_mask: &'a Mask) -> Self {
        Self { target_mask }
    }
}

impl ProcessPredicate for InvalidOnly<'_> {
    fn should_process(&self, pixel: Point, matches: &MatchSet) -> bool {
        self.target_mask.is_valid(pixel) && !matches.has_valid_match()
    }
}

/// Counters of one propagation pass. Transient skips are observability data,
/// never errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassStats {
    /// Pixels that received at least one better match.
    pub improved: usize,
    /// Candidates discarded because their region left the image or overlapped
    /// the hole.
    pub illegal_candidates: usize,
    /// Candidates that lost against the incumbent.
    pub rejected: usize,
}

/// One propagation pass over the target region, parameterized by the four
/// capabilities of the algorithm.
pub struct Propagator<'a> {
    pub patch_radius: u32,
    pub neighbors: &'a dyn NeighborFunctor,
    pub predicate: &'a dyn ProcessPredicate,
    pub distance: &'a dyn PatchDistance,
    pub acceptance: &'a dyn AcceptanceTest,
    pub source_mask: &'a Mask,
    pub target_mask: &'a Mask,
}

impl Propagator<'_> {
    /// Run one sequential pass in `order`, mutating the field in place.
    /// Returns per-pass counters; the count of improved pixels is the
    /// measure the driver logs.
    pub fn propagate(
        &self,
        nnf: &mut NearestNeighborField,
        order: ScanOrder,
        observer: &mut dyn NnfObserver,
        cancel: &CancelToken,
    ) -> Result<PassStats, PatchMatchError> {
        let mut stats = PassStats::default();
        let Some(bbox) = self.target_mask.valid_bounding_box() else {
            return Ok(stats);
        };

        let mut pixels: Vec<Point> = bbox.points().collect();
        if order == ScanOrder::Backward {
            pixels.reverse();
        }

        let extent = nnf.extent();
        let mut neighbor_buf = Vec::with_capacity(8);
        for p in pixels {
            if cancel.is_cancelled() {
                return Err(PatchMatchError::Cancelled);
            }
            if !self.predicate.should_process(p, nnf.get(p)) {
                continue;
            }
            observer.on_pixel_visited(p);

            let target_region = Region::patch_around(p, self.patch_radius);
            if !target_region.fits_in(extent) {
                continue;
            }

            neighbor_buf.clear();
            self.neighbors.neighbors_into(p, extent, &mut neighbor_buf);

            let mut improved = false;
            for &q in &neighbor_buf {
                let Some(neighbor_best) = nnf.best(q).filter(|m| m.is_valid()).copied() else {
                    continue;
                };
                // The candidate center is the neighbor's match shifted by the
                // inverse offset: standing one pixel right of the neighbor
                // means testing the patch one pixel right of its match.
                let (dx, dy) = q.offset_from(p);
                let candidate_center = neighbor_best.region.center().shifted(-dx, -dy);
                let candidate_region = Region::patch_around(candidate_center, self.patch_radius);
                if !candidate_region.fits_in(extent)
                    || !self.source_mask.is_valid_region(&candidate_region)
                {
                    stats.illegal_candidates += 1;
                    continue;
                }

                if self.try_candidate(nnf, p, &target_region, candidate_region, &mut stats, observer)
                {
                    improved = true;
                }
            }
            if improved {
                stats.improved += 1;
            }
        }

        debug!(
            "Propagator::propagate {} improved={} rejected={} illegal={}",
            order.label(),
            stats.improved,
            stats.rejected,
            stats.illegal_candidates
        );
        Ok(stats)
    }

    /// The Jacobi variant: every pixel is evaluated against a snapshot of the
    /// field taken at the start of the pass, so matches accepted during the
    /// pass do not feed later pixels. Converges slower per pass than the
    /// sequential scan but is deterministic and data-parallel.
    pub fn propagate_jacobi(
        &self,
        nnf: &mut NearestNeighborField,
        order: ScanOrder,
        observer: &mut dyn NnfObserver,
        cancel: &CancelToken,
    ) -> Result<PassStats, PatchMatchError> {
        let mut stats = PassStats::default();
        let Some(bbox) = self.target_mask.valid_bounding_box() else {
            return Ok(stats);
        };

        let mut pixels: Vec<Point> = bbox.points().collect();
        if order == ScanOrder::Backward {
            pixels.reverse();
        }

        let snapshot = nnf.clone();
        let extent = snapshot.extent();

        struct PixelOutcome {
            pixel: Point,
            candidates: Vec<Match>,
            illegal: usize,
        }

        let outcomes: Vec<PixelOutcome> = pixels
            .par_iter()
            .filter(|_| !cancel.is_cancelled())
            .filter(|&&p| self.predicate.should_process(p, snapshot.get(p)))
            .filter_map(|&p| {
                let target_region = Region::patch_around(p, self.patch_radius);
                if !target_region.fits_in(extent) {
                    return None;
                }
                let mut neighbor_buf = Vec::with_capacity(8);
                self.neighbors.neighbors_into(p, extent, &mut neighbor_buf);

                let mut candidates = Vec::new();
                let mut illegal = 0usize;
                for &q in &neighbor_buf {
                    let Some(neighbor_best) = snapshot.best(q).filter(|m| m.is_valid()) else {
                        continue;
                    };
                    let (dx, dy) = q.offset_from(p);
                    let candidate_center = neighbor_best.region.center().shifted(-dx, -dy);
                    let candidate_region =
                        Region::patch_around(candidate_center, self.patch_radius);
                    if !candidate_region.fits_in(extent)
                        || !self.source_mask.is_valid_region(&candidate_region)
                    {
                        illegal += 1;
                        continue;
                    }
                    let cap = incumbent_cap(snapshot.get(p));
                    let score =
                        self.distance
                            .distance_capped(&candidate_region, &target_region, cap);
                    candidates.push(Match::new(candidate_region, score));
                }
                if candidates.is_empty() && illegal == 0 {
                    return None;
                }
                Some(PixelOutcome {
                    pixel: p,
                    candidates,
                    illegal,
                })
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(PatchMatchError::Cancelled);
        }

        // Sequential merge in scan order keeps the result independent of the
        // parallel schedule.
        for outcome in outcomes {
            stats.illegal_candidates += outcome.illegal;
            let target_region = Region::patch_around(outcome.pixel, self.patch_radius);
            let mut improved = false;
            for candidate in outcome.candidates {
                let incumbent = nnf.get(outcome.pixel).replacement_target();
                let verdict = self
                    .acceptance
                    .is_better(&target_region, &incumbent, &candidate);
                if verdict.accepted {
                    let mut accepted = candidate;
                    accepted.verified = verdict.verified;
                    accepted.verification_score = verdict.verification_score;
                    nnf.get_mut(outcome.pixel).insert(accepted);
                    observer.on_match_accepted(outcome.pixel, &accepted);
                    improved = true;
                } else {
                    stats.rejected += 1;
                }
            }
            if improved {
                stats.improved += 1;
            }
        }

        debug!(
            "Propagator::propagate_jacobi {} improved={} rejected={} illegal={}",
            order.label(),
            stats.improved,
            stats.rejected,
            stats.illegal_candidates
        );
        Ok(stats)
    }

    fn try_candidate(
        &self,
        nnf: &mut NearestNeighborField,
        pixel: Point,
        target_region: &Region,
        candidate_region: Region,
        stats: &mut PassStats,
        observer: &mut dyn NnfObserver,
    ) -> bool {
        let incumbent = nnf.get(pixel).replacement_target();
        let cap = incumbent_cap(nnf.get(pixel));
        let score = self
            .distance
            .distance_capped(&candidate_region, target_region, cap);
        let candidate = Match::new(candidate_region, score);

        let verdict = self
            .acceptance
            .is_better(target_region, &incumbent, &candidate);
        if !verdict.accepted {
            stats.rejected += 1;
            return false;
        }

        let mut accepted = candidate;
        accepted.verified = verdict.verified;
        accepted.verification_score = verdict.verification_score;
        nnf.get_mut(pixel).insert(accepted);
        observer.on_match_accepted(pixel, &accepted);
        true
    }
}

/// Early-exit hint for the distance: the score a candidate has to beat.
fn incumbent_cap(matches: &MatchSet) -> f32 {
    let target = matches.replacement_target();
    if target.is_valid() {
        target.ssd_score
    } else {
        f32::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptance::{AcceptAll, SsdBetter};
    use crate::distance::SsdDistance;
    use crate::image::ImageRgbF;
    use crate::mask::PixelLabel;
    use crate::neighbors::{AllEightNeighbors, ForwardNeighbors};
    use crate::observer::NoopObserver;

    fn gradient_image(w: usize, h: usize) -> ImageRgbF {
        let mut img = ImageRgbF::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let v = (x + 2 * y) as f32 / (3 * w) as f32;
                img.set(x, y, [v, v, v]);
            }
        }
        img
    }

    #[test]
    fn a_perfect_match_spreads_along_the_scanline() {
        let image = gradient_image(12, 12);
        let source = Mask::new_filled(12, 12, PixelLabel::Valid);
        let target = Mask::new_filled(12, 12, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        // Seed only (4, 4) with its own patch; neighbors start with a bad one.
        let mut nnf = NearestNeighborField::new(12, 12, 1);
        let seed = Point::new(4, 4);
        nnf.get_mut(seed)
            .reset_to(Match::new(Region::patch_around(seed, 2), 0.0));
        let p = Point::new(5, 4);
        let far = Region::patch_around(Point::new(9, 9), 2);
        let bad = distance.distance(&far, &Region::patch_around(p, 2));
        nnf.get_mut(p).reset_to(Match::new(far, bad));

        let predicate = TargetUnconverged::new(&target);
        let propagator = Propagator {
            patch_radius: 2,
            neighbors: &ForwardNeighbors,
            predicate: &predicate,
            distance: &distance,
            acceptance: &SsdBetter,
            source_mask: &source,
            target_mask: &target,
        };
        let stats = propagator
            .propagate(
                &mut nnf,
                ScanOrder::Forward,
                &mut NoopObserver,
                &CancelToken::new(),
            )
            .unwrap();

        assert!(stats.improved >= 1);
        // The inverse-offset rule lands exactly on the pixel's own patch.
        let best = nnf.best(p).unwrap();
        assert_eq!(best.region, Region::patch_around(p, 2));
        assert_eq!(best.ssd_score, 0.0);
    }

    #[test]
    fn propagation_skips_candidates_overlapping_the_hole() {
        let image = gradient_image(12, 12);
        let source = Mask::from_fn(12, 12, |x, _| {
            if x >= 6 {
                PixelLabel::Hole
            } else {
                PixelLabel::Valid
            }
        });
        let target = Mask::new_filled(12, 12, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        // The left neighbor's match sits flush against the hole border, so the
        // shifted candidate overlaps the hole.
        let mut nnf = NearestNeighborField::new(12, 12, 1);
        let q = Point::new(5, 5);
        nnf.get_mut(q)
            .reset_to(Match::new(Region::patch_around(Point::new(3, 5), 2), 0.1));

        let predicate = TargetUnconverged::new(&target);
        let propagator = Propagator {
            patch_radius: 2,
            neighbors: &ForwardNeighbors,
            predicate: &predicate,
            distance: &distance,
            acceptance: &SsdBetter,
            source_mask: &source,
            target_mask: &target,
        };
        propagator
            .propagate(
                &mut nnf,
                ScanOrder::Forward,
                &mut NoopObserver,
                &CancelToken::new(),
            )
            .unwrap();

        // (6, 5)'s candidate would be centered at (4, 5): its patch reaches
        // x = 6 which is hole, so the pixel must stay unmatched.
        assert!(nnf.best(Point::new(6, 5)).is_none());
        // Every stored match still sits on valid source material.
        for y in 0..12 {
            for x in 0..12 {
                if let Some(m) = nnf.best(Point::new(x, y)) {
                    assert!(source.is_valid_region(&m.region));
                }
            }
        }
    }

    #[test]
    fn force_fill_reaches_pixels_with_invalid_matches() {
        let image = gradient_image(12, 12);
        let source = Mask::new_filled(12, 12, PixelLabel::Valid);
        let target = Mask::new_filled(12, 12, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        let mut nnf = NearestNeighborField::new(12, 12, 1);
        let filled = Point::new(5, 5);
        nnf.get_mut(filled)
            .reset_to(Match::new(Region::patch_around(filled, 2), 0.0));

        let predicate = InvalidOnly::new(&target);
        let propagator = Propagator {
            patch_radius: 2,
            neighbors: &AllEightNeighbors,
            predicate: &predicate,
            distance: &distance,
            acceptance: &AcceptAll,
            source_mask: &source,
            target_mask: &target,
        };
        propagator
            .propagate(
                &mut nnf,
                ScanOrder::Forward,
                &mut NoopObserver,
                &CancelToken::new(),
            )
            .unwrap();

        // The seed's neighborhood filled in during the same pass; the seed
        // itself was never reprocessed.
        assert!(nnf.best(Point::new(6, 6)).is_some());
        assert_eq!(nnf.best(filled).unwrap().ssd_score, 0.0);
    }

    #[test]
    fn cancellation_aborts_the_pass() {
        let image = gradient_image(12, 12);
        let source = Mask::new_filled(12, 12, PixelLabel::Valid);
        let target = Mask::new_filled(12, 12, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);
        let mut nnf = NearestNeighborField::new(12, 12, 1);

        let predicate = TargetUnconverged::new(&target);
        let propagator = Propagator {
            patch_radius: 2,
            neighbors: &ForwardNeighbors,
            predicate: &predicate,
            distance: &distance,
            acceptance: &SsdBetter,
            source_mask: &source,
            target_mask: &target,
        };
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = propagator.propagate(&mut nnf, ScanOrder::Forward, &mut NoopObserver, &cancel);
        assert!(matches!(err, Err(PatchMatchError::Cancelled)));
    }

    #[test]
    fn jacobi_pass_matches_a_one_step_sequential_pass_locally() {
        let image = gradient_image(12, 12);
        let source = Mask::new_filled(12, 12, PixelLabel::Valid);
        let target = Mask::new_filled(12, 12, PixelLabel::Valid);
        let distance = SsdDistance::new(&image, &source);

        let mut nnf = NearestNeighborField::new(12, 12, 1);
        let seed = Point::new(4, 4);
        nnf.get_mut(seed)
            .reset_to(Match::new(Region::patch_around(seed, 2), 0.0));

        let predicate = InvalidOnly::new(&target);
        let propagator = Propagator {
            patch_radius: 2,
            neighbors: &AllEightNeighbors,
            predicate: &predicate,
            distance: &distance,
            acceptance: &AcceptAll,
            source_mask: &source,
            target_mask: &target,
        };
        propagator
            .propagate_jacobi(
                &mut nnf,
                ScanOrder::Forward,
                &mut NoopObserver,
                &CancelToken::new(),
            )
            .unwrap();

        // Only the seed's direct ring can fill from the snapshot.
        assert!(nnf.best(Point::new(5, 5)).is_some());
        assert!(nnf.best(Point::new(8, 8)).is_none());
    }
}
