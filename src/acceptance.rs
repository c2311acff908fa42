//! Acceptance tests deciding whether a candidate match replaces an incumbent.
//!
//! Every policy is deterministic for fixed inputs. A policy may perform a
//! secondary verification and report its value through
//! [`Acceptance::verification_score`]; the propagator stamps accepted matches
//! with that result.
use crate::distance::histogram::{histogram_difference, patch_histogram};
use crate::geometry::Region;
use crate::image::ImageRgbF;
use crate::nnf::Match;
use serde::Deserialize;

/// Verdict of an acceptance test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Acceptance {
    pub accepted: bool,
    /// Whether the candidate passed a secondary verification check.
    pub verified: bool,
    /// Value of the secondary check; NaN when the policy has none.
    pub verification_score: f32,
}

impl Acceptance {
    pub fn rejected() -> Self {
        Self {
            accepted: false,
            verified: false,
            verification_score: f32::NAN,
        }
    }

    pub fn accepted_plain() -> Self {
        Self {
            accepted: true,
            verified: false,
            verification_score: f32::NAN,
        }
    }
}

/// Decide whether `candidate` beats `incumbent` for the patch at
/// `query_region`.
pub trait AcceptanceTest: Sync {
    fn is_better(&self, query_region: &Region, incumbent: &Match, candidate: &Match) -> Acceptance;
}

/// The trivial policy: a valid candidate wins iff its score is lower.
///
/// An invalid incumbent (NaN score) loses to any valid candidate; it marks an
/// explicitly unfilled entry, and a strict comparison against NaN would keep
/// it unfilled forever.
pub struct SsdBetter;

impl AcceptanceTest for SsdBetter {
    fn is_better(&self, _query: &Region, incumbent: &Match, candidate: &Match) -> Acceptance {
        if !candidate.is_valid() {
            return Acceptance::rejected();
        }
        if !incumbent.is_valid() || candidate.ssd_score < incumbent.ssd_score {
            Acceptance::accepted_plain()
        } else {
            Acceptance::rejected()
        }
    }
}

/// Accept any valid candidate; used by the final force-fill pass.
pub struct AcceptAll;

impl AcceptanceTest for AcceptAll {
    fn is_better(&self, _query: &Region, _incumbent: &Match, candidate: &Match) -> Acceptance {
        if candidate.is_valid() {
            Acceptance::accepted_plain()
        } else {
            Acceptance::rejected()
        }
    }
}

/// Knobs for the histogram-verified composite policy.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct CompositeParams {
    /// Bins per channel of the verification histograms.
    pub histogram_bins: usize,
    /// Maximum histogram difference for a candidate to be accepted.
    pub histogram_threshold: f32,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            histogram_bins: 20,
            histogram_threshold: 0.6,
        }
    }
}

/// Composite policy: the score must improve *and* the color histograms of the
/// candidate source patch and the query patch must be close.
pub struct CompositeHistogram<'a> {
    image: &'a ImageRgbF,
    params: CompositeParams,
}

impl<'a> CompositeHistogram<'a> {
    pub fn new(image: &'a ImageRgbF, params: CompositeParams) -> Self {
        Self { image, params }
    }
}

impl AcceptanceTest for CompositeHistogram<'_> {
    fn is_better(&self, query_region: &Region, incumbent: &Match, candidate: &Match) -> Acceptance {
        if !SsdBetter
            .is_better(query_region, incumbent, candidate)
            .accepted
        {
            return Acceptance::rejected();
        }
        if !candidate.region.fits_in(self.image.extent())
            || !query_region.fits_in(self.image.extent())
        {
            return Acceptance::rejected();
        }

        let candidate_hist =
            patch_histogram(self.image, &candidate.region, self.params.histogram_bins);
        let query_hist = patch_histogram(self.image, query_region, self.params.histogram_bins);
        let difference = histogram_difference(&candidate_hist, &query_hist);
        if difference <= self.params.histogram_threshold {
            Acceptance {
                accepted: true,
                verified: true,
                verification_score: difference,
            }
        } else {
            Acceptance::rejected()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn query() -> Region {
        Region::patch_around(Point::new(5, 5), 2)
    }

    #[test]
    fn ssd_better_compares_scores() {
        let region = Region::patch_around(Point::new(8, 8), 2);
        let incumbent = Match::new(region, 2.0);
        let better = Match::new(region, 1.0);
        let worse = Match::new(region, 3.0);

        assert!(SsdBetter.is_better(&query(), &incumbent, &better).accepted);
        assert!(!SsdBetter.is_better(&query(), &incumbent, &worse).accepted);
    }

    #[test]
    fn ssd_better_fills_an_invalid_incumbent() {
        let candidate = Match::new(Region::patch_around(Point::new(8, 8), 2), 9.0);
        assert!(
            SsdBetter
                .is_better(&query(), &Match::invalid(), &candidate)
                .accepted
        );
        assert!(
            !SsdBetter
                .is_better(&query(), &Match::invalid(), &Match::invalid())
                .accepted
        );
    }

    #[test]
    fn accept_all_only_requires_validity() {
        let incumbent = Match::new(Region::patch_around(Point::new(8, 8), 2), 0.1);
        let worse = Match::new(Region::patch_around(Point::new(3, 3), 2), 99.0);
        assert!(AcceptAll.is_better(&query(), &incumbent, &worse).accepted);
        assert!(
            !AcceptAll
                .is_better(&query(), &incumbent, &Match::invalid())
                .accepted
        );
    }

    #[test]
    fn composite_verifies_similar_histograms_and_rejects_dissimilar_ones() {
        // Left half dark, right half bright.
        let mut image = ImageRgbF::new(20, 10);
        for y in 0..10 {
            for x in 0..10 {
                image.set(x, y, [0.1; 3]);
            }
            for x in 10..20 {
                image.set(x, y, [0.9; 3]);
            }
        }
        let policy = CompositeHistogram::new(&image, CompositeParams::default());

        let dark_query = Region::patch_around(Point::new(4, 5), 2);
        let dark_candidate = Match::new(Region::patch_around(Point::new(5, 4), 2), 0.5);
        let bright_candidate = Match::new(Region::patch_around(Point::new(15, 5), 2), 0.5);

        let verdict = policy.is_better(&dark_query, &Match::invalid(), &dark_candidate);
        assert!(verdict.accepted && verdict.verified);
        assert!(verdict.verification_score <= CompositeParams::default().histogram_threshold);

        let verdict = policy.is_better(&dark_query, &Match::invalid(), &bright_candidate);
        assert!(!verdict.accepted);
    }
}
