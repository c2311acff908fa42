//! Patch-distance capabilities.
//!
//! A distance scores a source patch against an equally-sized target patch.
//! The contract: +infinity when either region is not fully inside the image
//! or when the source region overlaps the source-mask hole. Symmetry is not
//! required; the target side may span the hole.
//!
//! - `ssd`: mean per-pixel squared L2 in color space with early termination.
//! - `pca`: squared L2 between PCA projections of the vectorized patches.
//! - `histogram`: patch histograms used by verifying acceptance tests.
pub mod histogram;
pub mod pca;
pub mod ssd;

pub use self::pca::{PcaDistance, PcaParams};
pub use self::ssd::SsdDistance;

use crate::geometry::Region;

/// Score between two equally-sized patches. Lower is better.
pub trait PatchDistance: Sync {
    /// Distance between `source` and `target`, +infinity for illegal regions.
    fn distance(&self, source: &Region, target: &Region) -> f32;

    /// Distance with an early-exit hint: implementations may return
    /// +infinity as soon as the running value provably exceeds `cap`.
    fn distance_capped(&self, source: &Region, target: &Region, cap: f32) -> f32 {
        let _ = cap;
        self.distance(source, target)
    }
}
