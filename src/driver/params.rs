//! Parameter types configuring a PatchMatch run.
//!
//! Defaults follow the reference prescription: radius 3, five iterations,
//! deterministic seeding, SSD distance with the SSD-better acceptance test
//! and a single match per pixel.

use crate::acceptance::CompositeParams;
use crate::distance::PcaParams;
use serde::Deserialize;

/// How the field is seeded. A caller-provided field (`compute(Some(..))`)
/// bypasses the strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStrategy {
    Random,
    Boundary,
}

/// How propagation sources are enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationStrategy {
    /// Forward/backward scanline neighbors, alternating per iteration.
    Raster,
    /// All eight neighbors restricted to pixels already holding a valid
    /// match, so information flows inward from the solved rim of the hole.
    Inward,
}

/// Patch-distance implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceKind {
    Ssd,
    Pca,
}

/// Candidate-versus-incumbent policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceKind {
    SsdBetter,
    Composite,
    AcceptAll,
}

/// Driver-wide parameters controlling a `compute` call.
#[derive(Clone, Debug, Deserialize)]
pub struct PatchMatchParams {
    /// Half-side of patches (>= 1).
    pub patch_radius: u32,
    /// Number of propagation + random-search rounds (>= 1).
    pub iterations: u32,
    /// Seeding strategy when no initial field is provided.
    pub init_strategy: InitStrategy,
    /// Neighbor enumeration used by the propagation passes.
    pub propagation_strategy: PropagationStrategy,
    /// Seed the RNG from the clock (true) or from 0 (false, reproducible).
    pub random: bool,
    /// Patch-distance implementation.
    pub distance: DistanceKind,
    /// Acceptance policy applied during propagation and random search.
    pub acceptance: AcceptanceKind,
    /// Match-set capacity per pixel for the k-NN variant.
    pub k: u32,
    /// Self-seed pixels whose patch is entirely valid source material.
    pub seed_known_region: bool,
    /// Use the data-parallel Jacobi propagation variant. Matches accepted in
    /// a pass then no longer feed later pixels of the same pass.
    pub parallel_propagation: bool,
    /// Training knobs for the PCA distance.
    pub pca: PcaParams,
    /// Verification knobs for the composite acceptance test.
    pub composite: CompositeParams,
}

impl Default for PatchMatchParams {
    fn default() -> Self {
        Self {
            patch_radius: 3,
            iterations: 5,
            init_strategy: InitStrategy::Random,
            propagation_strategy: PropagationStrategy::Raster,
            random: false,
            distance: DistanceKind::Ssd,
            acceptance: AcceptanceKind::SsdBetter,
            k: 1,
            seed_known_region: true,
            parallel_propagation: false,
            pca: PcaParams::default(),
            composite: CompositeParams::default(),
        }
    }
}
