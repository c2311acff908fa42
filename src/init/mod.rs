//! Strategies seeding the nearest-neighbor field.
//!
//! - `known_region`: self-seeds pixels whose patch is entirely valid source
//!   material (perfect attractors during propagation).
//! - `random`: uniform draws from the table of fully-valid source patches.
//! - `boundary`: random seeding, then spatially coherent overwrites near the
//!   hole from the closest boundary patch.
//!
//! A caller-provided field bypasses all of these; the driver deep-copies it.
pub mod boundary;
pub mod known_region;
pub mod random;

pub use self::boundary::BoundaryInitializer;
pub use self::known_region::KnownRegionSeed;
pub use self::random::RandomInitializer;

use crate::error::PatchMatchError;
use crate::nnf::NearestNeighborField;
use rand_pcg::Pcg32;

/// Seed the field so that every target pixel holds a valid match unless its
/// patch leaves the image.
pub trait Initializer {
    fn initialize(
        &self,
        nnf: &mut NearestNeighborField,
        rng: &mut Pcg32,
    ) -> Result<(), PatchMatchError>;
}
