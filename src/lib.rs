#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod image;
pub mod mask;
pub mod nnf;
pub mod observer;

// "Expert" modules – still public, but considered unstable internals.
pub mod acceptance;
pub mod cancel;
pub mod distance;
pub mod geometry;
pub mod init;
pub mod neighbors;
pub mod propagate;
pub mod search;

// --- High-level re-exports -------------------------------------------------

// Main entry points: driver + results.
pub use crate::driver::{ComputeOutput, PatchMatchDriver, PatchMatchParams};
pub use crate::error::PatchMatchError;
pub use crate::nnf::{Match, MatchSet, NearestNeighborField};

// High-level diagnostics returned by the driver.
pub use crate::diagnostics::RunReport;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use patchmatch::prelude::*;
///
/// # fn main() -> Result<(), PatchMatchError> {
/// let mut driver = PatchMatchDriver::new(PatchMatchParams {
///     patch_radius: 2,
///     iterations: 3,
///     ..Default::default()
/// });
/// driver.set_image(ImageRgbF::new(32, 32));
/// driver.set_source_mask(Mask::new_filled(32, 32, PixelLabel::Valid));
/// driver.set_target_mask(Mask::new_filled(32, 32, PixelLabel::Valid));
/// let output = driver.compute(None)?;
/// println!("still invalid: {}", output.report.force_fill.still_invalid);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::driver::{ComputeOutput, PatchMatchDriver, PatchMatchParams};
    pub use crate::error::PatchMatchError;
    pub use crate::image::ImageRgbF;
    pub use crate::mask::{Mask, PixelLabel};
    pub use crate::nnf::NearestNeighborField;
}
