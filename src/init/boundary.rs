use super::{Initializer, RandomInitializer};
use crate::distance::PatchDistance;
use crate::error::PatchMatchError;
use crate::geometry::{Point, Region};
use crate::mask::Mask;
use crate::nnf::{Match, NearestNeighborField};
use log::debug;
use rand_pcg::Pcg32;

/// Random seeding followed by spatially coherent overwrites near the hole.
///
/// The source hole is dilated by the patch radius; every pixel inside the
/// dilated hole is re-seeded with the patch centered at its closest boundary
/// pixel (L2, ties broken by enumeration order). The coherent rim accelerates
/// convergence of the first propagation passes.
pub struct BoundaryInitializer<'a> {
    source_mask: &'a Mask,
    target_mask: &'a Mask,
    distance: &'a dyn PatchDistance,
    patch_radius: u32,
    seed_known_region: bool,
}

impl<'a> BoundaryInitializer<'a> {
    pub fn new(
        source_mask: &'a Mask,
        target_mask: &'a Mask,
        distance: &'a dyn PatchDistance,
        patch_radius: u32,
        seed_known_region: bool,
    ) -> Self {
        Self {
            source_mask,
            target_mask,
            distance,
            patch_radius,
            seed_known_region,
        }
    }
}

impl Initializer for BoundaryInitializer<'_> {
    fn initialize(
        &self,
        nnf: &mut NearestNeighborField,
        rng: &mut Pcg32,
    ) -> Result<(), PatchMatchError> {
        RandomInitializer::new(
            self.source_mask,
            self.target_mask,
            self.distance,
            self.patch_radius,
            self.seed_known_region,
        )
        .initialize(nnf, rng)?;

        let expanded = self.source_mask.expand_hole(self.patch_radius);
        // Only boundary pixels whose own patch is a legal seed are kept: the
        // Chebyshev dilation makes the patch hole-free, the fits check makes
        // it in-image.
        let boundary: Vec<Point> = expanded
            .boundary()
            .into_iter()
            .filter(|b| {
                let patch = Region::patch_around(*b, self.patch_radius);
                patch.fits_in(nnf.extent()) && self.source_mask.is_valid_region(&patch)
            })
            .collect();
        if boundary.is_empty() {
            debug!("BoundaryInitializer: no usable hole boundary, keeping random seeds");
            return Ok(());
        }
        debug!(
            "BoundaryInitializer: {} seed pixels on the dilated hole boundary",
            boundary.len()
        );

        let extent = nnf.extent();
        let r = self.patch_radius as usize;
        for y in r..nnf.height().saturating_sub(r) {
            for x in r..nnf.width().saturating_sub(r) {
                let p = Point::new(x as i32, y as i32);
                if !expanded.is_hole(p) {
                    continue;
                }
                let target_region = Region::patch_around(p, self.patch_radius);
                if !target_region.fits_in(extent) {
                    continue;
                }

                // First minimal entry wins, so index order breaks ties.
                let closest = boundary
                    .iter()
                    .copied()
                    .min_by_key(|b| b.distance_sq(p))
                    .expect("boundary is non-empty");
                let seed_region = Region::patch_around(closest, self.patch_radius);
                let score = self.distance.distance(&seed_region, &target_region);
                nnf.get_mut(p).reset_to(Match::new(seed_region, score));
            }
        }
        Ok(())
    }
}
