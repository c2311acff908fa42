use super::{Initializer, KnownRegionSeed};
use crate::distance::PatchDistance;
use crate::error::PatchMatchError;
use crate::geometry::Region;
use crate::mask::Mask;
use crate::nnf::{Match, NearestNeighborField};
use log::debug;
use rand::Rng;
use rand_pcg::Pcg32;

/// Seed every target pixel with a uniformly drawn fully-valid source patch.
///
/// Fails with [`PatchMatchError::NoValidSourceRegions`] when the source mask
/// admits no patch of the configured radius. Target pixels whose own patch
/// leaves the image are skipped; pixels already holding a valid match (e.g.
/// from the known-region seed) are left untouched.
pub struct RandomInitializer<'a> {
    source_mask: &'a Mask,
    target_mask: &'a Mask,
    distance: &'a dyn PatchDistance,
    patch_radius: u32,
    seed_known_region: bool,
}

impl<'a> RandomInitializer<'a> {
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

impl Initializer for RandomInitializer<'_> {
    fn initialize(
        &self,
        nnf: &mut NearestNeighborField,
        rng: &mut Pcg32,
    ) -> Result<(), PatchMatchError> {
        if self.seed_known_region {
            KnownRegionSeed::new(self.source_mask, self.patch_radius).initialize(nnf, rng)?;
        }

        let valid_regions = self.source_mask.fully_valid_patches(self.patch_radius);
        if valid_regions.is_empty() {
            return Err(PatchMatchError::NoValidSourceRegions);
        }

        let target_pixels = self.target_mask.valid_pixels();
        debug!(
            "RandomInitializer: {} target pixels, {} valid source regions",
            target_pixels.len(),
            valid_regions.len()
        );

        let extent = nnf.extent();
        for p in target_pixels {
            let target_region = Region::patch_around(p, self.patch_radius);
            if !target_region.fits_in(extent) {
                continue;
            }
            if nnf.get(p).has_valid_match() {
                continue;
            }
            let drawn = valid_regions[rng.gen_range(0..valid_regions.len())];
            let score = self.distance.distance(&drawn, &target_region);
            nnf.get_mut(p).reset_to(Match::new(drawn, score));
        }
        Ok(())
    }
}
