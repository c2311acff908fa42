use super::Initializer;
use crate::error::PatchMatchError;
use crate::geometry::{Point, Region};
use crate::mask::Mask;
use crate::nnf::{Match, NearestNeighborField};
use log::debug;
use rand_pcg::Pcg32;

/// Seed every pixel whose surrounding patch is entirely valid source material
/// with itself at score zero.
pub struct KnownRegionSeed<'a> {
    source_mask: &'a Mask,
    patch_radius: u32,
}

impl<'a> KnownRegionSeed<'a> {
    pub fn new(source_mask: &'a Mask, patch_radius: u32) -> Self {
        Self {
            source_mask,
            patch_radius,
        }
    }
}

impl Initializer for KnownRegionSeed<'_> {
    fn initialize(
        &self,
        nnf: &mut NearestNeighborField,
        _rng: &mut Pcg32,
    ) -> Result<(), PatchMatchError> {
        let r = self.patch_radius as usize;
        let (w, h) = (nnf.width(), nnf.height());
        if w < 2 * r + 1 || h < 2 * r + 1 {
            return Ok(());
        }

        let mut seeded = 0usize;
        for y in r..h - r {
            for x in r..w - r {
                let p = Point::new(x as i32, y as i32);
                let region = Region::patch_around(p, self.patch_radius);
                if self.source_mask.is_valid_region(&region) {
                    nnf.get_mut(p).reset_to(Match::new(region, 0.0));
                    seeded += 1;
                }
            }
        }
        debug!("KnownRegionSeed: seeded {} pixels at score 0", seeded);
        Ok(())
    }
}
