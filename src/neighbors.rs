//! Neighbor functors enumerating propagation sources for a query pixel.
//!
//! Each returned pixel is interpreted as "copy this pixel's nearest neighbor,
//! shifted by the inverse offset, and test it at the query". Functors never
//! return pixels outside the image.
use crate::geometry::{Extent, Point};
use crate::nnf::NearestNeighborField;

const FORWARD_OFFSETS: [(i32, i32); 2] = [(-1, 0), (0, -1)];
const BACKWARD_OFFSETS: [(i32, i32); 2] = [(1, 0), (0, 1)];
const ALL_EIGHT_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Enumerate the propagation-source pixels for a query pixel into `out`.
pub trait NeighborFunctor: Sync {
    fn neighbors_into(&self, pixel: Point, extent: Extent, out: &mut Vec<Point>);
}

fn push_offsets(pixel: Point, extent: Extent, offsets: &[(i32, i32)], out: &mut Vec<Point>) {
    for &(dx, dy) in offsets {
        let q = pixel.shifted(dx, dy);
        if extent.contains(q) {
            out.push(q);
        }
    }
}

/// The left and upper neighbors, used by forward raster scans.
pub struct ForwardNeighbors;

impl NeighborFunctor for ForwardNeighbors {
    fn neighbors_into(&self, pixel: Point, extent: Extent, out: &mut Vec<Point>) {
        push_offsets(pixel, extent, &FORWARD_OFFSETS, out);
    }
}

/// The right and lower neighbors, used by backward scans.
pub struct BackwardNeighbors;

impl NeighborFunctor for BackwardNeighbors {
    fn neighbors_into(&self, pixel: Point, extent: Extent, out: &mut Vec<Point>) {
        push_offsets(pixel, extent, &BACKWARD_OFFSETS, out);
    }
}

/// All eight pixels at Chebyshev distance 1, used by the force-fill pass.
pub struct AllEightNeighbors;

impl NeighborFunctor for AllEightNeighbors {
    fn neighbors_into(&self, pixel: Point, extent: Extent, out: &mut Vec<Point>) {
        push_offsets(pixel, extent, &ALL_EIGHT_OFFSETS, out);
    }
}

/// Bit grid marking the pixels a pass may propagate from.
#[derive(Clone, Debug)]
pub struct AllowedPropagationMask {
    w: usize,
    h: usize,
    allowed: Vec<bool>,
}

impl AllowedPropagationMask {
    pub fn new(w: usize, h: usize) -> Self {
        Self {
            w,
            h,
            allowed: vec![false; w * h],
        }
    }

    /// Mark every pixel whose current best match is valid as a legal
    /// propagation source.
    pub fn from_field_validity(nnf: &NearestNeighborField) -> Self {
        let mut mask = Self::new(nnf.width(), nnf.height());
        for y in 0..nnf.height() {
            for x in 0..nnf.width() {
                let p = Point::new(x as i32, y as i32);
                if nnf.get(p).has_valid_match() {
                    mask.allow(p);
                }
            }
        }
        mask
    }

    pub fn allow(&mut self, p: Point) {
        self.allowed[p.y as usize * self.w + p.x as usize] = true;
    }

    pub fn is_allowed(&self, p: Point) -> bool {
        if p.x < 0 || p.y < 0 || p.x as usize >= self.w || p.y as usize >= self.h {
            return false;
        }
        self.allowed[p.y as usize * self.w + p.x as usize]
    }
}

/// The eight neighbors restricted to pixels marked in an auxiliary
/// allowed-propagation mask.
pub struct AllowedNeighbors<'a> {
    allowed: &'a AllowedPropagationMask,
}

impl<'a> AllowedNeighbors<'a> {
    pub fn new(allowed: &'a AllowedPropagationMask) -> Self {
        Self { allowed }
    }
}

impl NeighborFunctor for AllowedNeighbors<'_> {
    fn neighbors_into(&self, pixel: Point, extent: Extent, out: &mut Vec<Point>) {
        for &(dx, dy) in &ALL_EIGHT_OFFSETS {
            let q = pixel.shifted(dx, dy);
            if extent.contains(q) && self.allowed.is_allowed(q) {
                out.push(q);
            }
        }
    }
}
