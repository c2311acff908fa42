//! The nearest-neighbor field store.
//!
//! One [`MatchSet`] per pixel, ordered ascending by score, capacity `k`
//! (`k = 1` for the basic variant). A [`Match`] pairs a source region with
//! its patch-distance score; NaN scores mark explicitly unfilled entries.
use crate::geometry::{Extent, Point, Region};
use crate::image::ImageRgbF;
use std::cmp::Ordering;

/// One candidate nearest neighbor: a source region and its scores.
#[derive(Clone, Copy, Debug)]
pub struct Match {
    /// The source patch backing this match.
    pub region: Region,
    /// Patch-distance value; NaN marks an invalid match.
    pub ssd_score: f32,
    /// Secondary score assigned by verifying acceptance tests; may be NaN.
    pub verification_score: f32,
    /// Set by acceptance tests that pass a secondary check.
    pub verified: bool,
}

impl Match {
    /// The explicitly-unfilled match: empty region, NaN scores.
    pub fn invalid() -> Self {
        Self {
            region: Region::empty(),
            ssd_score: f32::NAN,
            verification_score: f32::NAN,
            verified: false,
        }
    }

    pub fn new(region: Region, ssd_score: f32) -> Self {
        Self {
            region,
            ssd_score,
            verification_score: f32::NAN,
            verified: false,
        }
    }

    /// Valid iff the score is not NaN and the region has non-zero size.
    pub fn is_valid(&self) -> bool {
        !self.ssd_score.is_nan() && !self.region.is_empty()
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn make_invalid(&mut self) {
        *self = Self::invalid();
    }
}

impl Default for Match {
    fn default() -> Self {
        Self::invalid()
    }
}

// Equality treats NaN == NaN so that invalid matches compare equal.
impl PartialEq for Match {
    fn eq(&self, other: &Self) -> bool {
        fn score_eq(a: f32, b: f32) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }
        self.verified == other.verified
            && self.region == other.region
            && score_eq(self.ssd_score, other.ssd_score)
            && score_eq(self.verification_score, other.verification_score)
    }
}

/// Ordered set of up to `capacity` matches, ascending by `ssd_score`,
/// no duplicate regions.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchSet {
    capacity: usize,
    matches: Vec<Match>,
}

impl MatchSet {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "match-set capacity must be at least 1");
        Self {
            capacity,
            matches: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.matches.len() >= self.capacity
    }

    pub fn best(&self) -> Option<&Match> {
        self.matches.first()
    }

    pub fn worst(&self) -> Option<&Match> {
        self.matches.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn clear(&mut self) {
        self.matches.clear();
    }

    /// Whether this set holds a valid best match.
    pub fn has_valid_match(&self) -> bool {
        self.best().is_some_and(Match::is_valid)
    }

    /// The entry a new candidate competes against: the worst entry when the
    /// set is full, otherwise the invalid match (any valid candidate may
    /// claim a vacant slot).
    pub fn replacement_target(&self) -> Match {
        if self.is_full() {
            *self.matches.last().expect("full set is non-empty")
        } else {
            Match::invalid()
        }
    }

    /// Insert a valid match, keeping ascending score order, deduplicating by
    /// region (the better score wins) and truncating to capacity.
    pub fn insert(&mut self, m: Match) {
        if !m.is_valid() {
            return;
        }
        if let Some(existing) = self.matches.iter_mut().find(|e| e.region == m.region) {
            if m.ssd_score < existing.ssd_score {
                *existing = m;
            }
        } else {
            self.matches.push(m);
        }
        self.matches.sort_by(|a, b| {
            a.ssd_score
                .partial_cmp(&b.ssd_score)
                .unwrap_or(Ordering::Equal)
        });
        self.matches.truncate(self.capacity);
    }

    /// Replace all entries with a single match (invalid clears the set).
    pub fn reset_to(&mut self, m: Match) {
        self.matches.clear();
        self.insert(m);
    }
}

/// Grid of match sets, one per image pixel.
#[derive(Clone, Debug)]
pub struct NearestNeighborField {
    w: usize,
    h: usize,
    k: usize,
    cells: Vec<MatchSet>,
}

impl NearestNeighborField {
    pub fn new(w: usize, h: usize, k: usize) -> Self {
        Self {
            w,
            h,
            k,
            cells: vec![MatchSet::new(k); w * h],
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn match_capacity(&self) -> usize {
        self.k
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.w, self.h)
    }

    #[inline]
    fn idx(&self, p: Point) -> usize {
        debug_assert!(self.extent().contains(p), "NNF access out of bounds");
        p.y as usize * self.w + p.x as usize
    }

    pub fn get(&self, p: Point) -> &MatchSet {
        &self.cells[self.idx(p)]
    }

    pub fn get_mut(&mut self, p: Point) -> &mut MatchSet {
        let i = self.idx(p);
        &mut self.cells[i]
    }

    /// Best match at `p`, if one exists.
    pub fn best(&self, p: Point) -> Option<&Match> {
        self.get(p).best()
    }

    /// Sum of valid best scores over the whole field.
    pub fn total_best_score(&self) -> f64 {
        self.cells
            .iter()
            .filter_map(|set| set.best())
            .filter(|m| m.is_valid())
            .map(|m| m.ssd_score as f64)
            .sum()
    }

    /// The 3-component visualization/persistence image: per pixel
    /// `(best_center_x, best_center_y, best_score)`, `(-1, -1, NaN)` where no
    /// valid match exists.
    pub fn centers_image(&self) -> ImageRgbF {
        let mut out = ImageRgbF::new(self.w, self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                let p = Point::new(x as i32, y as i32);
                let px = match self.best(p) {
                    Some(m) if m.is_valid() => {
                        let c = m.region.center();
                        [c.x as f32, c.y as f32, m.ssd_score]
                    }
                    _ => [-1.0, -1.0, f32::NAN],
                };
                out.set(x, y, px);
            }
        }
        out
    }

    /// Rebuild a field from a centers image: each pixel with a non-NaN score
    /// becomes the patch of `patch_radius` around the stored center.
    pub fn from_centers_image(centers: &ImageRgbF, patch_radius: u32, k: usize) -> Self {
        let mut nnf = Self::new(centers.w, centers.h, k);
        for y in 0..centers.h {
            for x in 0..centers.w {
                let [cx, cy, score] = centers.get(x, y);
                if score.is_nan() {
                    continue;
                }
                let center = Point::new(cx.round() as i32, cy.round() as i32);
                let region = Region::patch_around(center, patch_radius);
                nnf.get_mut(Point::new(x as i32, y as i32))
                    .reset_to(Match::new(region, score));
            }
        }
        nnf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_match_is_not_valid_and_compares_equal_to_itself() {
        let m = Match::invalid();
        assert!(!m.is_valid());
        assert_eq!(m, Match::invalid());
    }

    #[test]
    fn match_equality_distinguishes_regions_and_scores() {
        let region = Region::new(2, 3, 5, 5);
        let a = Match::new(region, 1.5);
        let b = Match::new(region, 1.5);
        assert_eq!(a, b);
        assert_ne!(a, Match::new(region, 2.0));
        assert_ne!(a, Match::new(Region::new(0, 0, 5, 5), 1.5));

        let mut verified = a;
        verified.verified = true;
        verified.verification_score = 0.1;
        assert_ne!(a, verified);
    }

    #[test]
    fn match_set_keeps_ascending_order_and_capacity() {
        let mut set = MatchSet::new(3);
        set.insert(Match::new(Region::new(0, 0, 3, 3), 5.0));
        set.insert(Match::new(Region::new(1, 0, 3, 3), 1.0));
        set.insert(Match::new(Region::new(2, 0, 3, 3), 3.0));
        set.insert(Match::new(Region::new(3, 0, 3, 3), 2.0));

        assert_eq!(set.len(), 3);
        let scores: Vec<f32> = set.iter().map(|m| m.ssd_score).collect();
        assert_eq!(scores, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn match_set_deduplicates_regions_keeping_the_better_score() {
        let region = Region::new(4, 4, 3, 3);
        let mut set = MatchSet::new(3);
        set.insert(Match::new(region, 2.0));
        set.insert(Match::new(region, 1.0));
        set.insert(Match::new(region, 3.0));

        assert_eq!(set.len(), 1);
        assert_eq!(set.best().unwrap().ssd_score, 1.0);
    }

    #[test]
    fn match_set_rejects_invalid_candidates() {
        let mut set = MatchSet::new(1);
        set.insert(Match::invalid());
        set.insert(Match::new(Region::empty(), 1.0));
        set.insert(Match::new(Region::new(0, 0, 3, 3), f32::NAN));
        assert!(set.is_empty());
    }

    #[test]
    fn replacement_target_is_invalid_until_full() {
        let mut set = MatchSet::new(2);
        assert!(!set.replacement_target().is_valid());
        set.insert(Match::new(Region::new(0, 0, 3, 3), 1.0));
        assert!(!set.replacement_target().is_valid());
        set.insert(Match::new(Region::new(1, 0, 3, 3), 2.0));
        assert_eq!(set.replacement_target().ssd_score, 2.0);
    }

    #[test]
    fn centers_image_round_trips_the_best_matches() {
        let mut nnf = NearestNeighborField::new(8, 8, 1);
        let p = Point::new(3, 4);
        nnf.get_mut(p)
            .reset_to(Match::new(Region::patch_around(Point::new(5, 5), 2), 0.25));

        let centers = nnf.centers_image();
        let rebuilt = NearestNeighborField::from_centers_image(&centers, 2, 1);

        assert_eq!(rebuilt.best(p), nnf.best(p));
        assert!(rebuilt.best(Point::new(0, 0)).is_none());
    }
}
