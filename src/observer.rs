//! Observation hooks into a running compute.
//!
//! Observers receive read-only callbacks and must not mutate the field; the
//! default implementation of every hook is a no-op.
use crate::geometry::Point;
use crate::image::io::write_nnf_image;
use crate::nnf::{Match, NearestNeighborField};
use log::warn;
use std::path::PathBuf;

/// Identifies the pass an `on_pass_completed` callback refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassLabel {
    Initialization,
    Iteration(u32),
    ForceFill,
}

/// Read-only hooks invoked by the driver, the propagator and the searcher.
pub trait NnfObserver {
    fn on_pixel_visited(&mut self, _pixel: Point) {}
    fn on_match_accepted(&mut self, _pixel: Point, _accepted: &Match) {}
    fn on_pass_completed(&mut self, _pass: PassLabel, _nnf: &NearestNeighborField) {}
}

/// Observer that ignores every callback.
pub struct NoopObserver;

impl NnfObserver for NoopObserver {}

/// Writes an intermediate centers image after every completed pass.
///
/// Write failures are logged and do not interrupt the run.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl NnfObserver for SnapshotWriter {
    fn on_pass_completed(&mut self, pass: PassLabel, nnf: &NearestNeighborField) {
        let name = match pass {
            PassLabel::Initialization => "nnf_init.exr".to_string(),
            PassLabel::Iteration(i) => format!("nnf_iter_{i:02}.exr"),
            PassLabel::ForceFill => "nnf_final.exr".to_string(),
        };
        let path = self.dir.join(name);
        if let Err(err) = write_nnf_image(nnf, &path) {
            warn!("SnapshotWriter: {err}");
        }
    }
}
