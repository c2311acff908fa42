//! Serializable run diagnostics.
//!
//! A [`RunReport`] describes one `compute` call end to end: the input shape,
//! a per-stage timing breakdown, per-iteration pass counters and the force-
//! fill outcome. Transient per-pixel skips surface here as counters; a
//! non-zero `still_invalid` after force-fill points at a pathological input
//! and is reported, not raised.
use serde::Serialize;

/// Shape of the inputs a run worked on.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub patch_radius: u32,
    pub target_pixels: usize,
    pub source_pixels: usize,
}

/// One labelled stage duration.
#[derive(Clone, Debug, Serialize)]
pub struct StageTiming {
    pub label: &'static str,
    pub elapsed_ms: f64,
}

/// Total wall time plus per-stage durations, in execution order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct TimingBreakdown {
    pub total_ms: f64,
    pub stages: Vec<StageTiming>,
}

impl TimingBreakdown {
    pub fn push(&mut self, label: &'static str, elapsed_ms: f64) {
        self.stages.push(StageTiming { label, elapsed_ms });
    }
}

/// Counters of one propagate + random-search iteration.
#[derive(Clone, Debug, Serialize)]
pub struct IterationReport {
    pub iteration: u32,
    /// "forward" or "backward".
    pub scan_order: &'static str,
    pub propagation_improved: usize,
    pub search_improved: usize,
    /// Candidates discarded for leaving the image or overlapping the hole.
    pub illegal_candidates: usize,
    /// Candidates that lost against their incumbent.
    pub rejected_candidates: usize,
    /// Sum of valid best scores after the iteration; monotone non-increasing
    /// under the SSD-better acceptance test.
    pub total_best_score: f64,
}

/// Outcome of the final force-fill pass.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ForceFillReport {
    /// Pixels that received their first valid match during force-fill.
    pub filled: usize,
    /// Target pixels still without a valid match after the pass.
    pub still_invalid: usize,
}

/// Everything a `compute` call reports besides the field itself.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub input: InputDescriptor,
    /// The RNG seed actually used (0 unless clock seeding was requested).
    pub seed: u64,
    pub timings: TimingBreakdown,
    pub iterations: Vec<IterationReport>,
    pub force_fill: ForceFillReport,
}
