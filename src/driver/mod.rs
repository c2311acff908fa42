//! Driver orchestrating `initialize → (propagate; random-search)×N → force-fill`.
//!
//! Overview
//! - Validates the configuration and the input extents, then seeds the RNG
//!   (clock or 0) scoped to this one compute call.
//! - Seeds the field with the configured initializer, or deep-copies a
//!   caller-provided field.
//! - Alternates forward and backward propagation with random-search
//!   refinement for the configured number of iterations, collecting pass
//!   counters and stage timings.
//! - Finishes with a force-fill pass (all-eight neighbors, accept-all,
//!   invalid-only) so every reachable target pixel ends with a valid match.
//!
//! The driver alone owns the field during a run; initializers, propagators
//! and searchers borrow it for their pass. Distance, acceptance and neighbor
//! functors never hold field references.
//!
//! Typical usage:
//! ```no_run
//! use patchmatch::driver::{PatchMatchDriver, PatchMatchParams};
//! use patchmatch::image::ImageRgbF;
//! use patchmatch::mask::{Mask, PixelLabel};
//!
//! # fn example() -> Result<(), patchmatch::PatchMatchError> {
//! let mut driver = PatchMatchDriver::new(PatchMatchParams::default());
//! driver.set_image(ImageRgbF::new(32, 32));
//! driver.set_source_mask(Mask::new_filled(32, 32, PixelLabel::Valid));
//! driver.set_target_mask(Mask::new_filled(32, 32, PixelLabel::Valid));
//! let output = driver.compute(None)?;
//! println!("total score {:.3}", output.nnf.total_best_score());
//! # Ok(())
//! # }
//! ```
pub mod params;

pub use params::{
    AcceptanceKind, DistanceKind, InitStrategy, PatchMatchParams, PropagationStrategy,
};

use crate::acceptance::{AcceptAll, AcceptanceTest, CompositeHistogram, SsdBetter};
use crate::cancel::CancelToken;
use crate::diagnostics::{
    ForceFillReport, InputDescriptor, IterationReport, RunReport, TimingBreakdown,
};
use crate::distance::{PatchDistance, PcaDistance, SsdDistance};
use crate::error::PatchMatchError;
use crate::image::ImageRgbF;
use crate::init::{BoundaryInitializer, Initializer, RandomInitializer};
use crate::mask::Mask;
use crate::neighbors::{
    AllEightNeighbors, AllowedNeighbors, AllowedPropagationMask, BackwardNeighbors,
    ForwardNeighbors, NeighborFunctor,
};
use crate::nnf::NearestNeighborField;
use crate::observer::{NnfObserver, NoopObserver, PassLabel};
use crate::propagate::{InvalidOnly, Propagator, ScanOrder, TargetUnconverged};
use crate::search::RandomSearcher;
use log::{debug, info, warn};
use rand::SeedableRng;
use rand_pcg::Pcg32;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// The computed field together with the run diagnostics.
pub struct ComputeOutput {
    pub nnf: NearestNeighborField,
    pub report: RunReport,
}

/// PatchMatch driver owning the inputs of a run.
pub struct PatchMatchDriver {
    params: PatchMatchParams,
    image: Option<ImageRgbF>,
    source_mask: Option<Mask>,
    target_mask: Option<Mask>,
}

impl PatchMatchDriver {
    /// Create a driver with the supplied parameters.
    pub fn new(params: PatchMatchParams) -> Self {
        Self {
            params,
            image: None,
            source_mask: None,
            target_mask: None,
        }
    }

    pub fn params(&self) -> &PatchMatchParams {
        &self.params
    }

    pub fn set_image(&mut self, image: ImageRgbF) {
        self.image = Some(image);
    }

    pub fn set_source_mask(&mut self, mask: Mask) {
        self.source_mask = Some(mask);
    }

    pub fn set_target_mask(&mut self, mask: Mask) {
        self.target_mask = Some(mask);
    }

    /// Run the full pipeline with no observer and no cancellation.
    pub fn compute(
        &self,
        initial: Option<&NearestNeighborField>,
    ) -> Result<ComputeOutput, PatchMatchError> {
        self.compute_with(initial, &mut NoopObserver, &CancelToken::new())
    }

    /// Run the full pipeline, reporting progress to `observer` and polling
    /// `cancel` between pixels.
    pub fn compute_with(
        &self,
        initial: Option<&NearestNeighborField>,
        observer: &mut dyn NnfObserver,
        cancel: &CancelToken,
    ) -> Result<ComputeOutput, PatchMatchError> {
        let total_start = Instant::now();
        let (image, source_mask, target_mask) = self.checked_inputs(initial)?;
        let radius = self.params.patch_radius;
        let (width, height) = (image.w, image.h);

        let seed = if self.params.random {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        } else {
            0
        };
        let mut rng = Pcg32::seed_from_u64(seed);
        debug!(
            "PatchMatchDriver::compute start {}x{} r={} iters={} k={} seed={}",
            width, height, radius, self.params.iterations, self.params.k, seed
        );
        if let Some(bbox) = target_mask.hole_bounding_box() {
            debug!("PatchMatchDriver::compute target hole bbox {:?}", bbox);
        }

        let distance: Box<dyn PatchDistance + '_> = match self.params.distance {
            DistanceKind::Ssd => Box::new(SsdDistance::new(image, source_mask)),
            DistanceKind::Pca => Box::new(PcaDistance::train(
                image,
                source_mask,
                radius,
                &self.params.pca,
                &mut rng,
            )?),
        };
        let acceptance: Box<dyn AcceptanceTest + '_> = match self.params.acceptance {
            AcceptanceKind::SsdBetter => Box::new(SsdBetter),
            AcceptanceKind::Composite => {
                Box::new(CompositeHistogram::new(image, self.params.composite))
            }
            AcceptanceKind::AcceptAll => Box::new(AcceptAll),
        };

        let mut timings = TimingBreakdown::default();

        // INIT
        let init_start = Instant::now();
        let mut nnf = match initial {
            Some(provided) => provided.clone(),
            None => {
                let mut nnf =
                    NearestNeighborField::new(width, height, self.params.k as usize);
                let initializer: Box<dyn Initializer + '_> = match self.params.init_strategy {
                    InitStrategy::Random => Box::new(RandomInitializer::new(
                        source_mask,
                        target_mask,
                        distance.as_ref(),
                        radius,
                        self.params.seed_known_region,
                    )),
                    InitStrategy::Boundary => Box::new(BoundaryInitializer::new(
                        source_mask,
                        target_mask,
                        distance.as_ref(),
                        radius,
                        self.params.seed_known_region,
                    )),
                };
                initializer.initialize(&mut nnf, &mut rng)?;
                nnf
            }
        };
        timings.push("init", init_start.elapsed().as_secs_f64() * 1000.0);
        observer.on_pass_completed(PassLabel::Initialization, &nnf);

        // ITERATE
        let mut iterations = Vec::with_capacity(self.params.iterations as usize);
        for i in 0..self.params.iterations {
            let order = if i % 2 == 0 {
                ScanOrder::Forward
            } else {
                ScanOrder::Backward
            };

            let iter_start = Instant::now();
            let allowed;
            let neighbors: Box<dyn NeighborFunctor + '_> = match self.params.propagation_strategy
            {
                PropagationStrategy::Raster => match order {
                    ScanOrder::Forward => Box::new(ForwardNeighbors),
                    ScanOrder::Backward => Box::new(BackwardNeighbors),
                },
                PropagationStrategy::Inward => {
                    allowed = AllowedPropagationMask::from_field_validity(&nnf);
                    Box::new(AllowedNeighbors::new(&allowed))
                }
            };
            let predicate = TargetUnconverged::new(target_mask);
            let propagator = Propagator {
                patch_radius: radius,
                neighbors: neighbors.as_ref(),
                predicate: &predicate,
                distance: distance.as_ref(),
                acceptance: acceptance.as_ref(),
                source_mask,
                target_mask,
            };
            let prop_stats = if self.params.parallel_propagation {
                propagator.propagate_jacobi(&mut nnf, order, observer, cancel)?
            } else {
                propagator.propagate(&mut nnf, order, observer, cancel)?
            };

            let searcher = RandomSearcher {
                patch_radius: radius,
                distance: distance.as_ref(),
                acceptance: acceptance.as_ref(),
                source_mask,
                target_mask,
            };
            let search_stats = searcher.search(&mut nnf, &mut rng, observer, cancel)?;

            let total_best_score = nnf.total_best_score();
            info!(
                "PatchMatch iteration {} ({}) propagated={} searched={} total={:.4}",
                i,
                order.label(),
                prop_stats.improved,
                search_stats.improved,
                total_best_score
            );
            iterations.push(IterationReport {
                iteration: i,
                scan_order: order.label(),
                propagation_improved: prop_stats.improved,
                search_improved: search_stats.improved,
                illegal_candidates: prop_stats.illegal_candidates
                    + search_stats.illegal_candidates,
                rejected_candidates: prop_stats.rejected + search_stats.rejected,
                total_best_score,
            });
            timings.push("iteration", iter_start.elapsed().as_secs_f64() * 1000.0);
            observer.on_pass_completed(PassLabel::Iteration(i), &nnf);
        }

        // FORCE_FILL: always the sequential scan, so freshly filled pixels
        // can seed their still-invalid neighbors within the same pass.
        let fill_start = Instant::now();
        let invalid_before = count_invalid_targets(&nnf, target_mask);
        let fill_predicate = InvalidOnly::new(target_mask);
        let force_fill = Propagator {
            patch_radius: radius,
            neighbors: &AllEightNeighbors,
            predicate: &fill_predicate,
            distance: distance.as_ref(),
            acceptance: &AcceptAll,
            source_mask,
            target_mask,
        };
        force_fill.propagate(&mut nnf, ScanOrder::Forward, observer, cancel)?;
        let still_invalid = count_invalid_targets(&nnf, target_mask);
        timings.push("force_fill", fill_start.elapsed().as_secs_f64() * 1000.0);
        observer.on_pass_completed(PassLabel::ForceFill, &nnf);

        if still_invalid > 0 {
            warn!(
                "PatchMatchDriver::compute {} target pixels still lack a valid match",
                still_invalid
            );
        }

        timings.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "PatchMatchDriver::compute done in {:.3} ms, total score {:.4}",
            timings.total_ms,
            nnf.total_best_score()
        );

        let report = RunReport {
            input: InputDescriptor {
                width,
                height,
                patch_radius: radius,
                target_pixels: target_mask.count_valid(),
                source_pixels: source_mask.count_valid(),
            },
            seed,
            timings,
            iterations,
            force_fill: ForceFillReport {
                filled: invalid_before.saturating_sub(still_invalid),
                still_invalid,
            },
        };
        Ok(ComputeOutput { nnf, report })
    }

    fn checked_inputs(
        &self,
        initial: Option<&NearestNeighborField>,
    ) -> Result<(&ImageRgbF, &Mask, &Mask), PatchMatchError> {
        if self.params.patch_radius < 1 {
            return Err(PatchMatchError::InvalidPatchRadius {
                radius: self.params.patch_radius,
            });
        }
        if self.params.iterations < 1 {
            return Err(PatchMatchError::InvalidIterations {
                iterations: self.params.iterations,
            });
        }
        if self.params.k < 1 {
            return Err(PatchMatchError::InvalidMatchCapacity { k: self.params.k });
        }

        let image = self
            .image
            .as_ref()
            .ok_or(PatchMatchError::MissingInput { what: "image" })?;
        let source_mask = self.source_mask.as_ref().ok_or(PatchMatchError::MissingInput {
            what: "source mask",
        })?;
        let target_mask = self.target_mask.as_ref().ok_or(PatchMatchError::MissingInput {
            what: "target mask",
        })?;

        let min_side = 2 * self.params.patch_radius + 1;
        if image.w < min_side as usize || image.h < min_side as usize {
            return Err(PatchMatchError::ImageTooSmall {
                width: image.w,
                height: image.h,
                min_side,
            });
        }
        for (what, mask) in [("source mask", source_mask), ("target mask", target_mask)] {
            if mask.width() != image.w || mask.height() != image.h {
                return Err(PatchMatchError::ExtentMismatch {
                    what,
                    found_width: mask.width(),
                    found_height: mask.height(),
                    width: image.w,
                    height: image.h,
                });
            }
        }
        if let Some(provided) = initial {
            if provided.width() != image.w || provided.height() != image.h {
                return Err(PatchMatchError::ExtentMismatch {
                    what: "initial field",
                    found_width: provided.width(),
                    found_height: provided.height(),
                    width: image.w,
                    height: image.h,
                });
            }
        }
        Ok((image, source_mask, target_mask))
    }
}

fn count_invalid_targets(nnf: &NearestNeighborField, target_mask: &Mask) -> usize {
    target_mask
        .valid_pixels()
        .into_iter()
        .filter(|&p| !nnf.get(p).has_valid_match())
        .count()
}
