/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! A vertex-centric parallel compute engine.
//!
//! An algorithm is expressed as a set of [compute steps](ComputeStep), each
//! owning a disjoint range of nodes, a [concurrent copy](vcgraph::traits::Graph::concurrent_copy)
//! of the graph, and some private scratch state. The
//! [engine](ComputeEngine) runs all steps in parallel on a dedicated
//! [thread pool](rayon::ThreadPool), waits for all of them (this is the
//! _barrier_), and starts a new iteration until one of the following happens:
//!
//! - no step reports a change (the computation has converged);
//! - the barrier callback passed to [`run`](ComputeEngine::run) returns
//!   [`ControlFlow::Break`] (the algorithm detected convergence by itself);
//! - the stopping [predicate](preds) evaluates to true (usually because the
//!   maximum number of iterations has been reached: this is not an error,
//!   but the [outcome](ComputeOutcome) will report non-convergence);
//! - the [termination flag](TerminationFlag) has been raised (the run fails
//!   with [`Interrupted`]);
//! - a step fails (the run fails with the error of the step).
//!
//! The termination flag is checked only at the barrier, so a termination
//! request never interrupts a step in the middle of its range.
//!
//! Per-node state written by steps is usually stored in slices shared as
//! [`SyncCell`](sync_cell_slice::SyncCell) slices: since ranges are disjoint,
//! each cell is written by at most one step.

pub mod partition;
pub mod preds;

use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog};
use log::info;
use predicates::Predicate;
use rayon::prelude::*;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// The computation was interrupted by raising its [`TerminationFlag`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The computation was interrupted")]
pub struct Interrupted;

/// A shared flag requesting the termination of a computation.
///
/// Clones share the same flag. A raised flag is honored at the next barrier
/// of the engine.
#[derive(Debug, Clone, Default)]
pub struct TerminationFlag(Arc<AtomicBool>);

impl TerminationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests termination.
    pub fn terminate(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_terminated(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A unit of parallel work.
pub trait ComputeStep: Send {
    /// Processes the range of the step, returning whether some state
    /// changed.
    ///
    /// `pl` should be updated with the number of processed nodes.
    fn compute(
        &mut self,
        iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool>;

    /// Frees the scratch state of the step.
    ///
    /// Called once at the end of a run, whatever its result.
    fn release(&mut self) {}
}

/// How a run of the engine ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeOutcome {
    /// The number of completed iterations.
    pub iterations: usize,
    /// Whether the computation stopped because it converged, rather than
    /// because of the stopping predicate.
    pub did_converge: bool,
}

/// Runs [compute steps](ComputeStep) on a dedicated thread pool until
/// convergence.
#[derive(Debug)]
pub struct ComputeEngine {
    thread_pool: rayon::ThreadPool,
    termination_flag: TerminationFlag,
}

impl ComputeEngine {
    /// Creates an engine with the given number of threads.
    pub fn new(concurrency: usize) -> Self {
        Self {
            thread_pool: vcgraph::thread_pool![concurrency],
            termination_flag: TerminationFlag::default(),
        }
    }

    /// Sets the flag that will be checked at each barrier.
    pub fn termination_flag(&mut self, termination_flag: TerminationFlag) -> &mut Self {
        self.termination_flag = termination_flag;
        self
    }

    /// Returns the number of threads of the engine.
    pub fn concurrency(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Runs a closure inside the thread pool of the engine.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.thread_pool.install(op)
    }

    /// Runs `steps` until convergence, interruption, or until `predicate`
    /// evaluates to true.
    ///
    /// `predicate` is evaluated before each iteration with the number of
    /// completed iterations, so a predicate that holds from the start runs
    /// no iteration at all.
    ///
    /// After each iteration in which some step reported a change, `barrier`
    /// is called with the steps and the number of completed iterations; it
    /// can update the steps (e.g., with globally aggregated state) and stop
    /// the computation by returning [`ControlFlow::Break`], which counts as
    /// convergence.
    ///
    /// `pl` logs iterations, while clones of `cpl` are passed to the steps.
    pub fn run<S: ComputeStep>(
        &self,
        steps: &mut [S],
        predicate: impl Predicate<preds::PredParams>,
        mut barrier: impl FnMut(&mut [S], usize) -> anyhow::Result<ControlFlow<()>>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<ComputeOutcome> {
        info!(
            "Running {} compute steps on {} threads",
            steps.len(),
            self.concurrency()
        );
        info!("Stopping criterion: {predicate}");

        pl.item_name("iteration");
        pl.expected_updates(None);
        pl.start("Computing...");

        let result = self.iterate(steps, &predicate, &mut barrier, pl, cpl);
        pl.done();
        steps.iter_mut().for_each(ComputeStep::release);

        let outcome = result?;
        info!(
            "Completed {} iterations ({})",
            outcome.iterations,
            if outcome.did_converge {
                "converged"
            } else {
                "did not converge"
            }
        );
        Ok(outcome)
    }

    fn iterate<S: ComputeStep>(
        &self,
        steps: &mut [S],
        predicate: &impl Predicate<preds::PredParams>,
        barrier: &mut impl FnMut(&mut [S], usize) -> anyhow::Result<ControlFlow<()>>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<ComputeOutcome> {
        let mut iteration = 0;
        loop {
            if self.termination_flag.is_terminated() {
                info!("Terminated after {iteration} iterations");
                return Err(Interrupted.into());
            }
            if predicate.eval(&preds::PredParams { iteration }) {
                return Ok(ComputeOutcome {
                    iterations: iteration,
                    did_converge: false,
                });
            }

            cpl.item_name("node");
            cpl.start(format!("Iteration {}...", iteration + 1));
            let changed = self.thread_pool.install(|| {
                steps
                    .par_iter_mut()
                    .map_with(cpl.clone(), |cpl, step| step.compute(iteration, cpl))
                    .try_reduce(|| false, |a, b| Ok(a || b))
            });
            cpl.done();
            let changed = changed.map_err(|e| {
                e.context(format!("Compute step failed at iteration {}", iteration + 1))
            })?;

            iteration += 1;
            pl.update_and_display();

            if !changed || barrier(steps, iteration)?.is_break() {
                return Ok(ComputeOutcome {
                    iterations: iteration,
                    did_converge: true,
                });
            }
        }
    }
}
