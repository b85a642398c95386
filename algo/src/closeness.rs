/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Closeness centrality.
//!
//! For each node *v*, let the _farness_ of *v* be the sum of the distances
//! *d*(*u*, *v*) over all nodes *u* ≠ *v* that can reach *v*, and let the
//! _component size_ of *v* be the number of such nodes. The closeness
//! centrality of *v* is then its component size divided by its farness, or
//! zero if no node reaches *v*.
//!
//! With the [Wasserman–Faust](ClosenessCentrality::wasserman_faust)
//! normalization, the centrality is further multiplied by the fraction of
//! the other nodes in the component, that is, component size / (*n* − 1).
//!
//! Sources are split in batches, each processed by a
//! [compute step](crate::compute::ComputeStep). A step visits the graph from
//! [`SOURCES_PER_VISIT`] sources at a time with a multi-source breadth-first
//! visit: each node keeps a bit mask of the sources that have seen it and
//! one of the sources reaching it at the current depth, so a single pass
//! over the relationships of a frontier advances all the visits. The
//! contributions of the sources are added atomically to the counters of the
//! nodes they reach.

use crate::compute::{ComputeEngine, ComputeStep, TerminationFlag, partition};
use crate::compute::preds::MaxIterations;
use anyhow::Context;
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use std::ops::{ControlFlow, Range};
use std::sync::atomic::{AtomicU64, Ordering};
use vcgraph::codec::DecodeError;
use vcgraph::traits::Graph;

/// The number of sources sharing a breadth-first visit.
pub const SOURCES_PER_VISIT: usize = u64::BITS as usize;

/// Computes closeness centrality using multi-source breadth-first visits.
///
/// # Examples
///
/// ```
/// use vcgraph::prelude::*;
/// use vcgraph_algo::closeness::ClosenessCentrality;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = GraphBuilder::new();
/// for node in 0..3 {
///     builder.add_node(node, &[])?;
/// }
/// // A path 0 → 1 → 2
/// builder.add_relationship(0, 1)?;
/// builder.add_relationship(1, 2)?;
/// let graph = builder.build()?.graph(None)?;
///
/// let mut closeness = ClosenessCentrality::new(&graph);
/// closeness.run()?;
/// // Node 2 is reached by 1 at distance 1 and by 0 at distance 2
/// assert_eq!(closeness.farness()[2], 3);
/// assert_eq!(closeness.centrality()[0], 0.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ClosenessCentrality<'a, G: Graph> {
    graph: &'a G,
    wasserman_faust: bool,
    concurrency: usize,
    termination_flag: TerminationFlag,

    farness: Box<[u64]>,
    component: Box<[u64]>,
    centrality: Box<[f64]>,
}

impl<'a, G: Graph + Send + Sync> ClosenessCentrality<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            wasserman_faust: false,
            concurrency: rayon::current_num_threads(),
            termination_flag: TerminationFlag::default(),
            farness: Box::default(),
            component: Box::default(),
            centrality: Box::default(),
        }
    }

    /// Sets whether to apply the Wasserman–Faust normalization, which
    /// penalizes nodes reached by few other nodes.
    pub fn wasserman_faust(&mut self, wasserman_faust: bool) -> &mut Self {
        self.wasserman_faust = wasserman_faust;
        self
    }

    /// Sets the number of threads.
    ///
    /// # Panics
    ///
    /// Panics if `concurrency` is zero.
    pub fn concurrency(&mut self, concurrency: usize) -> &mut Self {
        assert!(concurrency > 0, "The concurrency must be positive");
        self.concurrency = concurrency;
        self
    }

    pub fn termination_flag(&mut self, termination_flag: TerminationFlag) -> &mut Self {
        self.termination_flag = termination_flag;
        self
    }

    /// Returns the centrality of each node, indexed by internal node id.
    pub fn centrality(&self) -> &[f64] {
        &self.centrality
    }

    /// Returns the farness of each node.
    pub fn farness(&self) -> &[u64] {
        &self.farness
    }

    /// Returns the number of nodes reaching each node.
    pub fn component(&self) -> &[u64] {
        &self.component
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Computes the centralities, logging on `pl` the (single) iteration and
    /// on clones of `cpl` the visited sources.
    pub fn run_with_logging(
        &mut self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<()> {
        let n = self.graph.node_count();
        let farness = (0..n).map(|_| AtomicU64::new(0)).collect::<Box<[_]>>();
        let component = (0..n).map(|_| AtomicU64::new(0)).collect::<Box<[_]>>();

        let mut engine = ComputeEngine::new(self.concurrency);
        engine.termination_flag(self.termination_flag.clone());
        let batches = partition::batch_count(self.concurrency);
        let mut steps = partition::range_partition(n, batches, SOURCES_PER_VISIT)
            .into_iter()
            .map(|sources| ClosenessStep {
                graph: self.graph.concurrent_copy(),
                sources,
                farness: &farness,
                component: &component,
                visits: MultiSourceVisits::default(),
            })
            .collect::<Vec<_>>();
        engine.run(
            &mut steps,
            MaxIterations::from(1),
            |_, _| Ok(ControlFlow::Break(())),
            pl,
            cpl,
        )?;
        drop(steps);

        self.farness = farness.into_iter().map(AtomicU64::into_inner).collect();
        self.component = component.into_iter().map(AtomicU64::into_inner).collect();
        let others = n.saturating_sub(1) as f64;
        self.centrality = self
            .farness
            .iter()
            .zip(&self.component)
            .map(|(&farness, &component)| {
                if farness == 0 {
                    return 0.0;
                }
                let centrality = component as f64 / farness as f64;
                if self.wasserman_faust {
                    centrality * (component as f64 / others)
                } else {
                    centrality
                }
            })
            .collect();
        Ok(())
    }
}

struct ClosenessStep<'a, G> {
    graph: G,
    sources: Range<usize>,
    farness: &'a [AtomicU64],
    component: &'a [AtomicU64],
    visits: MultiSourceVisits,
}

/// The state of up to [`SOURCES_PER_VISIT`] simultaneous breadth-first
/// visits.
///
/// Bit *i* of a mask refers to the *i*-th source of the current group. All
/// masks are zero between groups, except for `seen`, which is reset only on
/// the nodes listed in `reached`.
#[derive(Debug, Default)]
struct MultiSourceVisits {
    /// Sources that have reached each node.
    seen: Vec<u64>,
    /// Sources reaching each frontier node at the current depth.
    visit: Vec<u64>,
    /// Sources reaching each node at the next depth, possibly again.
    next: Vec<u64>,
    frontier: Vec<usize>,
    candidates: Vec<usize>,
    reached: Vec<usize>,
}

impl MultiSourceVisits {
    fn resize(&mut self, n: usize) {
        self.seen.resize(n, 0);
        self.visit.resize(n, 0);
        self.next.resize(n, 0);
    }

    /// Visits `graph` from `sources`, calling `on_reached` with each node,
    /// its distance from some sources, and the number of such sources.
    fn run(
        &mut self,
        graph: &mut impl Graph,
        sources: Range<usize>,
        mut on_reached: impl FnMut(usize, u64, u64),
    ) -> Result<(), DecodeError> {
        debug_assert!(sources.len() <= SOURCES_PER_VISIT);
        for &node in &self.reached {
            self.seen[node] = 0;
        }
        self.reached.clear();
        for (bit, source) in sources.enumerate() {
            self.seen[source] = 1 << bit;
            self.visit[source] = 1 << bit;
            self.frontier.push(source);
            self.reached.push(source);
        }

        let mut depth = 0;
        while !self.frontier.is_empty() {
            depth += 1;
            let (visit, next, candidates) = (&mut self.visit, &mut self.next, &mut self.candidates);
            for &node in &self.frontier {
                let bits = core::mem::take(&mut visit[node]);
                graph.for_each_relationship(node, |_, target| {
                    if next[target] == 0 {
                        candidates.push(target);
                    }
                    next[target] |= bits;
                    true
                })?;
            }

            self.frontier.clear();
            for &node in &self.candidates {
                let new = core::mem::take(&mut self.next[node]) & !self.seen[node];
                if new == 0 {
                    continue;
                }
                if self.seen[node] == 0 {
                    self.reached.push(node);
                }
                self.seen[node] |= new;
                self.visit[node] = new;
                self.frontier.push(node);
                on_reached(node, depth, new.count_ones() as u64);
            }
            self.candidates.clear();
        }
        Ok(())
    }

    fn release(&mut self) {
        *self = Self::default();
    }
}

impl<G: Graph + Send> ComputeStep for ClosenessStep<'_, G> {
    fn compute(
        &mut self,
        _iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool> {
        self.visits.resize(self.graph.node_count());
        let (farness, component) = (self.farness, self.component);
        for start in self.sources.clone().step_by(SOURCES_PER_VISIT) {
            let group = start..self.sources.end.min(start + SOURCES_PER_VISIT);
            let len = group.len();
            self.visits
                .run(&mut self.graph, group, |node, depth, count| {
                    farness[node].fetch_add(count * depth, Ordering::Relaxed);
                    component[node].fetch_add(count, Ordering::Relaxed);
                })
                .with_context(|| format!("Could not visit the graph from sources {start}.."))?;
            pl.update_with_count(len);
        }
        Ok(false)
    }

    fn release(&mut self) {
        self.visits.release();
    }
}
