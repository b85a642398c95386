/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Label propagation.
//!
//! Every node starts with a label (its seed, if a seed property is
//! configured, or a fresh label otherwise). At each iteration, every node
//! adopts the label with the largest total vote among its neighbors, where
//! the vote of a relationship is its property value (1 if the view has no
//! relationship property) multiplied by the weight of the neighbor (1 if no
//! node weight property is configured). Ties are broken in favor of the
//! smallest label; a node does not vote for itself, unless it has a
//! self-loop. Nodes without neighbors keep their label.
//!
//! # Determinism
//!
//! Labels are kept in two buffers. During an iteration, the
//! [compute step](crate::compute::ComputeStep) owning a batch of nodes reads
//! the labels of its own batch from the buffer it is writing, and the labels
//! of the other batches from the buffer of the previous iteration. Given
//! the same partition, the result and the number of iterations are thus
//! independent of thread scheduling.

mod votes;

use crate::compute::preds::PredParams;
use crate::compute::{ComputeEngine, ComputeOutcome, ComputeStep, TerminationFlag, partition};
use anyhow::{Context, ensure};
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use predicates::Predicate;
use std::collections::HashSet;
use std::ops::{ControlFlow, Range};
use sync_cell_slice::{SyncCell, SyncSlice};
use vcgraph::prelude::*;
use votes::VoteTally;

/// Computes communities by label propagation.
///
/// # Examples
///
/// ```
/// use vcgraph::prelude::*;
/// use vcgraph_algo::compute::preds::MaxIterations;
/// use vcgraph_algo::label_propagation::LabelPropagation;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = GraphBuilder::new();
/// builder.orientation(Orientation::Undirected);
/// for node in 0..6 {
///     builder.add_node(node, &[])?;
/// }
/// // Two triangles connected by a single edge
/// for (s, t) in [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)] {
///     builder.add_relationship(s, t)?;
/// }
/// let graph = builder.build()?.graph(None)?;
///
/// let mut lp = LabelPropagation::new(&graph);
/// lp.concurrency(1);
/// lp.run(MaxIterations::from(10))?;
/// assert_eq!(lp.labels().len(), 6);
/// assert!(lp.did_converge());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LabelPropagation<'a, G: Graph> {
    graph: &'a G,
    seed_property: Option<String>,
    node_weight_property: Option<String>,
    concurrency: usize,
    termination_flag: TerminationFlag,

    labels: Box<[u64]>,
    outcome: Option<ComputeOutcome>,
}

impl<'a, G: Graph + Send + Sync> LabelPropagation<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            seed_property: None,
            node_weight_property: None,
            concurrency: rayon::current_num_threads(),
            termination_flag: TerminationFlag::default(),
            labels: Box::default(),
            outcome: None,
        }
    }

    /// Sets the long node property providing initial labels.
    ///
    /// Nodes without a value get a fresh label larger than all seeds.
    pub fn seed_property(&mut self, key: Option<&str>) -> &mut Self {
        self.seed_property = key.map(str::to_owned);
        self
    }

    /// Sets the node property used to weight the votes of a node.
    pub fn node_weight_property(&mut self, key: Option<&str>) -> &mut Self {
        self.node_weight_property = key.map(str::to_owned);
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

    /// Sets the flag used to interrupt the computation.
    pub fn termination_flag(&mut self, termination_flag: TerminationFlag) -> &mut Self {
        self.termination_flag = termination_flag;
        self
    }

    /// Returns the labels computed by the last run, indexed by internal node
    /// id.
    pub fn labels(&self) -> &[u64] {
        &self.labels
    }

    /// Returns the label of a node given its original id.
    pub fn label_of_original(&self, original: u64) -> Option<u64> {
        self.graph
            .to_mapped_node_id(original)
            .and_then(|node| self.labels.get(node).copied())
    }

    /// Returns the number of distinct labels.
    pub fn community_count(&self) -> usize {
        self.labels.iter().collect::<HashSet<_>>().len()
    }

    /// Returns the number of iterations of the last run.
    pub fn iterations(&self) -> usize {
        self.outcome.map_or(0, |outcome| outcome.iterations)
    }

    /// Returns whether the last run converged before the stopping predicate
    /// was satisfied.
    pub fn did_converge(&self) -> bool {
        self.outcome.is_some_and(|outcome| outcome.did_converge)
    }

    /// Runs label propagation until convergence or until the given predicate
    /// is satisfied.
    pub fn run(&mut self, predicate: impl Predicate<PredParams>) -> anyhow::Result<()> {
        self.run_with_logging(predicate, no_logging![], no_logging![])
    }

    /// Runs label propagation, logging iterations on `pl` and processed nodes
    /// on clones of `cpl`.
    pub fn run_with_logging(
        &mut self,
        predicate: impl Predicate<PredParams>,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<()> {
        let n = self.graph.node_count();
        self.outcome = None;
        let node_weights = match &self.node_weight_property {
            Some(key) => Some(
                self.graph
                    .node_properties(key)
                    .with_context(|| format!("Unknown node weight property {key:?}"))?,
            ),
            None => None,
        };

        let mut current = self.initial_labels()?;
        let mut next = current.clone();

        let mut engine = ComputeEngine::new(self.concurrency);
        engine.termination_flag(self.termination_flag.clone());
        // One batch per thread, so that most reads see labels of the
        // current iteration
        let ranges = partition::degree_partition(self.graph, self.concurrency);
        log::info!("Propagating labels of {n} nodes in {} batches", ranges.len());

        let outcome = {
            let buffers = [current.as_sync_slice(), next.as_sync_slice()];
            let mut steps = ranges
                .into_iter()
                .map(|range| LabelPropagationStep {
                    graph: self.graph.concurrent_copy(),
                    range,
                    buffers,
                    node_weights,
                    tally: VoteTally::default(),
                })
                .collect::<Vec<_>>();
            engine.run(
                &mut steps,
                predicate,
                |_, _| Ok(ControlFlow::Continue(())),
                pl,
                cpl,
            )?
        };

        // The iteration of index i writes the buffer of index (i + 1) % 2
        self.labels = if outcome.iterations % 2 == 0 {
            current
        } else {
            next
        }
        .into_boxed_slice();
        self.outcome = Some(outcome);
        log::info!("Found {} communities", self.community_count());
        Ok(())
    }

    fn initial_labels(&self) -> anyhow::Result<Vec<u64>> {
        let n = self.graph.node_count();
        let Some(key) = &self.seed_property else {
            return Ok((0..n as u64).collect());
        };
        let seeds = self
            .graph
            .node_properties(key)
            .with_context(|| format!("Unknown seed property {key:?}"))?;
        ensure!(
            seeds.value_type() == ValueType::Long,
            "The seed property {key:?} must be of type {}, found {}",
            ValueType::Long,
            seeds.value_type()
        );

        let mut max_seed = None::<u64>;
        for node in 0..n {
            if let Some(seed) = seeds.long_value(node) {
                ensure!(seed >= 0, "Negative seed {seed} for node {node}");
                max_seed = max_seed.max(Some(seed as u64));
            }
        }
        let first_fresh = max_seed.map_or(0, |max| max + 1);
        Ok((0..n)
            .map(|node| match seeds.long_value(node) {
                Some(seed) => seed as u64,
                None => first_fresh + node as u64,
            })
            .collect())
    }
}

struct LabelPropagationStep<'a, G> {
    graph: G,
    range: Range<usize>,
    buffers: [&'a [SyncCell<u64>]; 2],
    node_weights: Option<&'a NodeProperties>,
    tally: VoteTally,
}

impl<G: Graph + Send> ComputeStep for LabelPropagationStep<'_, G> {
    fn compute(
        &mut self,
        iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool> {
        let current = self.buffers[iteration % 2];
        let next = self.buffers[(iteration + 1) % 2];
        for node in self.range.clone() {
            // SAFETY: the range is owned by this step.
            unsafe { next[node].set(current[node].get()) };
        }

        let mut changed = false;
        for node in self.range.clone() {
            self.tally.clear();
            let range = &self.range;
            let tally = &mut self.tally;
            let node_weights = self.node_weights;
            self.graph
                .for_each_relationship_with_property(node, 1.0, |_, target, weight| {
                    // SAFETY: labels of other batches are read from the
                    // buffer of the previous iteration, which nobody writes.
                    let label = unsafe {
                        if range.contains(&target) {
                            next[target].get()
                        } else {
                            current[target].get()
                        }
                    };
                    let node_weight = node_weights
                        .and_then(|w| w.double_value(target))
                        .unwrap_or(1.0);
                    tally.vote(label, weight * node_weight);
                    true
                })
                .with_context(|| format!("Could not enumerate the relationships of node {node}"))?;

            // SAFETY: the node belongs to this step.
            unsafe {
                let label = next[node].get();
                let winner = self.tally.winner(label);
                if winner != label {
                    next[node].set(winner);
                    changed = true;
                }
            }
        }
        pl.update_with_count(self.range.len());
        Ok(changed)
    }

    fn release(&mut self) {
        self.tally.release();
    }
}
