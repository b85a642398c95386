/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Conductance of a division of nodes into communities.
//!
//! The conductance of a community is the total weight of the relationships
//! leaving the community divided by the total weight of the relationships
//! starting in the community. Relationship weights are the property values of
//! the view (1 if the view has no relationship property). Nodes without a
//! community, and relationships towards them, are ignored.

use crate::compute::preds::MaxIterations;
use crate::compute::{ComputeEngine, ComputeStep, TerminationFlag, partition};
use anyhow::{Context, ensure};
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use std::collections::BTreeMap;
use std::ops::{ControlFlow, Range};
use vcgraph::prelude::*;

/// Internal and external relationship weight of a community.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommunityWeights {
    pub internal: f64,
    pub external: f64,
}

impl CommunityWeights {
    /// Returns the conductance, or `None` if no relationship starts in the
    /// community.
    pub fn conductance(&self) -> Option<f64> {
        let total = self.internal + self.external;
        (total > 0.0).then(|| self.external / total)
    }
}

/// Computes the conductance of the communities given by a long node property.
///
/// # Examples
///
/// ```
/// use vcgraph::prelude::*;
/// use vcgraph_algo::conductance::Conductance;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = GraphBuilder::new();
/// for (node, community) in [0, 0, 1].into_iter().enumerate() {
///     builder.add_node_with_properties(
///         node as u64,
///         [("community", PropertyValue::from(community as i64))],
///         &[],
///     )?;
/// }
/// builder.add_relationship(0, 1)?;
/// builder.add_relationship(1, 2)?;
/// let graph = builder.build()?.graph(None)?;
///
/// let mut conductance = Conductance::new(&graph, "community");
/// conductance.run()?;
/// assert_eq!(conductance.conductances().get(&0), Some(&0.5));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Conductance<'a, G: Graph> {
    graph: &'a G,
    community_property: String,
    concurrency: usize,
    termination_flag: TerminationFlag,

    weights: BTreeMap<i64, CommunityWeights>,
    conductances: BTreeMap<i64, f64>,
}

impl<'a, G: Graph + Send + Sync> Conductance<'a, G> {
    pub fn new(graph: &'a G, community_property: impl Into<String>) -> Self {
        Self {
            graph,
            community_property: community_property.into(),
            concurrency: rayon::current_num_threads(),
            termination_flag: TerminationFlag::default(),
            weights: BTreeMap::new(),
            conductances: BTreeMap::new(),
        }
    }

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

    /// Returns the internal and external weight of each community.
    pub fn weights(&self) -> &BTreeMap<i64, CommunityWeights> {
        &self.weights
    }

    /// Returns the conductance of each community from which some
    /// relationship starts.
    pub fn conductances(&self) -> &BTreeMap<i64, f64> {
        &self.conductances
    }

    /// Returns the average conductance over [communities with a
    /// conductance](Self::conductances), or zero if there are none.
    pub fn average_conductance(&self) -> f64 {
        if self.conductances.is_empty() {
            return 0.0;
        }
        self.conductances.values().sum::<f64>() / self.conductances.len() as f64
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    pub fn run_with_logging(
        &mut self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<()> {
        let key = &self.community_property;
        let communities = self
            .graph
            .node_properties(key)
            .with_context(|| format!("Unknown community property {key:?}"))?;
        ensure!(
            communities.value_type() == ValueType::Long,
            "The community property {key:?} must be of type {}, found {}",
            ValueType::Long,
            communities.value_type()
        );

        let mut engine = ComputeEngine::new(self.concurrency);
        engine.termination_flag(self.termination_flag.clone());
        let batches = partition::batch_count(self.concurrency);
        let mut steps = partition::degree_partition(self.graph, batches)
            .into_iter()
            .map(|range| ConductanceStep {
                graph: self.graph.concurrent_copy(),
                range,
                communities,
                weights: BTreeMap::new(),
            })
            .collect::<Vec<_>>();
        engine.run(
            &mut steps,
            MaxIterations::from(1),
            |_, _| Ok(ControlFlow::Break(())),
            pl,
            cpl,
        )?;
        let mut weights = BTreeMap::<i64, CommunityWeights>::new();
        for step in &steps {
            for (&community, w) in &step.weights {
                let total = weights.entry(community).or_default();
                total.internal += w.internal;
                total.external += w.external;
            }
        }

        self.conductances = weights
            .iter()
            .filter_map(|(&community, w)| w.conductance().map(|c| (community, c)))
            .collect();
        self.weights = weights;
        log::info!(
            "Average conductance of {} communities: {}",
            self.conductances.len(),
            self.average_conductance()
        );
        Ok(())
    }
}

struct ConductanceStep<'a, G> {
    graph: G,
    range: Range<usize>,
    communities: &'a NodeProperties,
    weights: BTreeMap<i64, CommunityWeights>,
}

impl<G: Graph + Send> ComputeStep for ConductanceStep<'_, G> {
    fn compute(
        &mut self,
        _iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool> {
        let communities = self.communities;
        for node in self.range.clone() {
            let Some(community) = communities.long_value(node) else {
                continue;
            };
            let weights = self.weights.entry(community).or_default();
            self.graph
                .for_each_relationship_with_property(node, 1.0, |_, target, weight| {
                    match communities.long_value(target) {
                        Some(c) if c == community => weights.internal += weight,
                        Some(_) => weights.external += weight,
                        None => {}
                    }
                    true
                })
                .with_context(|| format!("Could not enumerate the relationships of node {node}"))?;
        }
        pl.update_with_count(self.range.len());
        Ok(false)
    }
}
