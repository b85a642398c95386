/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! K-means clustering of nodes by a numeric node property.
//!
//! Nodes are points in a space whose dimension is the length of the arrays
//! of a double-array property (a double property yields points of dimension
//! one). Initial centroids are the values of *k* distinct nodes sampled
//! uniformly at random. At each iteration, every node is assigned to the
//! nearest centroid in Euclidean distance (the centroid of smallest index, in
//! case of ties), and then centroids are moved to the mean of their nodes; a
//! centroid without nodes does not move.
//!
//! The computation stops when no node changes cluster, when the fraction of
//! nodes that changed cluster in an iteration is at most the
//! [delta threshold](Kmeans::delta_threshold), or after the
//! [maximum number of iterations](Kmeans::max_iterations).

use crate::compute::preds::MaxIterations;
use crate::compute::{ComputeEngine, ComputeOutcome, ComputeStep, TerminationFlag, partition};
use anyhow::{Context, bail, ensure};
use dsi_progress_logger::{ConcurrentProgressLog, ProgressLog, no_logging};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use std::ops::{ControlFlow, Range};
use sync_cell_slice::{SyncCell, SyncSlice};
use vcgraph::prelude::*;

const UNASSIGNED: usize = usize::MAX;

/// Clusters nodes with the k-means algorithm.
///
/// # Examples
///
/// ```
/// use vcgraph::prelude::*;
/// use vcgraph_algo::kmeans::Kmeans;
///
/// # fn main() -> anyhow::Result<()> {
/// let mut builder = GraphBuilder::new();
/// for (node, x) in [0.0, 0.1, 0.2, 10.0, 10.1, 10.2].into_iter().enumerate() {
///     builder.add_node_with_properties(node as u64, [("x", PropertyValue::from(x))], &[])?;
/// }
/// let graph = builder.build()?.graph(None)?;
///
/// let mut kmeans = Kmeans::new(&graph, "x");
/// kmeans.k(2).seed(42);
/// kmeans.run()?;
/// let c = kmeans.communities();
/// assert!(c[0] == c[1] && c[1] == c[2]);
/// assert!(c[3] == c[4] && c[4] == c[5]);
/// assert_ne!(c[0], c[3]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Kmeans<'a, G: Graph> {
    graph: &'a G,
    property: String,
    k: usize,
    max_iterations: usize,
    delta_threshold: f64,
    seed: u64,
    concurrency: usize,
    termination_flag: TerminationFlag,

    communities: Box<[usize]>,
    distances: Box<[f64]>,
    centroids: Vec<Box<[f64]>>,
    outcome: Option<ComputeOutcome>,
}

impl<'a, G: Graph + Send + Sync> Kmeans<'a, G> {
    pub const DEFAULT_K: usize = 10;
    pub const DEFAULT_MAX_ITERATIONS: usize = 10;
    pub const DEFAULT_DELTA_THRESHOLD: f64 = 0.05;

    /// Creates a computation clustering the nodes of `graph` by the given
    /// node property.
    pub fn new(graph: &'a G, property: impl Into<String>) -> Self {
        Self {
            graph,
            property: property.into(),
            k: Self::DEFAULT_K,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            delta_threshold: Self::DEFAULT_DELTA_THRESHOLD,
            seed: 0,
            concurrency: rayon::current_num_threads(),
            termination_flag: TerminationFlag::default(),
            communities: Box::default(),
            distances: Box::default(),
            centroids: vec![],
            outcome: None,
        }
    }

    /// Sets the number of clusters.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    pub fn k(&mut self, k: usize) -> &mut Self {
        assert!(k > 0, "The number of clusters must be positive");
        self.k = k;
        self
    }

    /// # Panics
    ///
    /// Panics if `max_iterations` is zero.
    pub fn max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        assert!(max_iterations > 0, "The maximum number of iterations must be positive");
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the fraction of nodes changing cluster below which the
    /// computation stops.
    ///
    /// # Panics
    ///
    /// Panics if `delta_threshold` is not in [0 . . 1].
    pub fn delta_threshold(&mut self, delta_threshold: f64) -> &mut Self {
        assert!(
            (0.0..=1.0).contains(&delta_threshold),
            "The delta threshold must be in [0 . . 1], got {delta_threshold}"
        );
        self.delta_threshold = delta_threshold;
        self
    }

    /// Sets the seed used to sample the initial centroids.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
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

    /// Returns the cluster of each node, indexed by internal node id.
    pub fn communities(&self) -> &[usize] {
        &self.communities
    }

    /// Returns the final centroids.
    pub fn centroids(&self) -> &[Box<[f64]>] {
        &self.centroids
    }

    /// Returns the distance of each node from the centroid of its cluster.
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Returns the average distance of nodes from their centroid.
    pub fn average_distance(&self) -> f64 {
        if self.distances.is_empty() {
            return 0.0;
        }
        self.distances.iter().sum::<f64>() / self.distances.len() as f64
    }

    /// Returns the number of nodes in each cluster.
    pub fn community_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &community in self.communities.iter() {
            sizes[community] += 1;
        }
        sizes
    }

    pub fn iterations(&self) -> usize {
        self.outcome.map_or(0, |outcome| outcome.iterations)
    }

    pub fn did_converge(&self) -> bool {
        self.outcome.is_some_and(|outcome| outcome.did_converge)
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Computes the clusters, logging iterations on `pl` and assigned nodes on
    /// clones of `cpl`.
    pub fn run_with_logging(
        &mut self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<()> {
        let n = self.graph.node_count();
        let k = self.k;
        self.outcome = None;
        ensure!(k <= n, "Cannot compute {k} clusters of {n} nodes");
        let (points, dimension) = self.points()?;
        log::info!("Clustering {n} points of dimension {dimension} in {k} clusters");

        let mut rng = SmallRng::seed_from_u64(self.seed);
        let mut centroids = vec![0.0; k * dimension];
        for (centroid, node) in rand::seq::index::sample(&mut rng, n, k).into_iter().enumerate() {
            centroids[centroid * dimension..][..dimension]
                .copy_from_slice(&points[node * dimension..][..dimension]);
        }

        let mut communities = vec![UNASSIGNED; n];
        let mut engine = ComputeEngine::new(self.concurrency);
        engine.termination_flag(self.termination_flag.clone());
        let delta_threshold = self.delta_threshold;

        let outcome = {
            let communities = communities.as_sync_slice();
            let batches = partition::batch_count(self.concurrency);
            let mut steps = partition::range_partition(n, batches, 1)
                .into_iter()
                .map(|range| KmeansStep {
                    range,
                    points: &points,
                    dimension,
                    communities,
                    centroids: centroids.clone(),
                    sums: vec![0.0; k * dimension],
                    sizes: vec![0; k],
                    swaps: 0,
                })
                .collect::<Vec<_>>();

            engine.run(
                &mut steps,
                MaxIterations::from(self.max_iterations),
                |steps, iteration| {
                    let swaps = steps.iter().map(|step| step.swaps).sum::<usize>();
                    update_centroids(&mut centroids, steps, dimension);
                    for step in steps.iter_mut() {
                        step.centroids.copy_from_slice(&centroids);
                    }
                    let fraction = swaps as f64 / n as f64;
                    log::debug!("Iteration {iteration}: {swaps} nodes changed cluster");
                    Ok(if fraction <= delta_threshold {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    })
                },
                pl,
                cpl,
            )?
        };

        self.distances = engine
            .install(|| {
                communities
                    .par_iter()
                    .enumerate()
                    .map(|(node, &community)| {
                        squared_distance(
                            &points[node * dimension..][..dimension],
                            &centroids[community * dimension..][..dimension],
                        )
                        .sqrt()
                    })
                    .collect::<Vec<_>>()
            })
            .into_boxed_slice();
        self.communities = communities.into_boxed_slice();
        self.centroids = centroids.chunks(dimension).map(Box::from).collect();
        self.outcome = Some(outcome);
        log::info!("Average distance from centroids: {}", self.average_distance());
        Ok(())
    }

    /// Returns the points as a flat array, and their dimension.
    fn points(&self) -> anyhow::Result<(Box<[f64]>, usize)> {
        let key = &self.property;
        let values = self
            .graph
            .node_properties(key)
            .with_context(|| format!("Unknown node property {key:?}"))?;
        if values.value_type() == ValueType::Long {
            bail!(
                "The node property {key:?} must be of type {} or {}, found {}",
                ValueType::Double,
                ValueType::DoubleArray,
                ValueType::Long
            );
        }

        let n = self.graph.node_count();
        let mut points = vec![];
        let mut dimension = None;
        for node in 0..n {
            let value = values.double_array_value(node).with_context(|| {
                format!(
                    "Node {} has no value for property {key:?}",
                    self.graph.to_original_node_id(node)
                )
            })?;
            let dimension = *dimension.get_or_insert(value.len());
            ensure!(
                value.len() == dimension,
                "Node {} has a value of dimension {} for property {key:?}, expected {dimension}",
                self.graph.to_original_node_id(node),
                value.len()
            );
            points.extend_from_slice(value);
        }
        Ok((points.into_boxed_slice(), dimension.unwrap_or(0)))
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Moves each centroid to the mean of the points assigned to it.
fn update_centroids(centroids: &mut [f64], steps: &[KmeansStep<'_>], dimension: usize) {
    let k = centroids.len() / dimension;
    for c in 0..k {
        let size = steps.iter().map(|step| step.sizes[c]).sum::<usize>();
        if size == 0 {
            continue;
        }
        for d in 0..dimension {
            let sum = steps
                .iter()
                .map(|step| step.sums[c * dimension + d])
                .sum::<f64>();
            centroids[c * dimension + d] = sum / size as f64;
        }
    }
}

struct KmeansStep<'a> {
    range: Range<usize>,
    points: &'a [f64],
    dimension: usize,
    communities: &'a [SyncCell<usize>],
    centroids: Vec<f64>,
    sums: Vec<f64>,
    sizes: Vec<usize>,
    swaps: usize,
}

impl ComputeStep for KmeansStep<'_> {
    fn compute(
        &mut self,
        _iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool> {
        let dimension = self.dimension;
        self.sums.fill(0.0);
        self.sizes.fill(0);
        self.swaps = 0;
        for node in self.range.clone() {
            let point = &self.points[node * dimension..][..dimension];
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in self.centroids.chunks(dimension).enumerate() {
                let distance = squared_distance(point, centroid);
                if distance < best_distance {
                    best = c;
                    best_distance = distance;
                }
            }
            // SAFETY: the node belongs to this step.
            unsafe {
                if self.communities[node].get() != best {
                    self.communities[node].set(best);
                    self.swaps += 1;
                }
            }
            self.sizes[best] += 1;
            for (sum, x) in self.sums[best * dimension..][..dimension].iter_mut().zip(point) {
                *sum += x;
            }
        }
        pl.update_with_count(self.range.len());
        Ok(self.swaps > 0)
    }

    fn release(&mut self) {
        self.centroids = vec![];
        self.sums = vec![];
        self.sizes = vec![];
    }
}
