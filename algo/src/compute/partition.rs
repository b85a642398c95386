/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Partitioning of the node id space into contiguous batches.
//!
//! Both functions return disjoint, consecutive, nonempty ranges covering
//! [0 . . *n*). The number of batches should depend on the concurrency, not
//! on the number of nodes: [`batch_count`] suggests a few batches per thread,
//! so that threads finishing early can steal work.

use core::ops::Range;
use vcgraph::traits::Graph;

/// The number of batches suggested for each thread.
pub const BATCHES_PER_THREAD: usize = 4;

/// Returns the suggested number of batches for the given number of threads.
pub fn batch_count(concurrency: usize) -> usize {
    concurrency.max(1) * BATCHES_PER_THREAD
}

/// Splits [0 . . `node_count`) in at most `batches` ranges of approximately
/// the same number of nodes.
///
/// No range is shorter than `min_batch_size` nodes, except possibly the last
/// one.
pub fn range_partition(
    node_count: usize,
    batches: usize,
    min_batch_size: usize,
) -> Vec<Range<usize>> {
    if node_count == 0 {
        return vec![];
    }
    let batches = batches.clamp(1, node_count);
    let batch_size = node_count.div_ceil(batches).max(min_batch_size).max(1);
    (0..node_count)
        .step_by(batch_size)
        .map(|start| start..node_count.min(start + batch_size))
        .collect()
}

/// Splits the nodes of `graph` in about `batches` ranges with approximately
/// the same number of relationships.
///
/// Each node counts as one relationship more than its degree, so that
/// batches of isolated nodes are bounded, too.
pub fn degree_partition(graph: &impl Graph, batches: usize) -> Vec<Range<usize>> {
    let n = graph.node_count();
    if n == 0 {
        return vec![];
    }
    let batches = batches.clamp(1, n);
    let total = graph.relationship_count() + n;
    let target = total.div_ceil(batches);

    let mut ranges = Vec::with_capacity(batches);
    let mut start = 0;
    let mut weight = 0;
    for node in 0..n {
        weight += graph.degree(node) + 1;
        if weight >= target {
            ranges.push(start..node + 1);
            start = node + 1;
            weight = 0;
        }
    }
    if start < n {
        ranges.push(start..n);
    }
    log::debug!(
        "Partitioned {n} nodes in {} batches of about {target} relationships",
        ranges.len()
    );
    ranges
}
