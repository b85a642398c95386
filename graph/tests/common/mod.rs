/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![allow(dead_code)]

use anyhow::Result;
use vcgraph::prelude::*;

/// Arcs of the canonical test graph (8 nodes, 11 arcs).
///
/// - Outdegree 0: node 7 (sink)
/// - Outdegree 1: nodes 2, 3, 4, 6
/// - Outdegree 2: nodes 0, 5
/// - Outdegree 3: node 1
/// - Cycle: 2 → 4 → 6 → 2
pub const ARCS: [(usize, usize); 11] = [
    (0, 1),
    (0, 2),
    (1, 3),
    (1, 4),
    (1, 5),
    (2, 4),
    (3, 6),
    (4, 6),
    (5, 6),
    (5, 7),
    (6, 2),
];

/// Original id of node `i` in the test graphs.
pub fn original(i: usize) -> u64 {
    1000 + 7 * i as u64
}

/// Builds a store with `n` nodes and the given arcs; arc `i` has weight
/// `i + 1` under the key `"weight"`.
pub fn weighted_store(
    n: usize,
    arcs: &[(usize, usize)],
    orientation: Orientation,
    page_shift: u32,
    tracker: AllocationTracker,
) -> Result<GraphStore> {
    let mut builder = GraphBuilder::new();
    builder
        .orientation(orientation)
        .relationship_properties(["weight"])
        .page_shift(page_shift)
        .tracker(tracker);
    for i in 0..n {
        builder.add_node(original(i), if i % 2 == 0 { &["Even"] } else { &["Odd"] })?;
    }
    for (i, &(s, t)) in arcs.iter().enumerate() {
        builder.add_relationship_with_property(s, t, (i + 1) as f64)?;
    }
    Ok(builder.build()?)
}

/// Builds the canonical test graph.
pub fn test_store() -> Result<GraphStore> {
    weighted_store(
        8,
        &ARCS,
        Orientation::Natural,
        vcgraph::codec::DEFAULT_PAGE_SHIFT,
        AllocationTracker::empty(),
    )
}

/// Collects the targets of a node.
pub fn successors(graph: &mut impl Graph, node: usize) -> Result<Vec<usize>> {
    let mut targets = vec![];
    graph.for_each_relationship(node, |_, t| {
        targets.push(t);
        true
    })?;
    Ok(targets)
}
