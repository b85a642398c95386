/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![allow(dead_code)]

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use vcgraph::prelude::*;

/// Builds a store with nodes 0 . . `n` (original ids equal to internal ids)
/// and the given relationships.
pub fn store(n: usize, arcs: &[(usize, usize)], orientation: Orientation) -> Result<GraphStore> {
    let mut builder = GraphBuilder::new();
    builder.orientation(orientation);
    for node in 0..n {
        builder.add_node(node as u64, &[])?;
    }
    for &(s, t) in arcs {
        builder.add_relationship(s, t)?;
    }
    Ok(builder.build()?)
}

/// Builds a store with `n` nodes and `m` random relationships.
pub fn random_store(n: usize, m: usize, seed: u64, orientation: Orientation) -> Result<GraphStore> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let arcs = (0..m)
        .map(|_| (rng.random_range(0..n), rng.random_range(0..n)))
        .collect::<Vec<_>>();
    store(n, &arcs, orientation)
}

/// Returns the edges of a clique on the given nodes, each listed once.
pub fn clique(nodes: std::ops::Range<usize>) -> Vec<(usize, usize)> {
    let mut arcs = vec![];
    for s in nodes.clone() {
        for t in s + 1..nodes.end {
            arcs.push((s, t));
        }
    }
    arcs
}
