/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use anyhow::Result;
use common::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use vcgraph::prelude::*;

/// Weight of the relationship from `s` to `t` in the random graph.
fn weight(s: usize, t: usize) -> f64 {
    (s * 1_000_003 + t) as f64
}

#[test]
fn test_concurrent_copies_are_isolated() -> Result<()> {
    let n = 2000;
    let mut rng = SmallRng::seed_from_u64(0);
    let mut builder = GraphBuilder::new();
    builder
        .relationship_properties(["weight"])
        .aggregation(Aggregation::Single)
        .page_shift(10);
    for i in 0..n {
        builder.add_node(i as u64, &[])?;
    }
    for _ in 0..20 * n {
        let (s, t) = (rng.random_range(0..n), rng.random_range(0..n));
        builder.add_relationship_with_property(s, t, weight(s, t))?;
    }
    let store = builder.build()?;
    let graph = store.graph(Some("weight"))?;

    std::thread::scope(|scope| {
        let handles = (0..4)
            .map(|thread| {
                let mut copy = graph.concurrent_copy();
                scope.spawn(move || -> Result<usize> {
                    let mut checked = 0;
                    // Each thread visits nodes in a different order
                    let step = [1, 3, 7, 9][thread];
                    for i in 0..n {
                        let node = (i * step + thread * 97) % n;
                        let mut last = None;
                        let mut count = 0;
                        copy.for_each_relationship_with_property(node, f64::NAN, |s, t, w| {
                            assert_eq!(s, node);
                            assert_eq!(w, weight(s, t));
                            assert!(last < Some(t));
                            last = Some(t);
                            count += 1;
                            true
                        })?;
                        assert_eq!(count, copy.degree(node));
                        checked += count;
                    }
                    Ok(checked)
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            let checked = handle.join().expect("thread panicked")?;
            assert_eq!(checked, graph.relationship_count());
        }
        Ok(())
    })
}
