/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::Result;
use vcgraph::prelude::*;
use vcgraph_algo::conductance::{CommunityWeights, Conductance};

/// Nodes 0, 1, 2 are in community 0, nodes 3, 4 in community 1, and node 5
/// has no community. The cycle 0 → 1 → 2 → 3 → 4 → 0 has weights 1, 1, 4,
/// 2, 2; there is an additional relationship 0 → 5.
fn communities_store(orientation: Orientation) -> Result<GraphStore> {
    let mut builder = GraphBuilder::new();
    builder.orientation(orientation).relationship_properties(["w"]);
    for (node, community) in [0, 0, 0, 1, 1].into_iter().enumerate() {
        let value = PropertyValue::Long(community);
        builder.add_node_with_properties(node as u64, [("community", value)], &[])?;
    }
    builder.add_node(5, &[])?;
    let relationships = [
        (0, 1, 1.0),
        (1, 2, 1.0),
        (2, 3, 4.0),
        (3, 4, 2.0),
        (4, 0, 2.0),
        (0, 5, 9.0),
    ];
    for (s, t, w) in relationships {
        builder.add_relationship_with_property(s, t, w)?;
    }
    Ok(builder.build()?)
}

#[test]
fn test_unweighted() -> Result<()> {
    let store = communities_store(Orientation::Natural)?;
    let graph = store.graph(None)?;
    let mut conductance = Conductance::new(&graph, "community");
    conductance.run()?;
    assert_eq!(
        conductance.weights().get(&0),
        Some(&CommunityWeights {
            internal: 2.0,
            external: 1.0
        })
    );
    let conductances = conductance.conductances();
    assert_eq!(conductances.len(), 2);
    assert!((conductances[&0] - 1.0 / 3.0).abs() < 1E-12);
    assert!((conductances[&1] - 0.5).abs() < 1E-12);
    assert!((conductance.average_conductance() - 5.0 / 12.0).abs() < 1E-12);
    Ok(())
}

#[test]
fn test_weighted() -> Result<()> {
    let store = communities_store(Orientation::Natural)?;
    let graph = store.graph(Some("w"))?;
    let mut conductance = Conductance::new(&graph, "community");
    conductance.concurrency(2);
    conductance.run()?;
    let conductances = conductance.conductances();
    assert!((conductances[&0] - 4.0 / 6.0).abs() < 1E-12);
    assert!((conductances[&1] - 0.5).abs() < 1E-12);
    Ok(())
}

#[test]
fn test_undirected() -> Result<()> {
    let store = communities_store(Orientation::Undirected)?;
    let graph = store.graph(None)?;
    let mut conductance = Conductance::new(&graph, "community");
    conductance.run()?;
    // Internal relationships are seen from both ends
    assert_eq!(
        conductance.weights()[&0],
        CommunityWeights {
            internal: 4.0,
            external: 2.0
        }
    );
    assert_eq!(
        conductance.weights()[&1],
        CommunityWeights {
            internal: 2.0,
            external: 2.0
        }
    );
    Ok(())
}

#[test]
fn test_isolated_community() -> Result<()> {
    let mut builder = GraphBuilder::new();
    for (node, community) in [7, 7, 8].into_iter().enumerate() {
        let value = PropertyValue::Long(community);
        builder.add_node_with_properties(node as u64, [("c", value)], &[])?;
    }
    builder.add_relationship(0, 1)?;
    let store = builder.build()?;
    let graph = store.graph(None)?;
    let mut conductance = Conductance::new(&graph, "c");
    conductance.run()?;
    assert_eq!(conductance.conductances().get(&7), Some(&0.0));
    assert_eq!(conductance.conductances().get(&8), None);
    assert_eq!(CommunityWeights::default().conductance(), None);
    assert_eq!(conductance.average_conductance(), 0.0);
    Ok(())
}

#[test]
fn test_invalid_property() -> Result<()> {
    let mut builder = GraphBuilder::new();
    builder.add_node_with_properties(0, [("score", PropertyValue::Double(0.5))], &[])?;
    let store = builder.build()?;
    let graph = store.graph(None)?;
    assert!(Conductance::new(&graph, "score").run().is_err());
    assert!(Conductance::new(&graph, "missing").run().is_err());
    Ok(())
}
