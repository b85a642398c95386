/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

mod common;

use anyhow::Result;
use common::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use vcgraph::codec::{AdjacencyListBuilder, PropertyListBuilder};
use vcgraph::prelude::*;

#[test]
fn test_successors() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(None)?;
    assert_eq!(graph.node_count(), 8);
    assert_eq!(graph.relationship_count(), ARCS.len());
    assert!(!graph.is_undirected());
    assert!(!graph.has_relationship_property());
    for node in 0..8 {
        let expected = ARCS
            .iter()
            .filter(|&&(s, _)| s == node)
            .map(|&(_, t)| t)
            .collect::<Vec<_>>();
        assert_eq!(successors(&mut graph, node)?, expected);
    }
    Ok(())
}

#[test]
fn test_degree_consistency() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(Some("weight"))?;
    for node in 0..graph.node_count() {
        let mut count = 0;
        graph.for_each_relationship(node, |_, _| {
            count += 1;
            true
        })?;
        assert_eq!(graph.degree(node), count);
        let mut count = 0;
        graph.for_each_relationship_with_property(node, 0.0, |_, _, _| {
            count += 1;
            true
        })?;
        assert_eq!(graph.degree(node), count);
    }
    Ok(())
}

#[test]
fn test_empty_list_sentinel() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(Some("weight"))?;
    let sink = 7;
    assert_eq!(graph.degree(sink), 0);
    assert_eq!(graph.relationships().topology.offsets().offset(sink), 0);
    let mut calls = 0;
    graph.for_each_relationship(sink, |_, _| {
        calls += 1;
        true
    })?;
    graph.for_each_relationship_with_property(sink, 0.0, |_, _, _| {
        calls += 1;
        true
    })?;
    assert_eq!(calls, 0);
    Ok(())
}

#[test]
fn test_early_exit() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(None)?;
    for k in 1..=3 {
        let mut calls = 0;
        graph.for_each_relationship(1, |_, _| {
            calls += 1;
            calls < k
        })?;
        assert_eq!(calls, k);
    }
    Ok(())
}

#[test]
fn test_exists_and_get_target() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(None)?;
    assert!(graph.exists(1, 4)?);
    assert!(!graph.exists(1, 2)?);
    assert!(!graph.exists(7, 0)?);
    assert_eq!(graph.get_target(1, 0)?, Some(3));
    assert_eq!(graph.get_target(1, 2)?, Some(5));
    assert_eq!(graph.get_target(1, 3)?, None);
    assert_eq!(graph.get_target(7, 0)?, None);
    Ok(())
}

#[test]
fn test_relationship_properties() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(Some("weight"))?;
    assert!(graph.has_relationship_property());
    for (i, &(s, t)) in ARCS.iter().enumerate() {
        assert_eq!(graph.relationship_property(s, t, -1.0)?, (i + 1) as f64);
    }
    // Not a relationship
    assert_eq!(graph.relationship_property(0, 7, -1.0)?, -1.0);

    let mut pairs = vec![];
    graph.for_each_relationship_with_property(1, f64::NAN, |_, t, w| {
        pairs.push((t, w));
        true
    })?;
    assert_eq!(pairs, [(3, 3.0), (4, 4.0), (5, 5.0)]);
    Ok(())
}

#[test]
fn test_property_fallback_and_unsupported() -> Result<()> {
    let store = test_store()?;
    let mut graph = store.graph(None)?;
    let mut values = vec![];
    graph.for_each_relationship_with_property(0, 42.0, |_, _, w| {
        values.push(w);
        true
    })?;
    assert_eq!(values, [42.0, 42.0]);
    assert!(matches!(
        graph.relationship_property(0, 1, 0.0),
        Err(GraphError::Unsupported(_))
    ));
    assert!(matches!(
        store.graph(Some("length")),
        Err(GraphError::UnknownRelationshipProperty(_))
    ));
    Ok(())
}

#[test]
fn test_id_mapping() -> Result<()> {
    let store = test_store()?;
    let graph = store.graph(None)?;
    for node in 0..8 {
        assert_eq!(graph.to_original_node_id(node), original(node));
        assert_eq!(graph.to_mapped_node_id(original(node)), Some(node));
        assert!(graph.contains(original(node)));
    }
    assert!(!graph.contains(1));
    assert_eq!(graph.to_mapped_node_id(1), None);
    assert_eq!(graph.available_node_labels(), ["Even", "Odd"]);
    assert!(graph.has_label(2, "Even"));
    assert!(!graph.has_label(2, "Odd"));
    Ok(())
}

#[test]
fn test_batches_and_nodes() -> Result<()> {
    let store = test_store()?;
    let graph = store.graph(None)?;
    assert_eq!(graph.batch_iterables(3), [0..3, 3..6, 6..8]);
    let mut visited = vec![];
    graph.for_each_node(|node| {
        visited.push(node);
        node < 4
    });
    assert_eq!(visited, [0, 1, 2, 3, 4]);
    Ok(())
}

#[test]
fn test_release() -> Result<()> {
    let tracker = AllocationTracker::new();
    let store = weighted_store(
        8,
        &ARCS,
        Orientation::Natural,
        vcgraph::codec::DEFAULT_PAGE_SHIFT,
        tracker.clone(),
    )?;
    let total_bytes = store.size_in_bytes();
    assert_eq!(tracker.tracked_bytes(), total_bytes);
    let topology_bytes = store.graph(None)?.relationships().topology.size_in_bytes();

    let mut graph = store.graph(Some("weight"))?;
    let mut copy = graph.concurrent_copy();

    graph.can_release(false);
    graph.release_topology();
    assert_eq!(tracker.tracked_bytes(), total_bytes);
    assert_eq!(graph.degree(1), 3);

    // The copy keeps the property block alive, so it stays tracked
    graph.can_release(true);
    graph.release_properties();
    graph.release_properties();
    assert_eq!(store.size_in_bytes(), topology_bytes);
    assert_eq!(tracker.tracked_bytes(), total_bytes);
    assert_eq!(
        store.graph(Some("weight")).unwrap_err(),
        GraphError::Released("relationship property \"weight\"".to_owned())
    );
    assert!(store.graph(None).is_ok());

    copy.release_properties();
    assert_eq!(tracker.tracked_bytes(), topology_bytes);

    graph.release_topology();
    assert_eq!(store.size_in_bytes(), 0);
    assert_eq!(tracker.tracked_bytes(), topology_bytes);
    assert_eq!(successors(&mut copy, 1)?, [3, 4, 5]);
    assert!(store.graph(None).is_err());

    // Dropping the last owner frees the block
    drop(copy);
    assert_eq!(tracker.tracked_bytes(), 0);
    Ok(())
}

#[test]
fn test_tracked_until_dropped() -> Result<()> {
    let tracker = AllocationTracker::new();
    let store = weighted_store(
        8,
        &ARCS,
        Orientation::Undirected,
        vcgraph::codec::DEFAULT_PAGE_SHIFT,
        tracker.clone(),
    )?;
    let total_bytes = store.size_in_bytes();
    let graph = store.graph(Some("weight"))?;
    let intersect = graph.intersection(usize::MAX)?;
    drop(graph);
    drop(store);
    // The triangle enumerator still holds the topology
    let topology_bytes = tracker.tracked_bytes();
    assert!(topology_bytes > 0 && topology_bytes < total_bytes);
    drop(intersect);
    assert_eq!(tracker.tracked_bytes(), 0);
    Ok(())
}

#[test]
#[should_panic(expected = "released")]
fn test_use_after_release() {
    let store = test_store().unwrap();
    let mut graph = store.graph(None).unwrap();
    graph.release_topology();
    let _ = graph.for_each_relationship(0, |_, _| true);
}

#[test]
fn test_from_parts() -> Result<()> {
    let mut id_map = IdMapBuilder::new();
    for original in [5, 3, 9] {
        id_map.get_or_insert(original);
    }
    let mut adjacency = AdjacencyListBuilder::new(8, 3);
    adjacency.add(&[1, 2]);
    adjacency.add(&[]);
    adjacency.add(&[0]);
    let (list, offsets) = adjacency.build();
    let topology = TopologyCsr::new(Arc::new(list), Arc::new(offsets), 3, Orientation::Natural);
    let mut graph = CsrGraph::new(
        Arc::new(id_map.build()),
        Arc::new(BTreeMap::new()),
        Relationships::new(topology, None),
    );
    assert_eq!(successors(&mut graph, 0)?, [1, 2]);
    assert_eq!(successors(&mut graph, 2)?, [0]);
    assert_eq!(graph.to_original_node_id(1), 3);
    assert!(graph.available_node_properties().is_empty());
    Ok(())
}

#[test]
fn test_intersection() -> Result<()> {
    // Two triangles sharing the edge 1-2, plus a pendant node
    let arcs = [(0, 1), (0, 2), (1, 2), (1, 3), (2, 3), (3, 4), (1, 2)];
    let store = weighted_store(
        5,
        &arcs,
        Orientation::Undirected,
        vcgraph::codec::DEFAULT_PAGE_SHIFT,
        AllocationTracker::empty(),
    )?;
    let graph = store.graph(None)?;
    let mut intersect = graph.intersection(usize::MAX)?;
    let mut triangles = vec![];
    for node in 0..graph.node_count() {
        intersect.intersect_all(node, |a, b, c| triangles.push((a, b, c)))?;
    }
    assert_eq!(triangles, [(0, 1, 2), (1, 2, 3)]);

    // Nodes 1 and 2 have degree 4, counting the parallel relationship
    let mut intersect = graph.intersection(3)?;
    let mut triangles = vec![];
    for node in 0..graph.node_count() {
        intersect.intersect_all(node, |a, b, c| triangles.push((a, b, c)))?;
    }
    assert!(triangles.is_empty());

    let directed = test_store()?.graph(None)?;
    assert!(directed.intersection(usize::MAX).is_err());
    Ok(())
}

#[test]
fn test_missing_property_values() -> Result<()> {
    let mut id_map = IdMapBuilder::new();
    for original in 0..2 {
        id_map.get_or_insert(original);
    }
    let mut adjacency = AdjacencyListBuilder::new(8, 2);
    adjacency.add(&[0, 1]);
    adjacency.add(&[]);
    let (list, offsets) = adjacency.build();
    let topology = TopologyCsr::new(Arc::new(list), Arc::new(offsets), 2, Orientation::Natural);
    // The values of node 0 point to the empty-list address
    let (values, _) = PropertyListBuilder::new(8, 2).build();
    let properties = PropertyCsr::new(Arc::new(values), Arc::from(vec![0_u64, 0]), 2, f64::NAN);
    let mut graph = CsrGraph::new(
        Arc::new(id_map.build()),
        Arc::new(BTreeMap::new()),
        Relationships::new(topology, Some(properties)),
    );
    assert_eq!(
        graph.for_each_relationship_with_property(0, 1.0, |_, _, _| true),
        Err(DecodeError::OffsetOutOfBounds { address: 0 })
    );
    assert_eq!(successors(&mut graph, 0)?, [0, 1]);
    Ok(())
}
