/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::node_properties::NodeProperties;
use crate::codec::DecodeError;
use crate::traits::{Graph, GraphError, Unsupported};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct Filter {
    to_root: Box<[usize]>,
    to_filtered: Box<[Option<usize>]>,
    degrees: Box<[usize]>,
    relationship_count: usize,
    node_properties: BTreeMap<String, NodeProperties>,
}

/// The subgraph induced by the nodes carrying at least one of a set of
/// labels.
///
/// The view has its own dense id space: filtered ids follow the order of the
/// internal ids of the underlying graph, so adjacency lists remain sorted.
/// Degrees and node properties are computed once at construction and shared
/// by all concurrent copies.
#[derive(Debug)]
pub struct NodeFilteredGraph<G> {
    graph: G,
    filter: Arc<Filter>,
}

impl<G: Graph> NodeFilteredGraph<G> {
    /// Filters `graph`, keeping the nodes having any of the given labels.
    ///
    /// Returns [`GraphError::InvalidLabelFilter`] if a label does not appear in
    /// `graph`.
    pub fn new(mut graph: G, labels: &[&str]) -> Result<Self, GraphError> {
        let available = graph.available_node_labels();
        if let Some(unknown) = labels.iter().find(|label| !available.contains(*label)) {
            return Err(GraphError::InvalidLabelFilter(unknown.to_string()));
        }

        let n = graph.node_count();
        let to_root = (0..n)
            .filter(|&node| labels.iter().any(|label| graph.has_label(node, label)))
            .collect::<Box<[usize]>>();
        let mut to_filtered = vec![None; n].into_boxed_slice();
        for (filtered, &root) in to_root.iter().enumerate() {
            to_filtered[root] = Some(filtered);
        }

        let mut degrees = Vec::with_capacity(to_root.len());
        for &root in to_root.iter() {
            let mut degree = 0;
            graph.for_each_relationship(root, |_, t| {
                degree += to_filtered[t].is_some() as usize;
                true
            })?;
            degrees.push(degree);
        }
        let relationship_count = degrees.iter().sum();

        let node_properties = graph
            .available_node_properties()
            .into_iter()
            .filter_map(|key| {
                graph
                    .node_properties(key)
                    .map(|values| (key.to_owned(), values.select(&to_root)))
            })
            .collect();

        log::debug!(
            "Filtered {} of {n} nodes and {relationship_count} of {} relationships",
            to_root.len(),
            graph.relationship_count()
        );

        Ok(Self {
            graph,
            filter: Arc::new(Filter {
                to_root,
                to_filtered,
                degrees: degrees.into_boxed_slice(),
                relationship_count,
                node_properties,
            }),
        })
    }

    /// Returns the id in the underlying graph of a filtered node.
    pub fn to_root_node_id(&self, node: usize) -> usize {
        self.filter.to_root[node]
    }

    /// Returns the filtered id of a node of the underlying graph, if the node
    /// passed the filter.
    pub fn to_filtered_node_id(&self, root: usize) -> Option<usize> {
        self.filter.to_filtered[root]
    }

    pub fn into_inner(self) -> G {
        self.graph
    }
}

impl<G: Graph> Graph for NodeFilteredGraph<G> {
    type Intersect = core::convert::Infallible;

    fn node_count(&self) -> usize {
        self.filter.to_root.len()
    }

    fn relationship_count(&self) -> usize {
        self.filter.relationship_count
    }

    /// # Panics
    ///
    /// Panics if the topology of the underlying graph has been released.
    fn degree(&self, node: usize) -> usize {
        assert!(
            self.graph.has_topology(),
            "The topology of this graph has been released"
        );
        self.filter.degrees[node]
    }

    fn is_undirected(&self) -> bool {
        self.graph.is_undirected()
    }

    fn has_relationship_property(&self) -> bool {
        self.graph.has_relationship_property()
    }

    fn has_topology(&self) -> bool {
        self.graph.has_topology()
    }

    fn for_each_relationship(
        &mut self,
        node: usize,
        mut consumer: impl FnMut(usize, usize) -> bool,
    ) -> Result<(), DecodeError> {
        let filter = &self.filter;
        self.graph
            .for_each_relationship(filter.to_root[node], |_, t| match filter.to_filtered[t] {
                Some(t) => consumer(node, t),
                None => true,
            })
    }

    fn for_each_relationship_with_property(
        &mut self,
        node: usize,
        fallback: f64,
        mut consumer: impl FnMut(usize, usize, f64) -> bool,
    ) -> Result<(), DecodeError> {
        let filter = &self.filter;
        self.graph.for_each_relationship_with_property(
            filter.to_root[node],
            fallback,
            |_, t, w| match filter.to_filtered[t] {
                Some(t) => consumer(node, t, w),
                None => true,
            },
        )
    }

    fn node_properties(&self, key: &str) -> Option<&NodeProperties> {
        self.filter.node_properties.get(key)
    }

    fn available_node_properties(&self) -> Vec<&str> {
        self.filter
            .node_properties
            .keys()
            .map(String::as_str)
            .collect()
    }

    fn available_node_labels(&self) -> Vec<&str> {
        self.graph.available_node_labels()
    }

    fn has_label(&self, node: usize, label: &str) -> bool {
        self.graph.has_label(self.filter.to_root[node], label)
    }

    fn to_mapped_node_id(&self, original: u64) -> Option<usize> {
        self.graph
            .to_mapped_node_id(original)
            .and_then(|root| self.filter.to_filtered[root])
    }

    fn to_original_node_id(&self, node: usize) -> u64 {
        self.graph.to_original_node_id(self.filter.to_root[node])
    }

    fn concurrent_copy(&self) -> Self {
        Self {
            graph: self.graph.concurrent_copy(),
            filter: self.filter.clone(),
        }
    }

    fn intersection(&self, _max_degree: usize) -> Result<Self::Intersect, Unsupported> {
        Err(Unsupported {
            operation: "Intersection",
            view: "NodeFilteredGraph",
        })
    }

    fn can_release(&mut self, can_release: bool) {
        self.graph.can_release(can_release);
    }

    fn release_topology(&mut self) {
        self.graph.release_topology();
    }

    fn release_properties(&mut self) {
        self.graph.release_properties();
    }
}
