/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Construction of compressed graphs from node and relationship batches.
//!
//! A [`GraphBuilder`] collects nodes (identified by arbitrary `u64` original
//! ids, with labels and properties) and relationships (between internal ids,
//! or between original ids that are registered on the fly). Invalid input is
//! rejected immediately with a [`BuildError`]. [`build`](GraphBuilder::build)
//! then sorts, aggregates and compresses the relationships in parallel, and
//! returns an immutable [`GraphStore`] from which any number of
//! [views](crate::graphs::csr_graph::CsrGraph) can be obtained.
//!
//! # Examples
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use vcgraph::prelude::*;
//!
//! let mut builder = GraphBuilder::new();
//! builder.relationship_properties(["weight"]);
//! let a = builder.add_node(10, &["Person"])?;
//! let b = builder.add_node(20, &["Person"])?;
//! builder.add_relationship_with_property(a, b, 0.5)?;
//! let store = builder.build()?;
//!
//! let mut graph = store.graph(Some("weight"))?;
//! assert_eq!(graph.degree(a), 1);
//! assert_eq!(graph.relationship_property(a, b, f64::NAN)?, 0.5);
//! # Ok(())
//! # }
//! ```

mod aggregation;
mod graph_store;

pub use aggregation::Aggregation;
pub use graph_store::GraphStore;

use crate::codec::{
    AdjacencyListBuilder, DEFAULT_PAGE_SHIFT, MAX_PAGE_SHIFT, PropertyListBuilder,
    encode_adjacency,
};
use crate::graphs::csr::{Orientation, PropertyCsr, TopologyCsr};
use crate::graphs::id_map::{IdMapBuilder, InvalidLabel, NodeLabel};
use crate::graphs::node_properties::{NodeProperties, PropertyValue, ValueType};
use crate::utils::AllocationTracker;
use dsi_progress_logger::{ProgressLog, no_logging};
use log::info;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while ingesting nodes and relationships.
///
/// When an error is returned, the offending call has no effect; no graph is
/// ever built from input that was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error(transparent)]
    InvalidLabel(#[from] InvalidLabel),
    #[error("Node property {key:?} has type {expected}, but a {found} value was provided")]
    PropertyTypeMismatch {
        key: String,
        expected: ValueType,
        found: ValueType,
    },
    #[error("Unknown node {node}: the graph has {node_count} nodes")]
    UnknownNode { node: usize, node_count: usize },
    #[error("Expected {expected} relationship property values, got {found}")]
    PropertyCountMismatch { expected: usize, found: usize },
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfig(String),
    #[error("Node {node} has {degree} relationships, more than the maximum of {}", u32::MAX)]
    DegreeOverflow { node: usize, degree: usize },
}

/// Collects nodes and relationships and compresses them into a
/// [`GraphStore`].
///
/// The builder is configured through setters (orientation, aggregation of
/// parallel relationships, relationship property keys, page size, memory
/// tracker), which must be called before adding relationships.
#[derive(Debug)]
pub struct GraphBuilder {
    orientation: Orientation,
    aggregation: Aggregation,
    property_keys: Vec<String>,
    default_value: f64,
    page_shift: u32,
    tracker: AllocationTracker,

    id_map: IdMapBuilder,
    node_properties: BTreeMap<String, (ValueType, Vec<(usize, PropertyValue)>)>,
    /// Source, target, and index of the first property value.
    relationships: Vec<(usize, usize, usize)>,
    property_values: Vec<f64>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            orientation: Orientation::default(),
            aggregation: Aggregation::default(),
            property_keys: vec![],
            default_value: f64::NAN,
            page_shift: DEFAULT_PAGE_SHIFT,
            tracker: AllocationTracker::empty(),
            id_map: IdMapBuilder::new(),
            node_properties: BTreeMap::new(),
            relationships: vec![],
            property_values: vec![],
        }
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orientation(&mut self, orientation: Orientation) -> &mut Self {
        self.orientation = orientation;
        self
    }

    /// Sets how parallel relationships are merged.
    pub fn aggregation(&mut self, aggregation: Aggregation) -> &mut Self {
        self.aggregation = aggregation;
        self
    }

    /// Declares the relationship property keys.
    ///
    /// Every relationship must then come with one value per key.
    ///
    /// # Panics
    ///
    /// Panics if relationships have already been added.
    pub fn relationship_properties<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
    ) -> &mut Self {
        assert!(
            self.relationships.is_empty(),
            "Relationship properties must be declared before adding relationships"
        );
        self.property_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the value returned by views for relationships without a value
    /// (NaN by default).
    pub fn default_value(&mut self, default_value: f64) -> &mut Self {
        self.default_value = default_value;
        self
    }

    /// Sets the base-2 logarithm of the page size of compressed blocks.
    pub fn page_shift(&mut self, page_shift: u32) -> &mut Self {
        self.page_shift = page_shift;
        self
    }

    /// Sets the tracker that will be notified of the allocated blocks.
    pub fn tracker(&mut self, tracker: AllocationTracker) -> &mut Self {
        self.tracker = tracker;
        self
    }

    /// Returns the number of nodes registered so far.
    pub fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    fn parse_labels(labels: &[&str]) -> Result<Vec<NodeLabel>, BuildError> {
        Ok(labels
            .iter()
            .map(|&label| NodeLabel::new(label))
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Adds a node with the given labels, returning its internal id.
    ///
    /// Adding an original id twice returns the same internal id and adds the
    /// new labels to the node.
    pub fn add_node(&mut self, original: u64, labels: &[&str]) -> Result<usize, BuildError> {
        let labels = Self::parse_labels(labels)?;
        let node = self.id_map.get_or_insert(original);
        self.id_map.add_labels(node, &labels);
        Ok(node)
    }

    /// Adds a node with the given properties and labels, returning its
    /// internal id.
    ///
    /// The type of a property is fixed by the first value provided for it.
    pub fn add_node_with_properties<K: Into<String>>(
        &mut self,
        original: u64,
        properties: impl IntoIterator<Item = (K, PropertyValue)>,
        labels: &[&str],
    ) -> Result<usize, BuildError> {
        let labels = Self::parse_labels(labels)?;
        let properties = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value))
            .collect::<Vec<(String, PropertyValue)>>();
        let mut types = BTreeMap::<&str, ValueType>::new();
        for (key, value) in &properties {
            let expected = self
                .node_properties
                .get(key)
                .map(|(value_type, _)| *value_type)
                .or_else(|| types.get(key.as_str()).copied());
            match expected {
                Some(expected) if expected != value.value_type() => {
                    return Err(BuildError::PropertyTypeMismatch {
                        key: key.clone(),
                        expected,
                        found: value.value_type(),
                    });
                }
                _ => {
                    types.insert(key, value.value_type());
                }
            }
        }
        let node = self.id_map.get_or_insert(original);
        self.id_map.add_labels(node, &labels);
        for (key, value) in properties {
            self.node_properties
                .entry(key)
                .or_insert_with(|| (value.value_type(), vec![]))
                .1
                .push((node, value));
        }
        Ok(node)
    }

    /// Returns the internal id of an original id, registering an unlabeled
    /// node if the id was never seen before.
    pub fn to_mapped_node_id(&mut self, original: u64) -> usize {
        self.id_map.get_or_insert(original)
    }

    /// Adds a relationship between two internal ids.
    pub fn add_relationship(&mut self, source: usize, target: usize) -> Result<(), BuildError> {
        self.add_relationship_with_properties(source, target, &[])
    }

    pub fn add_relationship_with_property(
        &mut self,
        source: usize,
        target: usize,
        value: f64,
    ) -> Result<(), BuildError> {
        self.add_relationship_with_properties(source, target, &[value])
    }

    /// Adds a relationship with one value per declared property key.
    pub fn add_relationship_with_properties(
        &mut self,
        source: usize,
        target: usize,
        values: &[f64],
    ) -> Result<(), BuildError> {
        let node_count = self.node_count();
        for node in [source, target] {
            if node >= node_count {
                return Err(BuildError::UnknownNode { node, node_count });
            }
        }
        if values.len() != self.property_keys.len() {
            return Err(BuildError::PropertyCountMismatch {
                expected: self.property_keys.len(),
                found: values.len(),
            });
        }
        self.relationships
            .push((source, target, self.property_values.len()));
        self.property_values.extend_from_slice(values);
        Ok(())
    }

    /// Adds a relationship between two original ids, registering unseen ids
    /// as unlabeled nodes.
    pub fn add_relationship_by_original_ids(
        &mut self,
        source: u64,
        target: u64,
        values: &[f64],
    ) -> Result<(), BuildError> {
        if values.len() != self.property_keys.len() {
            return Err(BuildError::PropertyCountMismatch {
                expected: self.property_keys.len(),
                found: values.len(),
            });
        }
        let source = self.to_mapped_node_id(source);
        let target = self.to_mapped_node_id(target);
        self.add_relationship_with_properties(source, target, values)
    }

    fn check_config(&self) -> Result<(), BuildError> {
        if !(1..=MAX_PAGE_SHIFT).contains(&self.page_shift) {
            return Err(BuildError::UnsupportedConfig(format!(
                "the page shift must be in [1 . . {MAX_PAGE_SHIFT}], got {}",
                self.page_shift
            )));
        }
        for (i, key) in self.property_keys.iter().enumerate() {
            if key.is_empty() {
                return Err(BuildError::UnsupportedConfig(
                    "relationship property keys must be nonempty".to_owned(),
                ));
            }
            if self.property_keys[..i].contains(key) {
                return Err(BuildError::UnsupportedConfig(format!(
                    "duplicate relationship property key {key:?}"
                )));
            }
        }
        Ok(())
    }

    /// Compresses the collected data into a [`GraphStore`].
    pub fn build(self) -> Result<GraphStore, BuildError> {
        self.build_with_logging(no_logging![])
    }

    /// Compresses the collected data into a [`GraphStore`], logging progress
    /// on the per-node compression phase.
    pub fn build_with_logging(self, pl: &mut impl ProgressLog) -> Result<GraphStore, BuildError> {
        self.check_config()?;
        let id_map = self.id_map.build();
        let n = id_map.node_count();
        let num_keys = self.property_keys.len();

        let mut node_properties = BTreeMap::new();
        for (key, (value_type, values)) in self.node_properties {
            let mut column = NodeProperties::with_defaults(value_type, n);
            for (node, value) in values {
                column.set(node, value).unwrap_or_else(|value| {
                    unreachable!(
                        "Node property {key:?} of type {value_type} got a {} value",
                        value.value_type()
                    )
                });
            }
            node_properties.insert(key, column);
        }

        info!(
            "Compressing {} relationships on {n} nodes (orientation: {}, aggregation: {})",
            self.relationships.len(),
            self.orientation,
            self.aggregation
        );

        let mut entries = match self.orientation {
            Orientation::Natural => self.relationships,
            Orientation::Reverse => self
                .relationships
                .into_iter()
                .map(|(s, t, p)| (t, s, p))
                .collect(),
            Orientation::Undirected => self
                .relationships
                .into_iter()
                .flat_map(|(s, t, p)| [(s, t, p), (t, s, p)])
                .collect(),
        };
        // Stable, so parallel relationships keep their insertion order
        entries.par_sort_by_key(|&(s, t, _)| (s, t));

        let mut starts = vec![0_usize; n + 1];
        for &(s, _, _) in &entries {
            starts[s + 1] += 1;
        }
        for node in 0..n {
            starts[node + 1] += starts[node];
        }

        let aggregation = self.aggregation;
        let property_values = &self.property_values;
        pl.item_name("node");
        pl.expected_updates(Some(n));
        pl.start("Encoding adjacency lists...");
        let encoded = (0..n)
            .into_par_iter()
            .map(|node| {
                let list = &entries[starts[node]..starts[node + 1]];
                encode_node(list, num_keys, property_values, aggregation)
            })
            .collect::<Vec<_>>();
        pl.update_with_count(n);
        pl.done();

        let mut adjacency = AdjacencyListBuilder::new(self.page_shift, n);
        let mut properties = (0..num_keys)
            .map(|_| PropertyListBuilder::new(self.page_shift, n))
            .collect::<Vec<_>>();
        let mut element_count = 0;
        for (node, encoded) in encoded.iter().enumerate() {
            if encoded.degree > u32::MAX as usize {
                return Err(BuildError::DegreeOverflow {
                    node,
                    degree: encoded.degree,
                });
            }
            adjacency.add_encoded(&encoded.bytes, encoded.degree);
            for (builder, values) in properties.iter_mut().zip(encoded.values.iter()) {
                builder.add(values);
            }
            element_count += encoded.degree;
        }
        drop(encoded);

        let (list, offsets) = adjacency.build();
        let topology = TopologyCsr::new(
            Arc::new(list),
            Arc::new(offsets),
            element_count,
            self.orientation,
        )
        .track(&self.tracker);
        info!(
            "Compressed {element_count} relationships in {} bytes ({:.3} bits/relationship)",
            topology.list().size_in_bytes(),
            8.0 * topology.list().size_in_bytes() as f64 / element_count.max(1) as f64
        );

        let properties = self
            .property_keys
            .into_iter()
            .zip(properties)
            .map(|(key, builder)| {
                let (list, offsets) = builder.build();
                let csr = PropertyCsr::new(
                    Arc::new(list),
                    offsets.into(),
                    element_count,
                    self.default_value,
                )
                .track(&self.tracker);
                (key, csr)
            })
            .collect::<Vec<_>>();

        Ok(GraphStore::new(
            Arc::new(id_map),
            Arc::new(node_properties),
            topology,
            properties,
        ))
    }
}

/// The compressed relationships of a node.
struct EncodedNode {
    bytes: Vec<u8>,
    degree: usize,
    /// One vector of value bits per property key.
    values: Vec<Vec<u64>>,
}

/// Aggregates and encodes the sorted relationships of a node.
fn encode_node(
    list: &[(usize, usize, usize)],
    num_keys: usize,
    property_values: &[f64],
    aggregation: Aggregation,
) -> EncodedNode {
    let mut targets = Vec::with_capacity(list.len());
    let mut values = vec![Vec::with_capacity(list.len()); num_keys];

    let mut i = 0;
    while i < list.len() {
        let (_, target, _) = list[i];
        let run = if aggregation == Aggregation::None {
            1
        } else {
            list[i..].iter().take_while(|&&(_, t, _)| t == target).count()
        };
        targets.push(target);
        for (key, column) in values.iter_mut().enumerate() {
            let value = aggregation.merge(
                list[i..i + run]
                    .iter()
                    .map(|&(_, _, p)| property_values[p + key]),
                run,
            );
            column.push(value.to_bits());
        }
        i += run;
    }

    let mut bytes = Vec::new();
    encode_adjacency(&mut bytes, &targets);
    bytes.shrink_to_fit();
    EncodedNode {
        bytes,
        degree: targets.len(),
        values,
    }
}
