/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use thiserror::Error;

/// A label name is empty or contains whitespace.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid node label {0:?}: labels must be nonempty and must not contain whitespace")]
pub struct InvalidLabel(pub String);

/// A validated node label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeLabel(String);

impl NodeLabel {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidLabel> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(InvalidLabel(name));
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for NodeLabel {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bijection between original node ids and the dense internal id space
/// [0 . . *n*).
///
/// Internal ids are assigned in order of first appearance. The map also
/// stores, for each label, the sorted list of internal ids of the nodes
/// carrying it. An id map is immutable once built, and it is shared by all
/// views of a graph.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    to_mapped: HashMap<u64, usize>,
    to_original: Box<[u64]>,
    labels: BTreeMap<NodeLabel, Box<[usize]>>,
}

impl IdMap {
    pub fn node_count(&self) -> usize {
        self.to_original.len()
    }

    /// Returns the internal id of an original id, if present.
    pub fn to_mapped_node_id(&self, original: u64) -> Option<usize> {
        self.to_mapped.get(&original).copied()
    }

    /// Returns the original id of an internal id.
    ///
    /// # Panics
    ///
    /// Panics if `node` is not smaller than the number of nodes.
    pub fn to_original_node_id(&self, node: usize) -> u64 {
        self.to_original[node]
    }

    /// Returns whether the original id is part of the map.
    pub fn contains(&self, original: u64) -> bool {
        self.to_mapped.contains_key(&original)
    }

    /// Returns the labels appearing in the map, in lexicographical order.
    pub fn available_node_labels(&self) -> impl Iterator<Item = &NodeLabel> {
        self.labels.keys()
    }

    /// Returns the sorted internal ids of the nodes with the given label, or
    /// `None` if the label does not appear in the map.
    pub fn nodes_with_label(&self, label: &str) -> Option<&[usize]> {
        self.labels.get(label).map(|nodes| &**nodes)
    }

    /// Returns whether the node carries the given label.
    pub fn has_label(&self, node: usize, label: &str) -> bool {
        self.nodes_with_label(label)
            .is_some_and(|nodes| nodes.binary_search(&node).is_ok())
    }

    /// Returns the labels of a node.
    pub fn node_labels(&self, node: usize) -> impl Iterator<Item = &NodeLabel> {
        self.labels
            .iter()
            .filter(move |(_, nodes)| nodes.binary_search(&node).is_ok())
            .map(|(label, _)| label)
    }
}

/// Incrementally builds an [`IdMap`].
#[derive(Debug, Default)]
pub struct IdMapBuilder {
    to_mapped: HashMap<u64, usize>,
    to_original: Vec<u64>,
    labels: HashMap<NodeLabel, Vec<usize>>,
}

impl IdMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.to_original.len()
    }

    /// Returns the internal id of `original`, registering it if it was never
    /// seen before.
    pub fn get_or_insert(&mut self, original: u64) -> usize {
        let next = self.to_original.len();
        let node = *self.to_mapped.entry(original).or_insert(next);
        if node == next {
            self.to_original.push(original);
        }
        node
    }

    pub fn get(&self, original: u64) -> Option<usize> {
        self.to_mapped.get(&original).copied()
    }

    /// Adds labels to an internal id.
    pub fn add_labels<'a>(&mut self, node: usize, labels: impl IntoIterator<Item = &'a NodeLabel>) {
        for label in labels {
            self.labels.entry(label.clone()).or_default().push(node);
        }
    }

    pub fn build(self) -> IdMap {
        IdMap {
            to_mapped: self.to_mapped,
            to_original: self.to_original.into_boxed_slice(),
            labels: self
                .labels
                .into_iter()
                .map(|(label, mut nodes)| {
                    nodes.sort_unstable();
                    nodes.dedup();
                    (label, nodes.into_boxed_slice())
                })
                .collect(),
        }
    }
}
