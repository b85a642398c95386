/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::codec::{AdjacencyList, AdjacencyOffsets, PropertyList};
use crate::utils::{AllocationTracker, TrackedBytes};
use std::fmt::Display;
use std::sync::Arc;

/// How input relationships are laid out in adjacency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    /// A relationship *s* → *t* is stored in the list of *s*.
    #[default]
    Natural,
    /// A relationship *s* → *t* is stored in the list of *t*.
    Reverse,
    /// A relationship *s* → *t* is stored in the lists of both *s* and *t*.
    Undirected,
}

impl Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Orientation::Natural => f.write_str("natural"),
            Orientation::Reverse => f.write_str("reverse"),
            Orientation::Undirected => f.write_str("undirected"),
        }
    }
}

/// The topology of a compressed graph: a block of adjacency lists and its
/// index.
///
/// Cloning is cheap: the block and the index are shared. A
/// [tracked](TopologyCsr::track) topology reports its size to the memory
/// tracker until its last clone is dropped.
#[derive(Debug, Clone)]
pub struct TopologyCsr {
    list: Arc<AdjacencyList>,
    offsets: Arc<AdjacencyOffsets>,
    element_count: usize,
    orientation: Orientation,
    tracked: Option<Arc<TrackedBytes>>,
}

impl TopologyCsr {
    /// Creates a topology from its parts.
    ///
    /// `element_count` must be the sum of the degrees in `offsets`.
    pub fn new(
        list: Arc<AdjacencyList>,
        offsets: Arc<AdjacencyOffsets>,
        element_count: usize,
        orientation: Orientation,
    ) -> Self {
        debug_assert_eq!(
            element_count,
            (0..offsets.len()).map(|n| offsets.degree(n)).sum::<usize>()
        );
        Self {
            list,
            offsets,
            element_count,
            orientation,
            tracked: None,
        }
    }

    /// Accounts the size of the topology to `tracker`, until the last clone
    /// of the returned value is dropped.
    pub fn track(mut self, tracker: &AllocationTracker) -> Self {
        self.tracked = Some(Arc::new(TrackedBytes::new(tracker, self.size_in_bytes())));
        self
    }

    pub fn list(&self) -> &Arc<AdjacencyList> {
        &self.list
    }

    pub fn offsets(&self) -> &Arc<AdjacencyOffsets> {
        &self.offsets
    }

    /// Returns the number of stored relationships.
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn node_count(&self) -> usize {
        self.offsets.len()
    }

    /// Returns the exact number of bytes used by the block and its index.
    pub fn size_in_bytes(&self) -> usize {
        self.list.size_in_bytes() + self.offsets.size_in_bytes()
    }
}

/// The values of a relationship property, parallel to a [`TopologyCsr`].
///
/// The values of a node have their own address, but they come in the same
/// number and order as the targets of the node in the topology.
#[derive(Debug, Clone)]
pub struct PropertyCsr {
    list: Arc<PropertyList>,
    offsets: Arc<[u64]>,
    element_count: usize,
    default_value: f64,
    tracked: Option<Arc<TrackedBytes>>,
}

impl PropertyCsr {
    pub fn new(
        list: Arc<PropertyList>,
        offsets: Arc<[u64]>,
        element_count: usize,
        default_value: f64,
    ) -> Self {
        Self {
            list,
            offsets,
            element_count,
            default_value,
            tracked: None,
        }
    }

    /// Accounts the size of the values to `tracker`, until the last clone of
    /// the returned value is dropped.
    pub fn track(mut self, tracker: &AllocationTracker) -> Self {
        self.tracked = Some(Arc::new(TrackedBytes::new(tracker, self.size_in_bytes())));
        self
    }

    pub fn list(&self) -> &Arc<PropertyList> {
        &self.list
    }

    #[inline(always)]
    pub fn offset(&self, node: usize) -> u64 {
        self.offsets[node]
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Returns the value used for relationships that were added without one.
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    pub fn size_in_bytes(&self) -> usize {
        self.list.size_in_bytes() + self.offsets.len() * core::mem::size_of::<u64>()
    }
}

/// A topology with at most one relationship property.
#[derive(Debug, Clone)]
pub struct Relationships {
    pub topology: TopologyCsr,
    pub properties: Option<PropertyCsr>,
}

impl Relationships {
    /// Bundles a topology with an optional property.
    ///
    /// # Panics
    ///
    /// Panics if the property and the topology have a different number of
    /// elements.
    pub fn new(topology: TopologyCsr, properties: Option<PropertyCsr>) -> Self {
        if let Some(p) = &properties {
            assert_eq!(
                p.element_count(),
                topology.element_count(),
                "The property must have a value for every relationship"
            );
            assert_eq!(p.offsets.len(), topology.node_count());
        }
        Self {
            topology,
            properties,
        }
    }
}
