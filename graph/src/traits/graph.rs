/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! The read contract shared by all graph views.
//!
//! Relationship enumeration is callback based: consumers receive the source
//! and the target of each relationship (and possibly its property value) and
//! return `true` to continue or `false` to stop the enumeration.
//!
//! Enumeration methods take `&mut self` because views decode adjacency lists
//! using cursors they own. To read a view from several threads, obtain one
//! [concurrent copy](Graph::concurrent_copy) per thread.

use crate::codec::DecodeError;
use crate::graphs::node_properties::NodeProperties;
use core::ops::Range;
use thiserror::Error;

/// A view does not support an operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} is not supported by {view}")]
pub struct Unsupported {
    pub operation: &'static str,
    pub view: &'static str,
}

/// Errors raised by graph views.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Unsupported(#[from] Unsupported),
    #[error("Unknown node label {0:?} in label filter")]
    InvalidLabelFilter(String),
    #[error("Unknown relationship property {0:?}")]
    UnknownRelationshipProperty(String),
    #[error("The {0} of this graph has been released")]
    Released(String),
}

/// Enumerates triangles.
pub trait RelationshipIntersect {
    /// Enumerates each triangle {*a*, *b*, *c*} with *a* < *b* < *c* whose
    /// smallest node is `node`, passing it to `consumer` as `(a, b, c)`.
    fn intersect_all(
        &mut self,
        node: usize,
        consumer: impl FnMut(usize, usize, usize),
    ) -> Result<(), DecodeError>;
}

impl RelationshipIntersect for core::convert::Infallible {
    fn intersect_all(
        &mut self,
        _node: usize,
        _consumer: impl FnMut(usize, usize, usize),
    ) -> Result<(), DecodeError> {
        match *self {}
    }
}

/// The read contract of a graph view.
///
/// Nodes are identified by dense internal ids in [0 . . *n*); the view maps
/// them to and from the original ids provided at construction.
///
/// Methods enumerating relationships fail only if the underlying data is
/// corrupt. Calling them after the topology has been
/// [released](Graph::release_topology) is a contract violation and causes a
/// panic.
pub trait Graph {
    /// The type returned by [`intersection`](Graph::intersection).
    type Intersect: RelationshipIntersect;

    fn node_count(&self) -> usize;

    /// Returns the number of relationships stored in the view.
    ///
    /// In undirected views every input relationship is counted twice.
    fn relationship_count(&self) -> usize;

    /// Returns the number of relationships of a node, without decoding them.
    fn degree(&self, node: usize) -> usize;

    fn is_undirected(&self) -> bool;

    /// Returns whether the view exposes a relationship property.
    fn has_relationship_property(&self) -> bool;

    /// Returns whether the topology is still available, that is, whether it
    /// has not been [released](Graph::release_topology).
    fn has_topology(&self) -> bool;

    /// Enumerates the relationships of `node` in increasing target order.
    fn for_each_relationship(
        &mut self,
        node: usize,
        consumer: impl FnMut(usize, usize) -> bool,
    ) -> Result<(), DecodeError>;

    /// Enumerates the relationships of `node` together with their property
    /// value.
    ///
    /// If the view has no relationship property, `fallback` is passed as
    /// value.
    fn for_each_relationship_with_property(
        &mut self,
        node: usize,
        fallback: f64,
        consumer: impl FnMut(usize, usize, f64) -> bool,
    ) -> Result<(), DecodeError>;

    /// Returns the node property with the given key.
    fn node_properties(&self, key: &str) -> Option<&NodeProperties>;

    /// Returns the keys of the node properties, in lexicographical order.
    fn available_node_properties(&self) -> Vec<&str>;

    /// Returns the node labels, in lexicographical order.
    fn available_node_labels(&self) -> Vec<&str>;

    fn has_label(&self, node: usize, label: &str) -> bool;

    fn to_mapped_node_id(&self, original: u64) -> Option<usize>;

    /// # Panics
    ///
    /// Panics if `node` is out of range.
    fn to_original_node_id(&self, node: usize) -> u64;

    /// Returns whether the view contains a node with the given original id.
    fn contains(&self, original: u64) -> bool {
        self.to_mapped_node_id(original).is_some()
    }

    /// Returns a view sharing all immutable data with this one, but with
    /// independent cursors.
    ///
    /// The copy can be moved to a different thread and used concurrently
    /// with this view.
    fn concurrent_copy(&self) -> Self
    where
        Self: Sized;

    /// Returns a triangle enumerator, or [`Unsupported`] if the view cannot
    /// enumerate triangles.
    ///
    /// Nodes with degree larger than `max_degree` are ignored.
    fn intersection(&self, max_degree: usize) -> Result<Self::Intersect, Unsupported>;

    /// Sets whether the view may release its data.
    fn can_release(&mut self, can_release: bool);

    /// Releases the topology, if the view can release its data.
    ///
    /// The release is reported once to the memory tracker, even if it is
    /// requested by several copies of the view.
    fn release_topology(&mut self);

    /// Releases the relationship property, if the view can release its data.
    fn release_properties(&mut self);

    /// Returns the property value of the first relationship from `source` to
    /// `target`, or `fallback` if there is no such relationship.
    ///
    /// This method performs a linear scan of the relationships of `source`.
    fn relationship_property(
        &mut self,
        source: usize,
        target: usize,
        fallback: f64,
    ) -> Result<f64, GraphError> {
        if !self.has_relationship_property() {
            return Err(Unsupported {
                operation: "relationship_property",
                view: core::any::type_name::<Self>(),
            }
            .into());
        }
        let mut value = fallback;
        self.for_each_relationship_with_property(source, fallback, |_, t, w| {
            if t == target {
                value = w;
            }
            t < target
        })?;
        Ok(value)
    }

    /// Returns whether there is a relationship from `source` to `target`.
    ///
    /// This method performs a linear scan of the relationships of `source`.
    fn exists(&mut self, source: usize, target: usize) -> Result<bool, DecodeError> {
        let mut found = false;
        self.for_each_relationship(source, |_, t| {
            found = t == target;
            t < target
        })?;
        Ok(found)
    }

    /// Returns the `k`-th target of `source`, if any.
    ///
    /// This method performs a linear scan of the relationships of `source`.
    fn get_target(&mut self, source: usize, k: usize) -> Result<Option<usize>, DecodeError> {
        let mut target = None;
        let mut i = 0;
        self.for_each_relationship(source, |_, t| {
            if i == k {
                target = Some(t);
                return false;
            }
            i += 1;
            true
        })?;
        Ok(target)
    }

    /// Enumerates the nodes of the view until `consumer` returns `false`.
    fn for_each_node(&self, mut consumer: impl FnMut(usize) -> bool) {
        for node in 0..self.node_count() {
            if !consumer(node) {
                break;
            }
        }
    }

    /// Splits the nodes in consecutive ranges of `batch_size` nodes (the last
    /// one might be shorter).
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is zero.
    fn batch_iterables(&self, batch_size: usize) -> Vec<Range<usize>> {
        assert!(batch_size > 0, "The batch size must be positive");
        let n = self.node_count();
        (0..n)
            .step_by(batch_size)
            .map(|start| start..n.min(start + batch_size))
            .collect()
    }
}
