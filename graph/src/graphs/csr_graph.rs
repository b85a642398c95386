/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use super::csr::{PropertyCsr, Relationships, TopologyCsr};
use super::id_map::IdMap;
use super::node_properties::NodeProperties;
use crate::codec::{DecodeError, DecompressingCursor, PropertyCursor};
use crate::traits::{Graph, RelationshipIntersect, Unsupported};
use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// The blocks of a [graph store](crate::builder::GraphStore), shared with
/// all the views it creates.
///
/// Releasing a block from any view empties the corresponding slot, so the
/// store stops holding the block and refuses to create new views on it.
#[derive(Debug, Default)]
pub(crate) struct SharedBlocks {
    topology: Mutex<Option<TopologyCsr>>,
    properties: Box<[Mutex<Option<PropertyCsr>>]>,
}

impl SharedBlocks {
    pub(crate) fn new(topology: TopologyCsr, properties: Vec<PropertyCsr>) -> Self {
        Self {
            topology: Mutex::new(Some(topology)),
            properties: properties
                .into_iter()
                .map(|csr| Mutex::new(Some(csr)))
                .collect(),
        }
    }

    pub(crate) fn topology(&self) -> Option<TopologyCsr> {
        self.topology
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn property(&self, index: usize) -> Option<PropertyCsr> {
        self.properties[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn take_topology(&self) -> Option<TopologyCsr> {
        self.topology
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_property(&self, index: usize) -> Option<PropertyCsr> {
        self.properties
            .get(index)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

#[derive(Debug)]
struct Topology {
    csr: TopologyCsr,
    cursor: DecompressingCursor,
    empty: DecompressingCursor,
}

impl Topology {
    fn new(csr: TopologyCsr) -> Self {
        Self {
            cursor: DecompressingCursor::new(csr.list().clone()),
            empty: DecompressingCursor::new(csr.list().clone()),
            csr,
        }
    }

    /// Lends the cached cursor positioned on `node`, or the empty cursor if
    /// `node` has no relationships.
    fn adjacency_cursor_for_iteration(
        &mut self,
        node: usize,
    ) -> Result<&mut DecompressingCursor, DecodeError> {
        let offset = self.csr.offsets().offset(node);
        if offset == 0 {
            return Ok(&mut self.empty);
        }
        self.cursor.init(offset, self.csr.offsets().degree(node))?;
        Ok(&mut self.cursor)
    }
}

#[derive(Debug)]
struct PropertyTopology {
    csr: PropertyCsr,
    cursor: PropertyCursor,
    index: usize,
}

/// A read-only view on a compressed graph.
///
/// The view combines an [id map](IdMap), a [topology](TopologyCsr), at most
/// one [relationship property](PropertyCsr), and a set of
/// [node properties](NodeProperties). All these are immutable and shared:
/// a [concurrent copy](Graph::concurrent_copy) of the view costs a few
/// reference-count increments and two cursor allocations.
///
/// Enumerating relationships uses a cursor cached in the view, so a view can
/// enumerate the relationships of a single node at a time (this is enforced
/// by the borrow checker, as enumeration methods take `&mut self`).
///
/// # Releasing data
///
/// [`release_topology`](Graph::release_topology) and
/// [`release_properties`](Graph::release_properties) drop the references of
/// the view, and of the [store](crate::builder::GraphStore) that created it,
/// to the corresponding block. A block leaves the
/// [memory tracker](crate::utils::AllocationTracker) when its last owner
/// drops it, so concurrent copies that still hold the block keep it
/// accounted. Releases do nothing if the view has been marked as not
/// releasable with [`can_release`](Graph::can_release).
///
/// Enumerating relationships or querying degrees after the topology has been
/// released causes a panic.
#[derive(Debug)]
pub struct CsrGraph {
    id_map: Arc<IdMap>,
    node_properties: Arc<BTreeMap<String, NodeProperties>>,
    topology: Option<Topology>,
    properties: Option<PropertyTopology>,
    relationship_count: usize,
    undirected: bool,
    has_relationship_property: bool,
    can_release: bool,
    shared: Arc<SharedBlocks>,
}

impl CsrGraph {
    /// Creates a view from completed blocks, which the view owns alone.
    ///
    /// # Panics
    ///
    /// Panics if the number of nodes of the topology is different from the
    /// number of nodes of the id map or of the length of a node property.
    pub fn new(
        id_map: Arc<IdMap>,
        node_properties: Arc<BTreeMap<String, NodeProperties>>,
        relationships: Relationships,
    ) -> Self {
        Self::from_shared(
            id_map,
            node_properties,
            relationships,
            Arc::new(SharedBlocks::default()),
            0,
        )
    }

    pub(crate) fn from_shared(
        id_map: Arc<IdMap>,
        node_properties: Arc<BTreeMap<String, NodeProperties>>,
        relationships: Relationships,
        shared: Arc<SharedBlocks>,
        property_index: usize,
    ) -> Self {
        let Relationships {
            topology,
            properties,
        } = relationships;
        assert_eq!(
            topology.node_count(),
            id_map.node_count(),
            "The topology and the id map have different numbers of nodes"
        );
        for (key, values) in node_properties.iter() {
            assert_eq!(
                values.len(),
                id_map.node_count(),
                "Node property {key:?} has the wrong length"
            );
        }
        Self {
            relationship_count: topology.element_count(),
            undirected: topology.orientation() == super::csr::Orientation::Undirected,
            has_relationship_property: properties.is_some(),
            id_map,
            node_properties,
            topology: Some(Topology::new(topology)),
            properties: properties.map(|csr| PropertyTopology {
                cursor: PropertyCursor::new(csr.list().clone()),
                csr,
                index: property_index,
            }),
            can_release: true,
            shared,
        }
    }

    fn topology(&self) -> &Topology {
        self.topology
            .as_ref()
            .unwrap_or_else(|| panic!("The topology of this graph has been released"))
    }

    fn topology_mut(&mut self) -> &mut Topology {
        self.topology
            .as_mut()
            .unwrap_or_else(|| panic!("The topology of this graph has been released"))
    }

    /// Returns the id map of the view.
    pub fn id_map(&self) -> &Arc<IdMap> {
        &self.id_map
    }

    /// Returns the blocks of the view.
    ///
    /// # Panics
    ///
    /// Panics if the topology has been released.
    pub fn relationships(&self) -> Relationships {
        Relationships {
            topology: self.topology().csr.clone(),
            properties: self.properties.as_ref().map(|p| p.csr.clone()),
        }
    }
}

impl Graph for CsrGraph {
    type Intersect = CsrIntersect;

    fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    #[inline(always)]
    fn degree(&self, node: usize) -> usize {
        self.topology().csr.offsets().degree(node)
    }

    fn is_undirected(&self) -> bool {
        self.undirected
    }

    fn has_relationship_property(&self) -> bool {
        self.has_relationship_property
    }

    fn has_topology(&self) -> bool {
        self.topology.is_some()
    }

    fn for_each_relationship(
        &mut self,
        node: usize,
        mut consumer: impl FnMut(usize, usize) -> bool,
    ) -> Result<(), DecodeError> {
        let cursor = self.topology_mut().adjacency_cursor_for_iteration(node)?;
        while cursor.has_next() {
            if !consumer(node, cursor.next_target()?) {
                break;
            }
        }
        Ok(())
    }

    fn for_each_relationship_with_property(
        &mut self,
        node: usize,
        fallback: f64,
        mut consumer: impl FnMut(usize, usize, f64) -> bool,
    ) -> Result<(), DecodeError> {
        if !self.has_relationship_property {
            return self.for_each_relationship(node, |s, t| consumer(s, t, fallback));
        }
        let topology = self
            .topology
            .as_mut()
            .unwrap_or_else(|| panic!("The topology of this graph has been released"));
        let properties = self
            .properties
            .as_mut()
            .unwrap_or_else(|| panic!("The relationship property of this graph has been released"));
        let cursor = topology.adjacency_cursor_for_iteration(node)?;
        properties
            .cursor
            .init(properties.csr.offset(node), cursor.remaining())?;
        while cursor.has_next() {
            let target = cursor.next_target()?;
            if !consumer(node, target, properties.cursor.next_value()) {
                break;
            }
        }
        Ok(())
    }

    fn node_properties(&self, key: &str) -> Option<&NodeProperties> {
        self.node_properties.get(key)
    }

    fn available_node_properties(&self) -> Vec<&str> {
        self.node_properties.keys().map(String::as_str).collect()
    }

    fn available_node_labels(&self) -> Vec<&str> {
        self.id_map
            .available_node_labels()
            .map(|label| label.name())
            .collect()
    }

    fn has_label(&self, node: usize, label: &str) -> bool {
        self.id_map.has_label(node, label)
    }

    fn to_mapped_node_id(&self, original: u64) -> Option<usize> {
        self.id_map.to_mapped_node_id(original)
    }

    fn to_original_node_id(&self, node: usize) -> u64 {
        self.id_map.to_original_node_id(node)
    }

    fn contains(&self, original: u64) -> bool {
        self.id_map.contains(original)
    }

    fn concurrent_copy(&self) -> Self {
        Self {
            id_map: self.id_map.clone(),
            node_properties: self.node_properties.clone(),
            topology: self.topology.as_ref().map(|t| Topology::new(t.csr.clone())),
            properties: self.properties.as_ref().map(|p| PropertyTopology {
                csr: p.csr.clone(),
                cursor: PropertyCursor::new(p.csr.list().clone()),
                index: p.index,
            }),
            relationship_count: self.relationship_count,
            undirected: self.undirected,
            has_relationship_property: self.has_relationship_property,
            can_release: self.can_release,
            shared: self.shared.clone(),
        }
    }

    fn intersection(&self, max_degree: usize) -> Result<CsrIntersect, Unsupported> {
        if !self.undirected {
            return Err(Unsupported {
                operation: "Intersection on a directed graph",
                view: "CsrGraph",
            });
        }
        let csr = &self.topology().csr;
        Ok(CsrIntersect {
            cursor: DecompressingCursor::new(csr.list().clone()),
            topology: csr.clone(),
            max_degree,
            pivot: vec![],
        })
    }

    fn can_release(&mut self, can_release: bool) {
        self.can_release = can_release;
    }

    fn release_topology(&mut self) {
        if !self.can_release {
            return;
        }
        if let Some(topology) = self.topology.take() {
            self.shared.take_topology();
            debug!("Released topology ({} bytes)", topology.csr.size_in_bytes());
        }
    }

    fn release_properties(&mut self) {
        if !self.can_release {
            return;
        }
        if let Some(properties) = self.properties.take() {
            self.shared.take_property(properties.index);
            debug!(
                "Released relationship property ({} bytes)",
                properties.csr.size_in_bytes()
            );
        }
    }
}

/// Triangle enumeration on an undirected [`CsrGraph`].
///
/// The list of the pivot node is decoded once; the lists of its larger
/// neighbors are then merged against it. The enumerator keeps the topology
/// alive, even if the view it comes from releases it.
#[derive(Debug)]
pub struct CsrIntersect {
    topology: TopologyCsr,
    cursor: DecompressingCursor,
    max_degree: usize,
    pivot: Vec<usize>,
}

impl CsrIntersect {
    fn init(&mut self, node: usize) -> Result<(), DecodeError> {
        let offsets = self.topology.offsets();
        self.cursor.init(offsets.offset(node), offsets.degree(node))
    }
}

impl RelationshipIntersect for CsrIntersect {
    fn intersect_all(
        &mut self,
        a: usize,
        mut consumer: impl FnMut(usize, usize, usize),
    ) -> Result<(), DecodeError> {
        if self.topology.offsets().degree(a) > self.max_degree {
            return Ok(());
        }
        self.pivot.clear();
        self.init(a)?;
        while let Some(b) = self.cursor.advance(a + 1)? {
            if self.pivot.last() != Some(&b) && self.topology.offsets().degree(b) <= self.max_degree
            {
                self.pivot.push(b);
            }
        }

        for i in 0..self.pivot.len() {
            let b = self.pivot[i];
            self.init(b)?;
            let mut j = i + 1;
            while j < self.pivot.len() {
                let Some(c) = self.cursor.advance(self.pivot[j])? else {
                    break;
                };
                while j < self.pivot.len() && self.pivot[j] < c {
                    j += 1;
                }
                if j < self.pivot.len() && self.pivot[j] == c {
                    consumer(a, b, c);
                    j += 1;
                }
            }
        }
        Ok(())
    }
}
