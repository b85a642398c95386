/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::graphs::csr::{Orientation, PropertyCsr, Relationships, TopologyCsr};
use crate::graphs::csr_graph::{CsrGraph, SharedBlocks};
use crate::graphs::id_map::IdMap;
use crate::graphs::node_properties::NodeProperties;
use crate::traits::GraphError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The immutable result of a [`GraphBuilder`](super::GraphBuilder).
///
/// A store owns the id map, the node properties, the topology, and one
/// property block for each declared relationship property key. Views
/// obtained with [`graph`](GraphStore::graph) share all these with the
/// store.
///
/// When a view releases a block, the store drops its own reference to the
/// block too: the memory is freed (and leaves the tracker) once the views
/// still holding the block release or drop it, and the store returns
/// [`GraphError::Released`] when asked for a view on it.
#[derive(Debug)]
pub struct GraphStore {
    id_map: Arc<IdMap>,
    node_properties: Arc<BTreeMap<String, NodeProperties>>,
    property_keys: Vec<String>,
    relationship_count: usize,
    orientation: Orientation,
    blocks: Arc<SharedBlocks>,
}

impl GraphStore {
    pub(crate) fn new(
        id_map: Arc<IdMap>,
        node_properties: Arc<BTreeMap<String, NodeProperties>>,
        topology: TopologyCsr,
        properties: Vec<(String, PropertyCsr)>,
    ) -> Self {
        let (property_keys, properties): (Vec<String>, Vec<PropertyCsr>) =
            properties.into_iter().unzip();
        Self {
            id_map,
            node_properties,
            property_keys,
            relationship_count: topology.element_count(),
            orientation: topology.orientation(),
            blocks: Arc::new(SharedBlocks::new(topology, properties)),
        }
    }

    /// Returns a view exposing the given relationship property, or no
    /// relationship property if `property` is `None`.
    pub fn graph(&self, property: Option<&str>) -> Result<CsrGraph, GraphError> {
        let topology = self
            .blocks
            .topology()
            .ok_or_else(|| GraphError::Released("topology".to_owned()))?;
        let (index, properties) = match property {
            None => (0, None),
            Some(key) => {
                let index = self
                    .property_keys
                    .iter()
                    .position(|k| k == key)
                    .ok_or_else(|| GraphError::UnknownRelationshipProperty(key.to_owned()))?;
                let csr = self.blocks.property(index).ok_or_else(|| {
                    GraphError::Released(format!("relationship property {key:?}"))
                })?;
                (index, Some(csr))
            }
        };
        Ok(CsrGraph::from_shared(
            self.id_map.clone(),
            self.node_properties.clone(),
            Relationships::new(topology, properties),
            self.blocks.clone(),
            index,
        ))
    }

    pub fn id_map(&self) -> &Arc<IdMap> {
        &self.id_map
    }

    pub fn node_count(&self) -> usize {
        self.id_map.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.relationship_count
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Returns the relationship property keys, in declaration order.
    pub fn relationship_property_keys(&self) -> impl Iterator<Item = &str> {
        self.property_keys.iter().map(String::as_str)
    }

    pub fn node_property_keys(&self) -> impl Iterator<Item = &str> {
        self.node_properties.keys().map(String::as_str)
    }

    /// Returns the exact number of bytes of the compressed blocks the store
    /// still holds.
    pub fn size_in_bytes(&self) -> usize {
        self.blocks
            .topology()
            .map_or(0, |topology| topology.size_in_bytes())
            + (0..self.property_keys.len())
                .filter_map(|index| self.blocks.property(index))
                .map(|csr| csr.size_in_bytes())
                .sum::<usize>()
    }
}
