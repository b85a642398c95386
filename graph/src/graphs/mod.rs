/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Graph views and the data they are made of.

pub mod csr;
pub mod csr_graph;
pub mod filtered_graph;
pub mod id_map;
pub mod node_properties;

pub mod prelude {
    pub use super::csr::{Orientation, PropertyCsr, Relationships, TopologyCsr};
    pub use super::csr_graph::{CsrGraph, CsrIntersect};
    pub use super::filtered_graph::NodeFilteredGraph;
    pub use super::id_map::{IdMap, IdMapBuilder, InvalidLabel, NodeLabel};
    pub use super::node_properties::{NodeProperties, PropertyValue, ValueType};
}
