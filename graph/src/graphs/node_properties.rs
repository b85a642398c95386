/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fmt::Display;

/// The type of the values of a node property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    Long,
    Double,
    DoubleArray,
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Long => f.write_str("long"),
            ValueType::Double => f.write_str("double"),
            ValueType::DoubleArray => f.write_str("double array"),
        }
    }
}

/// A single node property value, as provided at ingestion time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Long(i64),
    Double(f64),
    DoubleArray(Box<[f64]>),
}

impl PropertyValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            PropertyValue::Long(_) => ValueType::Long,
            PropertyValue::Double(_) => ValueType::Double,
            PropertyValue::DoubleArray(_) => ValueType::DoubleArray,
        }
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(value: Vec<f64>) -> Self {
        PropertyValue::DoubleArray(value.into_boxed_slice())
    }
}

/// The values of a node property, indexed by internal node id.
///
/// Nodes without a value get the default value of the column type:
/// [`DEFAULT_LONG`](Self::DEFAULT_LONG) for longs, NaN for doubles, and an
/// empty array for double arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeProperties {
    Long(Box<[i64]>),
    Double(Box<[f64]>),
    DoubleArray(Box<[Box<[f64]>]>),
}

impl NodeProperties {
    pub const DEFAULT_LONG: i64 = i64::MIN;

    /// Creates a column of the given type and length filled with defaults.
    pub fn with_defaults(value_type: ValueType, len: usize) -> Self {
        match value_type {
            ValueType::Long => NodeProperties::Long(vec![Self::DEFAULT_LONG; len].into()),
            ValueType::Double => NodeProperties::Double(vec![f64::NAN; len].into()),
            ValueType::DoubleArray => {
                NodeProperties::DoubleArray(vec![Box::default(); len].into())
            }
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            NodeProperties::Long(_) => ValueType::Long,
            NodeProperties::Double(_) => ValueType::Double,
            NodeProperties::DoubleArray(_) => ValueType::DoubleArray,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NodeProperties::Long(v) => v.len(),
            NodeProperties::Double(v) => v.len(),
            NodeProperties::DoubleArray(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the value of a node in a long column, unless it is missing or
    /// the column has a different type.
    pub fn long_value(&self, node: usize) -> Option<i64> {
        match self {
            NodeProperties::Long(v) if v[node] != Self::DEFAULT_LONG => Some(v[node]),
            _ => None,
        }
    }

    /// Returns the value of a node in a long or double column, unless it is
    /// missing or the column has a different type.
    pub fn double_value(&self, node: usize) -> Option<f64> {
        match self {
            NodeProperties::Double(v) if !v[node].is_nan() => Some(v[node]),
            NodeProperties::Long(_) => self.long_value(node).map(|v| v as f64),
            _ => None,
        }
    }

    /// Returns the value of a node as an array.
    ///
    /// Double columns yield arrays of length one; missing values yield
    /// `None`.
    pub fn double_array_value(&self, node: usize) -> Option<&[f64]> {
        match self {
            NodeProperties::DoubleArray(v) if !v[node].is_empty() => Some(&v[node]),
            NodeProperties::Double(v) if !v[node].is_nan() => {
                Some(core::slice::from_ref(&v[node]))
            }
            _ => None,
        }
    }

    /// Returns whether the node has a value.
    pub fn has_value(&self, node: usize) -> bool {
        match self {
            NodeProperties::Long(v) => v[node] != Self::DEFAULT_LONG,
            NodeProperties::Double(v) => !v[node].is_nan(),
            NodeProperties::DoubleArray(v) => !v[node].is_empty(),
        }
    }

    /// Sets the value of a node.
    ///
    /// Returns the value back if its type does not match the column type.
    pub fn set(&mut self, node: usize, value: PropertyValue) -> Result<(), PropertyValue> {
        match (self, value) {
            (NodeProperties::Long(v), PropertyValue::Long(x)) => v[node] = x,
            (NodeProperties::Double(v), PropertyValue::Double(x)) => v[node] = x,
            (NodeProperties::DoubleArray(v), PropertyValue::DoubleArray(x)) => v[node] = x,
            (_, value) => return Err(value),
        }
        Ok(())
    }

    /// Returns a new column containing the values of the given nodes, in the
    /// given order.
    pub fn select(&self, nodes: &[usize]) -> Self {
        match self {
            NodeProperties::Long(v) => NodeProperties::Long(nodes.iter().map(|&n| v[n]).collect()),
            NodeProperties::Double(v) => {
                NodeProperties::Double(nodes.iter().map(|&n| v[n]).collect())
            }
            NodeProperties::DoubleArray(v) => {
                NodeProperties::DoubleArray(nodes.iter().map(|&n| v[n].clone()).collect())
            }
        }
    }
}
