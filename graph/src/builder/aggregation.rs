/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use std::fmt::Display;

/// How parallel relationships (relationships with the same source and
/// target) are merged at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Aggregation {
    /// Parallel relationships are all kept.
    #[default]
    None,
    /// Only the first parallel relationship is kept.
    Single,
    /// Parallel relationships are merged, summing their values.
    Sum,
    /// Parallel relationships are merged, keeping the minimum value.
    Min,
    /// Parallel relationships are merged, keeping the maximum value.
    Max,
    /// Parallel relationships are merged; the value is their number.
    Count,
}

impl Aggregation {
    /// Merges the values of `count` parallel relationships.
    pub(crate) fn merge(self, mut values: impl Iterator<Item = f64>, count: usize) -> f64 {
        match self {
            Aggregation::None | Aggregation::Single => values.next().unwrap_or(f64::NAN),
            Aggregation::Sum => values.sum(),
            Aggregation::Min => values.fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Count => count as f64,
        }
    }
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Aggregation::None => "none",
            Aggregation::Single => "single",
            Aggregation::Sum => "sum",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Count => "count",
        })
    }
}
