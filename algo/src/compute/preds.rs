/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Predicates implementing stopping conditions for the
//! [compute engine](super::ComputeEngine).
//!
//! Predicates are evaluated after each iteration in which some step reported
//! a change, and stop the computation when they evaluate to true. They can be
//! combined using the `and` and `or` methods of [`Predicate`].
//!
//! # Examples
//! ```
//! use predicates::prelude::*;
//! use vcgraph_algo::compute::preds::{MaxIterations, PredParams};
//!
//! let predicate = MaxIterations::from(10);
//! assert!(!predicate.eval(&PredParams { iteration: 9 }));
//! assert!(predicate.eval(&PredParams { iteration: 10 }));
//! ```

use predicates::{Predicate, reflection::PredicateReflection};
use std::fmt::Display;

/// The information passed to stopping predicates.
#[derive(Debug, Clone, Copy)]
pub struct PredParams {
    /// The number of completed iterations.
    pub iteration: usize,
}

/// Stops after at most the provided number of iterations.
#[derive(Debug, Clone)]
pub struct MaxIterations {
    max_iterations: usize,
}

impl MaxIterations {
    pub const DEFAULT_MAX_ITERATIONS: usize = usize::MAX;
}

impl From<Option<usize>> for MaxIterations {
    fn from(max_iterations: Option<usize>) -> Self {
        match max_iterations {
            Some(max_iterations) => MaxIterations { max_iterations },
            None => Self::default(),
        }
    }
}

impl From<usize> for MaxIterations {
    fn from(max_iterations: usize) -> Self {
        Some(max_iterations).into()
    }
}

impl Default for MaxIterations {
    fn default() -> Self {
        Self {
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl Display for MaxIterations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("(max iterations: {})", self.max_iterations))
    }
}

impl PredicateReflection for MaxIterations {}
impl Predicate<PredParams> for MaxIterations {
    fn eval(&self, pred_params: &PredParams) -> bool {
        pred_params.iteration >= self.max_iterations
    }
}
