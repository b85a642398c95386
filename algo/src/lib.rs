/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

#![doc = include_str!("../README.md")]
#![deny(unstable_features)]
#![deny(trivial_casts)]
#![deny(unconditional_recursion)]
#![deny(clippy::empty_loop)]
#![deny(unreachable_code)]
#![deny(unreachable_patterns)]
#![deny(unused_macro_rules)]
#![deny(unused_doc_comments)]

pub mod closeness;
pub mod compute;
pub mod conductance;
pub mod kmeans;
pub mod label_propagation;

pub mod prelude {
    pub use crate::closeness::ClosenessCentrality;
    pub use crate::compute::preds::MaxIterations;
    pub use crate::compute::{
        ComputeEngine, ComputeOutcome, ComputeStep, Interrupted, TerminationFlag,
    };
    pub use crate::conductance::Conductance;
    pub use crate::kmeans::Kmeans;
    pub use crate::label_propagation::LabelPropagation;
}
