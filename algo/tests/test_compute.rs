/*
 * SPDX-FileCopyrightText: 2025 Inria
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use anyhow::{Result, bail};
use dsi_progress_logger::{
    ConcurrentProgressLog, concurrent_progress_logger, no_logging, progress_logger,
};
use predicates::prelude::*;
use std::ops::ControlFlow;
use vcgraph_algo::compute::preds::{MaxIterations, PredParams};
use vcgraph_algo::compute::{ComputeEngine, ComputeStep, Interrupted, TerminationFlag};

/// Reports a change for the first `changes` iterations.
#[derive(Debug, Clone, Default)]
struct CountdownStep {
    changes: usize,
    computed: usize,
    fail_at: Option<usize>,
    released: bool,
}

impl CountdownStep {
    fn new(changes: usize) -> Self {
        Self {
            changes,
            ..Default::default()
        }
    }
}

impl ComputeStep for CountdownStep {
    fn compute(
        &mut self,
        iteration: usize,
        pl: &mut impl ConcurrentProgressLog,
    ) -> anyhow::Result<bool> {
        if self.fail_at == Some(iteration) {
            bail!("Corrupt batch");
        }
        self.computed += 1;
        pl.update();
        Ok(iteration < self.changes)
    }

    fn release(&mut self) {
        self.released = true;
    }
}

fn continue_always(_: &mut [CountdownStep], _: usize) -> Result<ControlFlow<()>> {
    Ok(ControlFlow::Continue(()))
}

#[test]
fn test_convergence() -> Result<()> {
    let engine = ComputeEngine::new(2);
    let mut steps = vec![CountdownStep::new(3), CountdownStep::new(1)];
    let outcome = engine.run(
        &mut steps,
        MaxIterations::default(),
        continue_always,
        no_logging![],
        no_logging![],
    )?;
    // Three iterations with changes, and a fourth one without
    assert_eq!(outcome.iterations, 4);
    assert!(outcome.did_converge);
    for step in &steps {
        assert_eq!(step.computed, 4);
        assert!(step.released);
    }
    Ok(())
}

#[test]
fn test_iteration_cap() -> Result<()> {
    let engine = ComputeEngine::new(2);
    let mut steps = vec![CountdownStep::new(usize::MAX); 3];
    let outcome = engine.run(
        &mut steps,
        MaxIterations::from(5),
        continue_always,
        no_logging![],
        no_logging![],
    )?;
    assert_eq!(outcome.iterations, 5);
    assert!(!outcome.did_converge);
    assert!(steps.iter().all(|step| step.released));
    Ok(())
}

#[test]
fn test_zero_iterations() -> Result<()> {
    let engine = ComputeEngine::new(2);
    let mut steps = vec![CountdownStep::new(usize::MAX); 3];
    let mut calls = 0;
    let outcome = engine.run(
        &mut steps,
        MaxIterations::from(0),
        |_, _| {
            calls += 1;
            Ok(ControlFlow::Continue(()))
        },
        no_logging![],
        no_logging![],
    )?;
    assert_eq!(outcome.iterations, 0);
    assert!(!outcome.did_converge);
    assert_eq!(calls, 0);
    assert!(steps.iter().all(|step| step.computed == 0 && step.released));
    Ok(())
}

#[test]
fn test_composed_predicate() -> Result<()> {
    let engine = ComputeEngine::new(1);
    let mut steps = vec![CountdownStep::new(usize::MAX)];
    let predicate = MaxIterations::from(100).or(predicate::function(|p: &PredParams| {
        p.iteration == 7
    }));
    let outcome = engine.run(
        &mut steps,
        predicate,
        continue_always,
        no_logging![],
        no_logging![],
    )?;
    assert_eq!(outcome.iterations, 7);
    assert!(!outcome.did_converge);
    Ok(())
}

#[test]
fn test_barrier_break() -> Result<()> {
    let engine = ComputeEngine::new(2);
    let mut steps = vec![CountdownStep::new(usize::MAX), CountdownStep::new(0)];
    let mut calls = vec![];
    let outcome = engine.run(
        &mut steps,
        MaxIterations::from(10),
        |steps, iteration| {
            calls.push(iteration);
            assert_eq!(steps.len(), 2);
            assert!(steps.iter().all(|step| step.computed == iteration));
            Ok(if iteration == 3 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        },
        no_logging![],
        no_logging![],
    )?;
    assert_eq!(calls, [1, 2, 3]);
    assert_eq!(outcome.iterations, 3);
    assert!(outcome.did_converge);
    Ok(())
}

#[test]
fn test_interrupted_before_start() -> Result<()> {
    let flag = TerminationFlag::new();
    flag.terminate();
    let mut engine = ComputeEngine::new(2);
    engine.termination_flag(flag.clone());
    let mut steps = vec![CountdownStep::new(usize::MAX); 2];
    let err = engine
        .run(
            &mut steps,
            MaxIterations::default(),
            continue_always,
            no_logging![],
            no_logging![],
        )
        .unwrap_err();
    assert_eq!(err.downcast_ref::<Interrupted>(), Some(&Interrupted));
    assert!(steps.iter().all(|step| step.computed == 0 && step.released));
    Ok(())
}

#[test]
fn test_interrupted_at_barrier() -> Result<()> {
    let flag = TerminationFlag::new();
    let mut engine = ComputeEngine::new(2);
    engine.termination_flag(flag.clone());
    let mut steps = vec![CountdownStep::new(usize::MAX); 4];
    let err = engine
        .run(
            &mut steps,
            MaxIterations::default(),
            |_, iteration| {
                if iteration == 2 {
                    flag.terminate();
                }
                Ok(ControlFlow::Continue(()))
            },
            no_logging![],
            no_logging![],
        )
        .unwrap_err();
    assert!(err.is::<Interrupted>());
    // The request is honored at the barrier: no step is cut short
    assert!(steps.iter().all(|step| step.computed == 2));
    Ok(())
}

#[test]
fn test_step_failure() -> Result<()> {
    let engine = ComputeEngine::new(2);
    let mut steps = vec![CountdownStep::new(usize::MAX); 4];
    steps[2].fail_at = Some(1);
    let err = engine
        .run(
            &mut steps,
            MaxIterations::default(),
            continue_always,
            no_logging![],
            no_logging![],
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Compute step failed at iteration 2");
    assert_eq!(err.root_cause().to_string(), "Corrupt batch");
    assert!(steps.iter().all(|step| step.released));
    Ok(())
}

#[test]
fn test_with_logging() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let engine = ComputeEngine::new(3);
    let mut steps = (0..6).map(CountdownStep::new).collect::<Vec<_>>();
    let mut pl = progress_logger![item_name = "iteration"];
    let mut cpl = concurrent_progress_logger![item_name = "node"];
    let outcome = engine.run(
        &mut steps,
        MaxIterations::default(),
        continue_always,
        &mut pl,
        &mut cpl,
    )?;
    assert_eq!(outcome.iterations, 6);
    assert!(outcome.did_converge);
    Ok(())
}

#[test]
fn test_no_steps() -> Result<()> {
    let engine = ComputeEngine::new(1);
    let mut steps = Vec::<CountdownStep>::new();
    let outcome = engine.run(
        &mut steps,
        MaxIterations::default(),
        continue_always,
        no_logging![],
        no_logging![],
    )?;
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.did_converge);
    Ok(())
}

#[test]
fn test_max_iterations_display() {
    assert_eq!(MaxIterations::from(3).to_string(), "(max iterations: 3)");
    assert!(!MaxIterations::default().eval(&PredParams { iteration: 1000 }));
    assert!(MaxIterations::from(None).eval(&PredParams {
        iteration: usize::MAX
    }));
}
