//! Iteration filters deciding which executions get persisted.

use crate::{Error, Result};

/// Decides whether the state produced by an iteration is worth persisting.
///
/// Consulted only after a successful execution; restores never ask. Any
/// `Fn(u64) -> bool` closure works where a filter is expected.
pub trait CheckpointFilter {
    fn accept(&self, iteration: u64) -> bool;
}

impl<F: Fn(u64) -> bool> CheckpointFilter for F {
    fn accept(&self, iteration: u64) -> bool {
        self(iteration)
    }
}

/// Persist every iteration.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl CheckpointFilter for AcceptAll {
    fn accept(&self, _iteration: u64) -> bool {
        true
    }
}

/// Persist every Nth iteration (those with `iteration % n == 0`).
#[derive(Debug, Clone, Copy)]
pub struct NthIteration {
    every: u64,
}

impl NthIteration {
    /// Accept multiples of `every`. Zero is rejected outright rather than
    /// becoming a filter that silently never persists.
    pub fn new(every: u64) -> Result<Self> {
        if every == 0 {
            return Err(Error::InvalidFilter(
                "iteration interval must be nonzero".to_string(),
            ));
        }
        Ok(Self { every })
    }

    pub fn interval(&self) -> u64 {
        self.every
    }
}

impl CheckpointFilter for NthIteration {
    fn accept(&self, iteration: u64) -> bool {
        iteration % self.every == 0
    }
}
