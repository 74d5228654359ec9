//! # Tardigrade
//!
//! A checkpoint/restart capture layer for long-running iterative array
//! computations.
//!
//! ## Overview
//!
//! Tardigrade wraps one unit of work (an "iteration" of a simulation loop)
//! so that the multi-dimensional array state it touches can be saved to, or
//! restored from, a durable backend without the caller enumerating or
//! serializing arrays by hand. It provides:
//!
//! - `TrackedArray` / `FrozenArray` wrappers around `ndarray` state, with
//!   type-erased `ArrayHandle` / `ConstArrayHandle` views for uniform
//!   byte-buffer transfer
//! - A per-call `Capture` scope that collects a handle for every array a
//!   work unit exposes
//! - The `checkpoint` driver: restore saved state for `(label, iteration)`
//!   if it exists, otherwise execute the work once and persist on the way
//!   out
//! - Iteration filters (`AcceptAll`, `NthIteration`) deciding which
//!   successful executions are worth persisting
//! - `FileBackend` and `MemoryBackend` storage implementations of the
//!   `Backend` contract
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tardigrade::prelude::*;
//! use ndarray::ArrayD;
//!
//! struct Step {
//!     temperature: TrackedArray<f64>,
//!     source: FrozenArray<f64>,
//! }
//!
//! impl Restartable for Step {
//!     fn expose(&self, capture: &mut Capture<'_>) -> tardigrade::Result<()> {
//!         self.temperature.expose(capture)?;
//!         self.source.expose(capture)?;
//!         Ok(())
//!     }
//!
//!     fn execute(&mut self) -> tardigrade::Result<()> {
//!         // ... one iteration of the simulation
//!         Ok(())
//!     }
//! }
//!
//! let mut ctx = Context::new(FileBackend::new("checkpoints"));
//! let mut step = /* ... */;
//!
//! for iteration in 0..1000 {
//!     // Restores instead of executing when a checkpoint for
//!     // ("diffusion", iteration) already exists.
//!     checkpoint_with(&mut ctx, "diffusion", iteration, &mut step,
//!                     NthIteration::new(10)?)?;
//! }
//! ```
//!
//! Restore and execute are mutually exclusive per call: a call either fills
//! the exposed arrays from storage (the work's real body does not run) or
//! runs the body exactly once and then persists if the filter accepts the
//! iteration.

pub mod backend;
pub mod capture;
pub mod checkpoint;
pub mod view;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{Backend, FileBackend, FileBackendConfig, MemoryBackend};
    pub use crate::capture::{Capture, Restartable};
    pub use crate::checkpoint::{
        checkpoint, checkpoint_with, AcceptAll, CheckpointFilter, Context, NthIteration, Outcome,
    };
    pub use crate::view::{ArrayHandle, ConstArrayHandle, Element, FrozenArray, TrackedArray};
    pub use crate::{Error, Result};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for the library
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A filter was constructed with parameters that can never be satisfied.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// An array cannot be reconciled with the flat byte-buffer transfer
    /// contract. Raised once, at handle construction.
    #[error("unsupported layout for '{label}': {reason}")]
    UnsupportedLayout { label: String, reason: String },

    /// A checkpoint label is unusable as a storage key.
    #[error("invalid checkpoint label {0:?}")]
    InvalidLabel(String),

    /// No stored state exists for the requested key.
    #[error("no checkpoint stored for '{label}' at iteration {iteration}")]
    MissingCheckpoint { label: String, iteration: u64 },

    /// A transfer buffer or the live array disagrees with the size a
    /// handle recorded at construction.
    #[error("size mismatch for '{label}': expected {expected} bytes, got {actual}")]
    SizeMismatch {
        label: String,
        expected: usize,
        actual: usize,
    },

    /// Stored checkpoint data is structurally unreadable.
    #[error("corrupt checkpoint data: {0}")]
    Format(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Codec(#[from] bincode::Error),

    /// Work-unit execution failed.
    #[error("execution failed: {0}")]
    Execution(String),
}

pub type Result<T> = std::result::Result<T, Error>;
