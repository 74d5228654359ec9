//! Checkpoint orchestration.
//!
//! Provides:
//! - `Context`, owning the backend and the capture capability flag
//! - `checkpoint` / `checkpoint_with`, the restore-or-execute driver
//! - `Outcome`, reporting which terminal path a call took
//! - `CheckpointFilter` and the shipped `AcceptAll` / `NthIteration`
//!   filters

mod context;
mod driver;
mod filter;

pub use context::Context;
pub use driver::{checkpoint, checkpoint_with, Outcome};
pub use filter::{AcceptAll, CheckpointFilter, NthIteration};
