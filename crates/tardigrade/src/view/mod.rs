//! Array state wrappers and type-erased handles.
//!
//! Provides:
//! - `TrackedArray` for mutable simulation state (checkpointed and restored)
//! - `FrozenArray` for read-only inputs (captured, never persisted)
//! - `ArrayHandle` / `ConstArrayHandle`, type-erased views exposing a
//!   uniform byte-buffer transfer contract over arrays of any element type,
//!   rank, and layout
//! - The `Element` marker for element types that can cross the flat-buffer
//!   boundary

mod element;
mod handle;
mod tracked;

pub use element::Element;
pub use handle::{ArrayHandle, ConstArrayHandle, HandleMeta};
pub use tracked::{FrozenArray, TrackedArray};
