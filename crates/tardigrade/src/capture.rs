//! Per-call capture scope and the work-unit contract.
//!
//! Provides:
//! - `Capture`, a scope with two callback slots (tracked and frozen) that
//!   collects a type-erased handle for every array a work unit declares
//! - `Restartable`, the trait a work unit implements so the checkpoint
//!   driver can learn its array set without running its body

use crate::view::{ArrayHandle, ConstArrayHandle, Element, FrozenArray, TrackedArray};
use crate::Result;

struct Slots<'a> {
    on_tracked: Box<dyn FnMut(ArrayHandle) + 'a>,
    on_frozen: Box<dyn FnMut(ConstArrayHandle) + 'a>,
}

/// Collects array handles declared by one work unit.
///
/// A capture is either armed, with one callback per handle kind, or idle.
/// While armed, every [`TrackedArray::expose`] delivers a writable handle
/// to the tracked slot and every [`FrozenArray::expose`] delivers a
/// read-only handle to the frozen slot. While idle, `expose` calls are
/// accepted and dropped, so the same declaration code runs unchanged when
/// nobody is collecting.
///
/// The checkpoint driver arms a capture, walks the work unit's `expose`,
/// and disarms before touching any storage, so each driver call sees
/// exactly the arrays of that call. Captures are plain values; nothing is
/// shared between concurrent calls.
pub struct Capture<'a> {
    slots: Option<Slots<'a>>,
}

impl<'a> Capture<'a> {
    /// A disarmed capture. Declarations against it are no-ops.
    pub fn idle() -> Self {
        Self { slots: None }
    }

    /// A capture armed with both callback slots.
    pub fn armed(
        on_tracked: impl FnMut(ArrayHandle) + 'a,
        on_frozen: impl FnMut(ConstArrayHandle) + 'a,
    ) -> Self {
        Self {
            slots: Some(Slots {
                on_tracked: Box::new(on_tracked),
                on_frozen: Box::new(on_frozen),
            }),
        }
    }

    /// Arm (or re-arm) both callback slots.
    pub fn set(
        &mut self,
        on_tracked: impl FnMut(ArrayHandle) + 'a,
        on_frozen: impl FnMut(ConstArrayHandle) + 'a,
    ) {
        self.slots = Some(Slots {
            on_tracked: Box::new(on_tracked),
            on_frozen: Box::new(on_frozen),
        });
    }

    /// Disarm; subsequent declarations are dropped.
    pub fn clear(&mut self) {
        self.slots = None;
    }

    /// Whether declarations are currently being collected.
    pub fn is_armed(&self) -> bool {
        self.slots.is_some()
    }

    /// Record a mutable array declaration.
    ///
    /// Builds a handle and delivers it to the tracked slot. Handle
    /// construction can fail (zero-sized element types); the error aborts
    /// the enclosing driver call before any execution or storage work.
    pub fn record_tracked<A: Element>(&mut self, array: &TrackedArray<A>) -> Result<()> {
        if let Some(slots) = self.slots.as_mut() {
            (slots.on_tracked)(array.handle()?);
        }
        Ok(())
    }

    /// Record a read-only array declaration.
    pub fn record_frozen<A: Element>(&mut self, array: &FrozenArray<A>) -> Result<()> {
        if let Some(slots) = self.slots.as_mut() {
            (slots.on_frozen)(array.handle()?);
        }
        Ok(())
    }
}

/// One unit of restartable work.
///
/// `expose` declares every array whose contents the body reads or writes
/// across iterations; `execute` runs the body once. The two are separate so
/// the checkpoint driver can decide, after seeing the array set, whether to
/// restore saved state instead of executing.
///
/// `expose` must be cheap, side-effect free on the work unit itself, and
/// deterministic: the driver relies on it declaring the same arrays whether
/// the call ends up restoring or executing.
pub trait Restartable {
    /// Declare the work unit's array set to `capture`.
    fn expose(&self, capture: &mut Capture<'_>) -> Result<()>;

    /// Run the body once.
    fn execute(&mut self) -> Result<()>;
}

impl<T: Restartable + ?Sized> Restartable for &mut T {
    fn expose(&self, capture: &mut Capture<'_>) -> Result<()> {
        (**self).expose(capture)
    }

    fn execute(&mut self) -> Result<()> {
        (**self).execute()
    }
}
