//! Shared array cells registered for checkpoint capture.

use std::sync::Arc;

use ndarray::ArrayD;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::element::Element;
use super::handle::{ArrayHandle, ConstArrayHandle};
use crate::capture::Capture;
use crate::Result;

/// Mutable simulation state that checkpoints can save and restore.
///
/// A `TrackedArray` is a labeled, shared cell around an `ndarray::ArrayD`.
/// Cloning it shares the underlying storage rather than duplicating the
/// data, so a work unit and the handles captured from it always observe the
/// same bytes.
///
/// # Example
///
/// ```rust,ignore
/// let u = TrackedArray::new("temperature", ArrayD::zeros(IxDyn(&[64])));
/// u.write()[[0]] = 1.0;
/// assert_eq!(u.read()[[0]], 1.0);
/// ```
pub struct TrackedArray<A> {
    label: String,
    data: Arc<RwLock<ArrayD<A>>>,
}

impl<A> Clone for TrackedArray<A> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

impl<A: Element> TrackedArray<A> {
    /// Wrap an array under a stable label.
    ///
    /// The label identifies this array inside a checkpoint record; keep it
    /// unique within one work unit.
    pub fn new(label: impl Into<String>, array: ArrayD<A>) -> Self {
        Self {
            label: label.into(),
            data: Arc::new(RwLock::new(array)),
        }
    }

    /// Label this array is captured and persisted under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current shape.
    pub fn shape(&self) -> Vec<usize> {
        self.data.read().shape().to_vec()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the array for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, ArrayD<A>> {
        self.data.read()
    }

    /// Lock the array for writing.
    pub fn write(&self) -> RwLockWriteGuard<'_, ArrayD<A>> {
        self.data.write()
    }

    /// Deep copy of the current contents.
    pub fn snapshot(&self) -> ArrayD<A> {
        self.data.read().clone()
    }

    /// Declare this array to an armed capture scope.
    ///
    /// Delivers one mutable handle to the capture's tracked slot; a no-op
    /// when the capture is disarmed.
    pub fn expose(&self, capture: &mut Capture<'_>) -> Result<()> {
        capture.record_tracked(self)
    }

    /// Build a type-erased handle bound to this array's storage.
    pub fn handle(&self) -> Result<ArrayHandle> {
        ArrayHandle::for_array(self)
    }

    pub(crate) fn storage(&self) -> &Arc<RwLock<ArrayD<A>>> {
        &self.data
    }
}

/// Read-only input data visible to capture but never persisted.
///
/// A `FrozenArray` carries content that is assumed derivable or immutable
/// (stencil coefficients, boundary masks, lookup tables). It is captured so
/// the work unit's full array set is known, but no write path to it exists
/// anywhere in the crate: restores cannot touch it and backends never
/// receive it.
pub struct FrozenArray<A> {
    label: String,
    data: Arc<ArrayD<A>>,
}

impl<A> Clone for FrozenArray<A> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

impl<A: Element> FrozenArray<A> {
    /// Wrap an immutable array under a stable label.
    pub fn new(label: impl Into<String>, array: ArrayD<A>) -> Self {
        Self {
            label: label.into(),
            data: Arc::new(array),
        }
    }

    /// Label this array is captured under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current shape.
    pub fn shape(&self) -> Vec<usize> {
        self.data.shape().to_vec()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The wrapped array.
    pub fn array(&self) -> &ArrayD<A> {
        &self.data
    }

    /// Declare this array to an armed capture scope.
    ///
    /// Delivers one read-only handle to the capture's frozen slot; a no-op
    /// when the capture is disarmed.
    pub fn expose(&self, capture: &mut Capture<'_>) -> Result<()> {
        capture.record_frozen(self)
    }

    /// Build a type-erased read-only handle bound to this array's storage.
    pub fn handle(&self) -> Result<ConstArrayHandle> {
        ConstArrayHandle::for_array(self)
    }

    pub(crate) fn storage(&self) -> &Arc<ArrayD<A>> {
        &self.data
    }
}
