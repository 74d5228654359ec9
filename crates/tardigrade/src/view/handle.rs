//! Type-erased array handles for uniform byte-buffer transfer.
//!
//! Capture scopes and backends never see element types. A handle carries
//! the metadata needed to size a transfer plus an erased reference to the
//! array's shared storage, so heterogeneous array sets move through one
//! `Vec<u8>`-per-array code path.

use std::fmt;
use std::mem;
use std::sync::Arc;

use ndarray::ArrayD;
use parking_lot::RwLock;
use zerocopy::IntoBytes;

use super::element::Element;
use super::tracked::{FrozenArray, TrackedArray};
use crate::{Error, Result};

/// Shape and identity of an array at the moment its handle was built.
///
/// Everything here is plain data. In particular `base_address` is kept for
/// identity and diagnostics only; transfers go through the shared storage,
/// never through the recorded pointer.
#[derive(Debug, Clone)]
pub struct HandleMeta {
    label: String,
    span: usize,
    element_size: usize,
    rank: usize,
    shape: Vec<usize>,
    contiguous: bool,
    base_address: usize,
}

impl HandleMeta {
    fn probe<A: Element>(label: &str, array: &ArrayD<A>) -> Result<Self> {
        let element_size = mem::size_of::<A>();
        if element_size == 0 {
            return Err(Error::UnsupportedLayout {
                label: label.to_string(),
                reason: "zero-sized element type".to_string(),
            });
        }
        Ok(Self {
            label: label.to_string(),
            span: array.len(),
            element_size,
            rank: array.ndim(),
            shape: array.shape().to_vec(),
            contiguous: array.is_standard_layout(),
            base_address: array.as_ptr() as usize,
        })
    }

    /// Label the array is stored under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of elements.
    pub fn span(&self) -> usize {
        self.span
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// Total transfer size in bytes (`span * element_size`).
    pub fn data_size(&self) -> usize {
        self.span * self.element_size
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Extent along each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Whether the elements were laid out contiguously in logical order.
    ///
    /// Transfers work either way; contiguous arrays take a single-memcpy
    /// path, the rest go element by element.
    pub fn contiguous(&self) -> bool {
        self.contiguous
    }

    /// Address of the first element when the handle was built.
    pub fn base_address(&self) -> *const u8 {
        self.base_address as *const u8
    }

    /// Whether the data lives in directly addressable host memory.
    ///
    /// Always true for `ndarray`-backed state; kept so callers sitting
    /// above mixed storage can gate on it uniformly.
    pub fn in_host_memory(&self) -> bool {
        true
    }
}

/// Storage access with the element type erased.
trait ErasedArray: Send + Sync {
    /// Copy the live contents into `buf` in logical element order.
    fn copy_to(&self, buf: &mut [u8]) -> Result<()>;
}

/// Erased storage access that can also be written back.
trait ErasedArrayMut: ErasedArray {
    /// Overwrite the live contents from `buf`, logical element order.
    fn copy_from(&self, buf: &[u8]) -> Result<()>;
}

struct TrackedSlot<A> {
    label: String,
    data: Arc<RwLock<ArrayD<A>>>,
}

struct FrozenSlot<A> {
    label: String,
    data: Arc<ArrayD<A>>,
}

fn check_size(label: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::SizeMismatch {
            label: label.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Write `array` into `buf` in logical (row-major) element order.
///
/// `buf.len()` must already equal the array's byte length.
fn copy_out<A: Element>(array: &ArrayD<A>, buf: &mut [u8]) {
    if let Some(slice) = array.as_slice() {
        buf.copy_from_slice(slice.as_bytes());
        return;
    }
    let width = mem::size_of::<A>();
    for (chunk, elem) in buf.chunks_exact_mut(width).zip(array.iter()) {
        chunk.copy_from_slice(elem.as_bytes());
    }
}

/// Overwrite `array` from `buf`, consuming bytes in logical element order.
///
/// `buf.len()` must already equal the array's byte length. The element-wise
/// path decodes per element, so `buf` needs no particular alignment.
fn copy_in<A: Element>(array: &mut ArrayD<A>, buf: &[u8]) -> Result<()> {
    if let Some(slice) = array.as_slice_mut() {
        slice.as_mut_bytes().copy_from_slice(buf);
        return Ok(());
    }
    let width = mem::size_of::<A>();
    for (elem, chunk) in array.iter_mut().zip(buf.chunks_exact(width)) {
        *elem = A::read_from_bytes(chunk)
            .map_err(|_| Error::Format("element decode failed".to_string()))?;
    }
    Ok(())
}

impl<A: Element> ErasedArray for TrackedSlot<A> {
    fn copy_to(&self, buf: &mut [u8]) -> Result<()> {
        let array = self.data.read();
        check_size(&self.label, array.len() * mem::size_of::<A>(), buf.len())?;
        copy_out(&array, buf);
        Ok(())
    }
}

impl<A: Element> ErasedArrayMut for TrackedSlot<A> {
    fn copy_from(&self, buf: &[u8]) -> Result<()> {
        let mut array = self.data.write();
        check_size(&self.label, array.len() * mem::size_of::<A>(), buf.len())?;
        copy_in(&mut array, buf)
    }
}

impl<A: Element> ErasedArray for FrozenSlot<A> {
    fn copy_to(&self, buf: &mut [u8]) -> Result<()> {
        check_size(&self.label, self.data.len() * mem::size_of::<A>(), buf.len())?;
        copy_out(&self.data, buf);
        Ok(())
    }
}

/// Type-erased, writable handle onto a [`TrackedArray`].
///
/// Cloning shares the underlying storage. Restoring through any clone is
/// visible to every holder of the array.
#[derive(Clone)]
pub struct ArrayHandle {
    meta: HandleMeta,
    slot: Arc<dyn ErasedArrayMut>,
}

impl ArrayHandle {
    pub(crate) fn for_array<A: Element>(array: &TrackedArray<A>) -> Result<Self> {
        let meta = HandleMeta::probe(array.label(), &array.read())?;
        Ok(Self {
            meta,
            slot: Arc::new(TrackedSlot {
                label: array.label().to_string(),
                data: Arc::clone(array.storage()),
            }),
        })
    }

    /// Label the array is stored under.
    pub fn label(&self) -> &str {
        self.meta.label()
    }

    /// Metadata recorded when the handle was built.
    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    /// Transfer size in bytes at handle-construction time.
    pub fn data_size(&self) -> usize {
        self.meta.data_size()
    }

    /// Copy the array into `buf` in logical element order.
    ///
    /// `buf` and the live array must both match the recorded `data_size`.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<()> {
        check_size(self.meta.label(), self.meta.data_size(), buf.len())?;
        self.slot.copy_to(buf)
    }

    /// Copy the array out into a fresh buffer sized from the recorded
    /// metadata.
    ///
    /// Fails with `SizeMismatch` if the array has been resized since the
    /// handle was built.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.meta.data_size()];
        self.slot.copy_to(&mut buf)?;
        Ok(buf)
    }

    /// Overwrite the array from `buf`, logical element order.
    ///
    /// `buf` and the live array must both match the recorded `data_size`.
    pub fn deserialize_from(&self, buf: &[u8]) -> Result<()> {
        check_size(self.meta.label(), self.meta.data_size(), buf.len())?;
        self.slot.copy_from(buf)
    }
}

impl fmt::Debug for ArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayHandle").field("meta", &self.meta).finish()
    }
}

/// Type-erased, read-only handle onto a [`FrozenArray`].
///
/// There is no write path: restore cannot reach the wrapped data.
#[derive(Clone)]
pub struct ConstArrayHandle {
    meta: HandleMeta,
    slot: Arc<dyn ErasedArray>,
}

impl ConstArrayHandle {
    pub(crate) fn for_array<A: Element>(array: &FrozenArray<A>) -> Result<Self> {
        let meta = HandleMeta::probe(array.label(), array.array())?;
        Ok(Self {
            meta,
            slot: Arc::new(FrozenSlot {
                label: array.label().to_string(),
                data: Arc::clone(array.storage()),
            }),
        })
    }

    /// Label the array is captured under.
    pub fn label(&self) -> &str {
        self.meta.label()
    }

    /// Metadata recorded when the handle was built.
    pub fn meta(&self) -> &HandleMeta {
        &self.meta
    }

    /// Transfer size in bytes at handle-construction time.
    pub fn data_size(&self) -> usize {
        self.meta.data_size()
    }

    /// Copy the array into `buf` in logical element order.
    ///
    /// `buf` must match the recorded `data_size`.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<()> {
        check_size(self.meta.label(), self.meta.data_size(), buf.len())?;
        self.slot.copy_to(buf)
    }

    /// Copy the array out into a fresh buffer sized from the recorded
    /// metadata.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.meta.data_size()];
        self.slot.copy_to(&mut buf)?;
        Ok(buf)
    }
}

impl fmt::Debug for ConstArrayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstArrayHandle")
            .field("meta", &self.meta)
            .finish()
    }
}
