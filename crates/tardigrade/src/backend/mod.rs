//! Storage backends for checkpointed array state.
//!
//! Provides:
//! - The `Backend` trait: query, restore, persist, keyed by
//!   `(label, iteration)`
//! - `MemoryBackend`, an in-process map that doubles as the reference
//!   semantics for the contract
//! - `FileBackend`, one checkpoint file per key with atomic writes and
//!   optional retention

mod file;
mod memory;

pub use file::{FileBackend, FileBackendConfig};
pub use memory::MemoryBackend;

use serde::{Deserialize, Serialize};

use crate::view::ArrayHandle;
use crate::{Error, Result};

/// Durable storage for the array set of one work unit.
///
/// Keys are `(label, iteration)`; the value is the ordered list of array
/// contents captured from the call. Persisting the same key again replaces
/// the previous state. `restart` must populate every handle it is given or
/// fail without claiming success; a `restart_available` answer of `true`
/// promises a matching `restart` can be attempted.
pub trait Backend {
    /// Whether stored state exists for `(label, iteration)`.
    fn restart_available(&self, label: &str, iteration: u64) -> bool;

    /// Populate `handles` from the state stored under `(label, iteration)`.
    ///
    /// Handles are matched to stored records positionally; any count,
    /// label, or size disagreement is an error and the caller must assume
    /// the arrays are partially written.
    fn restart(&mut self, label: &str, iteration: u64, handles: &mut [ArrayHandle])
        -> Result<()>;

    /// Persist the current contents of `handles` under `(label, iteration)`.
    fn checkpoint(&mut self, label: &str, iteration: u64, handles: &[ArrayHandle])
        -> Result<()>;
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn restart_available(&self, label: &str, iteration: u64) -> bool {
        (**self).restart_available(label, iteration)
    }

    fn restart(
        &mut self,
        label: &str,
        iteration: u64,
        handles: &mut [ArrayHandle],
    ) -> Result<()> {
        (**self).restart(label, iteration, handles)
    }

    fn checkpoint(&mut self, label: &str, iteration: u64, handles: &[ArrayHandle]) -> Result<()> {
        (**self).checkpoint(label, iteration, handles)
    }
}

/// One captured array inside a stored checkpoint.
///
/// `bytes` holds the elements in logical order, exactly as the handle
/// transfer contract produces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ViewRecord {
    pub label: String,
    pub element_size: u64,
    pub span: u64,
    pub bytes: Vec<u8>,
}

/// Capture the current contents of every handle as storable records.
pub(crate) fn snapshot_views(handles: &[ArrayHandle]) -> Result<Vec<ViewRecord>> {
    handles
        .iter()
        .map(|handle| {
            let bytes = handle.to_bytes()?;
            let meta = handle.meta();
            Ok(ViewRecord {
                label: meta.label().to_string(),
                element_size: meta.element_size() as u64,
                span: meta.span() as u64,
                bytes,
            })
        })
        .collect()
}

/// Write stored records back through the handles, positionally.
pub(crate) fn restore_views(records: &[ViewRecord], handles: &mut [ArrayHandle]) -> Result<()> {
    if records.len() != handles.len() {
        return Err(Error::Format(format!(
            "checkpoint holds {} arrays, caller declared {}",
            records.len(),
            handles.len()
        )));
    }
    for (record, handle) in records.iter().zip(handles.iter()) {
        let meta = handle.meta();
        if record.label != meta.label() {
            return Err(Error::Format(format!(
                "array order mismatch: stored '{}', declared '{}'",
                record.label,
                meta.label()
            )));
        }
        if record.element_size != meta.element_size() as u64 {
            return Err(Error::Format(format!(
                "element size mismatch for '{}': stored {}, declared {}",
                record.label,
                record.element_size,
                meta.element_size()
            )));
        }
        // span and element_size are untrusted; their product can overflow.
        let declared = record.span.checked_mul(record.element_size);
        if declared != Some(record.bytes.len() as u64) {
            return Err(Error::Format(format!(
                "inconsistent stored record for '{}'",
                record.label
            )));
        }
        handle.deserialize_from(&record.bytes)?;
    }
    Ok(())
}
