//! In-memory checkpoint storage.

use std::collections::HashMap;

use super::{restore_views, snapshot_views, Backend, ViewRecord};
use crate::view::ArrayHandle;
use crate::{Error, Result};

/// Checkpoint storage in a process-local map.
///
/// Nothing survives the process; this backend exists for tests, for
/// dry-running a resilience setup without touching disk, and as the
/// plainest possible reading of the [`Backend`] contract.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    store: HashMap<(String, u64), Vec<ViewRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored `(label, iteration)` keys.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop all stored state.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl Backend for MemoryBackend {
    fn restart_available(&self, label: &str, iteration: u64) -> bool {
        self.store.contains_key(&(label.to_string(), iteration))
    }

    fn restart(
        &mut self,
        label: &str,
        iteration: u64,
        handles: &mut [ArrayHandle],
    ) -> Result<()> {
        let records = self
            .store
            .get(&(label.to_string(), iteration))
            .ok_or_else(|| Error::MissingCheckpoint {
                label: label.to_string(),
                iteration,
            })?;
        restore_views(records, handles)?;
        tracing::debug!(
            "restored '{}' iteration {} from memory ({} arrays)",
            label,
            iteration,
            records.len()
        );
        Ok(())
    }

    fn checkpoint(&mut self, label: &str, iteration: u64, handles: &[ArrayHandle]) -> Result<()> {
        let records = snapshot_views(handles)?;
        tracing::debug!(
            "stored '{}' iteration {} in memory ({} arrays)",
            label,
            iteration,
            records.len()
        );
        self.store.insert((label.to_string(), iteration), records);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::TrackedArray;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_checkpoint_then_restart() {
        let mut backend = MemoryBackend::new();
        let arr = TrackedArray::new(
            "state",
            ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0f64, 2.0]).unwrap(),
        );
        let mut handles = vec![arr.handle().unwrap()];

        assert!(!backend.restart_available("state", 5));
        backend.checkpoint("state", 5, &handles).unwrap();
        assert!(backend.restart_available("state", 5));
        assert_eq!(backend.len(), 1);

        arr.write().fill(0.0);
        backend.restart("state", 5, &mut handles).unwrap();
        assert_eq!(arr.read()[[0]], 1.0);
        assert_eq!(arr.read()[[1]], 2.0);
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let mut backend = MemoryBackend::new();
        let arr = TrackedArray::new("state", ArrayD::<f64>::zeros(IxDyn(&[1])));
        let mut handles = vec![arr.handle().unwrap()];

        let err = backend.restart("state", 0, &mut handles).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCheckpoint { iteration: 0, .. }
        ));
    }

    #[test]
    fn test_same_key_overwrites() {
        let mut backend = MemoryBackend::new();
        let arr = TrackedArray::new("state", ArrayD::<f64>::zeros(IxDyn(&[1])));
        let mut handles = vec![arr.handle().unwrap()];

        backend.checkpoint("state", 1, &handles).unwrap();
        arr.write()[[0]] = 9.0;
        backend.checkpoint("state", 1, &handles).unwrap();
        assert_eq!(backend.len(), 1);

        arr.write()[[0]] = 0.0;
        backend.restart("state", 1, &mut handles).unwrap();
        assert_eq!(arr.read()[[0]], 9.0);
    }

    #[test]
    fn test_iterations_are_distinct_keys() {
        let mut backend = MemoryBackend::new();
        let arr = TrackedArray::new("state", ArrayD::<f64>::zeros(IxDyn(&[1])));
        let handles = vec![arr.handle().unwrap()];

        backend.checkpoint("state", 1, &handles).unwrap();
        backend.checkpoint("state", 2, &handles).unwrap();
        assert_eq!(backend.len(), 2);
        assert!(backend.restart_available("state", 1));
        assert!(backend.restart_available("state", 2));
        assert!(!backend.restart_available("state", 3));

        backend.clear();
        assert!(backend.is_empty());
    }
}
