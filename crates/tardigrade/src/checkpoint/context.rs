//! Execution context tying a backend to the checkpoint driver.

/// Owns the storage backend and the capture capability flag for a sequence
/// of checkpoint calls.
///
/// A context with capture available (the default) runs the full
/// restore-or-execute protocol. One built with `with_capture(false)` models
/// an execution environment whose state is not host-addressable; driver
/// calls then degrade to running the work directly, with no storage
/// traffic at all.
#[derive(Debug)]
pub struct Context<B> {
    backend: B,
    capture_available: bool,
}

impl<B> Context<B> {
    /// Context with capture available.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            capture_available: true,
        }
    }

    /// Override whether array capture is available.
    pub fn with_capture(mut self, available: bool) -> Self {
        self.capture_available = available;
        self
    }

    /// Whether driver calls will capture and use the backend.
    pub fn capture_available(&self) -> bool {
        self.capture_available
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the context, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    #[test]
    fn test_capture_defaults_on() {
        let ctx = Context::new(MemoryBackend::new());
        assert!(ctx.capture_available());
    }

    #[test]
    fn test_with_capture_off() {
        let ctx = Context::new(MemoryBackend::new()).with_capture(false);
        assert!(!ctx.capture_available());
    }

    #[test]
    fn test_backend_access() {
        let mut ctx = Context::new(MemoryBackend::new());
        assert!(ctx.backend().is_empty());
        ctx.backend_mut().clear();
        assert!(ctx.into_backend().is_empty());
    }
}
