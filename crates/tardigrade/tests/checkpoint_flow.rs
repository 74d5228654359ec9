//! End-to-end flows for a small diffusion solver running under checkpoint
//! protection, including a simulated crash with file-backed resume.

use ndarray::{ArrayD, IxDyn};
use tardigrade::prelude::*;
use tempfile::tempdir;

/// Explicit 1-D heat step: tracked temperature, frozen diffusion
/// coefficient, fixed boundaries.
struct HeatStep {
    temperature: TrackedArray<f64>,
    alpha: FrozenArray<f64>,
}

impl HeatStep {
    fn new(cells: usize) -> Self {
        let mut init = ArrayD::zeros(IxDyn(&[cells]));
        init[[cells / 2]] = 1.0;
        Self {
            temperature: TrackedArray::new("temperature", init),
            alpha: FrozenArray::new("alpha", ArrayD::from_elem(IxDyn(&[1]), 0.1)),
        }
    }

    fn temperature_bits(&self) -> Vec<u64> {
        self.temperature.read().iter().map(|v| v.to_bits()).collect()
    }
}

impl Restartable for HeatStep {
    fn expose(&self, capture: &mut Capture<'_>) -> tardigrade::Result<()> {
        self.temperature.expose(capture)?;
        self.alpha.expose(capture)?;
        Ok(())
    }

    fn execute(&mut self) -> tardigrade::Result<()> {
        let alpha = self.alpha.array()[[0]];
        let old = self.temperature.snapshot();
        let mut t = self.temperature.write();
        for i in 1..old.len() - 1 {
            t[[i]] = old[[i]] + alpha * (old[[i - 1]] - 2.0 * old[[i]] + old[[i + 1]]);
        }
        Ok(())
    }
}

#[test]
fn test_periodic_persistence_over_a_run() {
    let mut ctx = Context::new(MemoryBackend::new());
    let mut step = HeatStep::new(16);
    let every_other = NthIteration::new(2).unwrap();

    for iteration in 0..=6 {
        let outcome =
            checkpoint_with(&mut ctx, "heat", iteration, &mut step, every_other).unwrap();
        let expected = Outcome::Executed {
            persisted: iteration % 2 == 0,
        };
        assert_eq!(outcome, expected, "iteration {iteration}");
    }

    for iteration in 0..=6 {
        assert_eq!(
            ctx.backend().restart_available("heat", iteration),
            iteration % 2 == 0,
            "iteration {iteration}"
        );
    }
}

#[test]
fn test_crash_and_resume_from_files() {
    let dir = tempdir().unwrap();

    // First life of the process: run five iterations, persist each.
    let mut ctx = Context::new(FileBackend::new(dir.path()));
    let mut step = HeatStep::new(32);
    for iteration in 0..5 {
        let outcome = checkpoint(&mut ctx, "heat", iteration, &mut step).unwrap();
        assert_eq!(outcome, Outcome::Executed { persisted: true });
    }
    let before_crash = step.temperature_bits();
    drop(ctx);
    drop(step);

    // Second life: same directory, fresh state.
    let backend = FileBackend::new(dir.path());
    assert_eq!(backend.latest("heat").unwrap(), Some(4));

    let mut ctx = Context::new(backend);
    let mut step = HeatStep::new(32);
    for iteration in 0..5 {
        let outcome = checkpoint(&mut ctx, "heat", iteration, &mut step).unwrap();
        assert_eq!(outcome, Outcome::Restored, "iteration {iteration}");
    }
    assert_eq!(step.temperature_bits(), before_crash);

    // Replaying an already-restored iteration is still a restore.
    let outcome = checkpoint(&mut ctx, "heat", 3, &mut step).unwrap();
    assert_eq!(outcome, Outcome::Restored);

    // And the run continues past the crash point.
    let outcome = checkpoint(&mut ctx, "heat", 5, &mut step).unwrap();
    assert_eq!(outcome, Outcome::Executed { persisted: true });
}

#[test]
fn test_degraded_mode_touches_no_storage() {
    let dir = tempdir().unwrap();
    let mut ctx = Context::new(FileBackend::new(dir.path())).with_capture(false);
    let mut step = HeatStep::new(16);
    let untouched = step.temperature_bits();

    for iteration in 0..3 {
        let outcome = checkpoint(&mut ctx, "heat", iteration, &mut step).unwrap();
        assert_eq!(outcome, Outcome::Passthrough);
    }

    // The physics ran, but nothing was written.
    assert_ne!(step.temperature_bits(), untouched);
    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect();
    assert!(files.is_empty());
}

/// Records which array labels actually reach the storage layer.
struct SpyBackend {
    inner: MemoryBackend,
    persisted_labels: Vec<String>,
    restarts: usize,
}

impl SpyBackend {
    fn new() -> Self {
        Self {
            inner: MemoryBackend::new(),
            persisted_labels: Vec::new(),
            restarts: 0,
        }
    }
}

impl Backend for SpyBackend {
    fn restart_available(&self, label: &str, iteration: u64) -> bool {
        self.inner.restart_available(label, iteration)
    }

    fn restart(
        &mut self,
        label: &str,
        iteration: u64,
        handles: &mut [ArrayHandle],
    ) -> tardigrade::Result<()> {
        self.restarts += 1;
        self.inner.restart(label, iteration, handles)
    }

    fn checkpoint(
        &mut self,
        label: &str,
        iteration: u64,
        handles: &[ArrayHandle],
    ) -> tardigrade::Result<()> {
        self.persisted_labels
            .extend(handles.iter().map(|h| h.label().to_string()));
        self.inner.checkpoint(label, iteration, handles)
    }
}

#[test]
fn test_frozen_arrays_never_reach_the_backend() {
    let mut ctx = Context::new(SpyBackend::new());
    let mut step = HeatStep::new(8);
    let alpha_before = step.alpha.array().clone();

    checkpoint(&mut ctx, "heat", 0, &mut step).unwrap();
    assert_eq!(ctx.backend().persisted_labels, vec!["temperature"]);

    // Restore writes the tracked array and leaves the frozen one alone.
    step.temperature.write().fill(99.0);
    let outcome = checkpoint(&mut ctx, "heat", 0, &mut step).unwrap();
    assert_eq!(outcome, Outcome::Restored);
    assert_eq!(ctx.backend().restarts, 1);
    assert_ne!(step.temperature.read()[[4]], 99.0);
    assert_eq!(*step.alpha.array(), alpha_before);
}

/// Heterogeneous array set moving through the same type-erased path.
struct SolverState {
    field: TrackedArray<f64>,
    ticks: TrackedArray<i64>,
    flags: TrackedArray<u8>,
}

impl SolverState {
    fn new() -> Self {
        Self {
            field: TrackedArray::new("field", ArrayD::zeros(IxDyn(&[4]))),
            ticks: TrackedArray::new("ticks", ArrayD::zeros(IxDyn(&[1]))),
            flags: TrackedArray::new("flags", ArrayD::zeros(IxDyn(&[2]))),
        }
    }
}

impl Restartable for SolverState {
    fn expose(&self, capture: &mut Capture<'_>) -> tardigrade::Result<()> {
        self.field.expose(capture)?;
        self.ticks.expose(capture)?;
        self.flags.expose(capture)?;
        Ok(())
    }

    fn execute(&mut self) -> tardigrade::Result<()> {
        for v in self.field.write().iter_mut() {
            *v += 0.5;
        }
        self.ticks.write()[[0]] += 1;
        let mut flags = self.flags.write();
        flags[[0]] ^= 1;
        flags[[1]] = 7;
        Ok(())
    }
}

#[test]
fn test_mixed_element_types_roundtrip() {
    let dir = tempdir().unwrap();
    let mut ctx = Context::new(FileBackend::new(dir.path()));
    let mut state = SolverState::new();

    for iteration in 0..3 {
        checkpoint(&mut ctx, "solver", iteration, &mut state).unwrap();
    }
    assert_eq!(state.ticks.read()[[0]], 3);

    state.field.write().fill(-1.0);
    state.ticks.write()[[0]] = 0;
    state.flags.write().fill(0);

    let outcome = checkpoint(&mut ctx, "solver", 2, &mut state).unwrap();
    assert_eq!(outcome, Outcome::Restored);
    assert_eq!(state.field.read()[[0]], 1.5);
    assert_eq!(state.ticks.read()[[0]], 3);
    assert_eq!(state.flags.read()[[0]], 1);
    assert_eq!(state.flags.read()[[1]], 7);
}

#[test]
fn test_restore_into_wrong_shape_fails_loudly() {
    let mut ctx = Context::new(MemoryBackend::new());
    let mut wide = HeatStep::new(16);
    checkpoint(&mut ctx, "heat", 0, &mut wide).unwrap();

    let mut narrow = HeatStep::new(8);
    let err = checkpoint(&mut ctx, "heat", 0, &mut narrow).unwrap_err();
    assert!(matches!(err, tardigrade::Error::SizeMismatch { .. }));

    // A work unit declaring a different array count is also rejected.
    let mut partial = SolverState::new();
    let err = checkpoint(&mut ctx, "heat", 0, &mut partial).unwrap_err();
    assert!(matches!(err, tardigrade::Error::Format(_)));
}

#[test]
fn test_retention_keeps_only_newest() {
    let dir = tempdir().unwrap();
    let config = FileBackendConfig::new(dir.path()).keep_last(2);
    let mut ctx = Context::new(FileBackend::with_config(config));
    let mut step = HeatStep::new(16);

    for iteration in 0..5 {
        checkpoint(&mut ctx, "heat", iteration, &mut step).unwrap();
    }

    assert_eq!(ctx.backend().list_iterations("heat").unwrap(), vec![3, 4]);
    assert!(!ctx.backend().restart_available("heat", 0));
    assert!(ctx.backend().restart_available("heat", 4));
}
