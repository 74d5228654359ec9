//! 1-D heat diffusion under checkpoint protection.
//!
//! Run it, kill it, run it again: the solver resumes from the newest
//! checkpoint file instead of starting over. Set RUST_LOG=debug to watch
//! the driver decide between restore and execute.

use ndarray::{ArrayD, IxDyn};
use tardigrade::prelude::*;

const LABEL: &str = "heat";
const CELLS: usize = 64;
const ITERATIONS: u64 = 30;

struct HeatStep {
    temperature: TrackedArray<f64>,
    alpha: FrozenArray<f64>,
}

impl HeatStep {
    fn new() -> Self {
        // Hot spike in the middle of a cold rod.
        let mut init = ArrayD::zeros(IxDyn(&[CELLS]));
        init[[CELLS / 2]] = 100.0;
        Self {
            temperature: TrackedArray::new("temperature", init),
            alpha: FrozenArray::new("alpha", ArrayD::from_elem(IxDyn(&[1]), 0.2)),
        }
    }

    fn peak(&self) -> f64 {
        self.temperature.read().iter().cloned().fold(0.0, f64::max)
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
        for i in 1..CELLS - 1 {
            t[[i]] = old[[i]] + alpha * (old[[i - 1]] - 2.0 * old[[i]] + old[[i + 1]]);
        }
        Ok(())
    }
}

fn main() -> tardigrade::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = FileBackendConfig::new("heat_checkpoints").keep_last(2);
    let mut ctx = Context::new(FileBackend::with_config(config));
    let mut step = HeatStep::new();

    // Resume from the newest stored iteration, if any.
    let start = match ctx.backend().latest(LABEL)? {
        Some(iteration) => {
            let outcome = checkpoint(&mut ctx, LABEL, iteration, &mut step)?;
            println!("resumed at iteration {iteration} ({outcome:?})");
            iteration + 1
        }
        None => {
            println!("no checkpoints found, starting fresh");
            0
        }
    };

    let every_fifth = NthIteration::new(5)?;
    for iteration in start..ITERATIONS {
        let outcome = checkpoint_with(&mut ctx, LABEL, iteration, &mut step, every_fifth)?;
        if let Outcome::Executed { persisted: true } = outcome {
            println!("iteration {iteration:2}: peak {:6.2} (checkpointed)", step.peak());
        }
    }

    println!("done: peak temperature {:.2} after {ITERATIONS} iterations", step.peak());
    Ok(())
}
