//! The restore-or-execute driver.
//!
//! One driver call wraps one unit of work. It probes the work's array set
//! through an armed [`Capture`], disarms, then either restores every
//! tracked array from the backend (the body never runs) or runs the body
//! once and persists if the filter accepts the iteration. Restore and
//! execute are mutually exclusive per call by construction.

use super::context::Context;
use super::filter::{AcceptAll, CheckpointFilter};
use crate::backend::Backend;
use crate::capture::{Capture, Restartable};
use crate::Result;

/// Which terminal path a driver call took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Stored state existed; arrays were filled from it, body skipped.
    Restored,
    /// The body ran; `persisted` says whether the filter let the result
    /// reach the backend.
    Executed { persisted: bool },
    /// Capture unavailable; the body ran with no storage traffic.
    Passthrough,
}

/// Run `work` under checkpoint protection, persisting every executed
/// iteration.
///
/// Shorthand for [`checkpoint_with`] and [`AcceptAll`].
pub fn checkpoint<B, W>(
    ctx: &mut Context<B>,
    label: &str,
    iteration: u64,
    work: &mut W,
) -> Result<Outcome>
where
    B: Backend,
    W: Restartable,
{
    checkpoint_with(ctx, label, iteration, work, AcceptAll)
}

/// Run `work` under checkpoint protection.
///
/// If the backend holds state for `(label, iteration)`, every tracked
/// array the work exposes is overwritten from storage and the body is
/// skipped. Otherwise the body runs once; on success, `filter` decides
/// whether the resulting state is persisted under the key.
///
/// Errors from `expose` abort the call before the body runs; errors from
/// the body propagate before anything is persisted. Read-only (frozen)
/// arrays are captured but never sent to the backend and never written by
/// a restore.
pub fn checkpoint_with<B, W, F>(
    ctx: &mut Context<B>,
    label: &str,
    iteration: u64,
    work: &mut W,
    filter: F,
) -> Result<Outcome>
where
    B: Backend,
    W: Restartable,
    F: CheckpointFilter,
{
    if !ctx.capture_available() {
        tracing::debug!(label, iteration, "capture unavailable, running work directly");
        work.execute()?;
        return Ok(Outcome::Passthrough);
    }

    let mut tracked = Vec::new();
    let mut frozen = Vec::new();
    // Probe, then disarm before any storage traffic.
    let probed = {
        let mut capture = Capture::armed(|h| tracked.push(h), |h| frozen.push(h));
        let result = work.expose(&mut capture);
        capture.clear();
        result
    };
    probed?;
    tracing::debug!(
        label,
        iteration,
        tracked = tracked.len(),
        frozen = frozen.len(),
        "captured array set"
    );

    if ctx.backend().restart_available(label, iteration) {
        ctx.backend_mut().restart(label, iteration, &mut tracked)?;
        return Ok(Outcome::Restored);
    }

    work.execute()?;

    if filter.accept(iteration) {
        ctx.backend_mut().checkpoint(label, iteration, &tracked)?;
        Ok(Outcome::Executed { persisted: true })
    } else {
        tracing::debug!(label, iteration, "filter declined persistence");
        Ok(Outcome::Executed { persisted: false })
    }
}
