//! Production scheduler: one tokio task per timer.

use std::time::Duration;

use super::{Scheduler, TimerFn, TimerHandle};

/// Spawns a sleeping task per timer; the handle aborts it.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, fire: TimerFn) -> TimerHandle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        TimerHandle::new(move || task.abort())
    }
}
