//! Timer and clock abstraction owned by the lifecycle controller.
//!
//! `schedule(delay, fire) -> TimerHandle`: the callback runs once after
//! `delay` unless the handle is cancelled or dropped first. Dropping the
//! handle is the only disposal needed, so a controller that drops its job
//! state can never leak a timer into the next job.

mod guard;
mod manual;
mod tokio_timer;

pub use guard::TimerHandle;
pub use manual::ManualScheduler;
pub use tokio_timer::TokioScheduler;

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Callback run when a timer fires.
pub type TimerFn = Box<dyn FnOnce() + Send + 'static>;

/// Schedules one-shot callbacks.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, fire: TimerFn) -> TimerHandle;
}

/// Wall clock used for job timestamps and ETA arithmetic.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real UTC time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
