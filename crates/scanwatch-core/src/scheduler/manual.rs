//! Virtual-time scheduler and clock for deterministic tests and replays.
//!
//! Nothing fires on its own: [`ManualScheduler::advance`] moves virtual time
//! forward and runs every due callback in deadline order.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{Clock, Scheduler, TimerFn, TimerHandle};

struct PendingTimer {
    id: u64,
    deadline: Duration,
    fire: TimerFn,
}

struct ManualState {
    /// Virtual time elapsed since creation.
    elapsed: Duration,
    next_id: u64,
    timers: Vec<PendingTimer>,
}

/// Scheduler and [`Clock`] driven by explicit [`advance`](Self::advance) calls.
#[derive(Clone)]
pub struct ManualScheduler {
    base: DateTime<Utc>,
    state: Arc<Mutex<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(base: DateTime<Utc>) -> Self {
        Self {
            base,
            state: Arc::new(Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_id: 0,
                timers: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        // A panicking callback never runs under the lock, so poisoning only
        // means a test already failed; keep going with the inner state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move virtual time forward by `by`, firing due timers in deadline order.
    /// Returns how many callbacks ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.lock().elapsed + by;
        let mut fired = 0;
        loop {
            let due = {
                let mut state = self.lock();
                let next = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.id))
                    .map(|(i, _)| i);
                match next {
                    Some(i) => {
                        let timer = state.timers.remove(i);
                        state.elapsed = state.elapsed.max(timer.deadline);
                        Some(timer)
                    }
                    None => {
                        state.elapsed = target;
                        None
                    }
                }
            };
            match due {
                Some(timer) => {
                    (timer.fire)();
                    fired += 1;
                }
                None => return fired,
            }
        }
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.lock().timers.len()
    }

    /// Delay until the earliest armed timer, if any.
    pub fn next_deadline_in(&self) -> Option<Duration> {
        let state = self.lock();
        state
            .timers
            .iter()
            .map(|t| t.deadline.saturating_sub(state.elapsed))
            .min()
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualScheduler")
            .field("base", &self.base)
            .field("elapsed", &state.elapsed)
            .field("pending", &state.timers.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, fire: TimerFn) -> TimerHandle {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            let deadline = state.elapsed + delay;
            state.timers.push(PendingTimer { id, deadline, fire });
            id
        };
        let weak = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = weak.upgrade() {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                state.timers.retain(|t| t.id != id);
            }
        })
    }
}

impl Clock for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.lock().elapsed;
        self.base + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero())
    }
}
