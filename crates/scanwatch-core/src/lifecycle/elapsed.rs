//! Display-only elapsed time, ticking once a second.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use super::events::{Event, EventSender};
use crate::scheduler::{Scheduler, TimerHandle};

pub(crate) const ELAPSED_TICK: Duration = Duration::from_secs(1);

fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
    (to - from).to_std().unwrap_or(Duration::ZERO)
}

pub(crate) struct ElapsedTimer {
    scheduler: Arc<dyn Scheduler>,
    events: EventSender,
    generation: u64,
    timer: Option<TimerHandle>,
    elapsed: Duration,
}

impl ElapsedTimer {
    pub(crate) fn start(scheduler: Arc<dyn Scheduler>, events: EventSender, generation: u64) -> Self {
        let mut timer = Self {
            scheduler,
            events,
            generation,
            timer: None,
            elapsed: Duration::ZERO,
        };
        timer.arm();
        timer
    }

    fn arm(&mut self) {
        let events = self.events.clone();
        let generation = self.generation;
        self.timer = Some(self.scheduler.schedule(
            ELAPSED_TICK,
            Box::new(move || {
                let _ = events.send(Event::ElapsedTick { generation });
            }),
        ));
    }

    pub(crate) fn on_tick(&mut self, started_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.elapsed = between(started_at, now);
        self.arm();
    }

    /// Stop ticking and pin the value to the job's start/end pair.
    pub(crate) fn freeze(&mut self, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) {
        self.timer = None;
        self.elapsed = between(started_at, completed_at);
    }

    /// Stop ticking, keep the last value.
    pub(crate) fn stop(&mut self) {
        self.timer = None;
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
