//! Events delivered to the controller by timers and request tasks.

use tokio::sync::mpsc;

use crate::api::StatusResponse;
use crate::error::ScanError;

/// Everything that can wake the controller. Each event carries the generation
/// it was issued under; the controller drops events from retired generations.
#[derive(Debug)]
pub(crate) enum Event {
    PollDue {
        generation: u64,
    },
    StatusArrived {
        generation: u64,
        result: Result<StatusResponse, ScanError>,
    },
    ElapsedTick {
        generation: u64,
    },
}

impl Event {
    pub(crate) fn generation(&self) -> u64 {
        match self {
            Event::PollDue { generation }
            | Event::StatusArrived { generation, .. }
            | Event::ElapsedTick { generation } => *generation,
        }
    }
}

pub(crate) type EventSender = mpsc::UnboundedSender<Event>;
