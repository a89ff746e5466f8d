//! Channel-backed notification sink.

use tokio::sync::mpsc;

use super::{Notification, NotificationSink};

/// Forwards notifications to an unbounded channel (e.g. a UI task).
/// Notifications sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, n: Notification) {
        if self.tx.send(n).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}
