//! Human-readable time remaining.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time-remaining estimate for a running job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /// The server's estimated completion time has passed.
    Finalizing,
    /// Whole seconds left until the server's estimated completion time.
    Remaining(Duration),
}

impl Eta {
    pub fn until(at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        match (at - now).to_std() {
            Ok(left) if left.as_secs() > 0 => Eta::Remaining(Duration::from_secs(left.as_secs())),
            _ => Eta::Finalizing,
        }
    }
}

impl std::fmt::Display for Eta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Eta::Finalizing => f.write_str("finalizing…"),
            Eta::Remaining(d) => write!(f, "{} remaining", format_duration(*d)),
        }
    }
}

/// `1h 05m`, `2m 05s`, `45s`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
