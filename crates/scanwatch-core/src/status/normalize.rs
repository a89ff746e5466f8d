//! Ordered substring table from server spellings to canonical status.

use super::CanonicalStatus;

/// Consulted top to bottom; the first needle contained in the squashed input wins.
const STATUS_TABLE: &[(&str, CanonicalStatus)] = &[
    ("inprogress", CanonicalStatus::Running),
    ("running", CanonicalStatus::Running),
    ("complete", CanonicalStatus::Completed),
    ("fail", CanonicalStatus::Failed),
    ("cancel", CanonicalStatus::Cancelled),
    ("pending", CanonicalStatus::Pending),
    ("queued", CanonicalStatus::Pending),
];

/// Lower-case and drop every separator (`_`, `-`, whitespace, punctuation).
fn squash(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Map a raw server status to a [`CanonicalStatus`].
///
/// Total: unknown, empty and absent input all map to `Pending` (with a
/// warning in the log).
pub fn normalize(raw: Option<&str>) -> CanonicalStatus {
    let squashed = raw.map(squash).unwrap_or_default();
    if let Some((_, status)) = STATUS_TABLE
        .iter()
        .find(|(needle, _)| !squashed.is_empty() && squashed.contains(needle))
    {
        return *status;
    }
    tracing::warn!(raw = ?raw, "unrecognized scan status, treating as pending");
    CanonicalStatus::Pending
}
