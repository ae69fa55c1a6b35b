//! Date rendering shared by the CLI tables and the HTTP reports.

use chrono::DateTime;
use coursetrack_core::Timestamp;

/// Render a stored timestamp as an RFC 2822 date in UTC.
///
/// Unset (non-positive) timestamps and values outside chrono's range render
/// as `None`.
#[must_use]
pub fn rfc2822(timestamp: Timestamp) -> Option<String> {
    if !timestamp.is_set() {
        return None;
    }
    DateTime::from_timestamp(timestamp.secs(), 0).map(|dt| dt.to_rfc2822())
}
