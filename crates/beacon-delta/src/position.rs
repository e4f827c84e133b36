//! Timestamp-to-buffer-position resolution.

use chrono::{DateTime, Utc};

/// Resolve the buffer position (a `total_added` value) at time `t`.
///
/// `added_at` is the per-entry add-time slice parallel to the current buffer
/// contents, oldest first. Entries strictly after `t` are still "new" from
/// the perspective of a checkpoint at `t`, so the position is
/// `current_total - (entries after t)`, clamped at zero for times before the
/// retained window. An empty slice resolves to `current_total`.
pub fn find_position_at_time(added_at: &[DateTime<Utc>], current_total: i64, t: DateTime<Utc>) -> i64 {
    if added_at.is_empty() {
        return current_total;
    }
    let first_after = added_at.partition_point(|&ts| ts <= t);
    let after = (added_at.len() - first_after) as i64;
    (current_total - after).max(0)
}
