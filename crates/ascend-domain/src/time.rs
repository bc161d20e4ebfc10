//! Time primitives
//!
//! All instants are Unix timestamps in whole seconds. Storage, the clock port,
//! and challenge windows share this unit so no conversion happens inside the
//! decision logic.

/// Seconds since the Unix epoch
pub type Timestamp = u64;

/// Number of seconds in one day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Add a whole number of days to a timestamp, saturating at `u64::MAX`
pub fn add_days(at: Timestamp, days: u32) -> Timestamp {
    at.saturating_add(u64::from(days) * SECONDS_PER_DAY)
}

/// Remaining time until `end`, split into days, hours and minutes
///
/// Returns all zeros once `now` has reached or passed `end`.
pub fn remaining_dhm(now: Timestamp, end: Timestamp) -> (u64, u64, u64) {
    let secs = end.saturating_sub(now);
    let days = secs / SECONDS_PER_DAY;
    let hours = (secs % SECONDS_PER_DAY) / 3600;
    let minutes = (secs % 3600) / 60;
    (days, hours, minutes)
}
