//! Freshness clock: the single predicate every component uses to decide
//! whether a price observation is too old to act on.

use chrono::{DateTime, Utc};

/// True if `observed_at` is older than `max_age_secs` relative to `now`.
///
/// A timestamp in the future (clock skew) is never considered stale.
pub fn stale(observed_at: DateTime<Utc>, now: DateTime<Utc>, max_age_secs: i64) -> bool {
    if observed_at > now {
        return false;
    }
    let age = now - observed_at;
    age.num_seconds() > max_age_secs
}
