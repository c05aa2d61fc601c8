use crate::model::Event;
use chrono::{DateTime, Duration, Utc};

/// Event name the scheduler reads as a priority request.
pub const PRIORITY_EVENT: &str = "Prioritized";

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 9;

pub fn is_valid_priority(level: u8) -> bool {
    (MIN_PRIORITY..=MAX_PRIORITY).contains(&level)
}

/// Synthetic timestamp for a marker of the given level.
///
/// Markers live in the first ten days after the Unix epoch: level 9 at day 1, level 1 at
/// day 9. Anything stamped by a wall clock sorts after all of them.
pub fn marker_timestamp(level: u8) -> DateTime<Utc> {
    let days = i64::from(MAX_PRIORITY) + 1 - i64::from(level);
    // default() is the Unix epoch
    DateTime::<Utc>::default() + Duration::days(days)
}

pub fn priority_marker(level: u8, agent: &str, now: DateTime<Utc>) -> Event {
    Event::new(
        PRIORITY_EVENT,
        marker_timestamp(level),
        agent,
        format!("priority {} requested at {}", level, now.to_rfc3339()),
        true,
    )
}

pub fn is_priority_marker(event: &Event) -> bool {
    event.id == PRIORITY_EVENT
}
