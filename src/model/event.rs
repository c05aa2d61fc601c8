use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one pipeline step for a batch.
///
/// `id` names the step. It is not unique: a step that was retried shows up once per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    #[serde(default)]
    pub details: String,
    pub success: bool,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        agent: impl Into<String>,
        details: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            agent: agent.into(),
            details: details.into(),
            success,
        }
    }
}

/// Event history of one batch, ascending by timestamp.
///
/// Events with equal timestamps keep the order in which they were added. Every way of
/// building or growing a log goes through that rule, so callers can rely on index order
/// being time order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Event>", into = "Vec<Event>")]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a log from events in arbitrary order.
    pub fn from_events(mut events: Vec<Event>) -> Self {
        // sort_by_key is stable, which gives the tie rule for free
        events.sort_by_key(|e| e.timestamp);
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Index of the earliest event with `success == false`.
    pub fn first_failure(&self) -> Option<usize> {
        self.events.iter().position(|e| !e.success)
    }

    /// Index of the earliest event named `name`, whatever its outcome.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.events.iter().position(|e| e.id == name)
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.events.iter().filter(|e| e.id == name).count()
    }

    /// Inserts after every event with a timestamp less than or equal to the new one and
    /// returns the index it landed at.
    pub fn insert(&mut self, event: Event) -> usize {
        let index = self
            .events
            .partition_point(|e| e.timestamp <= event.timestamp);
        self.events.insert(index, event);
        index
    }

    /// Removes the event at `index` and everything after it. An index past the end
    /// removes nothing.
    pub fn truncate_from(&mut self, index: usize) -> Vec<Event> {
        if index >= self.events.len() {
            return Vec::new();
        }
        self.events.split_off(index)
    }

    /// Removes every event matching `predicate`, keeping the rest in order.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&Event) -> bool,
    {
        let before = self.events.len();
        self.events.retain(|e| !predicate(e));
        before - self.events.len()
    }
}

impl From<Vec<Event>> for EventLog {
    fn from(events: Vec<Event>) -> Self {
        Self::from_events(events)
    }
}

impl From<EventLog> for Vec<Event> {
    fn from(log: EventLog) -> Self {
        log.events
    }
}

impl<'a> IntoIterator for &'a EventLog {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
