use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Position of an entry in the log. Strictly increasing in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u64);

impl EntryId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who produced a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    User,
    Agent,
    System,
}

/// One line of the transcript. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: EntryId,
    pub text: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

/// An entry that has not been appended yet.
///
/// Channel and upload handlers produce these; only the controller turns
/// them into [`LogEntry`] values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub origin: Origin,
    pub text: String,
}

impl Notice {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            text: text.into(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::Agent,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            origin: Origin::System,
            text: text.into(),
        }
    }
}

/// Ordered, immutable view of the log at one point in time
pub type Snapshot = Arc<[LogEntry]>;

/// Append-only chat history
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next id and push the entry to the end of the log.
    pub fn append(&mut self, origin: Origin, text: impl Into<String>) -> &LogEntry {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(LogEntry {
            id,
            text: text.into(),
            origin,
            created_at: Utc::now(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn snapshot(&self) -> Snapshot {
        Arc::from(self.entries.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_id(&self) -> Option<EntryId> {
        self.entries.last().map(|e| e.id)
    }
}
