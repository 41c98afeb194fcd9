//! Notification bookkeeping carried from one cycle to the next.

use std::fmt;

use chrono::{DateTime, Utc};

use notifier::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    Signal,
    Expiration,
    Preparation,
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NotificationCategory::Signal => "signal",
            NotificationCategory::Expiration => "expiration",
            NotificationCategory::Preparation => "preparation",
        };
        f.write_str(s)
    }
}

/// A message the bot posted and may later retract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationRecord {
    pub message_id: MessageId,
    pub category: NotificationCategory,
    pub created_at: DateTime<Utc>,
}

/// At most one live record per category.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotificationRecords {
    pub signal: Option<NotificationRecord>,
    pub expiration: Option<NotificationRecord>,
    pub preparation: Option<NotificationRecord>,
}

impl NotificationRecords {
    fn slot_mut(&mut self, category: NotificationCategory) -> &mut Option<NotificationRecord> {
        match category {
            NotificationCategory::Signal => &mut self.signal,
            NotificationCategory::Expiration => &mut self.expiration,
            NotificationCategory::Preparation => &mut self.preparation,
        }
    }

    /// Store `record` in its category, handing back whatever it displaced.
    pub fn replace(&mut self, record: NotificationRecord) -> Option<NotificationRecord> {
        self.slot_mut(record.category).replace(record)
    }

    /// Remove every tracked record in deletion order: signal, expiration,
    /// preparation.
    pub fn drain(&mut self) -> Vec<NotificationRecord> {
        [
            self.signal.take(),
            self.expiration.take(),
            self.preparation.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_none() && self.expiration.is_none() && self.preparation.is_none()
    }
}

/// Where the sequencer is within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    SignalSent,
    ExpiredSent,
    PrepSent,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, category: NotificationCategory) -> NotificationRecord {
        NotificationRecord {
            message_id: MessageId(id),
            category,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn replace_returns_previous_of_same_category() {
        let mut records = NotificationRecords::default();

        assert!(records.replace(record(1, NotificationCategory::Signal)).is_none());
        assert!(records.replace(record(2, NotificationCategory::Expiration)).is_none());

        let old = records.replace(record(3, NotificationCategory::Signal)).unwrap();
        assert_eq!(old.message_id, MessageId(1));
        assert_eq!(records.signal.unwrap().message_id, MessageId(3));
    }

    #[test]
    fn drain_follows_category_order_and_empties() {
        let mut records = NotificationRecords::default();
        records.replace(record(30, NotificationCategory::Preparation));
        records.replace(record(10, NotificationCategory::Signal));
        records.replace(record(20, NotificationCategory::Expiration));

        let ids: Vec<i64> = records.drain().iter().map(|r| r.message_id.0).collect();

        assert_eq!(ids, vec![10, 20, 30]);
        assert!(records.is_empty());
        assert!(records.drain().is_empty());
    }
}
