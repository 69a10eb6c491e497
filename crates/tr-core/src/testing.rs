//! In-memory test doubles for the sink and store seams.

use std::collections::HashMap;

use tr_common::EventId;

use crate::persist::{InsertOutcome, Store, StoreError, TrapRow};
use crate::relay::{Delivery, DeliveryStats, Sink, SinkError, SinkSource};

/// A sink holding everything in memory, with switchable failures.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Newest first.
    pub index: Vec<EventId>,
    pub records: HashMap<EventId, String>,
    pub cursor: Option<EventId>,
    pub stats: DeliveryStats,
    /// Fail every call while set.
    pub unavailable: bool,
    /// Fail `fetch` for these IDs.
    pub fetch_failures: Vec<EventId>,
    /// Fail `advance_cursor` while set.
    pub cursor_write_fails: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    fn check(&self) -> Result<(), SinkError> {
        if self.unavailable {
            Err(SinkError::Unavailable("memory sink switched off".into()))
        } else {
            Ok(())
        }
    }

    /// Index a record directly, as if delivered.
    pub fn push(&mut self, id: EventId, body: impl Into<String>) {
        self.records.insert(id.clone(), body.into());
        self.index.insert(0, id);
    }
}

impl Sink for MemorySink {
    fn deliver(&mut self, delivery: &Delivery<'_>) -> Result<(), SinkError> {
        self.check()?;
        self.push(delivery.event.event_id.clone(), delivery.body);
        self.index.truncate(delivery.retention.max_index_len);
        self.stats.record(delivery.event);
        Ok(())
    }
}

impl SinkSource for MemorySink {
    fn index(&mut self) -> Result<Vec<EventId>, SinkError> {
        self.check()?;
        Ok(self.index.clone())
    }

    fn fetch(&mut self, id: &EventId) -> Result<Option<String>, SinkError> {
        self.check()?;
        if self.fetch_failures.contains(id) {
            return Err(SinkError::Read(format!("injected fetch failure for {id}")));
        }
        Ok(self.records.get(id).cloned())
    }

    fn cursor(&mut self) -> Result<Option<EventId>, SinkError> {
        self.check()?;
        Ok(self.cursor.clone())
    }

    fn advance_cursor(&mut self, id: &EventId) -> Result<(), SinkError> {
        self.check()?;
        if self.cursor_write_fails {
            return Err(SinkError::Write("injected cursor write failure".into()));
        }
        self.cursor = Some(id.clone());
        Ok(())
    }

    fn stats(&mut self) -> Result<DeliveryStats, SinkError> {
        self.check()?;
        Ok(self.stats.clone())
    }
}

/// A store keeping rows in memory, idempotent on `event_id`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub rows: Vec<TrapRow>,
    /// Reject inserts for these event IDs.
    pub reject: Vec<EventId>,
    /// Reject every insert while set.
    pub down: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn event_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.event_id.as_str()).collect()
    }
}

impl Store for MemoryStore {
    fn insert(&mut self, row: &TrapRow) -> Result<InsertOutcome, StoreError> {
        if self.down {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        if self.reject.iter().any(|id| id.as_str() == row.event_id) {
            return Err(StoreError::Write(format!("injected failure for {}", row.event_id)));
        }
        if self.rows.iter().any(|r| r.event_id == row.event_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        self.rows.push(row.clone());
        Ok(InsertOutcome::Inserted)
    }
}
