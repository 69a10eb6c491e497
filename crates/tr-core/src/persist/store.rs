//! Relational store contract and the row it persists.

use serde::Serialize;
use thiserror::Error;
use tr_common::FlattenedEvent;

/// Errors from the relational store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store write failed: {0}")]
    Write(String),

    #[error("row could not be encoded: {0}")]
    Encode(String),
}

impl From<StoreError> for tr_common::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => tr_common::Error::StoreUnavailable(msg),
            StoreError::Write(msg) | StoreError::Encode(msg) => tr_common::Error::StoreWrite(msg),
        }
    }
}

/// Whether an insert added a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with the same `event_id` already exists.
    Duplicate,
}

/// One row of the `snmp_traps` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrapRow {
    pub event_id: String,
    pub timestamp: String,
    pub hostname: String,
    pub source_ip: String,
    pub trap_oid: String,
    pub trap_name: String,
    pub severity: String,
    pub uptime: String,
    pub transport: String,
    pub alarm_number: Option<String>,
    pub alarm_text: Option<String>,
    pub alarm_server: Option<String>,
    pub alarm_instance: Option<String>,
    /// JSON array of `{oid, value, resolved_name}`.
    pub varbinds_json: String,
    /// The event's wire envelope, kept for audit.
    pub raw_event: String,
}

impl TrapRow {
    pub fn from_flattened(flat: &FlattenedEvent) -> Result<TrapRow, StoreError> {
        let event = &flat.event;
        let varbinds_json =
            serde_json::to_string(&flat.varbinds).map_err(|e| StoreError::Encode(e.to_string()))?;
        let raw_event = event
            .to_json_line()
            .map_err(|e| StoreError::Encode(e.to_string()))?;

        Ok(TrapRow {
            event_id: event.event_id.to_string(),
            timestamp: event.timestamp_string(),
            hostname: event.host.clone(),
            source_ip: event.source_ip.clone(),
            trap_oid: event.trap_oid.clone(),
            trap_name: event.trap_name.clone(),
            severity: event.severity.to_string(),
            uptime: event.uptime.clone(),
            transport: event.transport.clone(),
            alarm_number: flat.alarm_number.clone(),
            alarm_text: flat.alarm_text.clone(),
            alarm_server: flat.alarm_server.clone(),
            alarm_instance: flat.alarm_instance.clone(),
            varbinds_json,
            raw_event,
        })
    }
}

/// An append-only event table.
pub trait Store {
    /// Insert one row atomically; idempotent on `event_id`.
    fn insert(&mut self, row: &TrapRow) -> Result<InsertOutcome, StoreError>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn insert(&mut self, row: &TrapRow) -> Result<InsertOutcome, StoreError> {
        (**self).insert(row)
    }
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn insert(&mut self, row: &TrapRow) -> Result<InsertOutcome, StoreError> {
        (**self).insert(row)
    }
}
