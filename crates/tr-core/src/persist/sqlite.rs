//! SQLite relational store.

use rusqlite::{params as sql_params, Connection as DB};
use std::path::{Path, PathBuf};
use tr_config::StoreConfig;

use super::store::{InsertOutcome, Store, StoreError, TrapRow};

const SCHEMA: &str = include_str!("store.sql");

#[derive(Debug)]
pub struct SqliteStore {
    db: DB,
    path: PathBuf,
}

impl SqliteStore {
    /// Open the store and ensure the `snmp_traps` table exists.
    ///
    /// Creates the parent directory if missing.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let path = config.path.clone();
        let unavailable = |e: &dyn std::fmt::Display| {
            StoreError::Unavailable(format!("{}: {}", path.display(), e))
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(&e))?;
            }
        }
        let db = DB::open(&path).map_err(|e| unavailable(&e))?;
        db.busy_timeout(config.timeout())
            .map_err(|e| unavailable(&e))?;
        db.execute_batch(SCHEMA).map_err(|e| unavailable(&e))?;

        Ok(SqliteStore { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of persisted rows.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.db
            .query_row("SELECT COUNT(*) FROM snmp_traps", sql_params![], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n.max(0) as u64)
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    /// Event IDs in insertion order.
    pub fn event_ids(&self) -> Result<Vec<String>, StoreError> {
        let read_err = |e: rusqlite::Error| StoreError::Unavailable(e.to_string());
        let mut stmt = self
            .db
            .prepare("SELECT event_id FROM snmp_traps ORDER BY id")
            .map_err(read_err)?;
        let rows = stmt
            .query_map(sql_params![], |row| row.get::<_, String>(0))
            .map_err(read_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(read_err)
    }
}

impl Store for SqliteStore {
    fn insert(&mut self, row: &TrapRow) -> Result<InsertOutcome, StoreError> {
        let changed = self
            .db
            .execute(
                "INSERT INTO snmp_traps (
                    event_id, timestamp, hostname, source_ip, trap_oid, trap_name,
                    severity, uptime, transport, alarm_number, alarm_text,
                    alarm_server, alarm_instance, varbinds_json, raw_event
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
                 ON CONFLICT (event_id) DO NOTHING",
                sql_params![
                    row.event_id,
                    row.timestamp,
                    row.hostname,
                    row.source_ip,
                    row.trap_oid,
                    row.trap_name,
                    row.severity,
                    row.uptime,
                    row.transport,
                    row.alarm_number,
                    row.alarm_text,
                    row.alarm_server,
                    row.alarm_instance,
                    row.varbinds_json,
                    row.raw_event,
                ],
            )
            .map_err(|e| StoreError::Write(format!("{}: {}", self.path.display(), e)))?;

        Ok(if changed == 0 {
            InsertOutcome::Duplicate
        } else {
            InsertOutcome::Inserted
        })
    }
}
