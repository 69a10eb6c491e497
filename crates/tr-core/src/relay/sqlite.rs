//! SQLite-backed delivery sink.
//!
//! Mirrors a key-value broker layout in four tables (see `sink.sql`). Every
//! delivery runs in one transaction, so either all five steps apply or none.

use chrono::{DateTime, Utc};
use rusqlite::{params as sql_params, Connection as DB, OptionalExtension};
use std::path::{Path, PathBuf};
use tr_common::EventId;
use tr_config::SinkConfig;

use super::sink::{Delivery, DeliveryStats, Sink, SinkError, SinkSource};

const SCHEMA: &str = include_str!("sink.sql");

const FIELD_TOTAL: &str = "total";
const FIELD_LAST_TRAP: &str = "last_trap";
const SEVERITY_PREFIX: &str = "severity:";
const HOST_PREFIX: &str = "host:";

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send>;

/// Key names inside the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkKeys {
    pub index_key: String,
    pub record_prefix: String,
    pub stats_key: String,
    pub cursor_key: String,
}

impl From<&SinkConfig> for SinkKeys {
    fn from(config: &SinkConfig) -> Self {
        SinkKeys {
            index_key: config.index_key.clone(),
            record_prefix: config.record_prefix.clone(),
            stats_key: config.stats_key.clone(),
            cursor_key: config.cursor_key.clone(),
        }
    }
}

/// A connection to the SQLite sink.
pub struct SqliteSink {
    db: DB,
    path: PathBuf,
    keys: SinkKeys,
    clock: Clock,
}

fn unavailable(path: &Path, err: rusqlite::Error) -> SinkError {
    SinkError::Unavailable(format!("{}: {}", path.display(), err))
}

impl SqliteSink {
    /// Open the sink database and ensure its schema.
    ///
    /// The parent directory must already exist; a missing directory is
    /// reported as an unavailable sink.
    pub fn open(config: &SinkConfig) -> Result<Self, SinkError> {
        let path = config.path.clone();
        let db = DB::open(&path).map_err(|e| unavailable(&path, e))?;
        db.busy_timeout(config.timeout())
            .map_err(|e| unavailable(&path, e))?;
        db.execute_batch(SCHEMA)
            .map_err(|e| unavailable(&path, e))?;

        Ok(SqliteSink {
            db,
            path,
            keys: SinkKeys::from(config),
            clock: Box::new(Utc::now),
        })
    }

    /// Replace the clock used for TTL bookkeeping.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn now_millis(&self) -> i64 {
        (self.clock)().timestamp_millis()
    }

    fn read_err(&self, err: rusqlite::Error) -> SinkError {
        SinkError::Read(format!("{}: {}", self.path.display(), err))
    }
}

impl Sink for SqliteSink {
    fn deliver(&mut self, delivery: &Delivery<'_>) -> Result<(), SinkError> {
        let now = self.now_millis();
        let ttl_millis = i64::try_from(delivery.retention.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl_millis);
        let max_len = i64::try_from(delivery.retention.max_index_len).unwrap_or(i64::MAX);
        let event = delivery.event;
        let keys = &self.keys;
        let path = self.path.clone();
        let write_err = |e: rusqlite::Error| SinkError::Write(format!("{}: {}", path.display(), e));

        let tx = self.db.transaction().map_err(write_err)?;

        tx.execute(
            "DELETE FROM sink_records WHERE expires_at <= ?1",
            sql_params![now],
        )
        .map_err(write_err)?;

        tx.execute(
            "INSERT OR REPLACE INTO sink_records
                (key, body, timestamp, host, source_ip, severity, trap_oid, trap_name, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            sql_params![
                event.event_id.record_key(&keys.record_prefix),
                delivery.body,
                event.timestamp_string(),
                event.host,
                event.source_ip,
                event.severity.as_str(),
                event.trap_oid,
                event.trap_name,
                expires_at,
            ],
        )
        .map_err(write_err)?;

        tx.execute(
            "INSERT INTO sink_index (list_key, token) VALUES (?1, ?2)",
            sql_params![keys.index_key, event.event_id.as_str()],
        )
        .map_err(write_err)?;

        tx.execute(
            "DELETE FROM sink_index WHERE list_key = ?1 AND seq NOT IN (
                SELECT seq FROM sink_index WHERE list_key = ?1 ORDER BY seq DESC LIMIT ?2
            )",
            sql_params![keys.index_key, max_len],
        )
        .map_err(write_err)?;

        let severity_field = format!("{}{}", SEVERITY_PREFIX, event.severity.as_str());
        let host_field = format!("{}{}", HOST_PREFIX, event.host);
        for field in [FIELD_TOTAL, severity_field.as_str(), host_field.as_str()] {
            tx.execute(
                "INSERT INTO sink_hash (hash_key, field, value) VALUES (?1, ?2, '1')
                 ON CONFLICT (hash_key, field)
                 DO UPDATE SET value = CAST(CAST(value AS INTEGER) + 1 AS TEXT)",
                sql_params![keys.stats_key, field],
            )
            .map_err(write_err)?;
        }
        tx.execute(
            "INSERT INTO sink_hash (hash_key, field, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (hash_key, field) DO UPDATE SET value = excluded.value",
            sql_params![keys.stats_key, FIELD_LAST_TRAP, event.timestamp_string()],
        )
        .map_err(write_err)?;

        tx.commit().map_err(write_err)
    }
}

impl SinkSource for SqliteSink {
    fn index(&mut self) -> Result<Vec<EventId>, SinkError> {
        let mut stmt = self
            .db
            .prepare("SELECT token FROM sink_index WHERE list_key = ?1 ORDER BY seq DESC")
            .map_err(|e| self.read_err(e))?;
        let rows = stmt
            .query_map(sql_params![self.keys.index_key], |row| row.get::<_, String>(0))
            .map_err(|e| self.read_err(e))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(EventId(row.map_err(|e| self.read_err(e))?));
        }
        Ok(ids)
    }

    fn fetch(&mut self, id: &EventId) -> Result<Option<String>, SinkError> {
        let now = self.now_millis();
        self.db
            .query_row(
                "SELECT body FROM sink_records WHERE key = ?1 AND expires_at > ?2",
                sql_params![id.record_key(&self.keys.record_prefix), now],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| self.read_err(e))
    }

    fn cursor(&mut self) -> Result<Option<EventId>, SinkError> {
        self.db
            .query_row(
                "SELECT value FROM sink_strings WHERE key = ?1",
                sql_params![self.keys.cursor_key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map(|v| v.map(EventId))
            .map_err(|e| self.read_err(e))
    }

    fn advance_cursor(&mut self, id: &EventId) -> Result<(), SinkError> {
        self.db
            .execute(
                "INSERT INTO sink_strings (key, value) VALUES (?1, ?2)
                 ON CONFLICT (key) DO UPDATE SET value = excluded.value",
                sql_params![self.keys.cursor_key, id.as_str()],
            )
            .map(|_| ())
            .map_err(|e| SinkError::Write(format!("{}: {}", self.path.display(), e)))
    }

    fn stats(&mut self) -> Result<DeliveryStats, SinkError> {
        let mut stmt = self
            .db
            .prepare("SELECT field, value FROM sink_hash WHERE hash_key = ?1")
            .map_err(|e| self.read_err(e))?;
        let rows = stmt
            .query_map(sql_params![self.keys.stats_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| self.read_err(e))?;

        let mut stats = DeliveryStats::default();
        for row in rows {
            let (field, value) = row.map_err(|e| self.read_err(e))?;
            let count = || value.parse::<u64>().unwrap_or(0);
            if field == FIELD_TOTAL {
                stats.total = count();
            } else if field == FIELD_LAST_TRAP {
                stats.last_trap = Some(value.clone());
            } else if let Some(sev) = field.strip_prefix(SEVERITY_PREFIX) {
                stats.by_severity.insert(sev.to_string(), count());
            } else if let Some(host) = field.strip_prefix(HOST_PREFIX) {
                stats.by_host.insert(host.to_string(), count());
            }
        }
        Ok(stats)
    }
}

/// A sink source that (re)opens its connection on demand.
///
/// Any error drops the connection so the next call reconnects. The
/// consumption loop uses this to survive sink restarts without crashing.
pub struct ReconnectingSource {
    config: SinkConfig,
    conn: Option<SqliteSink>,
}

impl ReconnectingSource {
    pub fn new(config: SinkConfig) -> Self {
        ReconnectingSource { config, conn: None }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn with_conn<T>(
        &mut self,
        op: impl FnOnce(&mut SqliteSink) -> Result<T, SinkError>,
    ) -> Result<T, SinkError> {
        if self.conn.is_none() {
            self.conn = Some(SqliteSink::open(&self.config)?);
        }
        let Some(conn) = self.conn.as_mut() else {
            return Err(SinkError::Unavailable("connection not established".into()));
        };
        let result = op(conn);
        if result.is_err() {
            self.conn = None;
        }
        result
    }
}

impl SinkSource for ReconnectingSource {
    fn index(&mut self) -> Result<Vec<EventId>, SinkError> {
        self.with_conn(|c| c.index())
    }

    fn fetch(&mut self, id: &EventId) -> Result<Option<String>, SinkError> {
        self.with_conn(|c| c.fetch(id))
    }

    fn cursor(&mut self) -> Result<Option<EventId>, SinkError> {
        self.with_conn(|c| c.cursor())
    }

    fn advance_cursor(&mut self, id: &EventId) -> Result<(), SinkError> {
        self.with_conn(|c| c.advance_cursor(id))
    }

    fn stats(&mut self) -> Result<DeliveryStats, SinkError> {
        self.with_conn(|c| c.stats())
    }
}
