//! Persister: one atomic insert per event, failure log on store errors.
//!
//! Store failures during steady-state consumption are never fatal. Only
//! [`connect_store`] at startup may give up, after bounded retries.

pub mod sqlite;
pub mod store;

pub use sqlite::SqliteStore;
pub use store::{InsertOutcome, Store, StoreError, TrapRow};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tr_common::FlattenedEvent;
use tr_config::StoreConfig;

use crate::fallback::{FallbackError, FallbackLog};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::retry::{retry_with_backoff, Backoff, RetryError};

/// Which path a persisted event took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Stored,
    /// Already in the store; nothing written.
    Duplicate,
    /// Store rejected it; appended to the failure log.
    FellBack { path: PathBuf, reason: String },
}

/// Both the store and the failure log rejected the event.
#[derive(Debug, Error)]
#[error("event {event_id} lost: store failed ({store}); failure log failed ({log})")]
pub struct PersistError {
    pub event_id: String,
    pub store: StoreError,
    #[source]
    pub log: FallbackError,
}

pub struct Persister<S> {
    store: S,
    failure_log: FallbackLog,
    ctx: LogContext,
}

impl<S: Store> Persister<S> {
    pub fn new(store: S, failure_log: FallbackLog, ctx: LogContext) -> Self {
        Persister {
            store,
            failure_log,
            ctx,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn persist(&mut self, flat: &FlattenedEvent) -> Result<PersistOutcome, PersistError> {
        let event_id = flat.event.event_id.as_str();
        let attempt = TrapRow::from_flattened(flat).and_then(|row| self.store.insert(&row));

        let store_err = match attempt {
            Ok(InsertOutcome::Inserted) => {
                log_event!(
                    self.ctx,
                    DEBUG,
                    event_names::PERSIST_STORED,
                    Stage::Persist,
                    "trap stored",
                    event_id = event_id
                );
                return Ok(PersistOutcome::Stored);
            }
            Ok(InsertOutcome::Duplicate) => {
                log_event!(
                    self.ctx,
                    INFO,
                    event_names::PERSIST_DUPLICATE,
                    Stage::Persist,
                    "trap already stored; skipping",
                    event_id = event_id
                );
                return Ok(PersistOutcome::Duplicate);
            }
            Err(err) => err,
        };

        let line = match flat.event.to_json_line() {
            Ok(line) => line,
            Err(err) => {
                let log = FallbackError::Io {
                    path: self.failure_log.path().to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()),
                };
                return Err(self.lost(event_id, store_err, log));
            }
        };

        match self.failure_log.append(&line) {
            Ok(()) => {
                log_event!(
                    self.ctx,
                    ERROR,
                    event_names::PERSIST_FELL_BACK,
                    Stage::Persist,
                    "store write failed; trap written to failure log",
                    event_id = event_id,
                    error = store_err.to_string().as_str(),
                    path = self.failure_log.path().display().to_string().as_str()
                );
                Ok(PersistOutcome::FellBack {
                    path: self.failure_log.path().to_path_buf(),
                    reason: store_err.to_string(),
                })
            }
            Err(log_err) => Err(self.lost(event_id, store_err, log_err)),
        }
    }

    fn lost(&self, event_id: &str, store: StoreError, log: FallbackError) -> PersistError {
        log_event!(
            self.ctx,
            ERROR,
            event_names::PERSIST_LOST,
            Stage::Persist,
            "store and failure log both failed",
            event_id = event_id,
            store_error = store.to_string().as_str(),
            log_error = log.to_string().as_str()
        );
        PersistError {
            event_id: event_id.to_string(),
            store,
            log,
        }
    }
}

/// Open the store, retrying with backoff.
///
/// Exhausting the schedule is the one fatal store failure.
pub fn connect_store<Sleep>(
    config: &StoreConfig,
    ctx: &LogContext,
    sleep: Sleep,
) -> Result<SqliteStore, RetryError<StoreError>>
where
    Sleep: FnMut(Duration),
{
    let backoff = Backoff::from_store_config(config);
    let result = retry_with_backoff(
        "store connect",
        &backoff,
        |_| SqliteStore::open(config),
        |attempt, err, delay| {
            log_event!(
                ctx,
                WARN,
                event_names::STORE_CONNECT_RETRY,
                Stage::Init,
                "store connection failed; retrying",
                attempt = u64::from(attempt),
                delay_ms = delay.as_millis() as u64,
                error = err.to_string().as_str()
            );
        },
        sleep,
    );

    match &result {
        Ok(store) => log_event!(
            ctx,
            INFO,
            event_names::STORE_CONNECTED,
            Stage::Init,
            "store connected",
            path = store.path().display().to_string().as_str()
        ),
        Err(err) => log_event!(
            ctx,
            ERROR,
            event_names::STORE_CONNECT_FAILED,
            Stage::Init,
            "store unavailable after retries",
            error = err.to_string().as_str()
        ),
    }
    result
}
