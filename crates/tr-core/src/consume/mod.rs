//! Consumption loop: cursor-gated reads from the sink into the persister.
//!
//! Each cycle reads the newest-first index and the cursor, processes what is
//! newer than the cursor oldest-first, then moves the cursor to the index
//! head. Cursor advancement does not wait on persistence outcomes; failed
//! rows are already in the failure log by then.

pub mod cursor;
pub mod wakeup;

pub use cursor::{select_new, Batch};
pub use wakeup::{CountedWakeup, IntervalWakeup, Wakeup};

use serde::Serialize;
use tr_common::{EventId, TrapEvent};

use crate::flatten::flatten;
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use crate::persist::{PersistOutcome, Persister, Store};
use crate::relay::{SinkError, SinkSource};
use crate::shutdown::Shutdown;

/// What one cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Entries selected as new.
    pub fetched: u64,
    pub stored: u64,
    pub duplicates: u64,
    /// Written to the failure log instead of the store.
    pub fell_back: u64,
    /// Neither the store nor the failure log took them.
    pub lost: u64,
    pub decode_failed: u64,
    /// Indexed but the record had already expired.
    pub missing: u64,
    /// Cursor after the cycle.
    pub cursor: Option<EventId>,
    /// The cursor write failed; the next cycle will re-deliver.
    pub cursor_stalled: bool,
    /// Shutdown arrived mid-batch.
    pub interrupted: bool,
}

impl CycleReport {
    /// Events this cycle handled, whatever the outcome.
    pub fn handled(&self) -> u64 {
        self.stored + self.duplicates + self.fell_back + self.lost + self.decode_failed + self.missing
    }

    fn absorb(&mut self, other: &CycleReport) {
        self.fetched += other.fetched;
        self.stored += other.stored;
        self.duplicates += other.duplicates;
        self.fell_back += other.fell_back;
        self.lost += other.lost;
        self.decode_failed += other.decode_failed;
        self.missing += other.missing;
        self.cursor.clone_from(&other.cursor);
        self.cursor_stalled = other.cursor_stalled;
        self.interrupted |= other.interrupted;
    }
}

/// Totals across a run of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub cycles: u64,
    /// Cycles abandoned because the sink was unreachable.
    pub failed_cycles: u64,
    pub totals: CycleReport,
}

pub struct Consumer<Src, St> {
    source: Src,
    persister: Persister<St>,
    ctx: LogContext,
}

impl<Src: SinkSource, St: Store> Consumer<Src, St> {
    pub fn new(source: Src, persister: Persister<St>, ctx: LogContext) -> Self {
        Consumer {
            source,
            persister,
            ctx,
        }
    }

    pub fn source_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    pub fn persister(&self) -> &Persister<St> {
        &self.persister
    }

    /// Run one cycle.
    ///
    /// Errors only when the sink cannot be read. The cursor is then left
    /// where it was; anything already persisted in this cycle is absorbed
    /// as duplicates next time.
    pub fn run_cycle(&mut self, shutdown: &Shutdown) -> Result<CycleReport, SinkError> {
        let index = self.source.index()?;
        let previous = self.source.cursor()?;
        let batch = select_new(&index, previous.as_ref());

        let mut report = CycleReport {
            fetched: batch.pending.len() as u64,
            cursor: previous.clone(),
            ..CycleReport::default()
        };

        if batch.is_empty() {
            log_event!(
                self.ctx,
                DEBUG,
                event_names::CONSUME_IDLE,
                Stage::Consume,
                "no new traps",
                index_len = index.len() as u64
            );
            return Ok(report);
        }

        let mut last_handled: Option<&EventId> = None;
        for id in &batch.pending {
            if shutdown.is_requested() {
                report.interrupted = true;
                break;
            }
            self.handle(id, &mut report)?;
            last_handled = Some(id);
        }

        let target = if report.interrupted {
            last_handled.cloned()
        } else {
            batch.head.clone()
        };
        if let Some(target) = target.filter(|t| Some(t) != previous.as_ref()) {
            match self.source.advance_cursor(&target) {
                Ok(()) => {
                    log_event!(
                        self.ctx,
                        DEBUG,
                        event_names::CURSOR_ADVANCED,
                        Stage::Consume,
                        "cursor advanced",
                        cursor = target.as_str()
                    );
                    report.cursor = Some(target);
                }
                Err(err) => {
                    log_event!(
                        self.ctx,
                        WARN,
                        event_names::CURSOR_STALLED,
                        Stage::Consume,
                        "cursor write failed; batch may be re-delivered",
                        cursor = target.as_str(),
                        error = err.to_string().as_str()
                    );
                    report.cursor_stalled = true;
                }
            }
        }

        log_event!(
            self.ctx,
            INFO,
            event_names::CONSUME_BATCH,
            Stage::Consume,
            "batch processed",
            fetched = report.fetched,
            stored = report.stored,
            duplicates = report.duplicates,
            fell_back = report.fell_back,
            decode_failed = report.decode_failed,
            missing = report.missing,
            interrupted = report.interrupted
        );
        Ok(report)
    }

    fn handle(&mut self, id: &EventId, report: &mut CycleReport) -> Result<(), SinkError> {
        let Some(body) = self.source.fetch(id)? else {
            log_event!(
                self.ctx,
                WARN,
                event_names::CONSUME_MISSING,
                Stage::Consume,
                "indexed trap has no record; skipping",
                event_id = id.as_str()
            );
            report.missing += 1;
            return Ok(());
        };

        let mut event = match TrapEvent::decode(&body) {
            Ok(event) => event,
            Err(err) => {
                log_event!(
                    self.ctx,
                    WARN,
                    event_names::CONSUME_DECODE_FAILED,
                    Stage::Consume,
                    "undecodable trap body; skipping",
                    event_id = id.as_str(),
                    error = err.to_string().as_str()
                );
                report.decode_failed += 1;
                return Ok(());
            }
        };
        // The index token is the identity of record.
        event.event_id = id.clone();

        let flat = flatten(event);
        log_event!(
            self.ctx,
            DEBUG,
            event_names::TRAP_FLATTENED,
            Stage::Flatten,
            "trap flattened",
            event_id = id.as_str(),
            varbinds = flat.varbinds.len() as u64,
            alarm_number = flat.alarm_number.as_deref().unwrap_or("")
        );

        match self.persister.persist(&flat) {
            Ok(PersistOutcome::Stored) => report.stored += 1,
            Ok(PersistOutcome::Duplicate) => report.duplicates += 1,
            Ok(PersistOutcome::FellBack { .. }) => report.fell_back += 1,
            Err(_) => report.lost += 1,
        }
        Ok(())
    }

    /// Run cycles until `wakeup` says stop or shutdown is requested.
    ///
    /// Sink failures are logged and retried on the next cycle.
    pub fn run<W: Wakeup>(&mut self, wakeup: &mut W, shutdown: &Shutdown) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            if shutdown.is_requested() {
                break;
            }
            summary.cycles += 1;
            match self.run_cycle(shutdown) {
                Ok(report) => summary.totals.absorb(&report),
                Err(err) => {
                    summary.failed_cycles += 1;
                    log_event!(
                        self.ctx,
                        WARN,
                        event_names::CONSUME_SINK_UNAVAILABLE,
                        Stage::Consume,
                        "sink unavailable; retrying next cycle",
                        error = err.to_string().as_str()
                    );
                }
            }
            if !wakeup.wait(shutdown) {
                break;
            }
        }

        if shutdown.is_requested() {
            log_event!(
                self.ctx,
                INFO,
                event_names::SHUTDOWN_REQUESTED,
                Stage::Consume,
                "shutdown requested; consumption loop stopped",
                cycles = summary.cycles
            );
        }
        summary
    }
}
