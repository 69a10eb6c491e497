//! End-to-end pipeline scenarios against the SQLite sink and store.
//!
//! Each test builds both halves in a scratch directory: ingest into the
//! sink (or fallback file), then drain the sink into the store.

use chrono::Utc;
use std::path::Path;
use tempfile::TempDir;
use tr_common::{Severity, TrapEvent};
use tr_config::{SinkConfig, StoreConfig};
use tr_core::consume::{Consumer, CycleReport};
use tr_core::fallback::FallbackLog;
use tr_core::ingest::ingest;
use tr_core::logging::LogContext;
use tr_core::persist::{Persister, SqliteStore};
use tr_core::relay::{replay, ReconnectingSource, Relay, RelayOutcome, Retention, SinkSource, SqliteSink};
use tr_core::shutdown::Shutdown;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Env {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn ctx(&self) -> LogContext {
        LogContext::new("run-scenario", "host-scenario")
    }

    fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            path: self.dir.path().join("sink.db"),
            ..SinkConfig::default()
        }
    }

    fn unreachable_sink_config(&self) -> SinkConfig {
        SinkConfig {
            path: self.dir.path().join("missing/dir/sink.db"),
            ..SinkConfig::default()
        }
    }

    fn fallback(&self) -> FallbackLog {
        FallbackLog::new(self.dir.path().join("log/trap_fallback.log"))
    }

    fn failure_log(&self) -> FallbackLog {
        FallbackLog::new(self.dir.path().join("log/trap_store_failures.log"))
    }

    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            path: self.dir.path().join("traps.db"),
            ..StoreConfig::default()
        }
    }

    fn handle(&self, sink: &SinkConfig, lines: &[&str]) -> RelayOutcome {
        let mut relay = Relay::new(
            SqliteSink::open(sink),
            self.fallback(),
            Retention::default(),
            self.ctx(),
        );
        ingest(lines, Utc::now(), &mut relay, &self.ctx()).unwrap()
    }

    fn consumer(&self) -> Consumer<ReconnectingSource, SqliteStore> {
        let store = SqliteStore::open(&self.store_config()).unwrap();
        Consumer::new(
            ReconnectingSource::new(self.sink_config()),
            Persister::new(store, self.failure_log(), self.ctx()),
            self.ctx(),
        )
    }

    fn cycle(&self, consumer: &mut Consumer<ReconnectingSource, SqliteStore>) -> CycleReport {
        consumer.run_cycle(&Shutdown::new()).unwrap()
    }
}

fn link_down(host: &str) -> Vec<String> {
    vec![
        host.to_string(),
        "UDP: [10.0.0.5]:161->[10.0.0.1]:162".to_string(),
        "SNMPv2-MIB::snmpTrapOID.0 SNMPv2-MIB::linkDown".to_string(),
        "IF-MIB::ifIndex.1 5".to_string(),
    ]
}

fn as_strs(lines: &[String]) -> Vec<&str> {
    lines.iter().map(String::as_str).collect()
}

/// Event IDs in the store, read back through a fresh handle.
fn stored_ids(path: &Path) -> Vec<String> {
    let store = SqliteStore::open(&StoreConfig {
        path: path.to_path_buf(),
        ..StoreConfig::default()
    })
    .unwrap();
    store.event_ids().unwrap()
}

#[test]
fn link_down_flows_from_stdin_lines_to_store() {
    let env = Env::new();
    let outcome = env.handle(&env.sink_config(), &as_strs(&link_down("host-a")));
    let RelayOutcome::Delivered { id } = outcome else {
        panic!("expected delivery, got {outcome:?}");
    };

    let mut sink = SqliteSink::open(&env.sink_config()).unwrap();
    let event = TrapEvent::decode(&sink.fetch(&id).unwrap().unwrap()).unwrap();
    assert_eq!(event.source_ip, "10.0.0.5");
    assert_eq!(event.trap_oid, "SNMPv2-MIB::linkDown");
    assert_eq!(event.trap_name, "linkDown");
    assert_eq!(event.varbinds.len(), 2);
    assert_eq!(event.severity, Severity::Info);

    let mut consumer = env.consumer();
    let report = env.cycle(&mut consumer);
    assert_eq!(report.stored, 1);
    assert_eq!(report.cursor, Some(id.clone()));
    assert_eq!(consumer.persister().store().count().unwrap(), 1);
    assert_eq!(stored_ids(&env.store_config().path), vec![id.to_string()]);
}

#[test]
fn vendor_severity_reaches_the_store() {
    let env = Env::new();
    env.handle(
        &env.sink_config(),
        &[
            "dsr-1",
            "UDP: [10.1.1.1]:162->",
            "SNMPv2-MIB::snmpTrapOID.0 EAGLEXGDSR-MIB::eagleXgDsrTrap",
            "EAGLEXGDSR-MIB::eagleXgDsrAlarmSeverity.0 2",
            "EAGLEXGDSR-MIB::eagleXgDsrAlarmNumber.0 31201",
            "EAGLEXGDSR-MIB::eagleXgDsrAlarmText.0 Process CPU utilization",
        ],
    );

    let mut sink = SqliteSink::open(&env.sink_config()).unwrap();
    let stats = sink.stats().unwrap();
    assert_eq!(stats.by_severity.get("major"), Some(&1));
    assert_eq!(stats.by_host.get("dsr-1"), Some(&1));

    let mut consumer = env.consumer();
    assert_eq!(env.cycle(&mut consumer).stored, 1);
}

#[test]
fn unreachable_sink_appends_exactly_one_fallback_line() {
    let env = Env::new();
    let outcome = env.handle(&env.unreachable_sink_config(), &as_strs(&link_down("host-a")));

    assert!(matches!(outcome, RelayOutcome::FellBack { .. }));
    let lines = env.fallback().read_lines().unwrap();
    assert_eq!(lines.len(), 1);
    let event = TrapEvent::decode(&lines[0]).unwrap();
    assert_eq!(event.host, "host-a");
    assert_eq!(event.trap_name, "linkDown");
}

#[test]
fn fallback_replay_is_persisted_once() {
    let env = Env::new();
    env.handle(&env.unreachable_sink_config(), &as_strs(&link_down("host-a")));
    env.handle(&env.unreachable_sink_config(), &as_strs(&link_down("host-b")));
    let lines = env.fallback().read_lines().unwrap();

    let mut sink = SqliteSink::open(&env.sink_config()).unwrap();
    replay(&lines, &mut sink, Retention::default(), &env.ctx()).unwrap();
    // Replaying twice lands duplicates in the sink only.
    replay(&lines, &mut sink, Retention::default(), &env.ctx()).unwrap();
    drop(sink);

    let mut consumer = env.consumer();
    let report = env.cycle(&mut consumer);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.stored, 2);
    assert_eq!(report.duplicates, 2);
    assert_eq!(consumer.persister().store().count().unwrap(), 2);
}

#[test]
fn cursor_survives_consumer_restart() {
    let env = Env::new();
    for host in ["a", "b"] {
        env.handle(&env.sink_config(), &as_strs(&link_down(host)));
    }
    {
        let mut consumer = env.consumer();
        assert_eq!(env.cycle(&mut consumer).stored, 2);
    }

    env.handle(&env.sink_config(), &as_strs(&link_down("c")));
    let mut restarted = env.consumer();
    let report = env.cycle(&mut restarted);
    assert_eq!(report.fetched, 1);
    assert_eq!(report.stored, 1);
    assert_eq!(report.duplicates, 0);
    assert_eq!(restarted.persister().store().count().unwrap(), 3);
}

#[test]
fn consumer_waits_out_a_sink_outage() {
    let env = Env::new();
    let sink_config = SinkConfig {
        path: env.dir.path().join("later/sink.db"),
        ..SinkConfig::default()
    };
    let store = SqliteStore::open(&env.store_config()).unwrap();
    let mut consumer = Consumer::new(
        ReconnectingSource::new(sink_config.clone()),
        Persister::new(store, env.failure_log(), env.ctx()),
        env.ctx(),
    );

    assert!(consumer.run_cycle(&Shutdown::new()).is_err());

    std::fs::create_dir_all(env.dir.path().join("later")).unwrap();
    env.handle(&sink_config, &as_strs(&link_down("a")));
    assert_eq!(consumer.run_cycle(&Shutdown::new()).unwrap().stored, 1);
}
