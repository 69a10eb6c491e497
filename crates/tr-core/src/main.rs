//! Trap Relay - SNMP trap ingest, relay, and persistence
//!
//! The main entry point for the `trap-relay` binary:
//! - `handle`: one notification from stdin to the sink (trap handler mode)
//! - `process`: long-running sink to relational store consumer
//! - `replay`, `stats`, `config`: operator tooling

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use tr_config::{load_config, load_from_path, validate_config, Config, ConfigError, LoadedConfig};
use tr_core::consume::{Consumer, CountedWakeup, IntervalWakeup};
use tr_core::exit_codes::ExitCode;
use tr_core::fallback::FallbackLog;
use tr_core::ingest::{ingest, IngestError};
use tr_core::log_event;
use tr_core::logging::{event_names, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage};
use tr_core::persist::{connect_store, Persister};
use tr_core::relay::{replay, Relay, RelayError, RelayOutcome, ReconnectingSource, Retention, SinkSource, SqliteSink};
use tr_core::shutdown::Shutdown;

/// SNMP trap relay - ingest, relay, and persist trap notifications
#[derive(Parser)]
#[command(name = "trap-relay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to trap-relay.toml (overrides TRAP_RELAY_CONFIG and search paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format: human or jsonl
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read one notification from stdin and relay it (trap handler mode)
    Handle,

    /// Drain the sink into the relational store
    Process(ProcessArgs),

    /// Re-relay every event in a fallback file into the sink
    Replay(ReplayArgs),

    /// Print sink delivery statistics as JSON
    Stats,

    /// Inspect and validate configuration
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ProcessArgs {
    /// Run a single cycle and print its report
    #[arg(long)]
    once: bool,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Fallback file to replay
    file: PathBuf,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Validate a config file (defaults to the resolved one)
    Validate {
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };

    let exit_code = match cli.command {
        Commands::Version => {
            println!("trap-relay {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
        Commands::Config(ConfigArgs {
            command: ConfigCommands::Validate { path: Some(path) },
        }) => run_config_validate_path(&path),
        command => match load_config(cli.global.config.as_deref()) {
            Err(err) => {
                eprintln!("trap-relay: {}", err);
                ExitCode::ConfigError
            }
            Ok(loaded) => {
                let log_config =
                    LogConfig::resolve(&loaded.config.logging, cli_level, cli.global.log_format);
                // A broken log file must never cost a trap: log to stderr instead.
                let log_file_error = match init_logging(&log_config) {
                    Ok(()) => None,
                    Err(err) => {
                        let stderr_only = LogConfig {
                            file: None,
                            ..log_config
                        };
                        let _ = init_logging(&stderr_only);
                        Some(err.to_string())
                    }
                };
                dispatch(command, &loaded, log_file_error.as_deref())
            }
        },
    };

    std::process::exit(exit_code.as_i32());
}

fn dispatch(command: Commands, loaded: &LoadedConfig, log_file_error: Option<&str>) -> ExitCode {
    let ctx = LogContext::for_process();
    if let Some(error) = log_file_error {
        log_event!(
            ctx,
            WARN,
            event_names::LOG_FILE_UNAVAILABLE,
            Stage::Init,
            "log file unavailable; logging to stderr",
            path = loaded
                .config
                .logging
                .file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
                .as_str(),
            error = error
        );
    }
    log_event!(
        ctx,
        DEBUG,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration loaded",
        source = loaded.source.to_string().as_str()
    );

    match command {
        Commands::Handle => run_handle(&loaded.config, &ctx),
        Commands::Process(args) => run_process(&loaded.config, &ctx, &args),
        Commands::Replay(args) => run_replay(&loaded.config, &ctx, &args),
        Commands::Stats => run_stats(&loaded.config),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(loaded),
            ConfigCommands::Validate { .. } => {
                println!("config OK ({})", loaded.source);
                ExitCode::Clean
            }
        },
        Commands::Version => ExitCode::Clean,
    }
}

fn run_handle(config: &Config, ctx: &LogContext) -> ExitCode {
    let lines: Vec<String> = match std::io::stdin().lock().lines().collect() {
        Ok(lines) => lines,
        Err(err) => {
            log_event!(
                ctx,
                ERROR,
                event_names::TRAP_REJECTED,
                Stage::Ingest,
                "failed to read notification from stdin",
                error = err.to_string().as_str()
            );
            return ExitCode::InputError;
        }
    };

    let mut relay = Relay::new(
        SqliteSink::open(&config.sink),
        FallbackLog::new(&config.relay.fallback_path),
        Retention::from_config(&config.relay),
        ctx.clone(),
    );

    match ingest(&lines, Utc::now(), &mut relay, ctx) {
        Ok(RelayOutcome::Delivered { .. }) | Ok(RelayOutcome::FellBack { .. }) => ExitCode::Clean,
        Err(IngestError::Parse(_)) => ExitCode::InputError,
        Err(IngestError::Relay(RelayError::Lost { .. })) => ExitCode::IoError,
        Err(IngestError::Relay(RelayError::Encode(_))) => ExitCode::InternalError,
    }
}

fn run_process(config: &Config, ctx: &LogContext, args: &ProcessArgs) -> ExitCode {
    log_event!(
        ctx,
        INFO,
        event_names::RUN_STARTED,
        Stage::Init,
        "processor starting",
        sink = config.sink.path.display().to_string().as_str(),
        store = config.store.path.display().to_string().as_str(),
        once = args.once
    );

    let shutdown = match Shutdown::install() {
        Ok(shutdown) => shutdown,
        Err(err) => {
            log_event!(
                ctx,
                WARN,
                event_names::SIGNALS_UNAVAILABLE,
                Stage::Init,
                "signal handlers not installed; stop with SIGKILL",
                error = err.to_string().as_str()
            );
            Shutdown::new()
        }
    };

    let store = match connect_store(&config.store, ctx, std::thread::sleep) {
        Ok(store) => store,
        Err(_) => return ExitCode::StoreUnavailable,
    };

    let persister = Persister::new(
        store,
        FallbackLog::new(&config.processor.failure_log_path),
        ctx.clone(),
    );
    let mut consumer = Consumer::new(
        ReconnectingSource::new(config.sink.clone()),
        persister,
        ctx.clone(),
    );

    let summary = if args.once {
        consumer.run(&mut CountedWakeup::new(0), &shutdown)
    } else {
        consumer.run(
            &mut IntervalWakeup::new(config.processor.poll_interval()),
            &shutdown,
        )
    };
    // Release sink and store connections before reporting.
    drop(consumer);

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Consume,
        "processor stopped",
        cycles = summary.cycles,
        failed_cycles = summary.failed_cycles,
        stored = summary.totals.stored,
        fell_back = summary.totals.fell_back
    );

    if args.once {
        match serde_json::to_string_pretty(&summary.totals) {
            Ok(json) => println!("{}", json),
            Err(_) => return ExitCode::InternalError,
        }
        if summary.failed_cycles == summary.cycles && summary.cycles > 0 {
            return ExitCode::SinkUnavailable;
        }
    }
    ExitCode::Clean
}

fn run_replay(config: &Config, ctx: &LogContext, args: &ReplayArgs) -> ExitCode {
    let lines = match FallbackLog::new(&args.file).read_lines() {
        Ok(lines) => lines,
        Err(err) => {
            eprintln!("trap-relay: {}", err);
            return ExitCode::InputError;
        }
    };
    let mut sink = match SqliteSink::open(&config.sink) {
        Ok(sink) => sink,
        Err(err) => {
            eprintln!("trap-relay: {}", err);
            return ExitCode::SinkUnavailable;
        }
    };

    match replay(&lines, &mut sink, Retention::from_config(&config.relay), ctx) {
        Ok(report) => match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::Clean
            }
            Err(_) => ExitCode::InternalError,
        },
        Err(err) => {
            eprintln!("trap-relay: {}", err);
            ExitCode::SinkUnavailable
        }
    }
}

fn run_stats(config: &Config) -> ExitCode {
    let stats = SqliteSink::open(&config.sink).and_then(|mut sink| sink.stats());
    match stats {
        Ok(stats) => match serde_json::to_string_pretty(&stats) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::Clean
            }
            Err(_) => ExitCode::InternalError,
        },
        Err(err) => {
            eprintln!("trap-relay: {}", err);
            ExitCode::SinkUnavailable
        }
    }
}

fn run_config_show(loaded: &LoadedConfig) -> ExitCode {
    match toml::to_string_pretty(&loaded.config) {
        Ok(body) => {
            match &loaded.path {
                Some(path) => println!("# source: {} ({})", loaded.source, path.display()),
                None => println!("# source: {}", loaded.source),
            }
            print!("{}", body);
            ExitCode::Clean
        }
        Err(err) => {
            eprintln!("trap-relay: cannot render config: {}", err);
            ExitCode::InternalError
        }
    }
}

fn run_config_validate_path(path: &std::path::Path) -> ExitCode {
    let result = load_from_path(path)
        .and_then(|config| validate_config(&config).map_err(ConfigError::from));
    match result {
        Ok(()) => {
            println!("config OK ({})", path.display());
            ExitCode::Clean
        }
        Err(err) => {
            eprintln!("trap-relay: {}", err);
            ExitCode::ConfigError
        }
    }
}
