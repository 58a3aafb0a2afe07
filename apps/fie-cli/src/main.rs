//! # fie-cli
//!
//! Command-line interface for Finite Intent Executor estates.
//!
//! - `fie trigger ...`: configure activation, check in, sign, report, fire
//! - `fie exec ...`: activate execution and submit corpus-gated actions
//! - `fie sunset ...`: drive the post-horizon wind-down
//! - `fie audit verify/tail`: inspect the tamper-evident audit trail
//!
//! `--at UNIX_SECONDS` pins the clock for one invocation, which is how the
//! 20-year horizon is exercised from a shell.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use fie_estate::{ExecutorConfig, FileConfig, LoggingConfig};
use fie_types::{Clock, ManualClock, SystemClock, Timestamp};
use tracing_subscriber::EnvFilter;

use commands::Session;

/// Finite Intent Executor: trigger, execute and sunset estates.
#[derive(Parser)]
#[command(name = "fie", version, about)]
struct Cli {
    /// Project root directory (defaults to current directory).
    #[arg(long, default_value = ".", global = true)]
    project_root: PathBuf,

    /// Treat this Unix timestamp (seconds) as the current time.
    #[arg(long, global = true)]
    at: Option<u64>,

    /// Identity making the call (defaults to `[cli] default_caller`).
    #[arg(long = "as", global = true, value_name = "IDENTITY")]
    caller: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure and fire estate triggers.
    Trigger {
        #[command(subcommand)]
        command: commands::trigger::TriggerCommands,
    },
    /// Run the execution agent of a triggered estate.
    Exec {
        #[command(subcommand)]
        command: commands::exec::ExecCommands,
    },
    /// Drive the sunset protocol.
    Sunset {
        #[command(subcommand)]
        command: commands::sunset::SunsetCommands,
    },
    /// Inspect the audit trail.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = ExecutorConfig::for_project(&project_root);
    let file_config = FileConfig::load_or_default(&config.config_file)?;

    init_logging(&file_config.logging);

    let clock: Arc<dyn Clock> = match cli.at {
        Some(secs) => Arc::new(ManualClock::new(Timestamp::from_secs(secs))),
        None => Arc::new(SystemClock),
    };
    let caller = cli.caller.or(file_config.cli.default_caller);
    let session = Session::new(config, clock, caller)?;

    match &cli.command {
        Commands::Trigger { command } => commands::trigger::execute(command, &session),
        Commands::Exec { command } => commands::exec::execute(command, &session),
        Commands::Sunset { command } => commands::sunset::execute(command, &session),
        Commands::Audit { command } => commands::audit::execute(command, &session),
    }
}

/// Logs go to stderr so command output on stdout stays scriptable.
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
