//! Main CLI application structure

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::{annotate_cmd, report};
use crate::annotate::Clock;
use crate::storage::Config;

/// Environment variable holding a tracing filter, e.g. `worklog=debug`
pub const LOG_ENV: &str = "WORKLOG_LOG";

#[derive(Parser)]
#[command(name = "worklog")]
#[command(author, version, about = "Plain-text work logs with time tracking and task sync")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the configured one)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Pretend the current time is this one (YYYY-MM-DDTHH:MM)
    #[arg(long, global = true, env = "WORKLOG_NOW", hide = true, value_parser = parse_now)]
    pub now: Option<NaiveDateTime>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Annotate a project file in place, or standard input to standard output
    Annotate {
        /// Project file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Do not talk to the task tracker
        #[arg(long)]
        no_tracker: bool,

        /// Do not read commit history
        #[arg(long)]
        no_history: bool,

        /// Print the result instead of writing the file
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a project summary
    Show {
        /// Project file
        file: PathBuf,
    },

    /// List parse problems without rewriting the file
    Check {
        /// Project file
        file: PathBuf,
    },
}

fn parse_now(value: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM, got {:?}", value))
}

fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    // A second init (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    let config = Config::load().context("Failed to load configuration")?;
    let format = cli.format.unwrap_or(config.default_format);
    let output = Output::new(format, cli.verbose || cli.debug);
    let clock = cli.now.map(Clock::fixed).unwrap_or_else(Clock::system);

    output.verbose_ctx("clock", &format!("now is {}", clock.now()));

    match cli.command {
        Commands::Annotate {
            file,
            no_tracker,
            no_history,
            dry_run,
        } => {
            let opts = annotate_cmd::Flags {
                file,
                tracker: !no_tracker,
                history: !no_history,
                dry_run,
            };
            annotate_cmd::run(&output, &config, clock, opts)
        }
        Commands::Show { file } => report::show(&output, &config, clock, &file),
        Commands::Check { file } => report::check(&output, &config, clock, &file),
    }
}
