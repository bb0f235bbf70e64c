//! Sync Probe - Synchronization Scenario Rehearsal Tool
//!
//! Loads a YAML scenario describing a reference clock and a set of simulated
//! data sources, calibrates the group, holds a steady-state presentation
//! window, and prints a JSON session report.
//!
//! # Usage
//!
//! ```bash
//! # Rehearse a scenario and print the report
//! sync-probe run scenarios/two_cameras.yaml
//!
//! # Write the report to a file, with info logging
//! sync-probe -v run scenarios/two_cameras.yaml --output report.json
//!
//! # List the standard frame-rate catalog
//! sync-probe rates
//! ```

mod report;
mod scenario;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use framelock_core::StandardFrameRate;
use framelock_sources::SourceRegistry;

use crate::scenario::Scenario;
use crate::session::Session;

/// Sync Probe - Rehearse synchronization scenarios
#[derive(Parser)]
#[command(name = "sync-probe")]
#[command(author, version)]
#[command(about = "Rehearse synchronization scenarios and report calibration outcomes")]
struct Args {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a scenario: warm up, calibrate, hold a steady-state window, report
    Run {
        /// Path to the scenario YAML file
        scenario: PathBuf,

        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the standard frame-rate catalog
    Rates,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    match args.command {
        Command::Run { scenario, output } => {
            let scenario = Scenario::load(&scenario)?;
            let registry = SourceRegistry::with_defaults();
            let report = Session::build(scenario, &registry)?.run()?;

            let json = serde_json::to_string_pretty(&report)
                .context("failed to serialize the session report")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("failed to write report {}", path.display()))?;
                    tracing::info!("report written to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Rates => {
            for standard in StandardFrameRate::ALL {
                let rate = standard.rate();
                let label = rate.to_string();
                println!("{label:>9}  {}/{}", rate.numerator(), rate.denominator());
            }
        }
    }

    Ok(())
}
