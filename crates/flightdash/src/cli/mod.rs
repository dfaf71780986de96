//! Command-line interface for flightdash.
//!
//! This module provides the CLI structure and command arguments for the
//! `flightdash` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CompareCommand, ConfigCommand, DimensionArg, FilterArgs, MeasureArg, OptionsCommand,
    OutputFormat, SparklinesCommand, ViewCommand,
};

/// flightdash - Flight cancellation and route dashboards in the terminal
///
/// Loads the cancellation and route tables once, then filters, aggregates
/// and prints chart-ready views.
#[derive(Debug, Parser)]
#[command(name = "flightdash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Cancellation table (path or URL), overriding the configuration
    #[arg(long, global = true, value_name = "SOURCE")]
    pub cancellations: Option<String>,

    /// Route table (path or URL), overriding the configuration
    #[arg(long, global = true, value_name = "SOURCE")]
    pub routes: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cancellations by airline and reason, with the total
    Cancellations(ViewCommand),

    /// Year-over-year comparison per group
    Compare(CompareCommand),

    /// Monthly sparklines per entity
    Sparklines(SparklinesCommand),

    /// Flight totals, busiest origin cities and the route map
    Routes(ViewCommand),

    /// List dropdown options
    Options(OptionsCommand),

    /// Print the complete view model as JSON
    Render(ViewCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}
