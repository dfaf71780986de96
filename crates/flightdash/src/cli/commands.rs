//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::error::Result;
use crate::filter::FilterSelection;
use crate::record::{Dimension, Measure};

/// Filter flags shared by the data commands. An omitted flag means "All".
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Airline code
    #[arg(long)]
    pub airline: Option<String>,

    /// Cancellation reason
    #[arg(long)]
    pub reason: Option<String>,

    /// Year
    #[arg(long)]
    pub year: Option<String>,

    /// Month (1-12)
    #[arg(long)]
    pub month: Option<String>,

    /// Origin city
    #[arg(long)]
    pub origin: Option<String>,

    /// Destination city
    #[arg(long)]
    pub destination: Option<String>,
}

impl FilterArgs {
    /// Build the selection these flags describe.
    ///
    /// # Errors
    ///
    /// Returns an error if a year or month is not an integer.
    pub fn to_selection(&self) -> Result<FilterSelection> {
        let flags = [
            (Dimension::Airline, &self.airline),
            (Dimension::CancellationReason, &self.reason),
            (Dimension::Year, &self.year),
            (Dimension::Month, &self.month),
            (Dimension::OriginCity, &self.origin),
            (Dimension::DestinationCity, &self.destination),
        ];
        let mut selection = FilterSelection::all();
        for (dimension, raw) in flags {
            if let Some(raw) = raw {
                selection.set_raw(dimension, raw)?;
            }
        }
        Ok(selection)
    }
}

/// Compare command arguments.
#[derive(Debug, Args)]
pub struct CompareCommand {
    /// Dimension to group by
    #[arg(short, long, value_enum, default_value = "airline")]
    pub group_by: DimensionArg,

    /// Measure to sum
    #[arg(short, long, value_enum, default_value = "cancellations")]
    pub measure: MeasureArg,

    /// Filters; --year selects the compared year
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Sparklines command arguments.
#[derive(Debug, Args)]
pub struct SparklinesCommand {
    /// Dimension with one sparkline per value
    #[arg(short, long, value_enum, default_value = "airline")]
    pub entity: DimensionArg,

    /// Measure to sum
    #[arg(short, long, value_enum, default_value = "cancellations")]
    pub measure: MeasureArg,

    /// Filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Arguments of the page commands.
#[derive(Debug, Args)]
pub struct ViewCommand {
    /// Filters
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Options command arguments.
#[derive(Debug, Args)]
pub struct OptionsCommand {
    /// Only list this dimension
    #[arg(value_enum)]
    pub dimension: Option<DimensionArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "plain")]
    pub format: OutputFormat,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Dimension argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DimensionArg {
    /// Airline code
    Airline,
    /// Cancellation reason
    Reason,
    /// Year
    Year,
    /// Month
    Month,
    /// Origin city
    Origin,
    /// Destination city
    Destination,
}

impl From<DimensionArg> for Dimension {
    fn from(arg: DimensionArg) -> Self {
        match arg {
            DimensionArg::Airline => Self::Airline,
            DimensionArg::Reason => Self::CancellationReason,
            DimensionArg::Year => Self::Year,
            DimensionArg::Month => Self::Month,
            DimensionArg::Origin => Self::OriginCity,
            DimensionArg::Destination => Self::DestinationCity,
        }
    }
}

/// Measure argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MeasureArg {
    /// Cancelled flights
    Cancellations,
    /// Operated flights
    Flights,
}

impl From<MeasureArg> for Measure {
    fn from(arg: MeasureArg) -> Self {
        match arg {
            MeasureArg::Cancellations => Self::Cancellations,
            MeasureArg::Flights => Self::TotalFlights,
        }
    }
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}
