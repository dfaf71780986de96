//! `flightdash` - CLI for the flight dashboards
//!
//! This binary loads the configured tables once and prints chart-ready views
//! as plain text or JSON.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::debug;

use flightdash::cli::{
    Cli, Command, CompareCommand, ConfigCommand, OptionsCommand, OutputFormat, SparklinesCommand,
    ViewCommand,
};
use flightdash::format::{format_count, format_delta, format_percent};
use flightdash::sparkline::sparkline_series;
use flightdash::view::Dropdown;
use flightdash::{
    compare, init_logging, Config, Dashboard, Dataset, Dimension, GroupQuery, SortOrder,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    run(cli).map_err(with_hint)
}

/// Put the recovery hint of a dataset or query error on top of the report.
fn with_hint(err: anyhow::Error) -> anyhow::Error {
    match err.downcast_ref::<flightdash::Error>().and_then(flightdash::Error::hint) {
        Some(hint) => err.context(hint),
        None => err,
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from(cli.config.clone())
        .context("failed to load configuration")?
        .with_sources(cli.cancellations.clone(), cli.routes.clone());

    if let Command::Config(config_cmd) = cli.command {
        return handle_config(&config, config_cmd);
    }
    config.validate().context("invalid dataset sources")?;

    let tables = config.tables()?;
    let dataset = Dataset::load(&tables, config.timeout())
        .context("failed to load dataset")?
        .into_shared();
    let dashboard = Dashboard::new(dataset, config.display.clone());

    match cli.command {
        Command::Cancellations(cmd) => handle_cancellations(&dashboard, &cmd),
        Command::Compare(cmd) => handle_compare(&dashboard, &cmd),
        Command::Sparklines(cmd) => handle_sparklines(&dashboard, &cmd),
        Command::Routes(cmd) => handle_routes(&dashboard, &cmd),
        Command::Options(cmd) => handle_options(&dashboard, &cmd),
        Command::Render(cmd) => {
            let selection = cmd.filters.to_selection()?;
            print_json(&dashboard.render(&selection)?)
        }
        Command::Config(_) => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_cancellations(dashboard: &Dashboard, cmd: &ViewCommand) -> Result<()> {
    let selection = cmd.filters.to_selection()?;
    let view = dashboard.cancellations(&selection)?;
    match cmd.format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Plain => {
            print!("{}", view.to_text());
            Ok(())
        }
    }
}

fn handle_routes(dashboard: &Dashboard, cmd: &ViewCommand) -> Result<()> {
    let selection = cmd.filters.to_selection()?;
    let view = dashboard.routes(&selection)?;
    match cmd.format {
        OutputFormat::Json => print_json(&view),
        OutputFormat::Plain => {
            print!("{}", view.to_text());
            Ok(())
        }
    }
}

fn handle_compare(dashboard: &Dashboard, cmd: &CompareCommand) -> Result<()> {
    let selection = cmd.filters.to_selection()?;
    let query = GroupQuery::by(Dimension::from(cmd.group_by), cmd.measure.into())
        .ordered(SortOrder::Descending);
    let series = compare(dashboard.dataset(), &selection, &query)?;
    debug!(groups = series.len(), "Compared with prior year");

    if cmd.format == OutputFormat::Json {
        return print_json(&series);
    }

    if series.is_empty() {
        println!("No data for this selection.");
        return Ok(());
    }
    for row in &series {
        match row.comparison {
            Some(yoy) => println!(
                "{:<28} {:>12} {:>9}  {} {:>10} ({})",
                row.label,
                row.display,
                row.share_display,
                yoy.trend.marker(),
                format_delta(yoy.delta),
                format_percent(yoy.pct_change)
            ),
            None => println!("{:<28} {:>12} {:>9}", row.label, row.display, row.share_display),
        }
    }
    Ok(())
}

fn handle_sparklines(dashboard: &Dashboard, cmd: &SparklinesCommand) -> Result<()> {
    let selection = cmd.filters.to_selection()?;
    let set = sparkline_series(
        dashboard.dataset(),
        &selection,
        cmd.entity.into(),
        cmd.measure.into(),
    )?;

    if cmd.format == OutputFormat::Json {
        return print_json(&set);
    }

    for (entity, points) in &set {
        let values: Vec<String> = points.iter().map(|p| format_count(p.value)).collect();
        println!("{entity:<24} {}", values.join(" "));
    }
    Ok(())
}

fn handle_options(dashboard: &Dashboard, cmd: &OptionsCommand) -> Result<()> {
    let dropdowns: Vec<Dropdown> = match cmd.dimension {
        Some(dimension) => vec![dashboard.dropdown(dimension.into())],
        None => dashboard.filters(),
    };

    if cmd.format == OutputFormat::Json {
        return print_json(&dropdowns);
    }

    for dropdown in &dropdowns {
        let labels: Vec<&str> = dropdown.options.iter().map(|o| o.label.as_str()).collect();
        println!("{}: {}", dropdown.dimension, labels.join(", "));
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Dataset]");
                println!("  Cancellations:      {}", config.dataset.cancellations);
                println!("  Routes:             {}", config.dataset.routes);
                println!("  Timeout (secs):     {}", config.dataset.timeout_secs);
                println!();
                println!("[Display]");
                println!("  Top origin cities:  {}", config.display.top_origin_cities);
                println!("  Grid columns:       {}", config.display.grid_columns);
                println!("  Top airports:       {}", config.display.top_airports);
                println!("  Bar padding ratio:  {}", config.display.bar_padding_ratio);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
