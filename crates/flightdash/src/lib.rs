//! `flightdash` - Filter, aggregate and chart-ready views over flight data
//!
//! This library loads the flight cancellation and route tables once into an
//! immutable [`Dataset`] and derives every chart from it through a single
//! filter → aggregate → derive pipeline. [`Dashboard::render`] produces the
//! complete view model for one [`FilterSelection`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod routes;
pub mod sparkline;
pub mod view;

pub use config::Config;
pub use dataset::{DataSource, Dataset, SharedDataset, TableKind};
pub use error::{Error, Result};
pub use filter::FilterSelection;
pub use logging::init_logging;
pub use pipeline::{compare, compute, summarize, DerivedSeries, GroupQuery, SortOrder};
pub use record::{Dimension, DimensionValue, FlightRecord, Measure};
pub use view::{Dashboard, ViewModel};
