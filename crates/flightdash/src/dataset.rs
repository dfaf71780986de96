//! Dataset loading and the shared read-only data handle.
//!
//! The dataset is read once at startup from local files or HTTP URLs and is
//! never mutated afterwards. Callers share it through [`SharedDataset`] and
//! pass it explicitly into every pipeline call.

use std::collections::BTreeSet;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Month;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::{Coordinate, Dimension, DimensionValue, FlightRecord, RouteLeg};

/// A dataset handle shared between views.
pub type SharedDataset = Arc<Dataset>;

/// Where a table is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// An `http://` or `https://` URL.
    Url(String),
    /// A local file.
    Path(PathBuf),
}

impl DataSource {
    /// Read the raw bytes of the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the request fails.
    pub fn read_bytes(&self, timeout: Duration) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => std::fs::read(path).map_err(|source| Error::DatasetRead {
                path: path.clone(),
                source,
            }),
            Self::Url(url) => {
                let fetch_err = |source| Error::DatasetFetch {
                    url: url.clone(),
                    source,
                };
                let client = reqwest::blocking::Client::builder()
                    .timeout(timeout)
                    .build()
                    .map_err(fetch_err)?;
                let response = client
                    .get(url)
                    .send()
                    .and_then(reqwest::blocking::Response::error_for_status)
                    .map_err(fetch_err)?;
                let bytes = response.bytes().map_err(fetch_err)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

impl FromStr for DataSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ConfigValidation {
                message: "dataset source must not be empty".to_string(),
            });
        }
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Which table layout a source follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// `airline, cancellation_reason, year, month, cancellations`
    Cancellations,
    /// Route legs with airport coordinates and a flight count.
    Routes,
}

#[derive(Debug, Deserialize)]
struct CancellationRow {
    airline: String,
    cancellation_reason: String,
    year: i32,
    month: u32,
    cancellations: u64,
}

#[derive(Debug, Deserialize)]
struct RouteRow {
    origin_city: String,
    destination_city: String,
    origin_airport_lat: f64,
    origin_airport_lon: f64,
    destination_airport_lat: f64,
    destination_airport_lon: f64,
    year: i32,
    month: u32,
    #[serde(rename = "count(flight_id)", alias = "total_flights")]
    total_flights: u64,
}

fn check_month(month: u32) -> std::result::Result<(), String> {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|_| ())
        .ok_or_else(|| format!("month {month} out of range 1-12"))
}

/// Provenance of one loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSummary {
    /// Display name of the source.
    pub name: String,
    /// Table layout.
    pub kind: TableKind,
    /// Number of rows loaded.
    pub rows: usize,
    /// BLAKE3 hash of the raw bytes.
    pub fingerprint: String,
}

/// The immutable in-memory dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<FlightRecord>,
    sources: Vec<SourceSummary>,
}

impl Dataset {
    /// Wrap already-built records.
    #[must_use]
    pub fn new(records: Vec<FlightRecord>) -> Self {
        Self {
            records,
            sources: Vec::new(),
        }
    }

    /// Load and concatenate tables.
    ///
    /// # Errors
    ///
    /// Returns an error if any source is unreachable or contains an invalid
    /// row. A dashboard cannot render without its data, so there is no
    /// partial result.
    pub fn load(tables: &[(TableKind, DataSource)], timeout: Duration) -> Result<Self> {
        let mut dataset = Self::default();
        for (kind, source) in tables {
            let name = source.to_string();
            debug!(source = %name, ?kind, "Reading dataset source");
            let bytes = source.read_bytes(timeout)?;
            let records = Self::parse(&bytes[..], *kind, &name)?;
            let summary = SourceSummary {
                name,
                kind: *kind,
                rows: records.len(),
                fingerprint: blake3::hash(&bytes).to_hex().to_string(),
            };
            info!(
                source = %summary.name,
                rows = summary.rows,
                fingerprint = &summary.fingerprint[..16],
                "Loaded dataset source"
            );
            dataset.records.extend(records);
            dataset.sources.push(summary);
        }
        Ok(dataset)
    }

    /// Decode CSV rows of the given table layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatasetRow`] naming the first row that fails to decode
    /// or carries an invalid month.
    pub fn parse<R: Read>(
        reader: R,
        kind: TableKind,
        source_name: &str,
    ) -> Result<Vec<FlightRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let row_err = |row: usize, message: String| {
            Error::dataset_row(source_name, u64::try_from(row + 1).unwrap_or(u64::MAX), message)
        };

        let mut records = Vec::new();
        match kind {
            TableKind::Cancellations => {
                for (i, row) in reader.deserialize::<CancellationRow>().enumerate() {
                    let row = row.map_err(|e| row_err(i, e.to_string()))?;
                    check_month(row.month).map_err(|m| row_err(i, m))?;
                    records.push(FlightRecord::cancellation(
                        row.airline,
                        row.cancellation_reason,
                        row.year,
                        row.month,
                        row.cancellations,
                    ));
                }
            }
            TableKind::Routes => {
                for (i, row) in reader.deserialize::<RouteRow>().enumerate() {
                    let row = row.map_err(|e| row_err(i, e.to_string()))?;
                    check_month(row.month).map_err(|m| row_err(i, m))?;
                    let leg = RouteLeg {
                        origin_city: row.origin_city,
                        destination_city: row.destination_city,
                        origin: Coordinate::new(row.origin_airport_lat, row.origin_airport_lon),
                        destination: Coordinate::new(
                            row.destination_airport_lat,
                            row.destination_airport_lon,
                        ),
                        total_flights: row.total_flights,
                    };
                    records.push(FlightRecord::route(leg, row.year, row.month));
                }
            }
        }
        Ok(records)
    }

    /// Freeze the dataset into a shared handle.
    #[must_use]
    pub fn into_shared(self) -> SharedDataset {
        Arc::new(self)
    }

    /// All records.
    #[must_use]
    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    /// Provenance of the loaded tables.
    #[must_use]
    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Combined fingerprint of all loaded sources, if any were loaded.
    #[must_use]
    pub fn fingerprint(&self) -> Option<String> {
        if self.sources.is_empty() {
            return None;
        }
        let mut hasher = blake3::Hasher::new();
        for source in &self.sources {
            hasher.update(source.fingerprint.as_bytes());
        }
        Some(hasher.finalize().to_hex().to_string())
    }

    /// Distinct observed values of a dimension, sorted.
    ///
    /// These are the dropdown options; selecting one of them can never be
    /// outside the dimension's domain.
    #[must_use]
    pub fn options(&self, dimension: Dimension) -> Vec<DimensionValue> {
        self.records
            .iter()
            .filter_map(|r| r.value(dimension))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// The most recent year present in the data.
    #[must_use]
    pub fn latest_year(&self) -> Option<i32> {
        self.records.iter().map(|r| r.year).max()
    }
}
