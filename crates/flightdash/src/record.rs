//! Core record types for flightdash.
//!
//! This module defines the row type shared by the cancellations and routes
//! tables, together with the dimensions rows can be filtered or grouped by and
//! the measures that can be summed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A categorical or temporal column usable as a filter or group key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Operating airline.
    Airline,
    /// Reason given for a cancellation.
    CancellationReason,
    /// Calendar year.
    Year,
    /// Calendar month (1-12).
    Month,
    /// City of the departure airport.
    OriginCity,
    /// City of the arrival airport.
    DestinationCity,
}

impl Dimension {
    /// Every dimension, in filter-panel order.
    pub const ALL: [Self; 6] = [
        Self::Airline,
        Self::CancellationReason,
        Self::Year,
        Self::Month,
        Self::OriginCity,
        Self::DestinationCity,
    ];

    /// The column name used in datasets and JSON output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Airline => "airline",
            Self::CancellationReason => "cancellation_reason",
            Self::Year => "year",
            Self::Month => "month",
            Self::OriginCity => "origin_city",
            Self::DestinationCity => "destination_city",
        }
    }

    /// Whether values of this dimension are integers.
    #[must_use]
    pub fn is_temporal(self) -> bool {
        matches!(self, Self::Year | Self::Month)
    }

    /// Parse a raw filter value into this dimension's value type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFilterValue`] when a temporal dimension is given
    /// a value that is not an integer.
    pub fn parse_value(self, raw: &str) -> Result<DimensionValue> {
        let raw = raw.trim();
        if self.is_temporal() {
            raw.parse::<i64>()
                .map(DimensionValue::Int)
                .map_err(|_| Error::invalid_filter_value(self.name(), raw))
        } else {
            Ok(DimensionValue::Text(raw.to_string()))
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "airline" => Ok(Self::Airline),
            "reason" | "cancellation_reason" => Ok(Self::CancellationReason),
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "origin" | "origin_city" => Ok(Self::OriginCity),
            "destination" | "destination_city" => Ok(Self::DestinationCity),
            _ => Err(Error::UnknownDimension(s.to_string())),
        }
    }
}

/// A single value of a [`Dimension`].
///
/// Integers order before text, which never matters in practice because one
/// dimension only ever carries one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimensionValue {
    /// Year or month.
    Int(i64),
    /// Airline, reason or city.
    Text(String),
}

impl DimensionValue {
    /// The integer payload, if any.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => f.pad(&v.to_string()),
            Self::Text(s) => f.pad(s),
        }
    }
}

impl From<&str> for DimensionValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for DimensionValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for DimensionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for DimensionValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for DimensionValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

/// Which direction of change is good news for a measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Growth is favorable (flight volume).
    HigherIsBetter,
    /// Growth is unfavorable (cancellations).
    LowerIsBetter,
}

/// A numeric column that can be summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    /// Number of cancelled flights.
    Cancellations,
    /// Number of operated flights on a route.
    TotalFlights,
}

impl Measure {
    /// The column name used in JSON output.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cancellations => "cancellations",
            Self::TotalFlights => "total_flights",
        }
    }

    /// Which direction of change is favorable.
    #[must_use]
    pub fn polarity(self) -> Polarity {
        match self {
            Self::Cancellations => Polarity::LowerIsBetter,
            Self::TotalFlights => Polarity::HigherIsBetter,
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "cancellations" => Ok(Self::Cancellations),
            "flights" | "total_flights" => Ok(Self::TotalFlights),
            _ => Err(Error::UnknownMeasure(s.to_string())),
        }
    }
}

/// An airport position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Bit-exact key for grouping; coordinates come verbatim from the source
    /// so equal airports always carry identical bits.
    #[must_use]
    pub fn key(self) -> (u64, u64) {
        (self.lat.to_bits(), self.lon.to_bits())
    }
}

/// Route columns carried by rows of the routes table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteLeg {
    /// City of the departure airport.
    pub origin_city: String,
    /// City of the arrival airport.
    pub destination_city: String,
    /// Departure airport position.
    pub origin: Coordinate,
    /// Arrival airport position.
    pub destination: Coordinate,
    /// Flights operated on this leg in the row's month.
    pub total_flights: u64,
}

/// One row of flight data.
///
/// Rows from the cancellations table carry `airline`, `cancellation_reason`
/// and `cancellations`; rows from the routes table carry `route`. A row only
/// matches a filter and only contributes to a group when it has the columns
/// involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Operating airline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<String>,
    /// Reason given for the cancellations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Number of cancelled flights.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellations: Option<u64>,
    /// Route columns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<RouteLeg>,
}

impl FlightRecord {
    /// Create a cancellations-table row.
    #[must_use]
    pub fn cancellation(
        airline: impl Into<String>,
        reason: impl Into<String>,
        year: i32,
        month: u32,
        cancellations: u64,
    ) -> Self {
        Self {
            airline: Some(airline.into()),
            cancellation_reason: Some(reason.into()),
            year,
            month,
            cancellations: Some(cancellations),
            route: None,
        }
    }

    /// Create a routes-table row.
    #[must_use]
    pub fn route(leg: RouteLeg, year: i32, month: u32) -> Self {
        Self {
            airline: None,
            cancellation_reason: None,
            year,
            month,
            cancellations: None,
            route: Some(leg),
        }
    }

    /// The row's value for a dimension, if it has that column.
    #[must_use]
    pub fn value(&self, dimension: Dimension) -> Option<DimensionValue> {
        match dimension {
            Dimension::Year => Some(DimensionValue::from(self.year)),
            Dimension::Month => Some(DimensionValue::from(self.month)),
            _ => self.text(dimension).map(DimensionValue::from),
        }
    }

    /// Compare a dimension against a value without allocating.
    #[must_use]
    pub fn has_value(&self, dimension: Dimension, expected: &DimensionValue) -> bool {
        match (dimension, expected) {
            (Dimension::Year, DimensionValue::Int(v)) => i64::from(self.year) == *v,
            (Dimension::Month, DimensionValue::Int(v)) => i64::from(self.month) == *v,
            (_, DimensionValue::Text(s)) => self.text(dimension) == Some(s.as_str()),
            _ => false,
        }
    }

    /// The row's value for a measure, if it has that column.
    #[must_use]
    pub fn measure(&self, measure: Measure) -> Option<u64> {
        match measure {
            Measure::Cancellations => self.cancellations,
            Measure::TotalFlights => self.route.as_ref().map(|r| r.total_flights),
        }
    }

    fn text(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Airline => self.airline.as_deref(),
            Dimension::CancellationReason => self.cancellation_reason.as_deref(),
            Dimension::OriginCity => self.route.as_ref().map(|r| r.origin_city.as_str()),
            Dimension::DestinationCity => self.route.as_ref().map(|r| r.destination_city.as_str()),
            Dimension::Year | Dimension::Month => None,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::leg;
    use super::*;

    #[test]
    fn test_dimension_from_str() {
        assert_eq!("airline".parse::<Dimension>().unwrap(), Dimension::Airline);
        assert_eq!("reason".parse::<Dimension>().unwrap(), Dimension::CancellationReason);
        assert_eq!("Origin-City".parse::<Dimension>().unwrap(), Dimension::OriginCity);
        assert_eq!("destination".parse::<Dimension>().unwrap(), Dimension::DestinationCity);
        assert!(matches!(
            "carrier".parse::<Dimension>(),
            Err(Error::UnknownDimension(_))
        ));
    }

    #[test]
    fn test_dimension_display_matches_column() {
        for dim in Dimension::ALL {
            assert_eq!(dim.to_string(), dim.name());
            assert_eq!(dim.name().parse::<Dimension>().unwrap(), dim);
        }
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(Dimension::Year.parse_value(" 2023 ").unwrap(), DimensionValue::Int(2023));
        assert_eq!(
            Dimension::Airline.parse_value("AA").unwrap(),
            DimensionValue::Text("AA".to_string())
        );
        assert!(Dimension::Month.parse_value("March").is_err());
    }

    #[test]
    fn test_measure_from_str_and_polarity() {
        assert_eq!("flights".parse::<Measure>().unwrap(), Measure::TotalFlights);
        assert_eq!("cancellations".parse::<Measure>().unwrap(), Measure::Cancellations);
        assert!("delays".parse::<Measure>().is_err());
        assert_eq!(Measure::Cancellations.polarity(), Polarity::LowerIsBetter);
        assert_eq!(Measure::TotalFlights.polarity(), Polarity::HigherIsBetter);
    }

    #[test]
    fn test_cancellation_record_values() {
        let record = FlightRecord::cancellation("AA", "Weather", 2023, 4, 12);
        assert_eq!(record.value(Dimension::Airline), Some("AA".into()));
        assert_eq!(record.value(Dimension::Month), Some(DimensionValue::Int(4)));
        assert_eq!(record.value(Dimension::OriginCity), None);
        assert_eq!(record.measure(Measure::Cancellations), Some(12));
        assert_eq!(record.measure(Measure::TotalFlights), None);
    }

    #[test]
    fn test_route_record_values() {
        let record = FlightRecord::route(leg("Atlanta", "Chicago", 300), 2022, 7);
        assert_eq!(record.value(Dimension::OriginCity), Some("Atlanta".into()));
        assert_eq!(record.value(Dimension::Airline), None);
        assert_eq!(record.measure(Measure::TotalFlights), Some(300));
        assert_eq!(record.measure(Measure::Cancellations), None);
    }

    #[test]
    fn test_has_value() {
        let record = FlightRecord::cancellation("DL", "Carrier", 2023, 1, 3);
        assert!(record.has_value(Dimension::Year, &DimensionValue::Int(2023)));
        assert!(!record.has_value(Dimension::Year, &DimensionValue::Int(2022)));
        assert!(record.has_value(Dimension::Airline, &"DL".into()));
        // Type mismatch never matches
        assert!(!record.has_value(Dimension::Year, &"2023".into()));
        assert!(!record.has_value(Dimension::OriginCity, &"Atlanta".into()));
    }

    #[test]
    fn test_coordinate_key_equality() {
        let a = Coordinate::new(33.6367, -84.4281);
        let b = Coordinate::new(33.6367, -84.4281);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), Coordinate::new(33.6368, -84.4281).key());
    }

    #[test]
    fn test_record_serialization_skips_missing_columns() {
        let record = FlightRecord::cancellation("AA", "Weather", 2023, 1, 10);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"airline\":\"AA\""));
        assert!(!json.contains("route"));
    }
}
