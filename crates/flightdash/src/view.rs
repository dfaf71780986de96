//! Chart-ready view models.
//!
//! [`Dashboard::render`] turns a [`FilterSelection`] into the complete set of
//! charts, tiles and dropdown lists for both dashboard pages. Rendering is a
//! pure function of the shared dataset and the selection.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DisplayConfig;
use crate::dataset::{Dataset, SharedDataset};
use crate::error::Result;
use crate::filter::{FilterSelection, ALL_LABEL};
use crate::format::{format_count, format_delta, format_percent, month_label};
use crate::pipeline::{compute, summarize, DerivedSeries, GroupQuery, SortOrder, SummaryTile};
use crate::record::{Dimension, DimensionValue, Measure};
use crate::routes::{aggregate_routes, top_airports, AirportMarker, RouteMap};
use crate::sparkline::{small_multiples, SmallMultiples};

/// Fill colour of the airline bars.
pub const BAR_COLOR: &str = "#49a9db";

/// Slice colours of the reason pie, cycled in slice order.
pub const PIE_COLORS: [&str; 4] = [
    "rgba(236, 81, 26, 0.65)",
    "rgba(248, 125, 7, 0.65)",
    "rgba(255, 166, 0, 0.65)",
    "rgba(219, 13, 39, 0.65)",
];

/// Dimensions the cancellations page filters on.
pub const CANCELLATION_FILTERS: [Dimension; 4] = [
    Dimension::Airline,
    Dimension::CancellationReason,
    Dimension::Year,
    Dimension::Month,
];

/// Dimensions the routes page filters on.
pub const ROUTE_FILTERS: [Dimension; 4] = [
    Dimension::OriginCity,
    Dimension::DestinationCity,
    Dimension::Year,
    Dimension::Month,
];

/// One bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Category label.
    pub label: String,
    /// Bar length.
    pub value: u64,
    /// Value text.
    pub display: String,
}

/// Cancellations per airline, smallest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    /// Bars in drawing order.
    pub bars: Vec<Bar>,
    /// Upper bound of the value axis.
    pub axis_max: f64,
    /// Bar fill colour.
    pub color: String,
}

/// One airline's contribution to a pie slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    /// Airline.
    pub label: String,
    /// Cancellations of this airline for the slice's reason.
    pub value: u64,
    /// Value text.
    pub display: String,
}

/// One pie slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    /// Cancellation reason.
    pub label: String,
    /// Cancellations for this reason.
    pub value: u64,
    /// Percentage of all cancellations.
    pub share: f64,
    /// Slice text.
    pub text: String,
    /// Fill colour.
    pub color: String,
    /// Per-airline hover breakdown, largest first.
    pub breakdown: Vec<Contribution>,
}

/// Cancellations per reason, largest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    /// Slices in drawing order.
    pub slices: Vec<PieSlice>,
}

/// The cancellations page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancellationsView {
    /// Cancellations by airline.
    pub by_airline: BarChart,
    /// Cancellations by reason.
    pub by_reason: PieChart,
    /// Total cancellations.
    pub kpi: SummaryTile,
}

/// The routes page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutesView {
    /// The year shown; the latest year of the data when none is selected.
    pub year: Option<i32>,
    /// Year heading.
    pub year_label: String,
    /// Total flights.
    pub kpi: SummaryTile,
    /// Total flights heading.
    pub kpi_label: String,
    /// Monthly flights of the busiest origin cities.
    pub origin_cities: SmallMultiples,
    /// Route lines.
    pub map: RouteMap,
    /// Busiest airports over the whole dataset.
    pub airports: Vec<AirportMarker>,
}

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropdownOption {
    /// Text shown.
    pub label: String,
    /// Selected value; `None` for the "All" entry.
    pub value: Option<DimensionValue>,
}

/// The entries of one dropdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dropdown {
    /// The filtered dimension.
    pub dimension: Dimension,
    /// "All" first, then the values in sorted order.
    pub options: Vec<DropdownOption>,
}

/// Everything shown for one selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    /// Combined hash of the loaded sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    /// The rendered selection.
    pub selection: FilterSelection,
    /// The cancellations page.
    pub cancellations: CancellationsView,
    /// The routes page.
    pub routes: RoutesView,
    /// Dropdown contents.
    pub filters: Vec<Dropdown>,
}

/// Renders view models over a shared dataset.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: SharedDataset,
    display: DisplayConfig,
}

impl Dashboard {
    /// Create a dashboard over a loaded dataset.
    #[must_use]
    pub fn new(dataset: SharedDataset, display: DisplayConfig) -> Self {
        Self { dataset, display }
    }

    /// The underlying dataset.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Render both pages and the dropdowns for a selection.
    ///
    /// # Errors
    ///
    /// Propagates pipeline errors.
    pub fn render(&self, selection: &FilterSelection) -> Result<ViewModel> {
        let view = ViewModel {
            fingerprint: self.dataset.fingerprint(),
            selection: selection.clone(),
            cancellations: self.cancellations(selection)?,
            routes: self.routes(selection)?,
            filters: self.filters(),
        };
        info!(
            constraints = selection.constraints().count(),
            "Rendered dashboard"
        );
        Ok(view)
    }

    /// Render the cancellations page.
    ///
    /// Route constraints (origin, destination) are ignored here.
    ///
    /// # Errors
    ///
    /// Propagates pipeline errors.
    pub fn cancellations(&self, selection: &FilterSelection) -> Result<CancellationsView> {
        let selection = selection.restricted_to(&CANCELLATION_FILTERS);
        Ok(CancellationsView {
            by_airline: self.bar_chart(&selection)?,
            by_reason: self.pie_chart(&selection)?,
            kpi: summarize(&self.dataset, &selection, Measure::Cancellations),
        })
    }

    #[allow(clippy::cast_precision_loss)]
    fn bar_chart(&self, selection: &FilterSelection) -> Result<BarChart> {
        let series = compute(
            &self.dataset,
            selection,
            &GroupQuery::by(Dimension::Airline, Measure::Cancellations),
        )?;
        let longest = series.iter().map(|s| s.total).max().unwrap_or(0);
        let bars = series
            .into_iter()
            .map(|s| Bar {
                label: s.label,
                value: s.total,
                display: s.display,
            })
            .collect();

        Ok(BarChart {
            bars,
            axis_max: longest as f64 * (1.0 + self.display.bar_padding_ratio),
            color: BAR_COLOR.to_string(),
        })
    }

    fn pie_chart(&self, selection: &FilterSelection) -> Result<PieChart> {
        let slices = compute(
            &self.dataset,
            selection,
            &GroupQuery::by(Dimension::CancellationReason, Measure::Cancellations)
                .ordered(SortOrder::Descending),
        )?;
        let pairs = compute(
            &self.dataset,
            selection,
            &GroupQuery::by_all(
                &[Dimension::CancellationReason, Dimension::Airline],
                Measure::Cancellations,
            )
            .ordered(SortOrder::Descending),
        )?;

        let mut breakdowns: BTreeMap<DimensionValue, Vec<Contribution>> = BTreeMap::new();
        for pair in pairs {
            let mut key = pair.key.into_iter();
            if let (Some(reason), Some(airline)) = (key.next(), key.next()) {
                breakdowns.entry(reason).or_default().push(Contribution {
                    label: airline.to_string(),
                    value: pair.total,
                    display: pair.display,
                });
            }
        }

        let slices = slices
            .into_iter()
            .enumerate()
            .map(|(index, slice)| {
                let breakdown = slice
                    .key
                    .first()
                    .and_then(|reason| breakdowns.remove(reason))
                    .unwrap_or_default();
                PieSlice {
                    text: slice_text(&slice),
                    color: PIE_COLORS[index % PIE_COLORS.len()].to_string(),
                    label: slice.label,
                    value: slice.total,
                    share: slice.share,
                    breakdown,
                }
            })
            .collect();
        Ok(PieChart { slices })
    }

    /// Render the routes page.
    ///
    /// Cancellation constraints (airline, reason) are ignored here.
    ///
    /// # Errors
    ///
    /// Propagates pipeline errors.
    pub fn routes(&self, selection: &FilterSelection) -> Result<RoutesView> {
        let selection = &selection.restricted_to(&ROUTE_FILTERS);
        let year = selection
            .year()
            .and_then(|y| i32::try_from(y).ok())
            .or_else(|| latest_route_year(&self.dataset));
        let selection = match year {
            Some(year) if selection.year().is_none() => {
                debug!(year, "No year selected; showing the latest year");
                selection.clone().with(Dimension::Year, year)
            }
            _ => selection.clone(),
        };

        let kpi = summarize(&self.dataset, &selection, Measure::TotalFlights);
        Ok(RoutesView {
            year,
            year_label: format!(
                "Jahr: {}",
                year.map_or_else(|| ALL_LABEL.to_string(), |y| y.to_string())
            ),
            kpi_label: format!("Total Flights: {}", kpi.compact),
            kpi,
            origin_cities: small_multiples(
                &self.dataset,
                &selection,
                Dimension::OriginCity,
                Measure::TotalFlights,
                self.display.top_origin_cities,
                self.display.grid_columns,
            )?,
            map: aggregate_routes(&self.dataset, &selection),
            airports: top_airports(&self.dataset, self.display.top_airports),
        })
    }

    /// Dropdown contents for every filterable dimension.
    #[must_use]
    pub fn filters(&self) -> Vec<Dropdown> {
        Dimension::ALL.iter().map(|d| self.dropdown(*d)).collect()
    }

    /// Dropdown contents for one dimension.
    ///
    /// Origin and destination offer the cities of the busiest airports.
    #[must_use]
    pub fn dropdown(&self, dimension: Dimension) -> Dropdown {
        let values: Vec<DimensionValue> = match dimension {
            Dimension::OriginCity | Dimension::DestinationCity => {
                top_airports(&self.dataset, self.display.top_airports)
                    .into_iter()
                    .map(|marker| DimensionValue::from(marker.city))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect()
            }
            _ => self.dataset.options(dimension),
        };

        let mut options = vec![DropdownOption {
            label: ALL_LABEL.to_string(),
            value: None,
        }];
        options.extend(values.into_iter().map(|value| DropdownOption {
            label: option_label(dimension, &value),
            value: Some(value),
        }));
        Dropdown { dimension, options }
    }
}

fn slice_text(slice: &DerivedSeries) -> String {
    format!(
        "<b>{}</b><br>{}<br>({})",
        slice.label, slice.display, slice.share_display
    )
}

fn option_label(dimension: Dimension, value: &DimensionValue) -> String {
    if dimension == Dimension::Month {
        if let Some(label) = value
            .as_int()
            .and_then(|m| u32::try_from(m).ok())
            .and_then(month_label)
        {
            return label.to_string();
        }
    }
    value.to_string()
}

fn latest_route_year(dataset: &Dataset) -> Option<i32> {
    dataset
        .records()
        .iter()
        .filter(|r| r.route.is_some())
        .map(|r| r.year)
        .max()
}

impl CancellationsView {
    /// Plain-text rendering for the terminal.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::from("Cancellations by airline\n");
        for bar in &self.by_airline.bars {
            out.push_str(&format!("  {:<24} {:>12}\n", bar.label, bar.display));
        }
        out.push_str("\nCancellations by reason\n");
        for slice in &self.by_reason.slices {
            out.push_str(&format!(
                "  {:<24} {:>12} {:>9}\n",
                slice.label,
                format_count(slice.value),
                format_percent(slice.share)
            ));
            for part in &slice.breakdown {
                out.push_str(&format!("    {:<22} {:>12}\n", part.label, part.display));
            }
        }
        out.push_str(&format!("\nTotal: {}", self.kpi.display));
        if let Some(yoy) = self.kpi.comparison {
            out.push_str(&format!(
                " {} {} ({})",
                yoy.trend.marker(),
                format_delta(yoy.delta),
                format_percent(yoy.pct_change)
            ));
        }
        out.push('\n');
        out
    }
}

impl RoutesView {
    /// Plain-text rendering for the terminal.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n{}\n", self.year_label, self.kpi_label);
        out.push_str("\nBusiest origin cities\n");
        for cell in &self.origin_cities.cells {
            out.push_str(&format!(
                "  [{},{}] {:<20} {:>10}\n",
                cell.row,
                cell.column,
                cell.entity,
                format_count(cell.total)
            ));
        }
        out.push_str("\nRoutes\n");
        for edge in &self.map.edges {
            out.push_str(&format!(
                "  {:<20} -> {:<20} {:>10}  w={:.2}\n",
                edge.origin_city,
                edge.destination_city,
                format_count(edge.total_flights),
                edge.weight
            ));
        }
        out.push_str("\nAirports\n");
        for marker in &self.airports {
            out.push_str(&format!("  {}\n", marker.popup));
        }
        out
    }
}
