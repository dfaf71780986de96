//! Sparklines and small-multiple grids.
//!
//! Every entity gets one point per calendar period, zero-filled, so all
//! sparklines drawn in one pass share the same x axis:
//!
//! - with a year selected: the 12 months of that year;
//! - without one: every month from January of the earliest observed year to
//!   December of the latest.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::FilterSelection;
use crate::format::month_label;
use crate::pipeline::{aggregate, compute, GroupQuery, SortOrder};
use crate::record::{Dimension, DimensionValue, Measure};

/// One point of a sparkline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparkPoint {
    /// Calendar year.
    pub year: i32,
    /// Calendar month (1-12).
    pub month: u32,
    /// Short month name.
    pub label: String,
    /// Sum of the measure in this period; 0 when there were no rows.
    pub value: u64,
}

/// Sparkline series keyed by entity.
pub type SparklineSet = BTreeMap<DimensionValue, Vec<SparkPoint>>;

fn periods(selected_year: Option<i32>, observed_years: &BTreeSet<i32>) -> Vec<(i32, u32)> {
    let years: Vec<i32> = match selected_year {
        Some(year) => vec![year],
        None => match (observed_years.first(), observed_years.last()) {
            (Some(first), Some(last)) => (*first..=*last).collect(),
            _ => Vec::new(),
        },
    };
    years
        .into_iter()
        .flat_map(|year| (1..=12).map(move |month| (year, month)))
        .collect()
}

fn period_of(key: &[DimensionValue]) -> Option<(i32, u32)> {
    let year = i32::try_from(key.get(1)?.as_int()?).ok()?;
    let month = u32::try_from(key.get(2)?.as_int()?).ok()?;
    Some((year, month))
}

/// Per-entity, per-period totals of the filtered rows (not zero-filled).
fn observed(
    dataset: &Dataset,
    selection: &FilterSelection,
    entity: Dimension,
    measure: Measure,
) -> Result<BTreeMap<DimensionValue, BTreeMap<(i32, u32), u64>>> {
    let groups = aggregate(
        dataset,
        selection,
        &[entity, Dimension::Year, Dimension::Month],
        measure,
    )?;

    let mut by_entity: BTreeMap<DimensionValue, BTreeMap<(i32, u32), u64>> = BTreeMap::new();
    for (key, total) in groups {
        let Some(period) = period_of(&key) else {
            continue;
        };
        if let Some(entity_value) = key.into_iter().next() {
            by_entity.entry(entity_value).or_default().insert(period, total);
        }
    }
    Ok(by_entity)
}

fn fill(
    by_entity: &BTreeMap<DimensionValue, BTreeMap<(i32, u32), u64>>,
    selected_year: Option<i32>,
) -> SparklineSet {
    let observed_years: BTreeSet<i32> = by_entity
        .values()
        .flat_map(|series| series.keys().map(|(year, _)| *year))
        .collect();
    let axis = periods(selected_year, &observed_years);

    by_entity
        .iter()
        .map(|(entity, series)| {
            let points = axis
                .iter()
                .map(|&(year, month)| SparkPoint {
                    year,
                    month,
                    label: month_label(month).unwrap_or_default().to_string(),
                    value: series.get(&(year, month)).copied().unwrap_or(0),
                })
                .collect();
            (entity.clone(), points)
        })
        .collect()
}

fn selected_year(selection: &FilterSelection) -> Option<i32> {
    selection.year().and_then(|y| i32::try_from(y).ok())
}

/// Build a zero-filled sparkline for every entity in the filtered rows.
///
/// Points are in calendar order regardless of row order in the dataset.
///
/// # Errors
///
/// Propagates aggregation errors; an empty filter result gives an empty map.
pub fn sparkline_series(
    dataset: &Dataset,
    selection: &FilterSelection,
    entity: Dimension,
    measure: Measure,
) -> Result<SparklineSet> {
    let by_entity = observed(dataset, selection, entity, measure)?;
    let set = fill(&by_entity, selected_year(selection));
    debug!(%entity, %measure, entities = set.len(), "Built sparklines");
    Ok(set)
}

/// Shared y axis of a small-multiple grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YScale {
    /// Smallest observed period total.
    pub min: f64,
    /// Largest observed period total plus 10% headroom.
    pub max: f64,
}

/// One chart in a small-multiple grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// The entity shown.
    pub entity: DimensionValue,
    /// Row in the grid (1-based).
    pub row: usize,
    /// Column in the grid (1-based).
    pub column: usize,
    /// Total over the filtered rows.
    pub total: u64,
    /// The entity's sparkline.
    pub points: Vec<SparkPoint>,
}

/// A grid of sparklines sharing one scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmallMultiples {
    /// Grid width.
    pub columns: usize,
    /// Grid height.
    pub rows: usize,
    /// Cells in reading order, largest total first.
    pub cells: Vec<GridCell>,
    /// Shared y axis; `None` when there is no data.
    pub y_scale: Option<YScale>,
}

/// Lay out sparklines of the `top_n` largest entities in a grid.
///
/// The y scale is computed over the observed period totals of every entity
/// in the filtered rows, not only the ones shown, so that panels stay
/// comparable when the selection changes.
///
/// # Errors
///
/// Propagates aggregation errors.
#[allow(clippy::cast_precision_loss)]
pub fn small_multiples(
    dataset: &Dataset,
    selection: &FilterSelection,
    entity: Dimension,
    measure: Measure,
    top_n: usize,
    columns: usize,
) -> Result<SmallMultiples> {
    let columns = columns.max(1);
    let ranking = compute(
        dataset,
        selection,
        &GroupQuery::by(entity, measure).ordered(SortOrder::Descending),
    )?;

    let by_entity = observed(dataset, selection, entity, measure)?;
    let mut sparklines = fill(&by_entity, selected_year(selection));

    let cells: Vec<GridCell> = ranking
        .into_iter()
        .take(top_n)
        .enumerate()
        .filter_map(|(index, series)| {
            let entity = series.key.into_iter().next()?;
            let points = sparklines.remove(&entity).unwrap_or_default();
            Some(GridCell {
                entity,
                row: index / columns + 1,
                column: index % columns + 1,
                total: series.total,
                points,
            })
        })
        .collect();

    let observed_totals = by_entity.values().flat_map(BTreeMap::values).copied();
    let y_scale = observed_totals
        .fold(None, |acc: Option<(u64, u64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
        .map(|(lo, hi)| YScale {
            min: lo as f64,
            max: hi as f64 * 1.1,
        });

    Ok(SmallMultiples {
        columns,
        rows: cells.len().div_ceil(columns),
        cells,
        y_scale,
    })
}
