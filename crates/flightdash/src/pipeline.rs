//! The filter → aggregate → derive pipeline.
//!
//! Every chart is one call to [`compute`] (or [`compare`] for year-over-year
//! views) with a different [`GroupQuery`]. Each call starts from the full
//! dataset; nothing is cached between calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::filter::FilterSelection;
use crate::format::{format_compact, format_count, format_percent, round1};
use crate::record::{Dimension, DimensionValue, Measure, Polarity};

/// Values of the grouped dimensions, in `group_by` order.
pub type GroupKey = Vec<DimensionValue>;

/// Row ordering of a derived series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Smallest total first; bar charts draw the largest bar at the far end.
    #[default]
    Ascending,
    /// Largest total first; pie and share views.
    Descending,
    /// Fixed category order (by group key).
    Key,
}

/// What to group by and what to sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupQuery {
    /// Dimensions that partition the filtered rows.
    pub group_by: Vec<Dimension>,
    /// The summed column.
    pub measure: Measure,
    /// Output ordering.
    pub order: SortOrder,
}

impl GroupQuery {
    /// Group by a single dimension, ascending.
    #[must_use]
    pub fn by(dimension: Dimension, measure: Measure) -> Self {
        Self {
            group_by: vec![dimension],
            measure,
            order: SortOrder::Ascending,
        }
    }

    /// Group by several dimensions, ascending.
    #[must_use]
    pub fn by_all(dimensions: &[Dimension], measure: Measure) -> Self {
        Self {
            group_by: dimensions.to_vec(),
            measure,
            order: SortOrder::Ascending,
        }
    }

    /// Change the output ordering.
    #[must_use]
    pub fn ordered(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// One group and its summed measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Values of the grouped dimensions.
    pub key: GroupKey,
    /// Sum of the measure.
    pub total: u64,
}

/// Whether a value went up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Strictly positive delta.
    Increase,
    /// Zero or negative delta.
    Decrease,
}

/// Whether a change is good news for the measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Rendered in the positive colour.
    Favorable,
    /// Rendered in the warning colour.
    Unfavorable,
}

/// Trend marker for a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trend {
    /// Up or down.
    pub direction: Direction,
    /// Good or bad, depending on the measure.
    pub sentiment: Sentiment,
}

impl Trend {
    /// Classify a delta for a measure of the given polarity.
    ///
    /// More cancellations is bad news, more flights is good news; a zero
    /// delta shows the decrease marker.
    #[must_use]
    pub fn from_delta(delta: i64, polarity: Polarity) -> Self {
        let direction = if delta > 0 {
            Direction::Increase
        } else {
            Direction::Decrease
        };
        let sentiment = match (direction, polarity) {
            (Direction::Increase, Polarity::HigherIsBetter)
            | (Direction::Decrease, Polarity::LowerIsBetter) => Sentiment::Favorable,
            (Direction::Increase, Polarity::LowerIsBetter)
            | (Direction::Decrease, Polarity::HigherIsBetter) => Sentiment::Unfavorable,
        };
        Self {
            direction,
            sentiment,
        }
    }

    /// Arrow glyph for the direction.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self.direction {
            Direction::Increase => "▲",
            Direction::Decrease => "▼",
        }
    }
}

/// Comparison against the same aggregation one year earlier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearOverYear {
    /// Total in the prior year.
    pub previous: u64,
    /// `current - previous`.
    pub delta: i64,
    /// `delta / previous * 100`, rounded to one decimal; 0 when `previous` is 0.
    pub pct_change: f64,
    /// Trend marker.
    pub trend: Trend,
}

impl YearOverYear {
    /// Compare two totals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn between(current: u64, previous: u64, polarity: Polarity) -> Self {
        let current_i = i64::try_from(current).unwrap_or(i64::MAX);
        let previous_i = i64::try_from(previous).unwrap_or(i64::MAX);
        let delta = current_i.saturating_sub(previous_i);
        let pct_change = if previous == 0 {
            0.0
        } else {
            round1(delta as f64 / previous as f64 * 100.0)
        };
        Self {
            previous,
            delta,
            pct_change,
            trend: Trend::from_delta(delta, polarity),
        }
    }
}

/// A presentation-ready group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
    /// Values of the grouped dimensions.
    pub key: GroupKey,
    /// Key values joined for display.
    pub label: String,
    /// Sum of the measure.
    pub total: u64,
    /// Percentage of the grand total, one decimal; 0 when the grand total is 0.
    pub share: f64,
    /// `total` with thousands separators.
    pub display: String,
    /// `share` as text.
    pub share_display: String,
    /// Prior-year comparison, when requested and available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<YearOverYear>,
}

/// Filter the dataset and sum `measure` per group.
///
/// Rows without one of the grouped columns or without the measure do not
/// contribute. Groups without rows are absent from the result.
///
/// # Errors
///
/// Returns [`Error::EmptyGroupKey`] if `group_by` is empty.
pub fn aggregate(
    dataset: &Dataset,
    selection: &FilterSelection,
    group_by: &[Dimension],
    measure: Measure,
) -> Result<BTreeMap<GroupKey, u64>> {
    if group_by.is_empty() {
        return Err(Error::EmptyGroupKey);
    }

    let mut groups: BTreeMap<GroupKey, u64> = BTreeMap::new();
    for record in selection.apply(dataset.records()) {
        let Some(value) = record.measure(measure) else {
            continue;
        };
        let key: Option<GroupKey> = group_by.iter().map(|d| record.value(*d)).collect();
        if let Some(key) = key {
            *groups.entry(key).or_insert(0) += value;
        }
    }

    trace!(groups = groups.len(), %measure, "Aggregated filtered rows");
    Ok(groups)
}

/// Sum `measure` over every row matching the selection.
#[must_use]
pub fn total(dataset: &Dataset, selection: &FilterSelection, measure: Measure) -> Option<u64> {
    let mut seen = false;
    let sum: u64 = selection
        .apply(dataset.records())
        .filter_map(|r| r.measure(measure))
        .inspect(|_| seen = true)
        .sum();
    seen.then_some(sum)
}

/// Order aggregate rows; ties fall back to the group key.
pub fn sort_rows(rows: &mut [AggregateRow], order: SortOrder) {
    match order {
        SortOrder::Ascending => {
            rows.sort_by(|a, b| a.total.cmp(&b.total).then_with(|| a.key.cmp(&b.key)));
        }
        SortOrder::Descending => {
            rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
        }
        SortOrder::Key => rows.sort_by(|a, b| a.key.cmp(&b.key)),
    }
}

/// Join key values for display.
#[must_use]
pub fn key_label(key: &[DimensionValue]) -> String {
    key.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" / ")
}

#[allow(clippy::cast_precision_loss)]
fn derive(rows: Vec<AggregateRow>) -> Vec<DerivedSeries> {
    let grand_total: u64 = rows.iter().map(|r| r.total).sum();
    rows.into_iter()
        .map(|row| {
            let share = if grand_total == 0 {
                0.0
            } else {
                round1(row.total as f64 / grand_total as f64 * 100.0)
            };
            DerivedSeries {
                label: key_label(&row.key),
                display: format_count(row.total),
                share_display: format_percent(share),
                key: row.key,
                total: row.total,
                share,
                comparison: None,
            }
        })
        .collect()
}

/// Run the pipeline for one chart.
///
/// An empty filter result gives an empty series, never an error.
///
/// # Errors
///
/// Returns [`Error::EmptyGroupKey`] if the query has no group dimension.
pub fn compute(
    dataset: &Dataset,
    selection: &FilterSelection,
    query: &GroupQuery,
) -> Result<Vec<DerivedSeries>> {
    let groups = aggregate(dataset, selection, &query.group_by, query.measure)?;
    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, total)| AggregateRow { key, total })
        .collect();
    sort_rows(&mut rows, query.order);

    let series = derive(rows);
    debug!(
        group_by = ?query.group_by,
        measure = %query.measure,
        groups = series.len(),
        "Computed series"
    );
    Ok(series)
}

fn shift_year(group_by: &[Dimension], key: GroupKey, years: i64) -> GroupKey {
    group_by
        .iter()
        .zip(key)
        .map(|(dimension, value)| match (dimension, value) {
            (Dimension::Year, DimensionValue::Int(year)) => DimensionValue::Int(year + years),
            (_, value) => value,
        })
        .collect()
}

/// Run the pipeline and attach year-over-year comparisons.
///
/// The comparison aggregates the same selection with the year shifted back
/// by one. Without a selected year, or for groups with no prior-year rows,
/// `comparison` stays `None`.
///
/// # Errors
///
/// Returns [`Error::EmptyGroupKey`] if the query has no group dimension.
pub fn compare(
    dataset: &Dataset,
    selection: &FilterSelection,
    query: &GroupQuery,
) -> Result<Vec<DerivedSeries>> {
    let mut series = compute(dataset, selection, query)?;
    let Some(prior_selection) = selection.prior_year() else {
        debug!("No year selected; skipping year-over-year comparison");
        return Ok(series);
    };

    let prior = aggregate(dataset, &prior_selection, &query.group_by, query.measure)?;
    // Prior groups keyed by year carry the previous year; align them with
    // the current groups
    let prior: BTreeMap<GroupKey, u64> = prior
        .into_iter()
        .map(|(key, total)| (shift_year(&query.group_by, key, 1), total))
        .collect();
    if prior.is_empty() {
        debug!(year = ?prior_selection.year(), "No prior-year data");
        return Ok(series);
    }

    let polarity = query.measure.polarity();
    for row in &mut series {
        row.comparison = prior
            .get(&row.key)
            .map(|previous| YearOverYear::between(row.total, *previous, polarity));
    }
    Ok(series)
}

/// A single-number summary tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTile {
    /// The summed column.
    pub measure: Measure,
    /// Sum over the filtered rows.
    pub total: u64,
    /// `total` with thousands separators.
    pub display: String,
    /// `total` in K/M notation.
    pub compact: String,
    /// Prior-year comparison, when a year is selected and the prior year has data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<YearOverYear>,
}

/// Summarize the filtered total of one measure.
#[must_use]
pub fn summarize(dataset: &Dataset, selection: &FilterSelection, measure: Measure) -> SummaryTile {
    let current = total(dataset, selection, measure).unwrap_or(0);
    let comparison = selection
        .prior_year()
        .and_then(|prior| total(dataset, &prior, measure))
        .map(|previous| YearOverYear::between(current, previous, measure.polarity()));

    SummaryTile {
        measure,
        total: current,
        display: format_count(current),
        compact: format_compact(current),
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FlightRecord;

    fn example() -> Dataset {
        Dataset::new(vec![
            FlightRecord::cancellation("AA", "weather", 2023, 1, 10),
            FlightRecord::cancellation("AA", "weather", 2023, 2, 5),
            FlightRecord::cancellation("DL", "weather", 2023, 1, 7),
        ])
    }

    fn two_years() -> Dataset {
        Dataset::new(vec![
            FlightRecord::cancellation("AA", "Weather", 2023, 1, 60),
            FlightRecord::cancellation("AA", "Carrier", 2023, 2, 40),
            FlightRecord::cancellation("AA", "Weather", 2022, 1, 80),
            FlightRecord::cancellation("DL", "Weather", 2023, 1, 30),
            FlightRecord::cancellation("DL", "Weather", 2022, 3, 0),
            FlightRecord::cancellation("UA", "Security", 2023, 5, 9),
        ])
    }

    fn totals(series: &[DerivedSeries]) -> Vec<(String, u64)> {
        series.iter().map(|s| (s.label.clone(), s.total)).collect()
    }

    #[test]
    fn test_compute_example_sorted_ascending() {
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let series = compute(&example(), &selection, &query).unwrap();
        assert_eq!(
            totals(&series),
            vec![("DL".to_string(), 7), ("AA".to_string(), 15)]
        );
        assert_eq!(series[1].display, "15");
    }

    #[test]
    fn test_compute_descending_with_shares() {
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations)
            .ordered(SortOrder::Descending);
        let series = compute(&example(), &FilterSelection::all(), &query).unwrap();
        assert_eq!(series[0].label, "AA");
        assert!((series[0].share - 68.2).abs() < 1e-9);
        assert!((series[1].share - 31.8).abs() < 1e-9);
        assert_eq!(series[1].share_display, "31,8 %");
    }

    #[test]
    fn test_compute_tie_break_by_key() {
        let dataset = Dataset::new(vec![
            FlightRecord::cancellation("UA", "Weather", 2023, 1, 5),
            FlightRecord::cancellation("AA", "Weather", 2023, 1, 5),
            FlightRecord::cancellation("DL", "Weather", 2023, 1, 9),
        ]);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let asc = compute(&dataset, &FilterSelection::all(), &query).unwrap();
        assert_eq!(totals(&asc)[0].0, "AA");
        assert_eq!(totals(&asc)[1].0, "UA");

        let desc = compute(
            &dataset,
            &FilterSelection::all(),
            &query.clone().ordered(SortOrder::Descending),
        )
        .unwrap();
        assert_eq!(totals(&desc)[0].0, "DL");
        assert_eq!(totals(&desc)[1].0, "AA");

        let by_key =
            compute(&dataset, &FilterSelection::all(), &query.ordered(SortOrder::Key)).unwrap();
        let labels: Vec<_> = by_key.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["AA", "DL", "UA"]);
    }

    #[test]
    fn test_compute_multi_key() {
        let query = GroupQuery::by_all(
            &[Dimension::CancellationReason, Dimension::Airline],
            Measure::Cancellations,
        )
        .ordered(SortOrder::Key);
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let series = compute(&two_years(), &selection, &query).unwrap();
        let labels: Vec<_> = series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Carrier / AA", "Security / UA", "Weather / AA", "Weather / DL"]
        );
    }

    #[test]
    fn test_compute_unknown_value_is_empty() {
        let selection = FilterSelection::all().with(Dimension::Airline, "ZZ");
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        assert!(compute(&example(), &selection, &query).unwrap().is_empty());
    }

    #[test]
    fn test_compute_empty_group_key_is_error() {
        let query = GroupQuery::by_all(&[], Measure::Cancellations);
        let err = compute(&example(), &FilterSelection::all(), &query).unwrap_err();
        assert!(matches!(err, Error::EmptyGroupKey));
    }

    #[test]
    fn test_zero_grand_total_has_zero_shares() {
        let dataset = Dataset::new(vec![
            FlightRecord::cancellation("AA", "Weather", 2023, 1, 0),
            FlightRecord::cancellation("DL", "Weather", 2023, 1, 0),
        ]);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let series = compute(&dataset, &FilterSelection::all(), &query).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.iter().all(|s| s.share == 0.0));
    }

    #[test]
    fn test_year_over_year_between() {
        let yoy = YearOverYear::between(100, 80, Polarity::LowerIsBetter);
        assert_eq!(yoy.delta, 20);
        assert!((yoy.pct_change - 25.0).abs() < 1e-9);
        assert_eq!(yoy.trend.direction, Direction::Increase);
        assert_eq!(yoy.trend.sentiment, Sentiment::Unfavorable);

        let zero_prior = YearOverYear::between(50, 0, Polarity::LowerIsBetter);
        assert_eq!(zero_prior.delta, 50);
        assert!(zero_prior.pct_change == 0.0);
    }

    #[test]
    fn test_trend_polarity_asymmetry() {
        let flights_up = Trend::from_delta(10, Polarity::HigherIsBetter);
        assert_eq!(flights_up.sentiment, Sentiment::Favorable);
        assert_eq!(flights_up.marker(), "▲");

        let cancellations_down = Trend::from_delta(-3, Polarity::LowerIsBetter);
        assert_eq!(cancellations_down.sentiment, Sentiment::Favorable);
        assert_eq!(cancellations_down.marker(), "▼");

        let flat = Trend::from_delta(0, Polarity::HigherIsBetter);
        assert_eq!(flat.direction, Direction::Decrease);
        assert_eq!(flat.sentiment, Sentiment::Unfavorable);
    }

    #[test]
    fn test_compare_attaches_prior_year() {
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let series = compare(&two_years(), &selection, &query).unwrap();

        let aa = series.iter().find(|s| s.label == "AA").unwrap();
        let yoy = aa.comparison.unwrap();
        assert_eq!(yoy.previous, 80);
        assert_eq!(yoy.delta, 20);
        assert!((yoy.pct_change - 25.0).abs() < 1e-9);

        // DL has prior-year rows summing to zero
        let dl = series.iter().find(|s| s.label == "DL").unwrap();
        let yoy = dl.comparison.unwrap();
        assert_eq!(yoy.previous, 0);
        assert!(yoy.pct_change == 0.0);

        // UA has no prior-year rows at all
        let ua = series.iter().find(|s| s.label == "UA").unwrap();
        assert!(ua.comparison.is_none());
    }

    #[test]
    fn test_compare_grouped_by_year() {
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let query = GroupQuery::by(Dimension::Year, Measure::Cancellations);
        let series = compare(&two_years(), &selection, &query).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].key, vec![DimensionValue::Int(2023)]);
        let yoy = series[0].comparison.unwrap();
        assert_eq!(yoy.previous, 80);
        assert_eq!(yoy.delta, 59);

        let query =
            GroupQuery::by_all(&[Dimension::Airline, Dimension::Year], Measure::Cancellations);
        let series = compare(&two_years(), &selection, &query).unwrap();
        let aa = series.iter().find(|s| s.label == "AA / 2023").unwrap();
        assert_eq!(aa.comparison.unwrap().delta, 20);
    }

    #[test]
    fn test_compare_without_year_or_prior_data() {
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let series = compare(&two_years(), &FilterSelection::all(), &query).unwrap();
        assert!(series.iter().all(|s| s.comparison.is_none()));

        let selection = FilterSelection::all().with(Dimension::Year, 2022);
        let series = compare(&two_years(), &selection, &query).unwrap();
        assert!(!series.is_empty());
        assert!(series.iter().all(|s| s.comparison.is_none()));
    }

    #[test]
    fn test_summarize() {
        let selection = FilterSelection::all()
            .with(Dimension::Year, 2023)
            .with(Dimension::Airline, "AA");
        let tile = summarize(&two_years(), &selection, Measure::Cancellations);
        assert_eq!(tile.total, 100);
        assert_eq!(tile.compact, "100");
        let yoy = tile.comparison.unwrap();
        assert_eq!(yoy.delta, 20);
        assert_eq!(yoy.trend.sentiment, Sentiment::Unfavorable);

        let empty = summarize(&two_years(), &FilterSelection::all(), Measure::TotalFlights);
        assert_eq!(empty.total, 0);
        assert!(empty.comparison.is_none());
    }

    #[test]
    fn test_total_none_without_rows() {
        let dataset = example();
        assert_eq!(total(&dataset, &FilterSelection::all(), Measure::Cancellations), Some(22));
        assert_eq!(total(&dataset, &FilterSelection::all(), Measure::TotalFlights), None);
    }
}
