//! Property tests for the aggregation pipeline.

use std::collections::{BTreeMap, BTreeSet};

use flightdash::sparkline::sparkline_series;
use flightdash::{
    compute, Dataset, Dimension, DimensionValue, FilterSelection, FlightRecord, GroupQuery,
    Measure, SortOrder,
};
use proptest::prelude::*;

const AIRLINES: [&str; 4] = ["AA", "DL", "UA", "WN"];
const REASONS: [&str; 3] = ["Carrier", "Weather", "Security"];

fn record() -> impl Strategy<Value = FlightRecord> {
    (0..AIRLINES.len(), 0..REASONS.len(), 2021..=2023i32, 1..=12u32, 0..1_000u64).prop_map(
        |(airline, reason, year, month, cancellations)| {
            let (airline, reason) = (AIRLINES[airline], REASONS[reason]);
            FlightRecord::cancellation(airline, reason, year, month, cancellations)
        },
    )
}

fn selection() -> impl Strategy<Value = FilterSelection> {
    (
        proptest::option::of(0..AIRLINES.len()),
        proptest::option::of(2021..=2023i32),
        proptest::option::of(1..=12u32),
    )
        .prop_map(|(airline, year, month)| {
            let mut selection = FilterSelection::all();
            selection.set(
                Dimension::Airline,
                airline.map(|a| DimensionValue::from(AIRLINES[a])),
            );
            selection.set(Dimension::Year, year.map(DimensionValue::from));
            selection.set(Dimension::Month, month.map(DimensionValue::from));
            selection
        })
}

fn matching_total(records: &[FlightRecord], selection: &FilterSelection) -> u64 {
    records
        .iter()
        .filter(|r| selection.matches(r))
        .filter_map(|r| r.cancellations)
        .sum()
}

proptest! {
    #[test]
    fn prop_totals_are_conserved(
        records in proptest::collection::vec(record(), 0..60),
        selection in selection(),
    ) {
        let expected = matching_total(&records, &selection);
        let dataset = Dataset::new(records);
        let query = GroupQuery::by(Dimension::CancellationReason, Measure::Cancellations);
        let series = compute(&dataset, &selection, &query).unwrap();

        let sum: u64 = series.iter().map(|s| s.total).sum();
        prop_assert_eq!(sum, expected);
    }

    #[test]
    fn prop_groups_match_filtered_rows(
        records in proptest::collection::vec(record(), 0..60),
        selection in selection(),
    ) {
        let expected: BTreeSet<String> = records
            .iter()
            .filter(|r| selection.matches(r))
            .filter_map(|r| r.airline.clone())
            .collect();
        let dataset = Dataset::new(records);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let series = compute(&dataset, &selection, &query).unwrap();

        let labels: BTreeSet<String> = series.iter().map(|s| s.label.clone()).collect();
        prop_assert_eq!(labels.len(), series.len());
        prop_assert_eq!(labels, expected);
    }

    #[test]
    fn prop_shares_sum_to_hundred(
        records in proptest::collection::vec(record(), 1..60),
        selection in selection(),
    ) {
        let dataset = Dataset::new(records);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations)
            .ordered(SortOrder::Descending);
        let series = compute(&dataset, &selection, &query).unwrap();
        let total: u64 = series.iter().map(|s| s.total).sum();
        prop_assume!(total > 0);

        let shares: f64 = series.iter().map(|s| s.share).sum();
        #[allow(clippy::cast_precision_loss)]
        let tolerance = 0.1 * series.len() as f64 + 1e-9;
        prop_assert!((shares - 100.0).abs() <= tolerance, "shares sum to {}", shares);
    }

    #[test]
    fn prop_descending_order(
        records in proptest::collection::vec(record(), 0..60),
    ) {
        let dataset = Dataset::new(records);
        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations)
            .ordered(SortOrder::Descending);
        let series = compute(&dataset, &FilterSelection::all(), &query).unwrap();
        prop_assert!(series.windows(2).all(|w| w[0].total >= w[1].total));
    }

    #[test]
    fn prop_all_sentinels_match_unfiltered(
        records in proptest::collection::vec(record(), 0..60),
    ) {
        let dataset = Dataset::new(records);
        let sentinels = FilterSelection::from_pairs([
            ("airline", "All"),
            ("reason", "alle"),
            ("year", "all"),
            ("month", ""),
            ("origin", "*"),
            ("destination", "All"),
        ])
        .unwrap();
        prop_assert!(sentinels.is_unconstrained());

        let query = GroupQuery::by_all(
            &[Dimension::Airline, Dimension::Year],
            Measure::Cancellations,
        );
        let filtered = compute(&dataset, &sentinels, &query).unwrap();
        let unfiltered = compute(&dataset, &FilterSelection::all(), &query).unwrap();
        prop_assert_eq!(filtered, unfiltered);
    }

    #[test]
    fn prop_sparklines_share_one_axis(
        records in proptest::collection::vec(record(), 1..60),
        year in proptest::option::of(2021..=2023i32),
    ) {
        let dataset = Dataset::new(records);
        let mut selection = FilterSelection::all();
        selection.set(Dimension::Year, year.map(DimensionValue::from));
        let set = sparkline_series(&dataset, &selection, Dimension::Airline, Measure::Cancellations)
            .unwrap();

        let lengths: BTreeSet<usize> = set.values().map(Vec::len).collect();
        prop_assert!(lengths.len() <= 1);
        if year.is_some() {
            prop_assert!(set.values().all(|points| points.len() == 12));
        }

        let query = GroupQuery::by(Dimension::Airline, Measure::Cancellations);
        let totals: BTreeMap<String, u64> = compute(&dataset, &selection, &query)
            .unwrap()
            .into_iter()
            .map(|s| (s.label, s.total))
            .collect();
        for (entity, points) in &set {
            let sum: u64 = points.iter().map(|p| p.value).sum();
            prop_assert_eq!(Some(&sum), totals.get(&entity.to_string()));
            let periods: Vec<(i32, u32)> = points.iter().map(|p| (p.year, p.month)).collect();
            let mut sorted = periods.clone();
            sorted.sort_unstable();
            prop_assert_eq!(periods, sorted);
        }
    }
}
