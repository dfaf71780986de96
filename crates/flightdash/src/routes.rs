//! Route-map aggregation.
//!
//! Route legs are grouped by their (origin, destination) airport coordinates.
//! Edge weights are min-max scaled against the candidate population: all legs
//! matching the selection's time constraints, whatever the origin or
//! destination filter says. Narrowing the map to one city therefore keeps
//! line widths comparable with the unfiltered map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::filter::FilterSelection;
use crate::format::format_count;
use crate::record::{Coordinate, Dimension, RouteLeg};

/// Line opacity at weight 1.
pub const MAX_OPACITY: f64 = 0.08;

/// Line width at weight 1.
pub const MAX_STROKE_WIDTH: f64 = 0.9;

type PairKey = ((u64, u64), (u64, u64));

/// One line on the route map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEdge {
    /// City of the departure airport.
    pub origin_city: String,
    /// City of the arrival airport.
    pub destination_city: String,
    /// Departure airport position.
    pub origin: Coordinate,
    /// Arrival airport position.
    pub destination: Coordinate,
    /// Flights on this leg in the filtered rows.
    pub total_flights: u64,
    /// Min-max scaled flight count in `[0, 1]`.
    pub weight: f64,
    /// Line opacity.
    pub opacity: f64,
    /// Line width.
    pub stroke_width: f64,
}

/// Bounds used to scale edge weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeScale {
    /// Smallest candidate total.
    pub min: u64,
    /// Largest candidate total.
    pub max: u64,
}

impl EdgeScale {
    /// Scale a total into `[0, 1]`; a degenerate range maps everything to 1.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn weight(self, total: u64) -> f64 {
        if self.max <= self.min {
            return 1.0;
        }
        let scaled = (total.saturating_sub(self.min)) as f64 / (self.max - self.min) as f64;
        scaled.clamp(0.0, 1.0)
    }
}

/// The route-map view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMap {
    /// Edges, busiest first.
    pub edges: Vec<RouteEdge>,
    /// Scale derived from the candidate population; `None` when it is empty.
    pub scale: Option<EdgeScale>,
    /// Flights over all edges.
    pub total_flights: u64,
}

fn group_legs<'a, I>(legs: I) -> BTreeMap<PairKey, (&'a RouteLeg, u64)>
where
    I: Iterator<Item = &'a RouteLeg>,
{
    let mut pairs: BTreeMap<PairKey, (&RouteLeg, u64)> = BTreeMap::new();
    for leg in legs {
        let entry = pairs
            .entry((leg.origin.key(), leg.destination.key()))
            .or_insert((leg, 0));
        entry.1 += leg.total_flights;
    }
    pairs
}

/// Aggregate route legs for the map.
#[must_use]
pub fn aggregate_routes(dataset: &Dataset, selection: &FilterSelection) -> RouteMap {
    let candidates = selection.restricted_to(&[Dimension::Year, Dimension::Month]);
    let candidate_pairs = group_legs(
        candidates
            .apply(dataset.records())
            .filter_map(|r| r.route.as_ref()),
    );
    let scale = candidate_pairs
        .values()
        .map(|(_, total)| *total)
        .fold(None, |acc: Option<EdgeScale>, total| {
            Some(match acc {
                None => EdgeScale { min: total, max: total },
                Some(s) => EdgeScale {
                    min: s.min.min(total),
                    max: s.max.max(total),
                },
            })
        });

    let pairs = group_legs(
        selection
            .apply(dataset.records())
            .filter_map(|r| r.route.as_ref()),
    );

    let mut edges: Vec<RouteEdge> = pairs
        .into_values()
        .map(|(leg, total)| {
            let weight = scale.map_or(1.0, |s| s.weight(total));
            RouteEdge {
                origin_city: leg.origin_city.clone(),
                destination_city: leg.destination_city.clone(),
                origin: leg.origin,
                destination: leg.destination,
                total_flights: total,
                weight,
                opacity: weight * MAX_OPACITY,
                stroke_width: weight * MAX_STROKE_WIDTH,
            }
        })
        .collect();
    edges.sort_by(|a, b| {
        b.total_flights
            .cmp(&a.total_flights)
            .then_with(|| a.origin_city.cmp(&b.origin_city))
            .then_with(|| a.destination_city.cmp(&b.destination_city))
    });

    let total_flights = edges.iter().map(|e| e.total_flights).sum();
    debug!(
        edges = edges.len(),
        candidates = candidate_pairs.len(),
        total_flights,
        "Aggregated routes"
    );

    RouteMap {
        edges,
        scale,
        total_flights,
    }
}

/// A marker for a busy departure airport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportMarker {
    /// City of the airport.
    pub city: String,
    /// Airport position.
    pub position: Coordinate,
    /// Departures over the whole dataset.
    pub total_flights: u64,
    /// Popup text.
    pub popup: String,
}

/// The `n` origin airports with the most departures in the whole dataset.
///
/// Markers and the origin/destination dropdowns use this fixed list, so it
/// ignores the current selection.
#[must_use]
pub fn top_airports(dataset: &Dataset, n: usize) -> Vec<AirportMarker> {
    let mut airports: BTreeMap<(String, (u64, u64)), (Coordinate, u64)> = BTreeMap::new();
    for leg in dataset.records().iter().filter_map(|r| r.route.as_ref()) {
        let entry = airports
            .entry((leg.origin_city.clone(), leg.origin.key()))
            .or_insert((leg.origin, 0));
        entry.1 += leg.total_flights;
    }

    let mut markers: Vec<AirportMarker> = airports
        .into_iter()
        .map(|((city, _), (position, total_flights))| AirportMarker {
            popup: format!("{city} // Flights: {}", format_count(total_flights)),
            city,
            position,
            total_flights,
        })
        .collect();
    markers.sort_by(|a, b| {
        b.total_flights
            .cmp(&a.total_flights)
            .then_with(|| a.city.cmp(&b.city))
    });
    markers.truncate(n);
    markers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::fixtures::leg;
    use crate::record::FlightRecord;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            FlightRecord::route(leg("Atlanta", "Chicago", 100), 2023, 1),
            FlightRecord::route(leg("Atlanta", "Chicago", 50), 2023, 2),
            FlightRecord::route(leg("Chicago", "Atlanta", 30), 2023, 1),
            FlightRecord::route(leg("Dallas", "Denver", 10), 2023, 1),
            FlightRecord::route(leg("Denver", "Dallas", 500), 2022, 1),
            FlightRecord::cancellation("AA", "Weather", 2023, 1, 7),
        ])
    }

    #[test]
    fn test_edges_grouped_by_pair() {
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let map = aggregate_routes(&dataset(), &selection);

        let totals: Vec<(&str, &str, u64)> = map
            .edges
            .iter()
            .map(|e| (e.origin_city.as_str(), e.destination_city.as_str(), e.total_flights))
            .collect();
        assert_eq!(
            totals,
            vec![
                ("Atlanta", "Chicago", 150),
                ("Chicago", "Atlanta", 30),
                ("Dallas", "Denver", 10),
            ]
        );
        assert_eq!(map.total_flights, 190);
    }

    #[test]
    fn test_weights_use_candidate_range() {
        let selection = FilterSelection::all().with(Dimension::Year, 2023);
        let map = aggregate_routes(&dataset(), &selection);
        assert_eq!(map.scale, Some(EdgeScale { min: 10, max: 150 }));
        assert!((map.edges[0].weight - 1.0).abs() < 1e-9);
        assert!((map.edges[1].weight - 20.0 / 140.0).abs() < 1e-9);
        assert!(map.edges[2].weight.abs() < 1e-9);
        assert!((map.edges[0].opacity - MAX_OPACITY).abs() < 1e-9);
        assert!((map.edges[0].stroke_width - MAX_STROKE_WIDTH).abs() < 1e-9);
    }

    #[test]
    fn test_route_filter_keeps_candidate_scale() {
        let selection = FilterSelection::all()
            .with(Dimension::Year, 2023)
            .with(Dimension::OriginCity, "Chicago");
        let map = aggregate_routes(&dataset(), &selection);
        assert_eq!(map.edges.len(), 1);
        assert_eq!(map.scale, Some(EdgeScale { min: 10, max: 150 }));
        assert!((map.edges[0].weight - 20.0 / 140.0).abs() < 1e-9);
    }

    #[test]
    fn test_month_filter_narrows_candidates() {
        let selection = FilterSelection::all()
            .with(Dimension::Year, 2023)
            .with(Dimension::Month, 2);
        let map = aggregate_routes(&dataset(), &selection);
        assert_eq!(map.edges.len(), 1);
        // Single candidate: degenerate range
        assert!((map.edges[0].weight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_selection() {
        let selection = FilterSelection::all().with(Dimension::Year, 1999);
        let map = aggregate_routes(&dataset(), &selection);
        assert!(map.edges.is_empty());
        assert!(map.scale.is_none());
        assert_eq!(map.total_flights, 0);
    }

    #[test]
    fn test_edge_scale_weight() {
        let scale = EdgeScale { min: 10, max: 110 };
        assert!((scale.weight(60) - 0.5).abs() < 1e-9);
        assert!(scale.weight(0).abs() < 1e-9);
        assert!((scale.weight(500) - 1.0).abs() < 1e-9);
        assert!((EdgeScale { min: 5, max: 5 }.weight(5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_airports() {
        let markers = top_airports(&dataset(), 2);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].city, "Denver");
        assert_eq!(markers[0].total_flights, 500);
        assert_eq!(markers[1].city, "Atlanta");
        assert_eq!(markers[1].popup, "Atlanta // Flights: 150");
    }
}
