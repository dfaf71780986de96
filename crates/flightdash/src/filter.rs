//! Filter selections.
//!
//! A [`FilterSelection`] holds at most one selected value per [`Dimension`].
//! Dimensions without a value are unconstrained (the dropdown's "All"
//! entry). Constraints conjoin.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::{Dimension, DimensionValue, FlightRecord};

/// Label of the unconstrained dropdown entry.
pub const ALL_LABEL: &str = "All";

/// Spellings of the unconstrained entry accepted from user input.
const ALL_SENTINELS: &[&str] = &["all", "alle", "*"];

/// Check whether raw input means "no constraint".
#[must_use]
pub fn is_all_sentinel(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || ALL_SENTINELS.iter().any(|s| s.eq_ignore_ascii_case(raw))
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection {
    constraints: BTreeMap<Dimension, DimensionValue>,
}

impl FilterSelection {
    /// A selection with every dimension set to "All".
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Builder-style constraint.
    #[must_use]
    pub fn with(mut self, dimension: Dimension, value: impl Into<DimensionValue>) -> Self {
        self.constraints.insert(dimension, value.into());
        self
    }

    /// Set or clear the constraint on one dimension.
    pub fn set(&mut self, dimension: Dimension, value: Option<DimensionValue>) {
        match value {
            Some(value) => {
                self.constraints.insert(dimension, value);
            }
            None => {
                self.constraints.remove(&dimension);
            }
        }
    }

    /// Set a constraint from raw user input; "All" clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if a temporal dimension gets a non-integer value.
    pub fn set_raw(&mut self, dimension: Dimension, raw: &str) -> Result<()> {
        let value = if is_all_sentinel(raw) {
            None
        } else {
            Some(dimension.parse_value(raw)?)
        };
        self.set(dimension, value);
        Ok(())
    }

    /// Build a selection from `(dimension name, raw value)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown dimension name or a malformed value.
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut selection = Self::all();
        for (name, raw) in pairs {
            let dimension: Dimension = name.parse()?;
            selection.set_raw(dimension, raw)?;
        }
        Ok(selection)
    }

    /// The selected value of a dimension, `None` meaning "All".
    #[must_use]
    pub fn get(&self, dimension: Dimension) -> Option<&DimensionValue> {
        self.constraints.get(&dimension)
    }

    /// The selected year, if one is selected.
    #[must_use]
    pub fn year(&self) -> Option<i64> {
        self.get(Dimension::Year).and_then(DimensionValue::as_int)
    }

    /// Whether every dimension is "All".
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Iterate over the active constraints.
    pub fn constraints(&self) -> impl Iterator<Item = (Dimension, &DimensionValue)> {
        self.constraints.iter().map(|(d, v)| (*d, v))
    }

    /// A copy with one dimension reset to "All".
    #[must_use]
    pub fn without(&self, dimension: Dimension) -> Self {
        let mut copy = self.clone();
        copy.constraints.remove(&dimension);
        copy
    }

    /// A copy keeping only the constraints on `dimensions`.
    #[must_use]
    pub fn restricted_to(&self, dimensions: &[Dimension]) -> Self {
        Self {
            constraints: self
                .constraints
                .iter()
                .filter(|(d, _)| dimensions.contains(d))
                .map(|(d, v)| (*d, v.clone()))
                .collect(),
        }
    }

    /// The same selection shifted to the previous year.
    ///
    /// Returns `None` when no year is selected.
    #[must_use]
    pub fn prior_year(&self) -> Option<Self> {
        let year = self.year()?;
        Some(self.clone().with(Dimension::Year, year - 1))
    }

    /// Check whether a record satisfies every constraint.
    #[must_use]
    pub fn matches(&self, record: &FlightRecord) -> bool {
        self.constraints
            .iter()
            .all(|(dimension, value)| record.has_value(*dimension, value))
    }

    /// Iterate over the records that satisfy the selection.
    pub fn apply<'a>(
        &'a self,
        records: &'a [FlightRecord],
    ) -> impl Iterator<Item = &'a FlightRecord> + 'a {
        records.iter().filter(move |record| self.matches(record))
    }
}
