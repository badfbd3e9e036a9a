use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::table::{Listing, ListingTable};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Inclusive numeric range over a filterable column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub min: f64,
    pub max: f64,
}

impl RangeFilter {
    /// Build a range, rejecting inverted or non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, PipelineError> {
        let range = RangeFilter { min, max };
        range.validate("range")?;
        Ok(range)
    }

    fn validate(&self, column: &str) -> Result<(), PipelineError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(PipelineError::validation(format!(
                "{column}: bounds must be finite numbers"
            )));
        }
        if self.min > self.max {
            return Err(PipelineError::validation(format!(
                "{column}: min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Inclusive containment. NaN values never match.
    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// User-selected predicates, built fresh from widget state per interaction
/// and immutable once built. `None` means the attribute is unconstrained.
/// Active predicates compose conjunctively.
///
/// Serialized into the metrics snapshot so a cached model run can be matched
/// against the filter state it was computed under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub area: Option<RangeFilter>,
    pub bedrooms: Option<RangeFilter>,
    pub energy_score: Option<RangeFilter>,
    /// Selected transport categories. An empty selection retains no rows
    /// (nothing selected), which is a valid empty result, not an error.
    pub transport: Option<BTreeSet<String>>,
}

impl FilterCriteria {
    /// Whether any predicate is active.
    pub fn is_empty(&self) -> bool {
        self.area.is_none()
            && self.bedrooms.is_none()
            && self.energy_score.is_none()
            && self.transport.is_none()
    }

    /// Reject malformed criteria (inverted or non-finite ranges).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if let Some(r) = &self.area {
            r.validate("area")?;
        }
        if let Some(r) = &self.bedrooms {
            r.validate("bedrooms")?;
        }
        if let Some(r) = &self.energy_score {
            r.validate("energy_score")?;
        }
        Ok(())
    }

    /// Whether one listing satisfies every active predicate.
    pub fn matches(&self, listing: &Listing) -> bool {
        if let Some(r) = &self.area {
            if !r.contains(listing.area) {
                return false;
            }
        }
        if let Some(r) = &self.bedrooms {
            if !r.contains(listing.bedrooms as f64) {
                return false;
            }
        }
        if let Some(r) = &self.energy_score {
            // NaN (missing score) fails an active energy range.
            if !r.contains(listing.energy_score) {
                return false;
            }
        }
        if let Some(selected) = &self.transport {
            if !selected.contains(&listing.transport) {
                return false;
            }
        }
        true
    }
}

/// Return indices of listings that pass all active predicates.
///
/// The result is always a subset of the table's row indices, in row order;
/// an empty result is a valid state the caller must render as "no data".
pub fn apply(table: &ListingTable, criteria: &FilterCriteria) -> Result<Vec<usize>, PipelineError> {
    criteria.validate()?;
    Ok(table
        .listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| criteria.matches(listing))
        .map(|(i, _)| i)
        .collect())
}
