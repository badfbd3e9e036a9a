use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Listing – one row of the source table
// ---------------------------------------------------------------------------

/// Logical columns every source file must provide, in model feature order.
/// `transport` enters the model as an ordinal category code.
pub const FEATURE_NAMES: [&str; 4] = ["area", "bedrooms", "energy_score", "transport"];

/// A single housing listing with the schema checked once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    /// Unit surface in m². Finite and positive.
    pub area: f64,
    /// Bedroom count.
    pub bedrooms: u32,
    /// Ordinal energy efficiency score. `NaN` when the source cell is blank;
    /// such rows are dropped by the trainer's cleanup pass.
    pub energy_score: f64,
    /// Transport proximity category (e.g. "metro", "tram"). Never empty.
    pub transport: String,
    /// Listing price in euros. Positive (non-positive rows are excluded at load).
    pub price: f64,
    /// Natural log of `price`, the regression target. Always finite.
    pub ln_price: f64,
}

// ---------------------------------------------------------------------------
// ListingTable – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full parsed dataset plus indices the filter widgets and the feature
/// encoder need: the sorted set of transport categories and per-column bounds.
#[derive(Debug, Clone, Default)]
pub struct ListingTable {
    /// All listings (rows).
    pub listings: Vec<Listing>,
    /// Sorted set of transport categories present in the data. The position
    /// of a category in this set is its ordinal feature code.
    pub transport_categories: BTreeSet<String>,
}

impl ListingTable {
    /// Build category indices from the loaded listings.
    pub fn from_listings(listings: Vec<Listing>) -> Self {
        let transport_categories = listings
            .iter()
            .map(|l| l.transport.clone())
            .collect::<BTreeSet<String>>();
        ListingTable {
            listings,
            transport_categories,
        }
    }

    /// Number of listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    /// Ordinal code of a transport category (its rank in the sorted set).
    pub fn transport_code(&self, category: &str) -> Option<usize> {
        self.transport_categories
            .iter()
            .position(|c| c == category)
    }

    /// Category label for an ordinal transport code.
    pub fn transport_label(&self, code: usize) -> Option<&str> {
        self.transport_categories.iter().nth(code).map(|s| s.as_str())
    }

    /// Min/max over a numeric column, ignoring NaN. `None` when the table is
    /// empty or the column is all-NaN.
    pub fn numeric_bounds(&self, value: impl Fn(&Listing) -> f64) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;
        for listing in &self.listings {
            let v = value(listing);
            if !v.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                None => (v, v),
                Some((lo, hi)) => (lo.min(v), hi.max(v)),
            });
        }
        bounds
    }

    /// Model feature vector for one row: `[area, bedrooms, energy_score,
    /// transport code]`. NaN components mark the row as unusable for training.
    pub fn feature_row(&self, idx: usize) -> [f64; 4] {
        let l = &self.listings[idx];
        let transport = self
            .transport_code(&l.transport)
            .map(|c| c as f64)
            .unwrap_or(f64::NAN);
        [l.area, l.bedrooms as f64, l.energy_score, transport]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(transport: &str, price: f64) -> Listing {
        Listing {
            area: 70.0,
            bedrooms: 2,
            energy_score: 5.0,
            transport: transport.to_string(),
            price,
            ln_price: price.ln(),
        }
    }

    #[test]
    fn transport_codes_follow_sorted_order() {
        let table = ListingTable::from_listings(vec![
            listing("tram", 300_000.0),
            listing("bus", 250_000.0),
            listing("metro", 400_000.0),
            listing("bus", 220_000.0),
        ]);
        assert_eq!(table.transport_code("bus"), Some(0));
        assert_eq!(table.transport_code("metro"), Some(1));
        assert_eq!(table.transport_code("tram"), Some(2));
        assert_eq!(table.transport_label(1), Some("metro"));
        assert_eq!(table.transport_code("ferry"), None);
    }

    #[test]
    fn numeric_bounds_skip_nan() {
        let mut rows = vec![listing("bus", 200_000.0), listing("bus", 500_000.0)];
        rows[0].energy_score = f64::NAN;
        rows[1].energy_score = 7.0;
        let table = ListingTable::from_listings(rows);
        assert_eq!(table.numeric_bounds(|l| l.energy_score), Some((7.0, 7.0)));
        assert_eq!(
            table.numeric_bounds(|l| l.price),
            Some((200_000.0, 500_000.0))
        );
    }

    #[test]
    fn empty_table_has_no_bounds() {
        let table = ListingTable::default();
        assert!(table.is_empty());
        assert_eq!(table.numeric_bounds(|l| l.area), None);
    }
}
