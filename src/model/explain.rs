use std::cmp::Ordering;

use crate::data::table::{ListingTable, FEATURE_NAMES};
use crate::error::PipelineError;
use crate::model::trainer::TrainedModel;

// ---------------------------------------------------------------------------
// Per-feature attribution of model predictions
// ---------------------------------------------------------------------------

/// Attribution of one evaluation row: contribution per feature plus the raw
/// model prediction. Contributions and the shared baseline sum to the
/// prediction (the additivity invariant the charts rely on).
#[derive(Debug, Clone)]
pub struct RowAttribution {
    /// Index of the row in the source table.
    pub row: usize,
    pub feature_values: [f64; 4],
    pub contributions: [f64; 4],
    pub prediction: f64,
}

/// Attributions over the evaluation split, with aggregate views for the
/// charts. Invalidated (rebuilt) whenever the model or the split changes.
#[derive(Debug, Clone)]
pub struct AttributionSet {
    pub feature_names: Vec<String>,
    /// Expected value of the model output; shared by all rows.
    pub baseline: f64,
    pub rows: Vec<RowAttribution>,
}

impl AttributionSet {
    /// The informational "nothing to explain" state.
    pub fn empty() -> Self {
        AttributionSet {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            baseline: 0.0,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean absolute contribution per feature, ranked descending; ties break
    /// by feature name so the ranking is invariant under row reordering.
    pub fn global_importance(&self) -> Vec<(String, f64)> {
        if self.rows.is_empty() {
            return Vec::new();
        }
        let n = self.rows.len() as f64;
        let mut ranking: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .enumerate()
            .map(|(f, name)| {
                let mean_abs = self
                    .rows
                    .iter()
                    .map(|r| r.contributions[f].abs())
                    .sum::<f64>()
                    / n;
                (name.clone(), mean_abs)
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranking
    }

    /// `(feature value, contribution)` pairs for one feature, for the
    /// dependence scatter. Unknown feature names yield an empty view.
    pub fn dependence(&self, feature: &str) -> Vec<(f64, f64)> {
        let Some(f) = self.feature_names.iter().position(|n| n == feature) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|r| (r.feature_values[f], r.contributions[f]))
            .collect()
    }
}

/// Compute per-row attributions for the model over the evaluation rows.
///
/// Uses the booster's own tree-path contributions (exact, not sampled), so
/// for every row `baseline + Σ contributions = raw prediction`. An empty
/// evaluation set produces an empty `AttributionSet`, not an error.
pub fn explain(
    model: &TrainedModel,
    table: &ListingTable,
    test_rows: &[usize],
) -> Result<AttributionSet, PipelineError> {
    if test_rows.is_empty() {
        return Ok(AttributionSet::empty());
    }

    let stride = FEATURE_NAMES.len() + 1;
    let contributions = model.contributions(table, test_rows);
    debug_assert_eq!(contributions.len(), test_rows.len() * stride);
    let predictions = model.predict(table, test_rows);

    // The trailing term of every contribution row is the expected value.
    let baseline = contributions[FEATURE_NAMES.len()];

    let rows = test_rows
        .iter()
        .enumerate()
        .map(|(i, &row)| {
            let offset = i * stride;
            let mut per_feature = [0.0; 4];
            per_feature.copy_from_slice(&contributions[offset..offset + FEATURE_NAMES.len()]);
            RowAttribution {
                row,
                feature_values: table.feature_row(row),
                contributions: per_feature,
                prediction: predictions[i],
            }
        })
        .collect();

    Ok(AttributionSet {
        feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        baseline,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribution_set() -> AttributionSet {
        AttributionSet {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            baseline: 12.5,
            rows: vec![
                RowAttribution {
                    row: 0,
                    feature_values: [70.0, 2.0, 6.0, 1.0],
                    contributions: [0.30, -0.05, 0.10, 0.02],
                    prediction: 12.87,
                },
                RowAttribution {
                    row: 3,
                    feature_values: [45.0, 1.0, 3.0, 0.0],
                    contributions: [-0.20, -0.07, -0.04, -0.01],
                    prediction: 12.18,
                },
            ],
        }
    }

    #[test]
    fn importance_is_mean_absolute_contribution_ranked_descending() {
        let set = attribution_set();
        let ranking = set.global_importance();
        assert_eq!(ranking[0].0, "area");
        assert!((ranking[0].1 - 0.25).abs() < 1e-12);
        let values: Vec<f64> = ranking.iter().map(|(_, v)| *v).collect();
        assert!(values.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn importance_ranking_ignores_row_order() {
        let set = attribution_set();
        let mut reversed = set.clone();
        reversed.rows.reverse();
        assert_eq!(set.global_importance(), reversed.global_importance());
    }

    #[test]
    fn dependence_pairs_feature_value_with_contribution() {
        let set = attribution_set();
        let pairs = set.dependence("energy_score");
        assert_eq!(pairs, vec![(6.0, 0.10), (3.0, -0.04)]);
        assert!(set.dependence("floor").is_empty());
    }

    #[test]
    fn empty_set_is_a_valid_state() {
        let set = AttributionSet::empty();
        assert!(set.is_empty());
        assert!(set.global_importance().is_empty());
        assert!(set.dependence("area").is_empty());
    }
}
