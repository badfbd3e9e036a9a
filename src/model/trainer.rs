use perpetual::booster::config::ContributionsMethod;
use perpetual::objective_functions::Objective;
use perpetual::{Matrix, PerpetualBooster};

use crate::data::table::{ListingTable, FEATURE_NAMES};
use crate::error::PipelineError;
use crate::model::metrics::{self, Metrics};
use crate::model::split::{train_test_split, SPLIT_SEED};

// ---------------------------------------------------------------------------
// Gradient-boosted regressor over listing features
// ---------------------------------------------------------------------------

/// Minimum usable rows for a meaningful 80/20 split.
pub const MIN_TRAIN_ROWS: usize = 10;

/// Fitted booster. Stateless after fit; dropped at the end of a pipeline run.
pub struct TrainedModel {
    booster: PerpetualBooster,
}

/// Everything `train` produces besides the model itself.
pub struct TrainOutput {
    pub model: TrainedModel,
    pub metrics: Metrics,
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
    /// Rows dropped by the cleanup pass (missing energy score etc.).
    pub dropped: usize,
}

/// Fit a gradient-boosted regressor on `ln_price` and evaluate it on the
/// held-out split. Metrics are on the ln_price scale.
///
/// One cleanup pass drops rows with non-finite features before splitting;
/// fewer than [`MIN_TRAIN_ROWS`] usable rows (including a cleanup that empties
/// the input) is [`PipelineError::InsufficientData`], never a degenerate model.
pub fn train(table: &ListingTable, indices: &[usize]) -> Result<TrainOutput, PipelineError> {
    let (usable, dropped) = usable_rows(table, indices);
    if dropped > 0 {
        log::info!("cleanup dropped {dropped} rows with missing fields");
    }
    if usable.len() < MIN_TRAIN_ROWS {
        return Err(PipelineError::insufficient_data(format!(
            "{} usable rows after cleanup; at least {MIN_TRAIN_ROWS} required",
            usable.len()
        )));
    }

    let split = train_test_split(&usable, SPLIT_SEED);
    let model = TrainedModel::fit(table, &split.train)?;

    let predicted = model.predict(table, &split.test);
    let truth: Vec<f64> = split.test.iter().map(|&i| table.listings[i].ln_price).collect();
    let metrics = metrics::evaluate(&truth, &predicted);

    log::info!(
        "trained on {} rows, evaluated on {}: rmse={:.4} mae={:.4} r2={:.4}",
        split.train.len(),
        split.test.len(),
        metrics.rmse,
        metrics.mae,
        metrics.r2
    );

    Ok(TrainOutput {
        model,
        metrics,
        train_rows: split.train,
        test_rows: split.test,
        dropped,
    })
}

/// Cleanup pass: keep rows whose feature vector and target are all finite.
fn usable_rows(table: &ListingTable, indices: &[usize]) -> (Vec<usize>, usize) {
    let usable: Vec<usize> = indices
        .iter()
        .copied()
        .filter(|&i| {
            table.feature_row(i).iter().all(|v| v.is_finite())
                && table.listings[i].ln_price.is_finite()
        })
        .collect();
    let dropped = indices.len() - usable.len();
    (usable, dropped)
}

/// Column-major feature matrix over the given rows, as the booster expects.
fn feature_matrix(table: &ListingTable, rows: &[usize]) -> Vec<f64> {
    let mut flat = Vec::with_capacity(rows.len() * FEATURE_NAMES.len());
    for feature in 0..FEATURE_NAMES.len() {
        for &row in rows {
            flat.push(table.feature_row(row)[feature]);
        }
    }
    flat
}

impl TrainedModel {
    /// Fit on the train rows with fixed hyperparameters. Booster failures
    /// (degenerate inputs the cleanup pass could not repair) surface as
    /// `InsufficientData`.
    fn fit(table: &ListingTable, train_rows: &[usize]) -> Result<Self, PipelineError> {
        let flat = feature_matrix(table, train_rows);
        let matrix = Matrix::new(&flat, train_rows.len(), FEATURE_NAMES.len());
        let y: Vec<f64> = train_rows
            .iter()
            .map(|&i| table.listings[i].ln_price)
            .collect();

        let mut booster = PerpetualBooster::default()
            .set_objective(Objective::SquaredLoss)
            .set_budget(0.5);
        booster
            .fit(&matrix, &y, None, None)
            .map_err(|e| PipelineError::insufficient_data(format!("model fit failed: {e}")))?;

        Ok(TrainedModel { booster })
    }

    /// Predicted ln_price for the given rows.
    pub fn predict(&self, table: &ListingTable, rows: &[usize]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        let flat = feature_matrix(table, rows);
        let matrix = Matrix::new(&flat, rows.len(), FEATURE_NAMES.len());
        self.booster.predict(&matrix, true)
    }

    /// Per-row, per-feature prediction contributions, flat with stride
    /// `FEATURE_NAMES.len() + 1`; the trailing term of each row is the
    /// baseline (expected value), so each row sums to its raw prediction.
    pub(crate) fn contributions(&self, table: &ListingTable, rows: &[usize]) -> Vec<f64> {
        if rows.is_empty() {
            return Vec::new();
        }
        let flat = feature_matrix(table, rows);
        let matrix = Matrix::new(&flat, rows.len(), FEATURE_NAMES.len());
        self.booster
            .predict_contributions(&matrix, ContributionsMethod::Weight, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Listing;

    /// Deterministic synthetic listings with a planted price structure.
    fn synthetic_table(n: usize) -> ListingTable {
        let transports = ["bus", "metro", "none", "tram"];
        let listings = (0..n)
            .map(|i| {
                let area = 35.0 + (i % 40) as f64 * 4.5;
                let bedrooms = 1 + (i % 4) as u32;
                let energy = 1.0 + (i % 10) as f64;
                let transport = transports[i % transports.len()];
                let transport_bonus = match transport {
                    "metro" => 1.25,
                    "tram" => 1.12,
                    "bus" => 1.05,
                    _ => 1.0,
                };
                let price = (2_800.0 * area + 15_000.0 * bedrooms as f64 + 6_000.0 * energy)
                    * transport_bonus;
                Listing {
                    area,
                    bedrooms,
                    energy_score: energy,
                    transport: transport.to_string(),
                    price,
                    ln_price: price.ln(),
                }
            })
            .collect();
        ListingTable::from_listings(listings)
    }

    #[test]
    fn too_few_rows_is_insufficient_data() {
        let table = synthetic_table(8);
        let indices: Vec<usize> = (0..table.len()).collect();
        match train(&table, &indices) {
            Err(PipelineError::InsufficientData(_)) => {}
            other => panic!("expected InsufficientData, got {:?}", other.err()),
        }
    }

    #[test]
    fn cleanup_that_empties_the_input_fails_rather_than_degenerating() {
        let mut table = synthetic_table(20);
        for listing in &mut table.listings {
            listing.energy_score = f64::NAN;
        }
        let indices: Vec<usize> = (0..table.len()).collect();
        match train(&table, &indices) {
            Err(PipelineError::InsufficientData(msg)) => {
                assert!(msg.contains("0 usable rows"), "{msg}")
            }
            other => panic!("expected InsufficientData, got {:?}", other.err()),
        }
    }

    #[test]
    fn training_produces_finite_metrics_and_full_coverage() {
        let table = synthetic_table(120);
        let indices: Vec<usize> = (0..table.len()).collect();
        let out = train(&table, &indices).expect("train");

        assert_eq!(out.train_rows.len() + out.test_rows.len(), 120);
        assert_eq!(out.dropped, 0);
        assert!(out.metrics.rmse.is_finite());
        assert!(out.metrics.mae.is_finite());
        assert!(out.metrics.r2.is_finite());

        let predictions = out.model.predict(&table, &out.test_rows);
        assert_eq!(predictions.len(), out.test_rows.len());
        assert!(predictions.iter().all(|p| p.is_finite()));
    }
}
