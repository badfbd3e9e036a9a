use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::filter::FilterCriteria;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Evaluation metrics
// ---------------------------------------------------------------------------

/// Regression metrics comparing predictions against held-out ground truth.
/// All values are on the ln_price scale, not back-transformed prices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

/// Compute RMSE, MAE and R² over paired slices. Callers guarantee equal,
/// non-zero lengths. R² of a constant target is reported as 0.
pub fn evaluate(truth: &[f64], predicted: &[f64]) -> Metrics {
    debug_assert_eq!(truth.len(), predicted.len());
    let n = truth.len() as f64;

    let mut sq_err = 0.0;
    let mut abs_err = 0.0;
    for (&t, &p) in truth.iter().zip(predicted) {
        let err = p - t;
        sq_err += err * err;
        abs_err += err.abs();
    }

    let mean = truth.iter().sum::<f64>() / n;
    let ss_tot: f64 = truth.iter().map(|&t| (t - mean) * (t - mean)).sum();
    let r2 = if ss_tot > 0.0 { 1.0 - sq_err / ss_tot } else { 0.0 };

    Metrics {
        rmse: (sq_err / n).sqrt(),
        mae: abs_err / n,
        r2,
    }
}

// ---------------------------------------------------------------------------
// On-disk metrics snapshot
// ---------------------------------------------------------------------------

/// File written next to the dataset so the model pane can show metrics
/// without retraining when the filter state matches.
const SNAPSHOT_FILE: &str = "model_metrics.json";

/// A persisted metrics record tagged with the filter state it was computed
/// under. Consistency is exact criteria equality plus the filtered row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub criteria: FilterCriteria,
    pub row_count: usize,
    pub metrics: Metrics,
}

impl MetricsSnapshot {
    /// Whether this snapshot was computed under the given filter state.
    pub fn is_consistent_with(&self, criteria: &FilterCriteria, row_count: usize) -> bool {
        self.criteria == *criteria && self.row_count == row_count
    }

    /// Best-effort load; an unreadable or stale-format snapshot is ignored.
    pub fn load(path: &Path) -> Option<Self> {
        let text = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&text) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                log::warn!("ignoring unreadable metrics snapshot {path:?}: {e}");
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::data_format(format!("encoding metrics snapshot: {e}")))?;
        std::fs::write(path, text)
            .map_err(|e| PipelineError::data_format(format!("writing metrics snapshot: {e}")))
    }
}

/// Snapshot location for a dataset: a sibling `model_metrics.json`.
pub fn snapshot_path(dataset_path: &Path) -> PathBuf {
    dataset_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(SNAPSHOT_FILE)
}
