/// Model layer: split → train → evaluate → explain.
///
/// ```text
///   filtered indices
///        │
///        ▼
///   ┌──────────┐   cleanup + seeded 80/20 split
///   │  trainer  │   gradient-boosted fit on ln_price
///   └──────────┘   RMSE / MAE / R² on the held-out rows
///        │
///        ▼
///   ┌──────────┐
///   │  explain  │   additive per-feature contributions
///   └──────────┘   importance ranking + dependence views
/// ```
///
/// Everything here is pure with respect to the UI: a run consumes a table
/// and row indices and returns values; the model itself is dropped with the
/// run.
pub mod explain;
pub mod metrics;
pub mod split;
pub mod trainer;

use crate::data::table::ListingTable;
use crate::error::PipelineError;
use explain::AttributionSet;
use metrics::Metrics;

// ---------------------------------------------------------------------------
// One pipeline run over the filtered view
// ---------------------------------------------------------------------------

/// The outputs the presentation layer consumes from one train-and-explain
/// run. Recomputed whenever the filtered view changes.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub metrics: Metrics,
    pub attributions: AttributionSet,
    pub n_train: usize,
    pub n_test: usize,
    /// Rows the cleanup pass dropped before splitting.
    pub n_dropped: usize,
}

/// Train on the given rows and explain the held-out split.
pub fn run(table: &ListingTable, indices: &[usize]) -> Result<PipelineRun, PipelineError> {
    let out = trainer::train(table, indices)?;
    let attributions = explain::explain(&out.model, table, &out.test_rows)?;

    Ok(PipelineRun {
        metrics: out.metrics,
        attributions,
        n_train: out.train_rows.len(),
        n_test: out.test_rows.len(),
        n_dropped: out.dropped,
    })
}
