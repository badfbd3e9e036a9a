use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::color::ColorMap;
use crate::data::filter::{self, FilterCriteria, RangeFilter};
use crate::data::table::{Listing, ListingTable};
use crate::error::PipelineError;
use crate::model::metrics::{snapshot_path, MetricsSnapshot};
use crate::model::{self, PipelineRun};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Central tabs, mirroring the dashboard sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Explore,
    Model,
    About,
}

/// Raw widget state for one numeric range filter: the selected ends plus the
/// column bounds the widgets are seeded from.
#[derive(Debug, Clone, Copy)]
pub struct RangeSelection {
    pub lo: f64,
    pub hi: f64,
    pub bounds: (f64, f64),
}

impl RangeSelection {
    fn full(bounds: (f64, f64)) -> Self {
        RangeSelection {
            lo: bounds.0,
            hi: bounds.1,
            bounds,
        }
    }

    /// Whether the selection constrains anything beyond the column bounds.
    pub fn is_active(&self) -> bool {
        self.lo > self.bounds.0 || self.hi < self.bounds.1
    }

    /// Predicate for the criteria object; unvalidated on purpose so that
    /// malformed widget input surfaces as a `Validation` error downstream.
    fn to_filter(&self) -> Option<RangeFilter> {
        self.is_active().then_some(RangeFilter {
            min: self.lo,
            max: self.hi,
        })
    }
}

/// Outcome of the last train-and-explain run shown in the Model tab.
#[derive(Debug, Clone)]
pub enum ModelOutput {
    /// No run yet for the current filter state.
    NotRun,
    /// Metrics recovered from a snapshot consistent with the filter state.
    Snapshot(MetricsSnapshot),
    /// A full run: metrics plus attributions.
    Trained(PipelineRun),
    /// Too few rows: an informational state, not a failure.
    NoData(String),
    /// Terminal pipeline error for this run.
    Failed(String),
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded dataset (None until the user opens a file).
    pub dataset: Option<ListingTable>,
    pub dataset_path: Option<PathBuf>,

    /// Indices of listings passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    // Filter widget state, seeded from column bounds on load.
    pub area_filter: Option<RangeSelection>,
    pub bedrooms_filter: Option<RangeSelection>,
    pub energy_filter: Option<RangeSelection>,
    pub transport_selected: BTreeSet<String>,

    /// Colours for transport categories.
    pub color_map: ColorMap,

    pub tab: Tab,

    /// Last pipeline outcome; stale whenever the filtered view has changed.
    pub model_output: ModelOutput,
    pub model_stale: bool,
    /// Skip the snapshot shortcut on the next run (the user asked for a
    /// retrain, e.g. to get attributions a snapshot cannot provide).
    pub force_retrain: bool,

    /// Feature shown in the dependence scatter.
    pub dependence_feature: String,

    /// Malformed-filter message (red, replaces results until fixed).
    pub filter_error: Option<String>,
    /// Transient status line (load/export feedback).
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset: None,
            dataset_path: None,
            visible_indices: Vec::new(),
            area_filter: None,
            bedrooms_filter: None,
            energy_filter: None,
            transport_selected: BTreeSet::new(),
            color_map: ColorMap::default(),
            tab: Tab::Explore,
            model_output: ModelOutput::NotRun,
            model_stale: false,
            force_retrain: false,
            dependence_feature: "transport".to_string(),
            filter_error: None,
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded dataset, seed the filter widgets from its
    /// bounds, and reset the pipeline outputs.
    pub fn set_dataset(&mut self, table: ListingTable, path: PathBuf) {
        self.area_filter = table.numeric_bounds(|l| l.area).map(RangeSelection::full);
        self.bedrooms_filter = table
            .numeric_bounds(|l| l.bedrooms as f64)
            .map(RangeSelection::full);
        self.energy_filter = table
            .numeric_bounds(|l| l.energy_score)
            .map(RangeSelection::full);
        self.transport_selected = table.transport_categories.clone();
        self.color_map = ColorMap::new(&table.transport_categories);

        self.visible_indices = (0..table.len()).collect();
        self.dataset = Some(table);
        self.dataset_path = Some(path);
        self.model_output = ModelOutput::NotRun;
        self.model_stale = true;
        self.filter_error = None;
        self.status_message = None;
    }

    /// Build immutable criteria from the current widget state. Constructed
    /// fresh per interaction and discarded after filtering.
    pub fn criteria(&self) -> FilterCriteria {
        let transport = match &self.dataset {
            Some(table) if self.transport_selected != table.transport_categories => {
                Some(self.transport_selected.clone())
            }
            _ => None,
        };
        FilterCriteria {
            area: self.area_filter.as_ref().and_then(RangeSelection::to_filter),
            bedrooms: self
                .bedrooms_filter
                .as_ref()
                .and_then(RangeSelection::to_filter),
            energy_score: self
                .energy_filter
                .as_ref()
                .and_then(RangeSelection::to_filter),
            transport,
        }
    }

    /// Recompute `visible_indices` after a filter change. A changed view
    /// marks the model outputs stale.
    pub fn refilter(&mut self) {
        let criteria = self.criteria();
        let Some(table) = &self.dataset else {
            return;
        };
        match filter::apply(table, &criteria) {
            Ok(indices) => {
                self.filter_error = None;
                if indices != self.visible_indices {
                    self.visible_indices = indices;
                    self.model_stale = true;
                }
            }
            Err(e) => {
                self.filter_error = Some(e.to_string());
            }
        }
    }

    /// Select every transport category.
    pub fn select_all_transport(&mut self) {
        if let Some(table) = &self.dataset {
            self.transport_selected = table.transport_categories.clone();
            self.refilter();
        }
    }

    /// Deselect every transport category.
    pub fn select_no_transport(&mut self) {
        self.transport_selected.clear();
        self.refilter();
    }

    /// Bring the model pane up to date with the filtered view: reuse a
    /// consistent metrics snapshot when one exists, otherwise run the
    /// train-and-explain pipeline and record a fresh snapshot.
    pub fn ensure_model_current(&mut self) {
        if !self.model_stale && !matches!(self.model_output, ModelOutput::NotRun) {
            return;
        }
        let Some(table) = &self.dataset else {
            return;
        };

        let criteria = self.criteria();
        let row_count = self.visible_indices.len();
        let snap_path = self.dataset_path.as_deref().map(snapshot_path);

        if !self.force_retrain {
            if let Some(path) = &snap_path {
                if let Some(snapshot) = MetricsSnapshot::load(path) {
                    if snapshot.is_consistent_with(&criteria, row_count) {
                        log::info!("showing metrics snapshot from {}", path.display());
                        self.model_output = ModelOutput::Snapshot(snapshot);
                        self.model_stale = false;
                        return;
                    }
                }
            }
        }
        self.force_retrain = false;

        let output = match model::run(table, &self.visible_indices) {
            Ok(run) => {
                if let Some(path) = &snap_path {
                    let snapshot = MetricsSnapshot {
                        criteria,
                        row_count,
                        metrics: run.metrics,
                    };
                    if let Err(e) = snapshot.save(path) {
                        log::warn!("could not save metrics snapshot: {e}");
                    }
                }
                ModelOutput::Trained(run)
            }
            Err(e @ PipelineError::InsufficientData(_)) => ModelOutput::NoData(e.to_string()),
            Err(e) => ModelOutput::Failed(e.to_string()),
        };
        self.model_output = output;
        self.model_stale = false;
    }

    /// Listings currently visible, for the KPI strip and charts.
    pub fn visible_listings(&self) -> impl Iterator<Item = &Listing> {
        let table = self.dataset.as_ref();
        self.visible_indices
            .iter()
            .filter_map(move |&i| table.map(|t| &t.listings[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::table::Listing;

    fn state_with_rows() -> AppState {
        let listings = (0..20)
            .map(|i| {
                let price = 200_000.0 + 10_000.0 * i as f64;
                Listing {
                    area: 40.0 + i as f64,
                    bedrooms: 1 + (i % 3) as u32,
                    energy_score: 1.0 + (i % 10) as f64,
                    transport: if i % 2 == 0 { "metro" } else { "bus" }.to_string(),
                    price,
                    ln_price: price.ln(),
                }
            })
            .collect();
        let mut state = AppState::default();
        state.set_dataset(ListingTable::from_listings(listings), PathBuf::from("x.csv"));
        state
    }

    #[test]
    fn fresh_dataset_has_inactive_criteria() {
        let state = state_with_rows();
        assert!(state.criteria().is_empty());
        assert_eq!(state.visible_indices.len(), 20);
    }

    #[test]
    fn narrowing_a_widget_activates_its_predicate_and_marks_the_model_stale() {
        let mut state = state_with_rows();
        state.model_stale = false;

        let filter = state.bedrooms_filter.as_mut().expect("bedroom bounds");
        filter.lo = 2.0;
        filter.hi = 2.0;
        state.refilter();

        let criteria = state.criteria();
        assert!(criteria.bedrooms.is_some());
        assert!(state.model_stale);
        for listing in state.visible_listings() {
            assert_eq!(listing.bedrooms, 2);
        }
    }

    #[test]
    fn inverted_widget_range_surfaces_a_filter_error() {
        let mut state = state_with_rows();
        let filter = state.area_filter.as_mut().expect("area bounds");
        filter.lo = 55.0;
        filter.hi = 41.0;
        state.refilter();
        let msg = state.filter_error.as_deref().expect("validation message");
        assert!(msg.contains("area"), "{msg}");
    }

    #[test]
    fn transport_selection_round_trips_through_all_and_none() {
        let mut state = state_with_rows();
        state.select_no_transport();
        assert!(state.visible_indices.is_empty());
        state.select_all_transport();
        assert_eq!(state.visible_indices.len(), 20);
        assert!(state.criteria().transport.is_none());
    }
}
