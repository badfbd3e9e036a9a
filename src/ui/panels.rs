use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::model::metrics::Metrics;
use crate::state::{AppState, ModelOutput, RangeSelection, Tab};
use crate::ui::{map_view, plot};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar with the tab strip.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for (tab, label) in [
            (Tab::Explore, "Explore"),
            (Tab::Model, "Model"),
            (Tab::About, "About"),
        ] {
            if ui.selectable_label(state.tab == tab, label).clicked() {
                state.tab = tab;
            }
        }

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} listings loaded, {} visible",
                ds.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.filter_error {
            ui.label(RichText::new(msg).color(Color32::RED));
        } else if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::LIGHT_GREEN));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if let Some(sel) = state.area_filter.as_mut() {
                range_row(ui, "Area (m²)", sel, 1.0);
            }
            if let Some(sel) = state.bedrooms_filter.as_mut() {
                range_row(ui, "Bedrooms", sel, 0.05);
            }
            if let Some(sel) = state.energy_filter.as_mut() {
                range_row(ui, "Energy score", sel, 0.1);
            }

            ui.separator();
            transport_section(ui, state);
            ui.separator();

            ui.label(format!(
                "Rows after filters: {}",
                state.visible_indices.len()
            ));
            if ui.button("Export filtered CSV…").clicked() {
                export_dialog(state);
            }
        });

    // Recompute visible indices after any widget changes.
    state.refilter();
}

/// A min/max pair of drag values clamped to the column bounds. The two ends
/// are clamped independently, so an inverted pair is possible and surfaces
/// through criteria validation instead of being silently fixed up.
fn range_row(ui: &mut Ui, label: &str, sel: &mut RangeSelection, speed: f64) {
    let bounds = sel.bounds;
    ui.strong(label);
    ui.horizontal(|ui: &mut Ui| {
        ui.add(
            egui::DragValue::new(&mut sel.lo)
                .speed(speed)
                .range(bounds.0..=bounds.1),
        );
        ui.label("to");
        ui.add(
            egui::DragValue::new(&mut sel.hi)
                .speed(speed)
                .range(bounds.0..=bounds.1),
        );
    });
    ui.add_space(4.0);
}

fn transport_section(ui: &mut Ui, state: &mut AppState) {
    let categories: Vec<String> = match &state.dataset {
        Some(table) => table.transport_categories.iter().cloned().collect(),
        None => return,
    };
    let header = format!(
        "Transport  ({}/{})",
        state.transport_selected.len(),
        categories.len()
    );

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    state.select_all_transport();
                }
                if ui.small_button("None").clicked() {
                    state.select_no_transport();
                }
            });

            for cat in &categories {
                let mut checked = state.transport_selected.contains(cat);
                let text = RichText::new(cat).color(state.color_map.color_for(cat));
                if ui.checkbox(&mut checked, text).changed() {
                    if checked {
                        state.transport_selected.insert(cat.clone());
                    } else {
                        state.transport_selected.remove(cat);
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Explore tab
// ---------------------------------------------------------------------------

pub fn explore_tab(ui: &mut Ui, state: &mut AppState) {
    let Some(table) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to explore listings  (File → Open…)");
        });
        return;
    };

    ui.label(format!(
        "Dataset loaded: {} listings, {} transport categories",
        table.len(),
        table.transport_categories.len()
    ));
    ui.add_space(4.0);

    let prices: Vec<f64> = state.visible_listings().map(|l| l.price).collect();
    let per_m2: Vec<f64> = state
        .visible_listings()
        .map(|l| l.price / l.area)
        .collect();
    let ln_prices: Vec<f64> = state.visible_listings().map(|l| l.ln_price).collect();

    ui.horizontal(|ui: &mut Ui| {
        kpi(ui, "Listings (filtered)", prices.len().to_string());
        kpi(ui, "Median price", fmt_eur(median(prices)));
        kpi(ui, "Median price / m²", fmt_eur(median(per_m2)));
        kpi(
            ui,
            "Mean ln_price",
            mean(&ln_prices)
                .map(|v| format!("{v:.3}"))
                .unwrap_or_else(|| "—".to_string()),
        );
    });

    ui.separator();
    ui.columns(2, |cols: &mut [Ui]| {
        cols[0].strong("Price distribution (filtered)");
        plot::price_histogram(&mut cols[0], state);
        map_view::map_panel(&mut cols[1], state);
    });
}

fn kpi(ui: &mut Ui, label: &str, value: String) {
    ui.vertical(|ui: &mut Ui| {
        ui.weak(label);
        ui.strong(RichText::new(value).size(18.0));
    });
    ui.add_space(16.0);
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn fmt_eur(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("€ {v:.0}"),
        None => "—".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Model tab
// ---------------------------------------------------------------------------

pub fn model_tab(ui: &mut Ui, state: &mut AppState) {
    if state.dataset.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to train the model  (File → Open…)");
        });
        return;
    }

    state.ensure_model_current();

    ui.heading("Model results (gradient boosting)");
    ui.add_space(4.0);

    let output = state.model_output.clone();
    match &output {
        ModelOutput::NotRun => {
            ui.label("No model run yet.");
        }
        ModelOutput::Snapshot(snapshot) => {
            metrics_row(ui, &snapshot.metrics);
            ui.weak("Metrics loaded from model_metrics.json (no retrain needed).");
            if ui.button("Retrain to compute attributions").clicked() {
                state.force_retrain = true;
                state.model_stale = true;
            }
        }
        ModelOutput::Trained(run) => {
            metrics_row(ui, &run.metrics);
            ui.weak(format!(
                "Trained on {} rows, evaluated on {} ({} dropped in cleanup).",
                run.n_train, run.n_test, run.n_dropped
            ));

            ui.separator();
            ui.strong("Feature attributions");
            plot::importance_section(ui, &run.attributions);

            ui.separator();
            ui.strong("Dependence");
            egui::ComboBox::from_id_salt("dependence_feature")
                .selected_text(state.dependence_feature.clone())
                .show_ui(ui, |ui: &mut Ui| {
                    for name in &run.attributions.feature_names {
                        if ui
                            .selectable_label(state.dependence_feature == *name, name)
                            .clicked()
                        {
                            state.dependence_feature = name.clone();
                        }
                    }
                });
            plot::dependence_plot(ui, state, &run.attributions);
        }
        ModelOutput::NoData(msg) => {
            ui.label(format!("No data to train on: {msg}"));
            ui.weak("Relax the filters to bring back enough listings.");
        }
        ModelOutput::Failed(msg) => {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    }
}

fn metrics_row(ui: &mut Ui, metrics: &Metrics) {
    ui.horizontal(|ui: &mut Ui| {
        kpi(ui, "RMSE", format!("{:.4}", metrics.rmse));
        kpi(ui, "MAE", format!("{:.4}", metrics.mae));
        kpi(ui, "R²", format!("{:.4}", metrics.r2));
    });
    ui.weak("Computed on the ln(price) scale.");
}

// ---------------------------------------------------------------------------
// About tab
// ---------------------------------------------------------------------------

pub fn about_tab(ui: &mut Ui) {
    ui.heading("About");
    ui.add_space(4.0);
    ui.label(
        "A compact dashboard to explore Milan housing listings, view the \
         pre-rendered area map, and inspect a gradient-boosted price model \
         with per-feature attributions.",
    );
    ui.add_space(8.0);
    ui.strong("How it works");
    ui.label(
        "Every interaction rebuilds the filter criteria and refilters the \
         table. The Model tab splits the filtered rows 80/20 with a fixed \
         seed, fits a boosted regressor on ln(price), evaluates RMSE / MAE / \
         R² on the held-out rows, and attributes each held-out prediction to \
         the individual features. Attributions are additive: baseline plus \
         per-feature contributions equals the raw prediction.",
    );
    ui.add_space(8.0);
    ui.strong("Data");
    ui.label(
        "Input files need area, bedrooms, energy_score, transport and price \
         columns (CSV, JSON or Parquet). Rows with a non-positive price are \
         excluded at load. The filtered view can be exported as CSV from the \
         side panel.",
    );
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open listings data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        match crate::data::loader::load_file(&path) {
            Ok(table) => {
                log::info!(
                    "loaded {} listings ({} transport categories) from {}",
                    table.len(),
                    table.transport_categories.len(),
                    path.display()
                );
                state.set_dataset(table, path);
            }
            Err(e) => {
                log::error!("failed to load file: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}

fn export_dialog(state: &mut AppState) {
    let Some(table) = &state.dataset else {
        return;
    };
    let file = rfd::FileDialog::new()
        .set_title("Export filtered listings")
        .add_filter("CSV", &["csv"])
        .set_file_name("milan_filtered.csv")
        .save_file();

    if let Some(path) = file {
        match crate::data::export::export_csv(&path, table, &state.visible_indices) {
            Ok(()) => {
                log::info!("exported {} rows to {}", state.visible_indices.len(), path.display());
                state.status_message = Some(format!(
                    "Exported {} rows to {}",
                    state.visible_indices.len(),
                    path.display()
                ));
            }
            Err(e) => {
                log::error!("export failed: {e}");
                state.status_message = Some(format!("Export failed: {e}"));
            }
        }
    }
}
