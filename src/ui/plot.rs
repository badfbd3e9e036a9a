use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Plot, PlotPoints, Points};

use crate::model::explain::AttributionSet;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Price histogram (Explore tab)
// ---------------------------------------------------------------------------

const HISTOGRAM_BINS: usize = 25;

/// Render the price distribution of the filtered listings.
pub fn price_histogram(ui: &mut Ui, state: &AppState) {
    let prices: Vec<f64> = state.visible_listings().map(|l| l.price).collect();
    if prices.is_empty() {
        ui.label("No listings match the current filters.");
        return;
    }

    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let width = if (max - min).abs() < f64::EPSILON {
        1.0
    } else {
        (max - min) / HISTOGRAM_BINS as f64
    };

    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for &p in &prices {
        let bin = (((p - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            Bar::new(min + (i as f64 + 0.5) * width, count as f64).width(width * 0.95)
        })
        .collect();

    Plot::new("price_histogram")
        .x_axis_label("Price (€)")
        .y_axis_label("Listings")
        .height(300.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(bars)
                    .color(Color32::LIGHT_BLUE)
                    .name("listings"),
            );
        });
}

// ---------------------------------------------------------------------------
// Global importance (Model tab)
// ---------------------------------------------------------------------------

/// Render the mean-|contribution| ranking as a bar chart plus a readable list.
pub fn importance_section(ui: &mut Ui, attributions: &AttributionSet) {
    let ranking = attributions.global_importance();
    if ranking.is_empty() {
        ui.label("No evaluation rows to attribute.");
        return;
    }

    ui.horizontal(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            for (rank, (name, value)) in ranking.iter().enumerate() {
                ui.label(format!("{}. {name}  —  {value:.4}", rank + 1));
            }
        });

        let bars: Vec<Bar> = ranking
            .iter()
            .enumerate()
            .map(|(i, (name, value))| Bar::new(i as f64, *value).width(0.6).name(name))
            .collect();

        Plot::new("importance_chart")
            .y_axis_label("mean |contribution|")
            .height(220.0)
            .show_x(false)
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE));
            });
    });
}

// ---------------------------------------------------------------------------
// Dependence scatter (Model tab)
// ---------------------------------------------------------------------------

/// Scatter of (feature value, contribution) over the evaluation rows for the
/// selected feature. Transport points are coloured per category.
pub fn dependence_plot(ui: &mut Ui, state: &AppState, attributions: &AttributionSet) {
    let feature = state.dependence_feature.clone();
    let pairs = attributions.dependence(&feature);
    if pairs.is_empty() {
        ui.label("No evaluation rows to plot.");
        return;
    }

    let plot = Plot::new("dependence_plot")
        .legend(Legend::default())
        .x_axis_label(feature.clone())
        .y_axis_label("Contribution to ln(price)")
        .height(300.0);

    if feature == "transport" {
        let Some(table) = &state.dataset else {
            return;
        };
        let feature_idx = attributions
            .feature_names
            .iter()
            .position(|n| n == "transport");
        let Some(feature_idx) = feature_idx else {
            return;
        };

        plot.show(ui, |plot_ui| {
            for category in &table.transport_categories {
                let points: PlotPoints = attributions
                    .rows
                    .iter()
                    .filter(|r| table.listings[r.row].transport == *category)
                    .map(|r| [r.feature_values[feature_idx], r.contributions[feature_idx]])
                    .collect();
                plot_ui.points(
                    Points::new(points)
                        .radius(3.0)
                        .color(state.color_map.color_for(category))
                        .name(category),
                );
            }
        });
    } else {
        let points: PlotPoints = pairs.iter().map(|&(x, y)| [x, y]).collect();
        plot.show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(points)
                    .radius(3.0)
                    .color(Color32::LIGHT_BLUE)
                    .name(feature),
            );
        });
    }
}
