use eframe::egui::{self, Ui};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Precomputed map artifact (Explore tab)
// ---------------------------------------------------------------------------

/// Pre-rendered area map expected next to the dataset file. Generated
/// offline; this app only displays it.
pub const MAP_FILE: &str = "milan_area_map.png";

/// Render the pre-rendered Milan area map, or an informational note when the
/// artifact is absent. Never an error: the map is optional.
pub fn map_panel(ui: &mut Ui, state: &AppState) {
    ui.strong("Milan map");

    let Some(dir) = state.dataset_path.as_deref().and_then(|p| p.parent()) else {
        ui.label("Load a dataset to locate the map artifact.");
        return;
    };

    let path = dir.join(MAP_FILE);
    if path.is_file() {
        ui.add(
            egui::Image::from_uri(format!("file://{}", path.display()))
                .max_width(ui.available_width())
                .max_height(560.0)
                .rounding(4.0),
        );
        ui.weak(format!("Rendered from {MAP_FILE}"));
    } else {
        ui.label(format!("Map file not found: {}", path.display()));
    }
}
