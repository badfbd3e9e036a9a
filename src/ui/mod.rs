/// UI layer: renders `AppState` into egui panels and charts. No pipeline
/// logic lives here; everything is computed in `state` / `data` / `model`.
pub mod map_view;
pub mod panels;
pub mod plot;
