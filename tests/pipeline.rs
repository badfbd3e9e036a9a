//! End-to-end checks over the filter → split → train → explain pipeline.

use casaviz::data::filter::{self, FilterCriteria, RangeFilter};
use casaviz::data::table::{Listing, ListingTable};
use casaviz::error::PipelineError;
use casaviz::model;

/// Deterministic 200-row dataset with a planted price structure so the
/// booster has real signal to fit and attribute.
fn milan_table() -> ListingTable {
    let transports = ["bus", "metro", "none", "tram"];
    let listings = (0..200)
        .map(|i| {
            let bedrooms = 1 + (i % 4) as u32;
            let area = 30.0 + 22.0 * bedrooms as f64 + (i % 17) as f64;
            let energy = 1.0 + (i % 10) as f64;
            let transport = transports[(i / 3) % transports.len()];
            let multiplier = match transport {
                "metro" => 1.25,
                "tram" => 1.12,
                "bus" => 1.05,
                _ => 1.0,
            };
            // Deterministic wobble stands in for noise.
            let wobble = 1.0 + 0.03 * ((i * 7 % 11) as f64 - 5.0) / 5.0;
            let price =
                (2_600.0 * area + 18_000.0 * bedrooms as f64 + 7_500.0 * energy)
                    * multiplier
                    * wobble;
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

fn all_indices(table: &ListingTable) -> Vec<usize> {
    (0..table.len()).collect()
}

#[test]
fn bedroom_filter_keeps_only_matching_rows() {
    let table = milan_table();
    let criteria = FilterCriteria {
        bedrooms: Some(RangeFilter::new(3.0, 3.0).unwrap()),
        ..FilterCriteria::default()
    };
    let indices = filter::apply(&table, &criteria).expect("apply");
    assert!(!indices.is_empty());
    for &i in &indices {
        assert_eq!(table.listings[i].bedrooms, 3);
    }
}

#[test]
fn empty_filter_result_reports_insufficient_data_instead_of_crashing() {
    let table = milan_table();
    // No listing has 9 bedrooms.
    let criteria = FilterCriteria {
        bedrooms: Some(RangeFilter::new(9.0, 9.0).unwrap()),
        ..FilterCriteria::default()
    };
    let indices = filter::apply(&table, &criteria).expect("apply");
    assert!(indices.is_empty());

    match model::run(&table, &indices) {
        Err(PipelineError::InsufficientData(_)) => {}
        other => panic!("expected InsufficientData, got {:?}", other.err()),
    }
}

#[test]
fn repeated_runs_produce_identical_metrics() {
    let table = milan_table();
    let indices = all_indices(&table);
    let a = model::run(&table, &indices).expect("first run");
    let b = model::run(&table, &indices).expect("second run");
    assert_eq!(a.metrics, b.metrics);
    assert_eq!(a.n_train, b.n_train);
    assert_eq!(a.n_test, b.n_test);
}

#[test]
fn split_sizes_are_about_eighty_twenty() {
    let table = milan_table();
    let run = model::run(&table, &all_indices(&table)).expect("run");
    assert_eq!(run.n_train + run.n_test, 200);
    let expected_test = (200.0 * 0.2_f64).round() as isize;
    assert!((run.n_test as isize - expected_test).abs() <= 1);
}

#[test]
fn attributions_are_additive_per_row() {
    let table = milan_table();
    let run = model::run(&table, &all_indices(&table)).expect("run");
    let attr = &run.attributions;
    assert_eq!(attr.rows.len(), run.n_test);

    for row in &attr.rows {
        let total: f64 = attr.baseline + row.contributions.iter().sum::<f64>();
        assert!(
            (total - row.prediction).abs() < 1e-3,
            "row {}: baseline {} + contributions {:?} = {total}, prediction {}",
            row.row,
            attr.baseline,
            row.contributions,
            row.prediction
        );
    }
}

#[test]
fn importance_ranking_is_invariant_under_row_reordering() {
    let table = milan_table();
    let run = model::run(&table, &all_indices(&table)).expect("run");
    let ranking = run.attributions.global_importance();
    assert_eq!(ranking.len(), 4);

    let mut reordered = run.attributions.clone();
    reordered.rows.reverse();
    assert_eq!(ranking, reordered.global_importance());
}

#[test]
fn model_fits_the_planted_structure_reasonably_well() {
    let table = milan_table();
    let run = model::run(&table, &all_indices(&table)).expect("run");
    // ln_price spans roughly 12.1–13.6 here; a fitted booster should easily
    // beat the constant predictor on held-out rows.
    assert!(run.metrics.r2 > 0.5, "r2 = {}", run.metrics.r2);
    assert!(run.metrics.rmse < 0.3, "rmse = {}", run.metrics.rmse);
}

#[test]
fn filtered_training_still_covers_every_selected_row() {
    let table = milan_table();
    let criteria = FilterCriteria {
        bedrooms: Some(RangeFilter::new(2.0, 4.0).unwrap()),
        ..FilterCriteria::default()
    };
    let indices = filter::apply(&table, &criteria).expect("apply");
    let run = model::run(&table, &indices).expect("run");
    assert_eq!(run.n_train + run.n_test + run.n_dropped, indices.len());
    // All evaluation rows come from the filtered view.
    for row in &run.attributions.rows {
        assert!(indices.contains(&row.row));
    }
}
