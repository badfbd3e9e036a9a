use std::io::Write;
use std::path::Path;

use super::table::ListingTable;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Filtered-view CSV export
// ---------------------------------------------------------------------------

const EXPORT_HEADERS: [&str; 6] = [
    "area",
    "bedrooms",
    "energy_score",
    "transport",
    "price",
    "ln_price",
];

/// Write the filtered view as CSV: exactly the rows in `indices`, in order,
/// with the declared schema columns. A missing energy score exports as an
/// empty field so the file round-trips through the loader.
pub fn write_csv<W: Write>(
    writer: W,
    table: &ListingTable,
    indices: &[usize],
) -> Result<(), PipelineError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(EXPORT_HEADERS)
        .map_err(|e| PipelineError::data_format(format!("writing CSV header: {e}")))?;

    for &idx in indices {
        let l = &table.listings[idx];
        let energy = if l.energy_score.is_nan() {
            String::new()
        } else {
            l.energy_score.to_string()
        };
        out.write_record([
            l.area.to_string(),
            l.bedrooms.to_string(),
            energy,
            l.transport.clone(),
            l.price.to_string(),
            l.ln_price.to_string(),
        ])
        .map_err(|e| PipelineError::data_format(format!("writing CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| PipelineError::data_format(format!("flushing CSV: {e}")))?;
    Ok(())
}

/// Export the filtered view to a file.
pub fn export_csv(
    path: &Path,
    table: &ListingTable,
    indices: &[usize],
) -> Result<(), PipelineError> {
    let file = std::fs::File::create(path)
        .map_err(|e| PipelineError::data_format(format!("creating export file: {e}")))?;
    write_csv(file, table, indices)
}
