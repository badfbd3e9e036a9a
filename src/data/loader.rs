use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::table::{Listing, ListingTable};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Column detection
// ---------------------------------------------------------------------------

// Source files come from several export paths, so each logical column accepts
// a short list of header spellings. The first match wins; no match fails fast.
const AREA_COLUMNS: &[&str] = &["area", "Area", "area_m2", "sqm"];
const BEDROOM_COLUMNS: &[&str] = &["bedrooms", "Bedrooms", "bedroom", "Bedroom", "beds"];
const ENERGY_COLUMNS: &[&str] = &["energy_score", "Energy_score", "energy", "EnergyScore"];
const TRANSPORT_COLUMNS: &[&str] = &["transport", "Transport", "transport_category"];
const PRICE_COLUMNS: &[&str] = &["price", "Price"];

fn pick_column(
    headers: &[String],
    candidates: &[&str],
    logical: &str,
) -> Result<usize, PipelineError> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
        .ok_or_else(|| {
            PipelineError::data_format(format!(
                "missing required column '{logical}' (accepted names: {})",
                candidates.join(", ")
            ))
        })
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listing table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with area / bedrooms / energy_score / transport / price
/// * `.json`    – `[{ "area": 72.0, "bedrooms": 2, ... }, ...]`
/// * `.parquet` – same columns as flat scalar fields
///
/// Rows with a non-positive price are invalid and excluded (counted in the
/// log). A blank energy score is kept as NaN; every other unparsable cell is
/// a [`PipelineError::DataFormat`]. Same file → same table.
pub fn load_file(path: &Path) -> Result<ListingTable, PipelineError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let (listings, excluded) = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => {
            return Err(PipelineError::data_format(format!(
                "unsupported file extension: .{other}"
            )))
        }
    };

    if excluded > 0 {
        log::warn!("excluded {excluded} rows with non-positive price");
    }
    Ok(ListingTable::from_listings(listings))
}

// ---------------------------------------------------------------------------
// Row assembly shared by all formats
// ---------------------------------------------------------------------------

/// One row's raw cell values before schema validation.
struct RawRow {
    area: f64,
    bedrooms: f64,
    /// NaN when the source cell is blank.
    energy_score: f64,
    transport: String,
    price: f64,
}

/// Validate a raw row. `Ok(None)` marks a row excluded for non-positive price.
fn build_listing(row_no: usize, raw: RawRow) -> Result<Option<Listing>, PipelineError> {
    if !raw.area.is_finite() || raw.area <= 0.0 {
        return Err(PipelineError::data_format(format!(
            "row {row_no}: 'area' must be a positive number, got {}",
            raw.area
        )));
    }
    if !raw.bedrooms.is_finite() || raw.bedrooms < 0.0 || raw.bedrooms.fract() != 0.0 {
        return Err(PipelineError::data_format(format!(
            "row {row_no}: 'bedrooms' must be a non-negative integer, got {}",
            raw.bedrooms
        )));
    }
    let transport = raw.transport.trim().to_string();
    if transport.is_empty() {
        return Err(PipelineError::data_format(format!(
            "row {row_no}: 'transport' is empty"
        )));
    }
    if !raw.price.is_finite() {
        return Err(PipelineError::data_format(format!(
            "row {row_no}: 'price' is not a number"
        )));
    }
    if raw.price <= 0.0 {
        // ln(price) would be undefined; an invalid listing, not a file defect.
        return Ok(None);
    }

    Ok(Some(Listing {
        area: raw.area,
        bedrooms: raw.bedrooms as u32,
        energy_score: raw.energy_score,
        transport,
        price: raw.price,
        ln_price: raw.price.ln(),
    }))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<(Vec<Listing>, usize), PipelineError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| PipelineError::data_format(format!("opening CSV: {e}")))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PipelineError::data_format(format!("reading CSV headers: {e}")))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let area_idx = pick_column(&headers, AREA_COLUMNS, "area")?;
    let bedrooms_idx = pick_column(&headers, BEDROOM_COLUMNS, "bedrooms")?;
    let energy_idx = pick_column(&headers, ENERGY_COLUMNS, "energy_score")?;
    let transport_idx = pick_column(&headers, TRANSPORT_COLUMNS, "transport")?;
    let price_idx = pick_column(&headers, PRICE_COLUMNS, "price")?;

    let mut listings = Vec::new();
    let mut excluded = 0usize;

    for (row_no, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| PipelineError::data_format(format!("CSV row {row_no}: {e}")))?;

        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let raw = RawRow {
            area: parse_f64(cell(area_idx), row_no, "area")?,
            bedrooms: parse_f64(cell(bedrooms_idx), row_no, "bedrooms")?,
            energy_score: parse_optional_f64(cell(energy_idx), row_no, "energy_score")?,
            transport: cell(transport_idx).to_string(),
            price: parse_f64(cell(price_idx), row_no, "price")?,
        };

        match build_listing(row_no, raw)? {
            Some(listing) => listings.push(listing),
            None => excluded += 1,
        }
    }

    Ok((listings, excluded))
}

fn parse_f64(s: &str, row: usize, col: &str) -> Result<f64, PipelineError> {
    s.parse::<f64>().map_err(|_| {
        PipelineError::data_format(format!("row {row}, column '{col}': '{s}' is not a number"))
    })
}

/// Blank cells are allowed and become NaN; anything else must parse.
fn parse_optional_f64(s: &str, row: usize, col: &str) -> Result<f64, PipelineError> {
    if s.is_empty() {
        Ok(f64::NAN)
    } else {
        parse_f64(s, row, col)
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "area": 72.0, "bedrooms": 2, "energy_score": 6.5,
///     "transport": "metro", "price": 385000.0 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<(Vec<Listing>, usize), PipelineError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::data_format(format!("reading JSON file: {e}")))?;
    let root: JsonValue = serde_json::from_str(&text)
        .map_err(|e| PipelineError::data_format(format!("parsing JSON: {e}")))?;

    let records = root
        .as_array()
        .ok_or_else(|| PipelineError::data_format("expected top-level JSON array"))?;

    let mut listings = Vec::with_capacity(records.len());
    let mut excluded = 0usize;

    for (row_no, rec) in records.iter().enumerate() {
        let obj = rec.as_object().ok_or_else(|| {
            PipelineError::data_format(format!("row {row_no} is not a JSON object"))
        })?;

        let field = |candidates: &[&str]| candidates.iter().find_map(|c| obj.get(*c));

        let raw = RawRow {
            area: json_f64(field(AREA_COLUMNS), row_no, "area")?,
            bedrooms: json_f64(field(BEDROOM_COLUMNS), row_no, "bedrooms")?,
            energy_score: match field(ENERGY_COLUMNS) {
                None | Some(JsonValue::Null) => f64::NAN,
                other => json_f64(other, row_no, "energy_score")?,
            },
            transport: field(TRANSPORT_COLUMNS)
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    PipelineError::data_format(format!(
                        "row {row_no}: missing or non-string 'transport'"
                    ))
                })?
                .to_string(),
            price: json_f64(field(PRICE_COLUMNS), row_no, "price")?,
        };

        match build_listing(row_no, raw)? {
            Some(listing) => listings.push(listing),
            None => excluded += 1,
        }
    }

    Ok((listings, excluded))
}

fn json_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<f64, PipelineError> {
    val.and_then(|v| v.as_f64()).ok_or_else(|| {
        PipelineError::data_format(format!("row {row}: missing or non-numeric '{col}'"))
    })
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar listing columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); numeric columns may be 32- or 64-bit.
fn load_parquet(path: &Path) -> Result<(Vec<Listing>, usize), PipelineError> {
    let file = std::fs::File::open(path)
        .map_err(|e| PipelineError::data_format(format!("opening parquet file: {e}")))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| PipelineError::data_format(format!("reading parquet metadata: {e}")))?;
    let reader = builder
        .build()
        .map_err(|e| PipelineError::data_format(format!("building parquet reader: {e}")))?;

    let mut listings = Vec::new();
    let mut excluded = 0usize;
    let mut row_no = 0usize;

    for batch_result in reader {
        let batch = batch_result
            .map_err(|e| PipelineError::data_format(format!("reading parquet batch: {e}")))?;
        let headers: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();

        let area_idx = pick_column(&headers, AREA_COLUMNS, "area")?;
        let bedrooms_idx = pick_column(&headers, BEDROOM_COLUMNS, "bedrooms")?;
        let energy_idx = pick_column(&headers, ENERGY_COLUMNS, "energy_score")?;
        let transport_idx = pick_column(&headers, TRANSPORT_COLUMNS, "transport")?;
        let price_idx = pick_column(&headers, PRICE_COLUMNS, "price")?;

        for row in 0..batch.num_rows() {
            let raw = RawRow {
                area: scalar_f64(batch.column(area_idx), row)
                    .ok_or_else(|| bad_cell(row_no, "area"))?,
                bedrooms: scalar_f64(batch.column(bedrooms_idx), row)
                    .ok_or_else(|| bad_cell(row_no, "bedrooms"))?,
                energy_score: scalar_f64(batch.column(energy_idx), row).unwrap_or(f64::NAN),
                transport: scalar_string(batch.column(transport_idx), row)
                    .ok_or_else(|| bad_cell(row_no, "transport"))?,
                price: scalar_f64(batch.column(price_idx), row)
                    .ok_or_else(|| bad_cell(row_no, "price"))?,
            };

            match build_listing(row_no, raw)? {
                Some(listing) => listings.push(listing),
                None => excluded += 1,
            }
            row_no += 1;
        }
    }

    Ok((listings, excluded))
}

fn bad_cell(row: usize, col: &str) -> PipelineError {
    PipelineError::data_format(format!("row {row}: missing or mistyped '{col}'"))
}

// -- Parquet / Arrow helpers --

/// Extract a numeric scalar from an Arrow column, widening 32-bit and integer
/// types. `None` for nulls and non-numeric columns.
fn scalar_f64(col: &Arc<dyn Array>, row: usize) -> Option<f64> {
    if col.is_null(row) {
        return None;
    }
    match col.data_type() {
        DataType::Float64 => col
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|a| a.value(row)),
        DataType::Float32 => col
            .as_any()
            .downcast_ref::<Float32Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int64 => col
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|a| a.value(row) as f64),
        DataType::Int32 => col
            .as_any()
            .downcast_ref::<Int32Array>()
            .map(|a| a.value(row) as f64),
        _ => None,
    }
}

/// Extract a string scalar from an Arrow Utf8 column.
fn scalar_string(col: &Arc<dyn Array>, row: usize) -> Option<String> {
    if col.is_null(row) {
        return None;
    }
    col.as_any()
        .downcast_ref::<StringArray>()
        .map(|a| a.value(row).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("create temp csv");
        file.write_all(contents.as_bytes()).expect("write temp csv");
        file.into_temp_path()
    }

    #[test]
    fn csv_happy_path_derives_ln_price() {
        let path = write_csv(
            "area,bedrooms,energy_score,transport,price\n\
             72.0,2,6.5,metro,385000\n\
             45.5,1,3.0,bus,210000\n",
        );
        let table = load_file(&path).expect("load");
        assert_eq!(table.len(), 2);
        let first = &table.listings[0];
        assert_eq!(first.bedrooms, 2);
        assert!((first.ln_price - 385000.0_f64.ln()).abs() < 1e-12);
        assert_eq!(table.transport_categories.len(), 2);
    }

    #[test]
    fn alternate_headers_are_accepted() {
        let path = write_csv(
            "Area,Bedroom,Energy_score,Transport,Price\n\
             80.0,3,5.0,tram,420000\n",
        );
        let table = load_file(&path).expect("load");
        assert_eq!(table.len(), 1);
        assert_eq!(table.listings[0].transport, "tram");
    }

    #[test]
    fn missing_column_is_a_data_format_error() {
        let path = write_csv("area,bedrooms,energy_score,transport\n72.0,2,6.5,metro\n");
        let err = load_file(&path).unwrap_err();
        match err {
            PipelineError::DataFormat(msg) => assert!(msg.contains("price"), "{msg}"),
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn non_positive_price_rows_are_excluded() {
        let path = write_csv(
            "area,bedrooms,energy_score,transport,price\n\
             72.0,2,6.5,metro,385000\n\
             50.0,1,4.0,bus,0\n\
             60.0,2,5.0,bus,-5\n",
        );
        let table = load_file(&path).expect("load");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn blank_energy_score_loads_as_nan() {
        let path = write_csv(
            "area,bedrooms,energy_score,transport,price\n\
             72.0,2,,metro,385000\n",
        );
        let table = load_file(&path).expect("load");
        assert!(table.listings[0].energy_score.is_nan());
    }

    #[test]
    fn unparsable_cell_names_row_and_column() {
        let path = write_csv(
            "area,bedrooms,energy_score,transport,price\n\
             seventy,2,6.5,metro,385000\n",
        );
        let err = load_file(&path).unwrap_err();
        match err {
            PipelineError::DataFormat(msg) => {
                assert!(msg.contains("row 0") && msg.contains("area"), "{msg}")
            }
            other => panic!("expected DataFormat, got {other:?}"),
        }
    }

    #[test]
    fn json_and_csv_flavors_load_the_same_table() {
        let csv_path = write_csv(
            "area,bedrooms,energy_score,transport,price\n\
             72.0,2,6.5,metro,385000\n\
             45.5,1,3.0,bus,210000\n",
        );
        let mut json_file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("create temp json");
        json_file
            .write_all(
                br#"[
                  {"area": 72.0, "bedrooms": 2, "energy_score": 6.5, "transport": "metro", "price": 385000.0},
                  {"area": 45.5, "bedrooms": 1, "energy_score": 3.0, "transport": "bus", "price": 210000.0}
                ]"#,
            )
            .expect("write temp json");
        let json_path = json_file.into_temp_path();

        let from_csv = load_file(&csv_path).expect("csv");
        let from_json = load_file(&json_path).expect("json");
        assert_eq!(from_csv.listings, from_json.listings);
    }
}
