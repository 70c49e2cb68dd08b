use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Catalog, Cell, Listing};
use crate::error::Error;

/// Raw row: column name → cell.
type Row = BTreeMap<String, Cell>;

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listing catalog from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one listing per line (the usual export)
/// * `.json`    – `[{ "index": 0, "price": 11300, ... }, ...]`
/// * `.parquet` – flat columns of strings, ints, floats and bools
///
/// Every row is coerced into a [`Listing`]; the first malformed row aborts
/// the load so the pipeline never sees a partially valid table.
pub fn load_file(path: &Path) -> Result<Catalog, Error> {
    load_rows(path)
        .and_then(|rows| {
            let listings = rows
                .iter()
                .enumerate()
                .map(|(i, row)| Listing::from_cells(i, row))
                .collect::<Result<Vec<_>>>()?;
            Catalog::from_listings(listings)
        })
        .map(|catalog| {
            log::info!("loaded {} listings from {}", catalog.len(), path.display());
            catalog
        })
        .map_err(|err| Error::data_load(path, err))
}

fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, as written by
/// `df.to_csv()` with the identity column named `index`.
fn load_csv(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(name, value)| (name.clone(), csv_cell(value)))
            .collect();
        rows.push(row);
    }
    log::debug!("csv: {} rows, columns {:?}", rows.len(), headers);
    Ok(rows)
}

/// CSV carries no types. Cells stay text and are coerced per column later,
/// so a model key such as `0320` keeps its leading zero.
fn csv_cell(s: &str) -> Cell {
    let s = s.trim();
    if s.is_empty() {
        Cell::Null
    } else {
        Cell::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn load_json(path: &Path) -> Result<Vec<Row>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let obj = rec
                .as_object()
                .with_context(|| format!("Row {i} is not a JSON object"))?;
            Ok(obj
                .iter()
                .map(|(key, val)| (key.clone(), json_to_cell(val)))
                .collect())
        })
        .collect()
}

fn json_to_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::String(s) => Cell::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Cell::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Cell::Float(f)
            } else {
                Cell::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Cell::Bool(*b),
        JsonValue::Null => Cell::Null,
        other => Cell::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table. Works with files written by both **Pandas**
/// (`df.to_parquet()`) and **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Vec<Row>> {
    read_parquet(path, PARQUET_BATCH_SIZE)
}

const PARQUET_BATCH_SIZE: usize = 8192;

fn read_parquet(path: &Path, batch_size: usize) -> Result<Vec<Row>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder
        .with_batch_size(batch_size)
        .build()
        .context("building parquet reader")?;

    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();
        // row numbers are reported across the whole file, not per batch
        let offset = rows.len();

        for row in 0..batch.num_rows() {
            let mut cells = Row::new();
            for (col_idx, field) in schema.fields().iter().enumerate() {
                let value = extract_cell(batch.column(col_idx), row).with_context(|| {
                    format!("Row {}: column '{}'", offset + row, field.name())
                })?;
                cells.insert(field.name().clone(), value);
            }
            rows.push(cells);
        }
    }

    Ok(rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Result<Cell> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match col.data_type() {
        DataType::Utf8 => {
            let arr = col
                .as_any()
                .downcast_ref::<StringArray>()
                .context("expected StringArray")?;
            Cell::String(arr.value(row).to_string())
        }
        DataType::LargeUtf8 => Cell::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int32Array>()
                .context("expected Int32Array")?;
            Cell::Integer(i64::from(arr.value(row)))
        }
        DataType::Int64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Int64Array>()
                .context("expected Int64Array")?;
            Cell::Integer(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float32Array>()
                .context("expected Float32Array")?;
            Cell::Float(f64::from(arr.value(row)))
        }
        DataType::Float64 => {
            let arr = col
                .as_any()
                .downcast_ref::<Float64Array>()
                .context("expected Float64Array")?;
            Cell::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col
                .as_any()
                .downcast_ref::<BooleanArray>()
                .context("expected BooleanArray")?;
            Cell::Bool(arr.value(row))
        }
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use arrow::array::{ArrayRef, Date32Array};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    const HEADER: &str = "index,price,age,mileage,fuel,paint_color,car_type,model_key,\
feature_1,feature_2,feature_3,feature_4,feature_5,feature_6,feature_7,feature_8";

    fn write_parquet(path: &Path, fields: Vec<Field>, columns: Vec<ArrayRef>) {
        let schema = Arc::new(Schema::new(fields));
        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
    }

    #[test]
    fn loads_csv_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.csv");
        std::fs::write(
            &path,
            format!(
                "{HEADER}\n\
0,11300.0,4.5,81000,diesel,black,sedan,320,True,False,False,False,False,False,False,False\n\
1,9800,6,120000.5,petrol,white,estate,520,false,true,0,0,0,0,0,1\n"
            ),
        )
        .unwrap();

        let catalog = load_file(&path).unwrap();

        assert_eq!(catalog.len(), 2);
        let first = &catalog.listings()[0];
        assert_eq!(first.price, 11_300);
        assert_eq!(first.model_key, "320");
        assert!(first.features[0]);
        assert_eq!(catalog.listings()[1].mileage, 120_000.5);
        assert!(catalog.listings()[1].features[7]);
    }

    #[test]
    fn csv_categories_keep_their_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.csv");
        std::fs::write(
            &path,
            format!(
                "{HEADER}\n\
0,11300,4.5,81000,diesel,black,sedan,0320,0,0,0,0,0,0,0,0\n\
1,9800,6,120000,petrol,white,estate,1.50,0,0,0,0,0,0,0,0\n"
            ),
        )
        .unwrap();

        let catalog = load_file(&path).unwrap();

        assert_eq!(catalog.listings()[0].model_key, "0320");
        assert_eq!(catalog.listings()[1].model_key, "1.50");
        assert_eq!(catalog.listings()[0].price, 11_300);
    }

    #[test]
    fn malformed_row_fails_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            format!(
                "{HEADER}\n\
0,11300,4.5,81000,diesel,black,sedan,320,0,0,0,0,0,0,0,0\n\
1,n/a,6,120000,petrol,white,estate,520,0,0,0,0,0,0,0,0\n"
            ),
        )
        .unwrap();

        let err = load_file(&path).unwrap_err();

        assert!(matches!(err, Error::DataLoad { .. }));
        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(cause, "row 1: price 'n/a' is not a number");
    }

    #[test]
    fn loads_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.json");
        let mut record = serde_json::json!({
            "index": 5, "price": 15000, "age": 2.0, "mileage": 30000,
            "fuel": "hybrid_petrol", "paint_color": "blue", "car_type": "suv",
            "model_key": "X5",
        });
        for i in 1..=8 {
            record[format!("feature_{i}")] = serde_json::Value::Bool(i == 3);
        }
        std::fs::write(&path, serde_json::Value::Array(vec![record]).to_string()).unwrap();

        let catalog = load_file(&path).unwrap();

        assert_eq!(catalog.listings()[0].index, 5);
        assert_eq!(catalog.listings()[0].fuel, "hybrid_petrol");
        assert!(catalog.listings()[0].features[2]);
    }

    #[test]
    fn loads_parquet_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ok.parquet");
        let mut fields = vec![
            Field::new("index", DataType::Int64, false),
            Field::new("price", DataType::Float64, false),
            Field::new("age", DataType::Float64, false),
            Field::new("mileage", DataType::Int32, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(vec![0, 1])),
            Arc::new(Float64Array::from(vec![12_000.0, 8_000.0])),
            Arc::new(Float64Array::from(vec![1.0, 7.5])),
            Arc::new(Int32Array::from(vec![10_000, 150_000])),
        ];
        for (name, values) in [
            ("fuel", ["diesel", "petrol"]),
            ("paint_color", ["grey", "red"]),
            ("car_type", ["coupe", "convertible"]),
            ("model_key", ["M4", "Z4"]),
        ] {
            fields.push(Field::new(name, DataType::Utf8, false));
            columns.push(Arc::new(StringArray::from(values.to_vec())));
        }
        for i in 1..=8 {
            fields.push(Field::new(format!("feature_{i}"), DataType::Boolean, false));
            columns.push(Arc::new(BooleanArray::from(vec![true, false])));
        }
        write_parquet(&path, fields, columns);

        let catalog = load_file(&path).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.listings()[1].price, 8_000);
        assert_eq!(catalog.listings()[1].mileage, 150_000.0);
        assert_eq!(catalog.listings()[0].model_key, "M4");
        assert_eq!(catalog.listings()[0].features, [true; 8]);
    }

    #[test]
    fn parquet_errors_report_file_row_across_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dates.parquet");
        write_parquet(
            &path,
            vec![Field::new("registered", DataType::Date32, true)],
            vec![Arc::new(Date32Array::from(vec![None, None, Some(19_000)]))],
        );

        // two rows per batch puts the bad cell first in the second batch
        let err = read_parquet(&path, 2).unwrap_err();
        assert_eq!(err.to_string(), "Row 2: column 'registered'");
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = load_file(Path::new("cars.xlsx")).unwrap_err();
        let cause = std::error::Error::source(&err).unwrap().to_string();
        assert_eq!(cause, "Unsupported file extension: .xlsx");
    }
}
