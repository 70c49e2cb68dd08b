use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::data::model::FEATURE_COUNT;
use crate::rank::Candidate;

// ---------------------------------------------------------------------------
// Ranked table (central panel)
// ---------------------------------------------------------------------------

/// Arrow batch of the ranked candidates, one row per car, best first.
pub fn ranked_batch(ranked: &[Candidate]) -> Result<RecordBatch> {
    let mut fields = vec![
        Field::new("rank", DataType::UInt64, false),
        Field::new("index", DataType::UInt64, false),
        Field::new("model_key", DataType::Utf8, false),
        Field::new("price", DataType::Int64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("mileage", DataType::Float64, false),
        Field::new("fuel", DataType::Utf8, false),
        Field::new("paint_color", DataType::Utf8, false),
        Field::new("car_type", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(1..=ranked.len() as u64)),
        Arc::new(UInt64Array::from_iter_values(
            ranked.iter().map(|c| c.listing.index),
        )),
        Arc::new(StringArray::from_iter_values(
            ranked.iter().map(|c| c.listing.model_key.as_str()),
        )),
        Arc::new(Int64Array::from_iter_values(
            ranked.iter().map(|c| c.listing.price),
        )),
        Arc::new(Float64Array::from_iter_values(
            ranked.iter().map(|c| c.listing.age),
        )),
        Arc::new(Float64Array::from_iter_values(
            ranked.iter().map(|c| c.listing.mileage),
        )),
        Arc::new(StringArray::from_iter_values(
            ranked.iter().map(|c| c.listing.fuel.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            ranked.iter().map(|c| c.listing.paint_color.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            ranked.iter().map(|c| c.listing.car_type.as_str()),
        )),
    ];

    for i in 0..FEATURE_COUNT {
        fields.push(Field::new(format!("feature_{}", i + 1), DataType::Boolean, false));
        columns.push(Arc::new(BooleanArray::from(
            ranked
                .iter()
                .map(|c| c.listing.features[i])
                .collect::<Vec<_>>(),
        )));
    }

    fields.push(Field::new("resale_price", DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from_iter_values(
        ranked.iter().map(|c| c.resale_price),
    )));
    fields.push(Field::new("profit", DataType::Int64, false));
    columns.push(Arc::new(Int64Array::from_iter_values(
        ranked.iter().map(|c| c.profit),
    )));

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .context("building ranked table")
}

/// Render the ranked candidates as a boxed text table.
pub fn ranked_table(ranked: &[Candidate]) -> Result<String> {
    let batch = ranked_batch(ranked)?;
    let table = pretty_format_batches(&[batch]).context("formatting ranked table")?;
    Ok(table.to_string())
}
