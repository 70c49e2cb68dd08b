//! Write a synthetic catalog, schema and model so `car-picker` can be run
//! without the production artifacts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

use car_picker::data::model::{Listing, FEATURE_COUNT};
use car_picker::oracle::{Estimator, ModelArtifact, SchemaParams, TreeNode};

const FUELS: [&str; 3] = ["diesel", "petrol", "hybrid_petrol"];
const PAINTS: [&str; 5] = ["black", "grey", "white", "blue", "red"];
const TYPES: [&str; 5] = ["estate", "sedan", "suv", "hatchback", "convertible"];
const MODELS: [&str; 6] = ["118", "320", "520", "X1", "X3", "X5"];

const IMP_FEATURES: [&str; 7] = [
    "age",
    "mileage",
    "fuel_petrol",
    "car_type_suv",
    "paint_color_white",
    "feature_1",
    "feature_8",
];

#[derive(Debug, Parser)]
#[command(about = "Generate a sample catalog, params.json and regressor.json")]
struct Args {
    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Number of listings
    #[arg(long, default_value_t = 200)]
    rows: usize,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// splitmix64; reproducible per seed.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn pick<'a>(&mut self, values: &[&'a str]) -> &'a str {
        values[(self.next_u64() % values.len() as u64) as usize]
    }
}

/// The first rows walk through every value so each level the model
/// references is present; later rows draw at random.
fn cycle(i: usize, values: &[&str], rng: &mut SampleRng) -> String {
    match values.get(i) {
        Some(value) => value.to_string(),
        None => rng.pick(values).to_string(),
    }
}

fn generate_listing(i: usize, rng: &mut SampleRng) -> Listing {
    let age = (rng.unit() * 20.0 * 2.0).round() / 2.0;
    let mileage = (age * 9_000.0 + rng.unit() * 30_000.0).round();
    let car_type = cycle(i, &TYPES, rng);
    let base = if car_type == "suv" { 38_000.0 } else { 31_000.0 };
    let price = (base * 0.88_f64.powf(age) - mileage * 0.03).max(500.0);
    // round to the nearest 100 like a dealer would
    let price = (price / 100.0).round() as i64 * 100;

    let mut features = [false; FEATURE_COUNT];
    for flag in &mut features {
        *flag = rng.unit() < 0.4;
    }

    Listing {
        index: i as u64,
        price,
        age,
        mileage,
        fuel: cycle(i, &FUELS, rng),
        paint_color: cycle(i, &PAINTS, rng),
        car_type,
        model_key: cycle(i, &MODELS, rng),
        features,
    }
}

fn stump(feature: &str, threshold: f64, left: f64, right: f64) -> TreeNode {
    let feature_idx = IMP_FEATURES
        .iter()
        .position(|f| *f == feature)
        .unwrap_or_default();
    TreeNode::Split {
        feature_idx,
        threshold,
        left: Box::new(TreeNode::Leaf { value: left }),
        right: Box::new(TreeNode::Leaf { value: right }),
    }
}

/// Hand-shaped boosted stumps: depreciation by age and mileage, premiums
/// for petrol, SUVs, white paint and features 1 and 8.
fn sample_model() -> ModelArtifact {
    let mut trees = Vec::new();
    for (threshold, drop) in [(1.0, 40_000.0), (3.0, 30_000.0), (6.0, 25_000.0), (10.0, 20_000.0)] {
        trees.push(stump("age", threshold, 0.0, -drop));
    }
    for (threshold, drop) in [(30_000.0, 15_000.0), (80_000.0, 15_000.0), (150_000.0, 10_000.0)] {
        trees.push(stump("mileage", threshold, 0.0, -drop));
    }
    trees.push(stump("fuel_petrol", 0.5, 0.0, 8_000.0));
    trees.push(stump("car_type_suv", 0.5, 0.0, 25_000.0));
    trees.push(stump("paint_color_white", 0.5, 0.0, 4_000.0));
    trees.push(stump("feature_1", 0.5, 0.0, 6_000.0));
    trees.push(stump("feature_8", 0.5, 0.0, 5_000.0));

    ModelArtifact {
        features: IMP_FEATURES.iter().map(|f| f.to_string()).collect(),
        estimator: Estimator::GradientBoosting {
            init: 24_000.0,
            learning_rate: 0.1,
            trees,
        },
    }
}

fn write_csv(path: &Path, listings: &[Listing]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    let mut header = vec![
        "index".to_string(),
        "price".into(),
        "age".into(),
        "mileage".into(),
        "fuel".into(),
        "paint_color".into(),
        "car_type".into(),
        "model_key".into(),
    ];
    header.extend((1..=FEATURE_COUNT).map(|i| format!("feature_{i}")));
    writer.write_record(&header)?;

    for l in listings {
        let mut record = vec![
            l.index.to_string(),
            l.price.to_string(),
            format!("{:.1}", l.age),
            format!("{:.1}", l.mileage),
            l.fuel.clone(),
            l.paint_color.clone(),
            l.car_type.clone(),
            l.model_key.clone(),
        ];
        // pandas spelling
        record.extend(
            l.features
                .iter()
                .map(|&f| String::from(if f { "True" } else { "False" })),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn text_column(listings: &[Listing], f: impl Fn(&Listing) -> &str) -> ArrayRef {
    Arc::new(StringArray::from_iter_values(listings.iter().map(f)))
}

fn write_parquet(path: &Path, listings: &[Listing]) -> Result<()> {
    let mut fields = vec![
        Field::new("index", DataType::Int64, false),
        Field::new("price", DataType::Int64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("mileage", DataType::Float64, false),
        Field::new("fuel", DataType::Utf8, false),
        Field::new("paint_color", DataType::Utf8, false),
        Field::new("car_type", DataType::Utf8, false),
        Field::new("model_key", DataType::Utf8, false),
    ];
    let mut columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from_iter_values(
            listings.iter().map(|l| l.index as i64),
        )),
        Arc::new(Int64Array::from_iter_values(listings.iter().map(|l| l.price))),
        Arc::new(Float64Array::from_iter_values(listings.iter().map(|l| l.age))),
        Arc::new(Float64Array::from_iter_values(
            listings.iter().map(|l| l.mileage),
        )),
        text_column(listings, |l| l.fuel.as_str()),
        text_column(listings, |l| l.paint_color.as_str()),
        text_column(listings, |l| l.car_type.as_str()),
        text_column(listings, |l| l.model_key.as_str()),
    ];
    for i in 0..FEATURE_COUNT {
        fields.push(Field::new(format!("feature_{}", i + 1), DataType::Boolean, false));
        columns.push(Arc::new(BooleanArray::from(
            listings.iter().map(|l| l.features[i]).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;

    let mut rng = SampleRng(args.seed);
    let rows = args.rows.max(TYPES.len().max(PAINTS.len()).max(MODELS.len()));
    let listings: Vec<Listing> = (0..rows).map(|i| generate_listing(i, &mut rng)).collect();

    write_csv(&args.out.join("data_clipped.csv"), &listings)?;
    write_parquet(&args.out.join("data_clipped.parquet"), &listings)?;

    let params = SchemaParams {
        numerical_cols: vec!["age".into(), "mileage".into()],
        imp_features: IMP_FEATURES.iter().map(|f| f.to_string()).collect(),
    };
    std::fs::write(
        args.out.join("params.json"),
        serde_json::to_string_pretty(&params)?,
    )?;
    std::fs::write(
        args.out.join("regressor.json"),
        serde_json::to_string_pretty(&sample_model())?,
    )?;

    println!("Wrote {rows} listings, params.json and regressor.json to {}", args.out.display());
    Ok(())
}
