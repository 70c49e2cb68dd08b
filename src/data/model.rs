use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Number of optional boolean equipment flags per listing.
pub const FEATURE_COUNT: usize = 8;

// ---------------------------------------------------------------------------
// Cell – a single raw value read from a catalog file
// ---------------------------------------------------------------------------

/// A loosely-typed cell as it comes out of CSV / JSON / Parquet, before the
/// row is coerced into a [`Listing`].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::String(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl Cell {
    /// Interpret the cell as a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Float(v) => *v,
            Cell::Integer(i) => *i as f64,
            Cell::String(s) => s.trim().parse::<f64>().ok()?,
            Cell::Bool(_) | Cell::Null => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Integer coercion with truncation toward zero for fractional values.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Integer(i) => return Some(*i),
            Cell::String(s) => {
                if let Ok(i) = s.trim().parse::<i64>() {
                    return Some(i);
                }
            }
            _ => {}
        }
        let v = self.as_f64()?.trunc();
        (v >= i64::MIN as f64 && v <= i64::MAX as f64).then_some(v as i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Integer(0) => Some(false),
            Cell::Integer(1) => Some(true),
            Cell::String(s) => match s.trim() {
                "true" | "True" | "TRUE" | "1" | "yes" => Some(true),
                "false" | "False" | "FALSE" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Categorical text. Numbers are rendered as-is so a numeric model key
    /// such as `320` survives.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Listing – one car of the catalog
// ---------------------------------------------------------------------------

/// Categorical columns of a listing, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoricalColumn {
    Fuel,
    PaintColor,
    CarType,
    ModelKey,
}

impl CategoricalColumn {
    pub const ALL: [CategoricalColumn; 4] = [
        CategoricalColumn::Fuel,
        CategoricalColumn::PaintColor,
        CategoricalColumn::CarType,
        CategoricalColumn::ModelKey,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalColumn::Fuel => "fuel",
            CategoricalColumn::PaintColor => "paint_color",
            CategoricalColumn::CarType => "car_type",
            CategoricalColumn::ModelKey => "model_key",
        }
    }
}

/// Numeric columns a listing carries (the index is an identity, not a feature).
pub const NUMERIC_COLUMNS: [&str; 3] = ["price", "age", "mileage"];

/// A single used-car listing. Never mutated once loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub index: u64,
    pub price: i64,
    pub age: f64,
    pub mileage: f64,
    pub fuel: String,
    pub paint_color: String,
    pub car_type: String,
    pub model_key: String,
    pub features: [bool; FEATURE_COUNT],
}

impl Listing {
    pub fn category(&self, column: CategoricalColumn) -> &str {
        match column {
            CategoricalColumn::Fuel => &self.fuel,
            CategoricalColumn::PaintColor => &self.paint_color,
            CategoricalColumn::CarType => &self.car_type,
            CategoricalColumn::ModelKey => &self.model_key,
        }
    }

    /// Coerce a raw row into a listing, failing on the first bad field.
    pub fn from_cells(row: usize, cells: &BTreeMap<String, Cell>) -> Result<Self> {
        let cell = |name: &str| {
            cells
                .get(name)
                .with_context(|| format!("row {row}: missing column '{name}'"))
        };
        let number = |name: &str| -> Result<f64> {
            let value = cell(name)?;
            value
                .as_f64()
                .with_context(|| format!("row {row}: {name} '{value}' is not a number"))
        };
        let text = |name: &str| -> Result<String> {
            let value = cell(name)?;
            value
                .as_text()
                .with_context(|| format!("row {row}: {name} is empty"))
        };

        let index_cell = cell("index")?;
        let index = index_cell
            .as_i64()
            .and_then(|i| u64::try_from(i).ok())
            .with_context(|| format!("row {row}: index '{index_cell}' is not a non-negative integer"))?;

        let price_cell = cell("price")?;
        let price = price_cell
            .as_i64()
            .with_context(|| format!("row {row}: price '{price_cell}' is not a number"))?;

        let mut features = [false; FEATURE_COUNT];
        for (i, slot) in features.iter_mut().enumerate() {
            let name = format!("feature_{}", i + 1);
            let value = cell(&name)?;
            *slot = value
                .as_bool()
                .with_context(|| format!("row {row}: {name} '{value}' is not a boolean"))?;
        }

        Ok(Listing {
            index,
            price,
            age: number("age")?,
            mileage: number("mileage")?,
            fuel: text("fuel")?,
            paint_color: text("paint_color")?,
            car_type: text("car_type")?,
            model_key: text("model_key")?,
            features,
        })
    }
}

// ---------------------------------------------------------------------------
// PriceRange
// ---------------------------------------------------------------------------

/// Inclusive budget bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: i64,
    pub max: i64,
}

impl Default for PriceRange {
    /// Unbounded; becomes the catalog bounds once clamped.
    fn default() -> Self {
        PriceRange {
            min: i64::MIN,
            max: i64::MAX,
        }
    }
}

impl PriceRange {
    pub fn new(min: i64, max: i64) -> Self {
        if min <= max {
            PriceRange { min, max }
        } else {
            PriceRange { min: max, max: min }
        }
    }

    pub fn contains(&self, price: i64) -> bool {
        (self.min..=self.max).contains(&price)
    }

    /// Whether the two ranges share at least one price.
    pub fn overlaps(&self, other: PriceRange) -> bool {
        let ordered = PriceRange::new(self.min, self.max);
        ordered.min <= other.max && other.min <= ordered.max
    }

    /// Restrict both ends to `bounds`; an inverted range is reordered first.
    pub fn clamp_to(self, bounds: PriceRange) -> Self {
        let ordered = PriceRange::new(self.min, self.max);
        PriceRange {
            min: ordered.min.clamp(bounds.min, bounds.max),
            max: ordered.max.clamp(bounds.min, bounds.max),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The validated listing table with pre-computed option lists.
#[derive(Debug, Clone)]
pub struct Catalog {
    listings: Vec<Listing>,
    price_bounds: PriceRange,
    /// Distinct values per categorical column, in order of first appearance.
    options: BTreeMap<CategoricalColumn, Vec<String>>,
}

impl Catalog {
    /// Build the catalog, rejecting empty tables and duplicate indices.
    pub fn from_listings(listings: Vec<Listing>) -> Result<Self> {
        if listings.is_empty() {
            bail!("catalog has no listings");
        }

        let mut seen = BTreeSet::new();
        for listing in &listings {
            if !seen.insert(listing.index) {
                bail!("duplicate listing index {}", listing.index);
            }
        }

        let min = listings.iter().map(|l| l.price).min().unwrap_or_default();
        let max = listings.iter().map(|l| l.price).max().unwrap_or_default();

        let mut options: BTreeMap<CategoricalColumn, Vec<String>> = BTreeMap::new();
        for column in CategoricalColumn::ALL {
            let values = options.entry(column).or_default();
            for listing in &listings {
                let value = listing.category(column);
                if !values.iter().any(|v| v == value) {
                    values.push(value.to_string());
                }
            }
        }

        Ok(Catalog {
            listings,
            price_bounds: PriceRange { min, max },
            options,
        })
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    /// `[min(price), max(price)]` over the whole catalog.
    pub fn price_bounds(&self) -> PriceRange {
        self.price_bounds
    }

    pub fn options(&self, column: CategoricalColumn) -> &[String] {
        self.options.get(&column).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}
