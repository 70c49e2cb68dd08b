use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::model::{CategoricalColumn, Listing, FEATURE_COUNT};
use crate::error::{Error, Result};
use crate::oracle::ModelOracle;

// ---------------------------------------------------------------------------
// Horizon – how long and how far the buyer keeps the car
// ---------------------------------------------------------------------------

/// Holding period in years and extra distance driven over it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Horizon {
    pub duration: f64,
    pub usage: u64,
}

impl Horizon {
    /// Negative or non-finite durations are coerced to zero.
    pub fn new(duration: f64, usage: u64) -> Self {
        let duration = if duration.is_finite() && duration > 0.0 {
            duration
        } else {
            0.0
        };
        Horizon { duration, usage }
    }

    pub fn is_identity(&self) -> bool {
        self.duration == 0.0 && self.usage == 0
    }
}

/// Copy of `listings` aged by the horizon; nothing else changes.
pub fn project(listings: &[Listing], horizon: Horizon) -> Vec<Listing> {
    listings
        .iter()
        .map(|listing| Listing {
            age: listing.age + horizon.duration,
            mileage: listing.mileage + horizon.usage as f64,
            ..listing.clone()
        })
        .collect()
}

// ---------------------------------------------------------------------------
// EncodedFrame – numeric, column-major view handed to the model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct EncodedFrame {
    rows: usize,
    names: Vec<String>,
    lookup: BTreeMap<String, usize>,
    columns: Vec<Vec<f64>>,
}

impl EncodedFrame {
    fn push(&mut self, name: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.rows);
        self.lookup.insert(name.clone(), self.columns.len());
        self.names.push(name);
        self.columns.push(values);
    }

    pub fn n_rows(&self) -> usize {
        self.rows
    }

    /// Column names in encoding order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.lookup.get(name).map(|&i| self.columns[i].as_slice())
    }
}

/// One-hot encode a listing table.
///
/// Numeric columns pass through, feature flags become 0/1, and every
/// categorical column expands into `<column>_<value>` indicators over its
/// sorted distinct values with the first value dropped. Indicator columns
/// therefore depend on which values occur in `listings`.
pub fn encode(listings: &[Listing]) -> EncodedFrame {
    let mut frame = EncodedFrame {
        rows: listings.len(),
        ..EncodedFrame::default()
    };

    frame.push("price".into(), listings.iter().map(|l| l.price as f64).collect());
    frame.push("age".into(), listings.iter().map(|l| l.age).collect());
    frame.push("mileage".into(), listings.iter().map(|l| l.mileage).collect());
    for i in 0..FEATURE_COUNT {
        frame.push(
            format!("feature_{}", i + 1),
            listings.iter().map(|l| indicator(l.features[i])).collect(),
        );
    }

    for column in CategoricalColumn::ALL {
        let levels: BTreeSet<&str> = listings.iter().map(|l| l.category(column)).collect();
        for level in levels.into_iter().skip(1) {
            frame.push(
                format!("{}_{level}", column.name()),
                listings
                    .iter()
                    .map(|l| indicator(l.category(column) == level))
                    .collect(),
            );
        }
    }

    frame
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

/// Resale estimate for one listing under one horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub resale_price: i64,
    pub profit: i64,
}

impl Prediction {
    pub fn new(resale_price: i64, price: i64) -> Self {
        Prediction {
            resale_price,
            profit: resale_price - price,
        }
    }
}

/// Round a raw model output to whole currency units, ties to even.
pub fn round_price(value: f64) -> Result<i64> {
    if !value.is_finite() {
        return Err(Error::Prediction(format!("model returned {value}")));
    }
    let rounded = value.round_ties_even();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return Err(Error::Prediction(format!("{value} is out of range")));
    }
    Ok(rounded as i64)
}

/// Project, encode and price every listing; output is aligned with `listings`.
pub fn predict(
    listings: &[Listing],
    horizon: Horizon,
    oracle: &ModelOracle,
) -> Result<Vec<Prediction>> {
    let projected = project(listings, horizon);
    let frame = encode(&projected);
    let raw = oracle.predict(&frame)?;
    if raw.len() != listings.len() {
        return Err(Error::Prediction(format!(
            "expected {} predictions, got {}",
            listings.len(),
            raw.len()
        )));
    }

    log::debug!(
        "priced {} listings for {:.1} years / {} miles",
        listings.len(),
        horizon.duration,
        horizon.usage
    );

    raw.into_iter()
        .zip(listings)
        .map(|(value, listing)| Ok(Prediction::new(round_price(value)?, listing.price)))
        .collect()
}
