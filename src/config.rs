use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::data::filter::{FeatureFlags, FilterSpec};
use crate::data::model::PriceRange;
use crate::data::projection::Horizon;

// ---------------------------------------------------------------------------
// Input files
// ---------------------------------------------------------------------------

/// Where the catalog, model and schema live.
#[derive(Debug, Clone, Args)]
pub struct DataPaths {
    /// Listing catalog (.csv, .json or .parquet)
    #[arg(long, env = "CAR_PICKER_CATALOG", default_value = "data_clipped.csv")]
    pub catalog: PathBuf,

    /// Serialized regressor artifact
    #[arg(long, env = "CAR_PICKER_MODEL", default_value = "regressor.json")]
    pub model: PathBuf,

    /// Schema parameters (numerical_cols, imp_features)
    #[arg(long, env = "CAR_PICKER_PARAMS", default_value = "params.json")]
    pub params: PathBuf,
}

// ---------------------------------------------------------------------------
// Preferences – everything the user chooses for one interaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub horizon: Horizon,
    pub filters: FilterSpec,
}

impl Preferences {
    /// Full budget, no selections, zero horizon.
    pub fn reset(bounds: PriceRange) -> Self {
        Preferences {
            horizon: Horizon::default(),
            filters: FilterSpec::unrestricted(bounds),
        }
    }

    /// Coerce values into range: non-negative duration, budget inside the
    /// catalog bounds.
    pub fn clamped(self, bounds: PriceRange) -> Self {
        Preferences {
            horizon: Horizon::new(self.horizon.duration, self.horizon.usage),
            filters: self.filters.clamped(bounds),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading preferences {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("parsing preferences {}", path.display()))
    }
}

/// Per-field overrides from the command line. Unset fields keep the value
/// from the preferences file.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Years the car will be kept
    #[arg(long)]
    pub duration: Option<f64>,

    /// Miles driven while owning the car
    #[arg(long)]
    pub usage: Option<u64>,

    /// Lower end of the budget
    #[arg(long)]
    pub min_price: Option<i64>,

    /// Upper end of the budget
    #[arg(long)]
    pub max_price: Option<i64>,

    /// Accepted fuel (repeatable)
    #[arg(long = "fuel", value_name = "FUEL")]
    pub fuel: Vec<String>,

    /// Accepted paint color (repeatable)
    #[arg(long = "paint", value_name = "COLOR")]
    pub paint_color: Vec<String>,

    /// Accepted body type (repeatable)
    #[arg(long = "car-type", value_name = "TYPE")]
    pub car_type: Vec<String>,

    /// Required feature number, 1 to 8 (repeatable)
    #[arg(long = "feature", value_name = "N", value_parser = clap::value_parser!(u8).range(1..=8))]
    pub features: Vec<u8>,
}

impl Overrides {
    pub fn apply(&self, mut prefs: Preferences) -> Preferences {
        if let Some(duration) = self.duration {
            prefs.horizon.duration = duration;
        }
        if let Some(usage) = self.usage {
            prefs.horizon.usage = usage;
        }

        let filters = &mut prefs.filters;
        if self.min_price.is_some() || self.max_price.is_some() {
            let current = filters.price_range;
            filters.set_price_range(PriceRange {
                min: self.min_price.unwrap_or(current.min),
                max: self.max_price.unwrap_or(current.max),
            });
        }
        if !self.fuel.is_empty() {
            filters.fuel = self.fuel.iter().cloned().collect();
        }
        if !self.paint_color.is_empty() {
            filters.paint_color = self.paint_color.iter().cloned().collect();
        }
        if !self.car_type.is_empty() {
            filters.car_type = self.car_type.iter().cloned().collect();
        }
        if !self.features.is_empty() {
            filters.features = FeatureFlags::from_numbers(self.features.iter().map(|&n| usize::from(n)));
        }
        prefs
    }
}
