//! Resale-price oracle: a pre-trained regressor plus the schema it was
//! trained against.
//!
//! ```text
//!   regressor.json      params.json
//!        │                  │
//!        └──────┬───────────┘
//!               ▼
//!         ┌────────────┐   EncodedFrame   ┌─────────────┐
//!         │ ModelOracle │ ◄─────────────── │ projection  │
//!         └────────────┘ ───────────────► └─────────────┘
//!                         Vec<f64> (row order)
//! ```

mod estimator;

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

pub use estimator::{Estimator, TreeNode};

use crate::data::model::NUMERIC_COLUMNS;
use crate::data::projection::EncodedFrame;
use crate::error::{Error, Result};

/// Schema side-channel written next to the model at training time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaParams {
    /// Columns the model treats as continuous.
    pub numerical_cols: Vec<String>,
    /// Post-encoding columns the model consumes, in order.
    pub imp_features: Vec<String>,
}

/// On-disk model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Feature order the estimator was fitted on.
    pub features: Vec<String>,
    pub estimator: Estimator,
}

#[derive(Debug, Clone)]
pub struct ModelOracle {
    schema: SchemaParams,
    estimator: Estimator,
}

impl ModelOracle {
    /// Pair an estimator with its schema, checking they agree.
    pub fn new(schema: SchemaParams, estimator: Estimator) -> anyhow::Result<Self> {
        if let Some(col) = schema
            .numerical_cols
            .iter()
            .find(|col| !NUMERIC_COLUMNS.contains(&col.as_str()))
        {
            bail!("numerical column '{col}' is not a numeric catalog column");
        }
        estimator.validate(schema.imp_features.len())?;
        Ok(ModelOracle { schema, estimator })
    }

    /// Read the artifact and its schema parameters.
    pub fn load(model_path: &Path, params_path: &Path) -> Result<Self> {
        let schema: SchemaParams = read_json(params_path)
            .context("reading schema parameters")
            .map_err(|err| Error::model_load(params_path, err))?;

        let oracle = read_json::<ModelArtifact>(model_path)
            .and_then(|artifact| {
                if artifact.features != schema.imp_features {
                    bail!(
                        "model was fitted on {} features that differ from imp_features ({})",
                        artifact.features.len(),
                        schema.imp_features.len()
                    );
                }
                ModelOracle::new(schema, artifact.estimator)
            })
            .map_err(|err| Error::model_load(model_path, err))?;

        log::info!(
            "loaded {} model over {} features from {}",
            oracle.estimator.name(),
            oracle.schema.imp_features.len(),
            model_path.display()
        );
        Ok(oracle)
    }

    pub fn schema(&self) -> &SchemaParams {
        &self.schema
    }

    /// Predict one value per frame row, in row order.
    ///
    /// Every `imp_features` column must be present in `frame`; otherwise the
    /// call fails with [`Error::SchemaMismatch`] instead of feeding the
    /// model a misaligned row.
    pub fn predict(&self, frame: &EncodedFrame) -> Result<Vec<f64>> {
        let mut columns = Vec::with_capacity(self.schema.imp_features.len());
        let mut missing = Vec::new();
        for name in &self.schema.imp_features {
            match frame.column(name) {
                Some(values) => columns.push(values),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            log::error!("encoded catalog lacks {} model feature(s)", missing.len());
            return Err(Error::SchemaMismatch { missing });
        }

        let mut row = vec![0.0; columns.len()];
        let predictions: Vec<f64> = (0..frame.n_rows())
            .map(|r| {
                for (slot, values) in row.iter_mut().zip(&columns) {
                    *slot = values[r];
                }
                self.estimator.predict_row(&row)
            })
            .collect();
        Ok(predictions)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path).context("reading file")?;
    serde_json::from_str(&text).context("parsing JSON")
}
