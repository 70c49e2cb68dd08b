use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failures of the load → project → predict pipeline.
///
/// Every variant is terminal for the current computation: the pipeline is
/// deterministic, so retrying with the same inputs cannot succeed.
#[derive(Debug, Error)]
pub enum Error {
    /// The catalog file is missing, unreadable, or has a malformed row.
    #[error("cannot load catalog from {}", path.display())]
    DataLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The regressor artifact or its schema parameters are unusable.
    #[error("cannot load model from {}", path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The encoded projection lacks columns the model was trained on.
    #[error("encoded catalog is missing model feature(s): {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("prediction failed: {0}")]
    Prediction(String),
}

impl Error {
    pub fn data_load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Error::DataLoad {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn model_load(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Error::ModelLoad {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_lists_missing_columns() {
        let err = Error::SchemaMismatch {
            missing: vec!["fuel_hybrid".into(), "car_type_van".into()],
        };
        assert_eq!(
            err.to_string(),
            "encoded catalog is missing model feature(s): fuel_hybrid, car_type_van"
        );
    }

    #[test]
    fn data_load_keeps_anyhow_chain_as_source() {
        let inner = anyhow::anyhow!("row 3: price 'abc' is not a number");
        let err = Error::data_load("cars.csv", inner);
        assert_eq!(err.to_string(), "cannot load catalog from cars.csv");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("row 3: price 'abc' is not a number"));
    }
}
