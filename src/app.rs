use serde::Serialize;

use crate::config::{DataPaths, Preferences};
use crate::data::loader;
use crate::error::Result;
use crate::oracle::ModelOracle;
use crate::rank::Recommendation;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Application wiring
// ---------------------------------------------------------------------------

pub struct CarPickerApp {
    pub state: AppState,
}

/// What one interaction produces: the applied preferences and the result.
#[derive(Debug, Serialize)]
pub struct Evaluation<'a> {
    pub preferences: &'a Preferences,
    pub recommendation: Recommendation,
}

impl CarPickerApp {
    /// Load catalog and model once; both are read-only afterwards.
    pub fn open(paths: &DataPaths) -> Result<Self> {
        let catalog = loader::load_file(&paths.catalog)?;
        let oracle = ModelOracle::load(&paths.model, &paths.params)?;
        Ok(CarPickerApp {
            state: AppState::new(catalog, oracle)?,
        })
    }

    /// Apply `preferences` and rank what is left.
    pub fn evaluate(&mut self, preferences: Preferences, limit: Option<usize>) -> Result<Evaluation<'_>> {
        self.state.apply(preferences)?;
        let recommendation = self.state.recommendation(limit);
        log::info!("{} cars match", recommendation.count);
        Ok(Evaluation {
            preferences: self.state.preferences(),
            recommendation,
        })
    }
}
