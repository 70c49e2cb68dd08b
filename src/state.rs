use crate::config::Preferences;
use crate::data::filter::{filtered_indices, FilterSpec};
use crate::data::model::{Catalog, CategoricalColumn, PriceRange};
use crate::data::projection::{predict, Horizon, Prediction};
use crate::error::Result;
use crate::oracle::ModelOracle;
use crate::rank::{recommend, Candidate, Recommendation};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Catalog, model and the derived views for the current preferences,
/// independent of rendering.
pub struct AppState {
    catalog: Catalog,
    oracle: ModelOracle,

    /// Current user choices, always clamped to the catalog.
    preferences: Preferences,

    /// Resale estimate per listing for `preferences.horizon` (cached).
    predictions: Vec<Prediction>,

    /// Positions of listings passing `preferences.filters` (cached).
    candidates: Vec<usize>,
}

impl AppState {
    /// Start from the reset preferences and price the whole catalog once.
    pub fn new(catalog: Catalog, oracle: ModelOracle) -> Result<Self> {
        let preferences = Preferences::reset(catalog.price_bounds());
        let predictions = predict(catalog.listings(), preferences.horizon, &oracle)?;
        let candidates = (0..catalog.len()).collect();
        Ok(AppState {
            catalog,
            oracle,
            preferences,
            predictions,
            candidates,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// Replace all preferences. Re-prices only when the horizon changed.
    pub fn apply(&mut self, preferences: Preferences) -> Result<()> {
        let preferences = preferences.clamped(self.catalog.price_bounds());
        self.set_horizon(preferences.horizon)?;
        self.set_filters(preferences.filters);
        Ok(())
    }

    /// Re-price the catalog for a new horizon. On failure the previous
    /// horizon and predictions stay in place.
    pub fn set_horizon(&mut self, horizon: Horizon) -> Result<()> {
        let horizon = Horizon::new(horizon.duration, horizon.usage);
        if horizon == self.preferences.horizon && !self.predictions.is_empty() {
            return Ok(());
        }
        log::info!(
            "projecting {:.1} years and {} miles ahead",
            horizon.duration,
            horizon.usage
        );
        self.predictions = predict(self.catalog.listings(), horizon, &self.oracle)?;
        self.preferences.horizon = horizon;
        Ok(())
    }

    pub fn set_filters(&mut self, filters: FilterSpec) {
        self.preferences.filters = filters.clamped(self.catalog.price_bounds());
        self.refilter();
    }

    /// A budget missing every catalog price leaves no candidates.
    pub fn set_price_range(&mut self, range: PriceRange) {
        let mut filters = self.preferences.filters.clone();
        filters.set_price_range(range);
        self.set_filters(filters);
    }

    /// Toggle a single value in a categorical selection.
    pub fn toggle_selection(&mut self, column: CategoricalColumn, value: &str) {
        let Some(selected) = self.preferences.filters.selection_mut(column) else {
            log::warn!("{} cannot be filtered on", column.name());
            return;
        };
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
        self.refilter();
    }

    /// Toggle the requirement on feature `number` (1-based).
    pub fn toggle_feature(&mut self, number: usize) {
        if let Some(flag) = number
            .checked_sub(1)
            .and_then(|i| self.preferences.filters.features.0.get_mut(i))
        {
            *flag = !*flag;
            self.refilter();
        }
    }

    /// Back to full budget, no selections and a zero horizon. The catalog
    /// itself is untouched.
    pub fn reset(&mut self) -> Result<()> {
        log::info!("resetting preferences");
        self.apply(Preferences::reset(self.catalog.price_bounds()))
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Ranked candidates and best purchase for the current preferences.
    pub fn recommendation(&self, limit: Option<usize>) -> Recommendation {
        let listings = self.catalog.listings();
        let candidates = self
            .candidates
            .iter()
            .map(|&i| Candidate::new(listings[i].clone(), self.predictions[i]))
            .collect();
        recommend(candidates, limit)
    }

    /// Recompute `candidates` after a filter change.
    fn refilter(&mut self) {
        self.preferences.filters.warn_unknown_values(&self.catalog);
        self.candidates = filtered_indices(self.catalog.listings(), &self.preferences.filters);
        log::debug!(
            "{} of {} listings pass the filters",
            self.candidates.len(),
            self.catalog.len()
        );
    }
}
