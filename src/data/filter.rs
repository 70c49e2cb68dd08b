use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::model::{Catalog, CategoricalColumn, Listing, PriceRange, FEATURE_COUNT};

// ---------------------------------------------------------------------------
// Filter configuration
// ---------------------------------------------------------------------------

/// Required equipment: `true` at position `i` means "feature_{i+1} must be
/// present". `false` never excludes anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureFlags(pub [bool; FEATURE_COUNT]);

impl FeatureFlags {
    /// Flags from 1-based feature numbers; out-of-range numbers are ignored.
    pub fn from_numbers(numbers: impl IntoIterator<Item = usize>) -> Self {
        let mut flags = [false; FEATURE_COUNT];
        for n in numbers {
            if let Some(slot) = n.checked_sub(1).and_then(|i| flags.get_mut(i)) {
                *slot = true;
            }
        }
        FeatureFlags(flags)
    }

    pub fn required(&self) -> impl Iterator<Item = usize> + '_ {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| i)
    }
}

/// User constraints narrowing the catalog.
///
/// An empty categorical set means the column is unrestricted; the price
/// range is always applied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSpec {
    pub price_range: PriceRange,
    pub fuel: BTreeSet<String>,
    pub paint_color: BTreeSet<String>,
    pub car_type: BTreeSet<String>,
    pub features: FeatureFlags,
    /// Set by [`FilterSpec::clamped`] when the requested budget lies wholly
    /// outside the catalog prices. `price_range` then shows the nearest
    /// catalog bound and no listing passes.
    #[serde(skip_deserializing)]
    pub budget_outside_catalog: bool,
}

impl FilterSpec {
    /// The reset value: full budget, nothing else selected.
    pub fn unrestricted(bounds: PriceRange) -> Self {
        FilterSpec {
            price_range: bounds,
            ..FilterSpec::default()
        }
    }

    /// Same spec with the budget clamped into `bounds`.
    pub fn clamped(mut self, bounds: PriceRange) -> Self {
        if !self.price_range.overlaps(bounds) {
            self.budget_outside_catalog = true;
        }
        self.price_range = self.price_range.clamp_to(bounds);
        self
    }

    /// Replace the budget as requested, before any clamping.
    pub fn set_price_range(&mut self, range: PriceRange) {
        self.price_range = range;
        self.budget_outside_catalog = false;
    }

    pub fn selection(&self, column: CategoricalColumn) -> Option<&BTreeSet<String>> {
        match column {
            CategoricalColumn::Fuel => Some(&self.fuel),
            CategoricalColumn::PaintColor => Some(&self.paint_color),
            CategoricalColumn::CarType => Some(&self.car_type),
            CategoricalColumn::ModelKey => None,
        }
    }

    pub fn selection_mut(&mut self, column: CategoricalColumn) -> Option<&mut BTreeSet<String>> {
        match column {
            CategoricalColumn::Fuel => Some(&mut self.fuel),
            CategoricalColumn::PaintColor => Some(&mut self.paint_color),
            CategoricalColumn::CarType => Some(&mut self.car_type),
            CategoricalColumn::ModelKey => None,
        }
    }

    /// The active predicates. Inactive filters (empty sets, unset flags)
    /// contribute nothing.
    pub fn predicates(&self) -> Vec<Predicate<'_>> {
        let budget = (!self.budget_outside_catalog).then_some(self.price_range);
        let mut predicates = vec![Predicate::Price(budget)];
        for column in [
            CategoricalColumn::Fuel,
            CategoricalColumn::PaintColor,
            CategoricalColumn::CarType,
        ] {
            if let Some(allowed) = self.selection(column).filter(|set| !set.is_empty()) {
                predicates.push(Predicate::OneOf { column, allowed });
            }
        }
        predicates.extend(self.features.required().map(Predicate::Requires));
        predicates
    }

    /// Log selections that no listing can satisfy.
    pub fn warn_unknown_values(&self, catalog: &Catalog) {
        if self.budget_outside_catalog {
            let bounds = catalog.price_bounds();
            log::warn!(
                "budget lies outside catalog prices {}..={}",
                bounds.min,
                bounds.max
            );
        }
        for column in [
            CategoricalColumn::Fuel,
            CategoricalColumn::PaintColor,
            CategoricalColumn::CarType,
        ] {
            let options = catalog.options(column);
            for value in self.selection(column).into_iter().flatten() {
                if !options.contains(value) {
                    log::warn!("no listing has {} '{value}'", column.name());
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One independent condition on a listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Predicate<'a> {
    /// `None` when the budget misses every catalog price.
    Price(Option<PriceRange>),
    OneOf {
        column: CategoricalColumn,
        allowed: &'a BTreeSet<String>,
    },
    /// Zero-based feature index that must be `true`.
    Requires(usize),
}

impl Predicate<'_> {
    pub fn matches(&self, listing: &Listing) -> bool {
        match self {
            Predicate::Price(range) => range.is_some_and(|r| r.contains(listing.price)),
            Predicate::OneOf { column, allowed } => allowed.contains(listing.category(*column)),
            Predicate::Requires(i) => listing.features[*i],
        }
    }
}

/// Return positions of listings passing every active predicate, in catalog
/// order.
pub fn filtered_indices(listings: &[Listing], spec: &FilterSpec) -> Vec<usize> {
    let predicates = spec.predicates();
    listings
        .iter()
        .enumerate()
        .filter(|(_, listing)| predicates.iter().all(|p| p.matches(listing)))
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::data::model::tests::listing;

    fn rows() -> Vec<Listing> {
        let mut rows = vec![listing(0, 10_000), listing(1, 20_000), listing(2, 15_000)];
        rows[1].fuel = "petrol".into();
        rows[1].paint_color = "white".into();
        rows[2].car_type = "suv".into();
        rows[2].features[4] = true;
        rows
    }

    fn bounds() -> PriceRange {
        PriceRange::new(10_000, 20_000)
    }

    #[test]
    fn unrestricted_spec_keeps_everything() {
        let spec = FilterSpec::unrestricted(bounds());
        assert_eq!(spec.predicates().len(), 1);
        assert_eq!(filtered_indices(&rows(), &spec), [0, 1, 2]);
    }

    #[test]
    fn price_range_is_inclusive() {
        let spec = FilterSpec {
            price_range: PriceRange::new(12_000, 20_000),
            ..FilterSpec::default()
        };
        assert_eq!(filtered_indices(&rows(), &spec), [1, 2]);
    }

    #[test]
    fn categorical_sets_restrict_when_non_empty() {
        let mut spec = FilterSpec::unrestricted(bounds());
        spec.fuel.insert("diesel".into());
        assert_eq!(filtered_indices(&rows(), &spec), [0, 2]);

        spec.car_type.insert("suv".into());
        spec.car_type.insert("sedan".into());
        assert_eq!(filtered_indices(&rows(), &spec), [0, 2]);

        spec.paint_color.insert("white".into());
        assert!(filtered_indices(&rows(), &spec).is_empty());
    }

    #[test]
    fn required_feature_with_no_match_is_empty() {
        let spec = FilterSpec {
            features: FeatureFlags::from_numbers([1]),
            ..FilterSpec::unrestricted(bounds())
        };
        assert!(filtered_indices(&rows(), &spec).is_empty());

        let spec = FilterSpec {
            features: FeatureFlags::from_numbers([5]),
            ..FilterSpec::unrestricted(bounds())
        };
        assert_eq!(filtered_indices(&rows(), &spec), [2]);
    }

    #[test]
    fn feature_numbers_are_one_based() {
        let flags = FeatureFlags::from_numbers([0, 1, 8, 9]);
        assert_eq!(flags.required().collect::<Vec<_>>(), [0, 7]);
    }

    #[test]
    fn clamping_pins_budget_to_catalog() {
        let spec = FilterSpec {
            price_range: PriceRange::new(0, 1_000_000),
            ..FilterSpec::default()
        }
        .clamped(bounds());
        assert_eq!(spec.price_range, bounds());
        assert_eq!(FilterSpec::default().clamped(bounds()), FilterSpec::unrestricted(bounds()));
    }

    #[test]
    fn budget_below_catalog_matches_nothing() {
        let spec = FilterSpec {
            price_range: PriceRange::new(0, 5_000),
            ..FilterSpec::default()
        }
        .clamped(bounds());
        assert!(spec.budget_outside_catalog);
        assert_eq!(spec.price_range, PriceRange::new(10_000, 10_000));
        assert!(filtered_indices(&rows(), &spec).is_empty());

        // clamping again keeps the budget unsatisfiable
        let spec = spec.clamped(bounds());
        assert!(filtered_indices(&rows(), &spec).is_empty());
    }

    #[test]
    fn budget_above_catalog_matches_nothing() {
        let mut spec = FilterSpec::unrestricted(bounds());
        spec.set_price_range(PriceRange::new(25_000, 40_000));
        let spec = spec.clamped(bounds());
        assert_eq!(spec.price_range, PriceRange::new(20_000, 20_000));
        assert!(filtered_indices(&rows(), &spec).is_empty());
    }

    #[test]
    fn new_budget_clears_out_of_catalog_state() {
        let mut spec = FilterSpec {
            price_range: PriceRange::new(0, 5_000),
            ..FilterSpec::default()
        }
        .clamped(bounds());
        spec.set_price_range(PriceRange::new(0, 12_000));
        let spec = spec.clamped(bounds());
        assert!(!spec.budget_outside_catalog);
        assert_eq!(filtered_indices(&rows(), &spec), [0]);
    }

    #[test]
    fn spec_deserializes_with_defaults() {
        let spec: FilterSpec = serde_json::from_str(r#"{"fuel": ["diesel"]}"#).unwrap();
        assert_eq!(spec.price_range, PriceRange::default());
        assert!(spec.fuel.contains("diesel"));
        assert_eq!(spec.features, FeatureFlags::default());
    }

    fn arb_listing() -> impl Strategy<Value = Listing> {
        (
            0i64..50,
            prop::sample::select(vec!["diesel", "petrol", "electro"]),
            prop::sample::select(vec!["black", "white"]),
            prop::sample::select(vec!["sedan", "suv", "van"]),
            prop::array::uniform8(any::<bool>()),
        )
            .prop_map(|(price, fuel, paint, car_type, features)| Listing {
                fuel: fuel.into(),
                paint_color: paint.into(),
                car_type: car_type.into(),
                features,
                ..listing(0, price * 1_000)
            })
    }

    fn arb_spec() -> impl Strategy<Value = FilterSpec> {
        (
            0i64..50,
            0i64..50,
            prop::collection::btree_set(prop::sample::select(vec!["diesel", "petrol"]), 0..3),
            prop::collection::btree_set(prop::sample::select(vec!["black", "white"]), 0..3),
            prop::collection::btree_set(prop::sample::select(vec!["suv", "van"]), 0..3),
            prop::array::uniform8(prop::bool::weighted(0.2)),
        )
            .prop_map(|(lo, hi, fuel, paint, car_type, features)| FilterSpec {
                price_range: PriceRange::new(lo * 1_000, hi * 1_000),
                fuel: fuel.into_iter().map(String::from).collect(),
                paint_color: paint.into_iter().map(String::from).collect(),
                car_type: car_type.into_iter().map(String::from).collect(),
                features: FeatureFlags(features),
                budget_outside_catalog: false,
            })
    }

    proptest! {
        #[test]
        fn predicate_order_does_not_matter(
            rows in prop::collection::vec(arb_listing(), 0..30),
            spec in arb_spec(),
            seed in any::<u64>(),
        ) {
            let expected = filtered_indices(&rows, &spec);

            // apply predicates one at a time in a shuffled order
            let mut predicates = spec.predicates();
            let mut state = seed;
            for i in (1..predicates.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                predicates.swap(i, (state >> 33) as usize % (i + 1));
            }
            let mut survivors: Vec<usize> = (0..rows.len()).collect();
            for predicate in &predicates {
                survivors.retain(|&i| predicate.matches(&rows[i]));
            }
            prop_assert_eq!(survivors, expected);
        }

        #[test]
        fn empty_selections_are_identity(rows in prop::collection::vec(arb_listing(), 0..30)) {
            let spec = FilterSpec::unrestricted(PriceRange::new(0, 49_000));
            prop_assert_eq!(filtered_indices(&rows, &spec), (0..rows.len()).collect::<Vec<_>>());
        }
    }
}
