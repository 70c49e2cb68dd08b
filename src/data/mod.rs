/// Data layer: core types, loading, projection and filtering.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Catalog (typed, validated)
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐  Horizon   ┌────────────┐
///   │ projection  │ ─────────► │   oracle   │  resale per listing
///   └────────────┘ ◄───────── └────────────┘
///        │  Vec<Prediction>
///        ▼
///   ┌──────────┐
///   │  filter   │  FilterSpec predicates → candidate indices
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod projection;
