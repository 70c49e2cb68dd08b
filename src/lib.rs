//! Used-car picker: project every listing's resale value after a holding
//! period, filter by the buyer's constraints and rank by expected profit.
//!
//! ```text
//!  catalog ──► projection ──► oracle ──► predictions
//!                                            │
//!  preferences ──────────► filter ◄──────────┘
//!                             │
//!                             ▼
//!                           rank ──► recommendation
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod oracle;
pub mod rank;
pub mod state;
pub mod ui;

pub use error::{Error, Result};
