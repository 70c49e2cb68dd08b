//! Terminal presentation: option lists, ranked table, purchase advice.

pub mod panels;
pub mod table;
