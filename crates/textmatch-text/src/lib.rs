//! textmatch-text
//!
//! Tantivy-based `UnitIndex`: schema and analyzer setup in `tantivy_utils`,
//! writes in `index`, match queries in `search`.

pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::TantivyUnitIndex;
