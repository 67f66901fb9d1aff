//! textmatch-core
//!
//! Data model, error taxonomy, configuration and the `UnitIndex` seam shared by
//! every other crate in the workspace.

pub mod config;
pub mod error;
pub mod logging;
pub mod splitter;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
