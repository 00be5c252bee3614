//! Utility functions shared by the analysis modules.
//!
//! ## Modules
//!
//! - [`app_data`] - Analyzer configuration and its app data directory
//! - [`lines`] - Line splitting with absolute byte offsets

pub mod app_data;
pub mod lines;

pub use app_data::*;
pub use lines::*;
