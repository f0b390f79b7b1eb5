//! Run orchestration and console/file output.
pub mod export;
mod progress;
mod runner;
pub(crate) mod summary;

pub use export::{SummaryDocument, import_summary};
pub(crate) use runner::{OutputOptions, run_local};
