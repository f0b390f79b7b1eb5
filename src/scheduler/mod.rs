//! Concurrency control and batch scheduling.
mod controller;
mod plan;


pub use controller::Scheduler;
pub use plan::{Batch, BatchPlan};
