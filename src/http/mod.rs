//! Request execution: client construction, transport and failure classification.
mod classify;
mod client;
mod executor;


pub use classify::{classify_error, classify_io_kind};
pub use client::build_client;
pub use executor::{HttpTransport, RequestExecutor, Transport};
