//! Core library for the `volley` HTTP load tester.
//!
//! The binary is a thin wrapper over [`entry::run`]. The modules below hold
//! the CLI and config layers, the request executor, the batch scheduler, and
//! the metrics aggregator with its console and file outputs.
pub mod app;
pub mod args;
pub mod config;
pub mod domain;
pub mod entry;
pub mod error;
pub mod http;
pub mod metrics;
pub mod scheduler;

mod logger;
mod shutdown;
mod shutdown_handlers;
