use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write CSV export '{path}': {source}")]
    WriteCsv {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write JSON summary '{path}': {source}")]
    WriteJson {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize JSON summary: {source}")]
    SerializeJson {
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read JSON summary '{path}': {source}")]
    ReadJson {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse JSON summary '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
