use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Metrics aggregator was already finalized.")]
    Finalized,
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
