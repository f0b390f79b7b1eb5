use std::time::Duration;

use serde::Deserialize;

use crate::args::{HttpMethod, parse_duration_value};
use crate::error::ValidationError;

/// Optional file-backed defaults; explicit CLI flags always win.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    #[serde(alias = "total_requests")]
    pub requests: Option<u64>,
    #[serde(alias = "connections")]
    pub concurrency: Option<usize>,
    pub batch_size: Option<u64>,
    pub cooldown: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub method: Option<HttpMethod>,
    #[serde(alias = "data")]
    pub body: Option<String>,
    pub headers: Option<Vec<String>>,
    pub keep_alive: Option<bool>,
    pub verify_ssl: Option<bool>,
    pub csv: Option<String>,
    pub json: Option<String>,
    pub grace_period: Option<DurationValue>,
    pub no_progress: Option<bool>,
    pub no_color: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        let duration = self.to_duration_allow_zero()?;
        if duration.is_zero() {
            return Err(ValidationError::DurationZero);
        }
        Ok(duration)
    }

    pub(crate) fn to_duration_allow_zero(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => parse_duration_value(text),
        }
    }
}
