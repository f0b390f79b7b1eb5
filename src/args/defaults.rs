use std::time::Duration;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("volley-loadtest/", env!("CARGO_PKG_VERSION"));

/// Config filenames checked in the working directory when `--config` is absent.
pub(crate) const DEFAULT_CONFIG_FILES: [&str; 2] = ["volley.toml", "volley.json"];

/// Added to the request timeout to derive the default shutdown grace period.
pub(crate) const GRACE_PERIOD_PADDING: Duration = Duration::from_secs(1);
