//! CLI argument types and parsing helpers.
mod cli;
mod defaults;
pub(crate) mod parsers;
mod types;


pub use cli::TesterArgs;
pub use types::{HttpMethod, PositiveU64, PositiveUsize};

pub(crate) use defaults::{DEFAULT_CONFIG_FILES, DEFAULT_USER_AGENT, GRACE_PERIOD_PADDING};
pub(crate) use parsers::{parse_duration_value, parse_header};
