use clap::Parser;
use std::time::Duration;

use super::parsers::{
    parse_cooldown, parse_duration_arg, parse_header, parse_positive_u64, parse_positive_usize,
};
use super::types::{HttpMethod, PositiveU64, PositiveUsize};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Async HTTP load tester - bounded concurrency, batched volleys with cooldowns, exact latency percentiles, and CSV/JSON exports.",
    next_help_heading = "Advanced Options"
)]
pub struct TesterArgs {
    /// Target URL for the load test
    #[arg(value_name = "URL", help_heading = "Common Options")]
    pub url: Option<String>,

    /// Total number of requests to issue
    #[arg(
        long = "requests",
        short = 'n',
        default_value = "1000",
        value_parser = parse_positive_u64,
        help_heading = "Common Options"
    )]
    pub requests: PositiveU64,

    /// Maximum number of requests in flight at once
    #[arg(
        long = "concurrency",
        short = 'c',
        default_value = "10",
        value_parser = parse_positive_usize,
        help_heading = "Common Options"
    )]
    pub concurrency: PositiveUsize,

    /// Requests per batch (defaults to all requests in a single batch)
    #[arg(long = "batch-size", value_parser = parse_positive_u64)]
    pub batch_size: Option<PositiveU64>,

    /// Pause between batches (supports us/ms/s/m/h and fractions, e.g. 1.5 or 500ms)
    #[arg(long = "cooldown", default_value = "0", value_parser = parse_cooldown)]
    pub cooldown: Duration,

    /// Per-request timeout covering the full round trip (supports us/ms/s/m/h)
    #[arg(
        long = "timeout",
        short = 't',
        default_value = "30s",
        value_parser = parse_duration_arg,
        help_heading = "Common Options"
    )]
    pub request_timeout: Duration,

    /// HTTP method to use
    #[arg(
        long,
        short = 'X',
        default_value = "get",
        ignore_case = true,
        help_heading = "Common Options"
    )]
    pub method: HttpMethod,

    /// Request body (for POST/PUT/PATCH)
    #[arg(long, short = 'd', help_heading = "Common Options")]
    pub body: Option<String>,

    /// HTTP headers in 'Key: Value' format (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header, help_heading = "Common Options")]
    pub headers: Vec<(String, String)>,

    /// Disable HTTP keep-alive (open a new connection per request)
    #[arg(long = "no-keep-alive", alias = "disable-keepalive")]
    pub no_keep_alive: bool,

    /// Skip TLS certificate and hostname verification
    #[arg(long = "no-verify-ssl", short = 'k', alias = "insecure")]
    pub no_verify_ssl: bool,

    /// Write one CSV row per request to this path
    #[arg(long = "csv", help_heading = "Common Options")]
    pub csv: Option<String>,

    /// Write the JSON summary to this path
    #[arg(long = "json", help_heading = "Common Options")]
    pub json: Option<String>,

    /// How long in-flight requests may drain after an interrupt (default: timeout + 1s)
    #[arg(long = "grace-period", value_parser = parse_duration_arg)]
    pub grace_period: Option<Duration>,

    /// Path to config file (TOML/JSON). Defaults to ./volley.toml or ./volley.json if present.
    #[arg(long, help_heading = "Common Options")]
    pub config: Option<String>,

    /// Disable the live progress line
    #[arg(long = "no-progress")]
    pub no_progress: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by VOLLEY_LOG/RUST_LOG)
    #[arg(long, short = 'v', alias = "debug", help_heading = "Common Options")]
    pub verbose: bool,
}
