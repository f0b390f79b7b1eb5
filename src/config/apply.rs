mod util;

use clap::ArgMatches;

use crate::args::TesterArgs;
use crate::error::AppResult;

use super::types::ConfigFile;
use util::{
    any_duration, ensure_positive_u64, ensure_positive_usize, is_cli, parse_headers,
    positive_duration,
};

/// Applies configuration values to CLI arguments.
///
/// Values passed explicitly on the command line take precedence; everything
/// else (including clap defaults) is overridden by the config file.
///
/// # Errors
///
/// Returns an error when config values are invalid.
pub fn apply_config(
    args: &mut TesterArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if !is_cli(matches, "url")
        && let Some(url) = config.url.clone()
    {
        args.url = Some(url);
    }

    if !is_cli(matches, "requests")
        && let Some(requests) = config.requests
    {
        args.requests = ensure_positive_u64(requests, "requests")?;
    }

    if !is_cli(matches, "concurrency")
        && let Some(concurrency) = config.concurrency
    {
        args.concurrency = ensure_positive_usize(concurrency, "concurrency")?;
    }

    if !is_cli(matches, "batch_size")
        && let Some(batch_size) = config.batch_size
    {
        args.batch_size = Some(ensure_positive_u64(batch_size, "batch_size")?);
    }

    if !is_cli(matches, "cooldown")
        && let Some(cooldown) = config.cooldown.as_ref()
    {
        args.cooldown = any_duration(cooldown, "cooldown")?;
    }

    if !is_cli(matches, "request_timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.request_timeout = positive_duration(timeout, "timeout")?;
    }

    if !is_cli(matches, "grace_period")
        && let Some(grace_period) = config.grace_period.as_ref()
    {
        args.grace_period = Some(positive_duration(grace_period, "grace_period")?);
    }

    if !is_cli(matches, "method")
        && let Some(method) = config.method
    {
        args.method = method;
    }

    if !is_cli(matches, "body")
        && let Some(body) = config.body.clone()
    {
        args.body = Some(body);
    }

    if !is_cli(matches, "headers")
        && let Some(headers) = config.headers.as_ref()
    {
        args.headers = parse_headers(headers)?;
    }

    if !is_cli(matches, "no_keep_alive")
        && let Some(keep_alive) = config.keep_alive
    {
        args.no_keep_alive = !keep_alive;
    }

    if !is_cli(matches, "no_verify_ssl")
        && let Some(verify_ssl) = config.verify_ssl
    {
        args.no_verify_ssl = !verify_ssl;
    }

    if !is_cli(matches, "csv")
        && let Some(path) = config.csv.clone()
    {
        args.csv = Some(path);
    }

    if !is_cli(matches, "json")
        && let Some(path) = config.json.clone()
    {
        args.json = Some(path);
    }

    if !is_cli(matches, "no_progress")
        && let Some(no_progress) = config.no_progress
    {
        args.no_progress = no_progress;
    }

    if !is_cli(matches, "no_color")
        && let Some(no_color) = config.no_color
    {
        args.no_color = no_color;
    }

    Ok(())
}
