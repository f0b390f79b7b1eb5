use std::ffi::OsString;
use std::path::Path;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::app::{self, OutputOptions};
use crate::args::{DEFAULT_CONFIG_FILES, TesterArgs};
use crate::config::{apply_config, load_config};
use crate::domain::TestConfiguration;
use crate::error::{AppError, AppResult, ValidationError};

/// Parses arguments, merges config, and runs the load test to completion.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, client setup
/// failures, and failed exports.
pub fn run() -> AppResult<()> {
    let Some((mut args, matches)) = parse_args()? else {
        return Ok(());
    };

    crate::logger::init_logging(args.verbose, args.no_color);

    let config = match prepare_config(&mut args, &matches) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{}", err);
            return Err(err);
        }
    };
    let output = OutputOptions::from_args(&args);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(ValidationError::RuntimeBuildFailed { source: err }))?;

    runtime.block_on(app::run_local(config, &output))
}

fn parse_args() -> AppResult<Option<(TesterArgs, ArgMatches)>> {
    let mut cmd = TesterArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = TesterArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

fn prepare_config(args: &mut TesterArgs, matches: &ArgMatches) -> AppResult<TestConfiguration> {
    if let Some(config) = load_config(args.config.as_deref())? {
        apply_config(args, matches, &config)?;
    }
    TestConfiguration::from_args(args)
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}
