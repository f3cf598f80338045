use std::{process::ExitCode, time::Duration};

use clap::Parser;
use repofetch::{
    cli::{
        args::{CliArgs, Command},
        command_handlers::{do_clear_cache, do_read, do_resolve, do_tree, do_write},
    },
    config::RepofetchConfig,
    files::LineRange,
    Repofetch,
};

fn run() -> anyhow::Result<()> {
    let cli_args: CliArgs = CliArgs::parse();
    let config = RepofetchConfig::load()?;

    let mut builder = Repofetch::builder();
    if let Some(cache_directory) = cli_args.cache_directory.or(config.cache_dir) {
        builder = builder.cache_directory(cache_directory);
    }
    if let Some(prefix) = config.entry_prefix {
        builder = builder.entry_prefix(prefix);
    }
    if let Some(prefix) = config.remote_prefix {
        builder = builder.remote_prefix(prefix);
    }
    let timeout = cli_args
        .timeout
        .map(Duration::from_secs)
        .or(config.acquisition_timeout);
    if let Some(timeout) = timeout {
        builder = builder.acquisition_timeout(timeout);
    }
    let repofetch = builder
        .try_build()
        .map_err(|error| anyhow::anyhow!("{error}"))?;

    match cli_args.cmd {
        Command::Tree { locator } => do_tree(&repofetch, &locator),
        Command::Read { locator, paths } => do_read(&repofetch, &locator, &paths),
        Command::Write {
            locator,
            path,
            content,
            start,
            end,
        } => {
            let range = start.zip(end).map(|(start, end)| LineRange::new(start, end));
            do_write(&repofetch, &locator, &path, content, range)
        }
        Command::Resolve { locator } => do_resolve(&repofetch, &locator),
        Command::ClearCache => do_clear_cache(&repofetch),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
