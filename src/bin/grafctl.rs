// src/bin/grafctl.rs

use anyhow::Result;
use clap::Parser;
use colored::*;
use grafctl::{
    cli::{Cli, dispatcher},
    core::config_loader::{self, Overrides},
    state::AppContext,
};

/// The main entry point of `grafctl`.
/// It sets up logging, resolves the settings, dispatches to the command handler,
/// and performs centralized error handling.
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run_cli(cli) {
        // Help and version requests of a command's own parser exit through clap.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// `warn` by default, `info` with `--verbose`; `RUST_LOG` wins over both.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let overrides = Overrides {
        url: cli.url,
        key: cli.key,
        profile: cli.profile,
    };
    let settings = config_loader::load_settings(&overrides)?;
    if let Some(profile) = &settings.profile {
        log::info!("using profile '{profile}'");
    }

    dispatcher::dispatch(cli.args, &AppContext::new(settings))
}
