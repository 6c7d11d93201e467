use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    core::{events::LogObserver, workflows},
    state::AppContext,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Rewrites the queries of a dashboard from the query files referenced by its panel descriptions."
)]
struct SyncArgs {
    /// The dashboard uid.
    #[arg(long)]
    uid: String,

    /// Directory holding the query files (searched recursively).
    #[arg(long)]
    queries: String,

    /// Report what would change without saving the dashboard.
    #[arg(long)]
    dry_run: bool,
}

/// Runs `sync`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let sync_args = SyncArgs::try_parse_from(&args)?;
    let queries_dir = commons::existing_dir_arg(&sync_args.queries)?;
    let client = context.client()?;

    commons::print_dry_run_banner(sync_args.dry_run);
    let report = workflows::sync(
        client,
        &LogObserver,
        &sync_args.uid,
        &queries_dir,
        sync_args.dry_run,
    )
    .with_context(|| format!("Failed to sync dashboard '{}'", sync_args.uid))?;

    println!(
        "\n{} '{}'",
        "Synced dashboard".green(),
        sync_args.uid.cyan()
    );
    commons::print_count("panels visited", report.panels_visited);
    commons::print_count("targets updated", report.targets_updated);
    commons::print_count("queries not found", report.targets_missing);
    commons::print_count("unsupported targets", report.targets_unsupported);
    Ok(())
}
