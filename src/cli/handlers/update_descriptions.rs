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
    about = "Sets each panel description to a query path derived from folder, dashboard, row and panel."
)]
struct UpdateDescriptionsArgs {
    /// The dashboard uid.
    #[arg(long)]
    uid: String,

    /// Replace descriptions that already reference a query.
    #[arg(long)]
    overwrite: bool,

    /// Report what would change without saving the dashboard.
    #[arg(long)]
    dry_run: bool,
}

/// Runs `update-descriptions`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let update_args = UpdateDescriptionsArgs::try_parse_from(&args)?;
    let client = context.client()?;

    commons::print_dry_run_banner(update_args.dry_run);
    let report = workflows::update_descriptions(
        client,
        &LogObserver,
        &update_args.uid,
        update_args.overwrite,
        update_args.dry_run,
    )
    .with_context(|| format!("Failed to update descriptions of dashboard '{}'", update_args.uid))?;

    println!(
        "\n{} '{}'",
        "Updated descriptions of dashboard".green(),
        update_args.uid.cyan()
    );
    commons::print_count("panels updated", report.panels_updated);
    commons::print_count("panels skipped", report.panels_skipped);
    Ok(())
}
