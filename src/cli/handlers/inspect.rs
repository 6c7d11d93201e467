use anyhow::{Context, Result};
use clap::Parser;

use crate::state::AppContext;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Prints a dashboard and its metadata as pretty JSON."
)]
struct InspectArgs {
    /// The dashboard uid.
    #[arg(long)]
    uid: String,
}

/// Runs `inspect`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let inspect_args = InspectArgs::try_parse_from(&args)?;
    let full = context
        .client()?
        .get_dashboard_by_uid(&inspect_args.uid)
        .with_context(|| format!("Failed to fetch dashboard '{}'", inspect_args.uid))?;
    println!("{}", serde_json::to_string_pretty(&full)?);
    Ok(())
}
