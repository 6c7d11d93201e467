use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    constants::QUERIES_SUBDIR,
    core::{
        events::LogObserver,
        workflows::{self, ExportOptions},
    },
    state::AppContext,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Writes the queries of a dashboard to query files under <out>/queries/."
)]
struct ExportArgs {
    /// The dashboard uid.
    #[arg(long)]
    uid: String,

    /// Base directory; files are written to its `queries` sub-directory.
    #[arg(long, default_value = ".")]
    out: String,

    /// Replace query files that already exist.
    #[arg(long)]
    overwrite: bool,

    /// Derive a query path for panels whose description has none.
    #[arg(long)]
    generate_paths: bool,

    /// Report what would be written without touching the filesystem.
    #[arg(long)]
    dry_run: bool,
}

/// Runs `export`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let export_args = ExportArgs::try_parse_from(&args)?;
    let out_dir = commons::expand_arg(&export_args.out)?;
    let client = context.client()?;

    let options = ExportOptions {
        overwrite: export_args.overwrite,
        generate_missing: export_args.generate_paths,
        dry_run: export_args.dry_run,
    };

    commons::print_dry_run_banner(options.dry_run);
    let report = workflows::export(client, &LogObserver, &export_args.uid, &out_dir, options)
        .with_context(|| format!("Failed to export queries of dashboard '{}'", export_args.uid))?;

    println!(
        "\n{} '{}' to {}",
        "Exported dashboard".green(),
        export_args.uid.cyan(),
        out_dir.join(QUERIES_SUBDIR).display()
    );
    commons::print_count("files written", report.files_written);
    commons::print_count("files kept", report.files_skipped);
    if report.files_skipped > 0 && !options.overwrite {
        println!("{}", "Use --overwrite to replace existing files.".dimmed());
    }
    Ok(())
}
