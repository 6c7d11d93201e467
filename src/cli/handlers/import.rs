use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    models::GrafanaBackup,
    state::AppContext,
    system::{backup, backup_store::BackupSource},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Restores a backup archive: folders and datasources are upserted, dashboards saved as new versions."
)]
struct ImportArgs {
    /// Archive to restore: `gs://<bucket>/<object>` or a local file.
    #[arg(long)]
    src: String,

    /// Do not ask for confirmation.
    #[arg(long, short)]
    yes: bool,
}

/// Runs `import`: restores a backup archive.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let import_args = ImportArgs::try_parse_from(&args)?;
    let source = match BackupSource::parse(&import_args.src)? {
        BackupSource::Local(path) => {
            BackupSource::Local(commons::expand_arg(&path.to_string_lossy())?)
        }
        gcs => gcs,
    };

    let bytes = source
        .read(context.gcs_token())
        .with_context(|| format!("Failed to read backup '{source}'"))?;
    let archive = backup::decode_backup(&bytes)
        .with_context(|| format!("'{source}' is not a valid backup archive"))?;
    let client = context.client()?;

    print_summary(&source, &archive, client.base_url());
    if !import_args.yes && !commons::confirm("Import this backup?")? {
        println!("{}", "Import cancelled.".yellow());
        return Ok(());
    }

    let report = backup::restore(client, &archive).context("Import failed")?;

    println!("\n{}", "Import complete.".green());
    commons::print_count("folders created", report.folders_created);
    commons::print_count("folders updated", report.folders_updated);
    commons::print_count("datasources created", report.datasources_created);
    commons::print_count("datasources updated", report.datasources_updated);
    commons::print_count("dashboards imported", report.dashboards_imported);
    Ok(())
}

fn print_summary(source: &BackupSource, archive: &GrafanaBackup, target: &str) {
    println!(
        "\nAbout to import {} into {}:",
        source.to_string().bold(),
        target.cyan()
    );
    commons::print_count("folders", archive.folders.len());
    commons::print_count("datasources", archive.datasources.len());
    commons::print_count("dashboards", archive.dashboards.len());
}
