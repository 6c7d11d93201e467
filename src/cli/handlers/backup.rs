use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons,
    state::AppContext,
    system::{
        backup,
        backup_store::{BackupError, BackupProvider, BackupStore, GcsStore, LocalStore},
    },
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Backs up every datasource, folder and dashboard into a gzipped JSON archive."
)]
struct BackupArgs {
    /// Where to store the archive: `local` or `gcs`.
    #[arg(long, default_value = "local")]
    provider: String,

    /// Destination: a directory for `local` (default: current directory), a bucket for `gcs`.
    #[arg(long)]
    out: Option<String>,
}

/// Runs `backup`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let backup_args = BackupArgs::try_parse_from(&args)?;
    let provider: BackupProvider = backup_args.provider.parse()?;
    let store = open_store(provider, backup_args.out.as_deref(), context.gcs_token())?;
    let client = context.client()?;

    println!("Backing up {} ...", client.base_url().cyan());
    let location = backup::backup(client, store.as_ref()).context("Backup failed")?;
    println!("{} {}", "Backup stored at".green(), location.bold());
    Ok(())
}

/// Builds the destination of a backup. A GCS bucket is checked before anything is
/// collected from the server.
fn open_store(
    provider: BackupProvider,
    out: Option<&str>,
    gcs_token: Option<&str>,
) -> Result<Box<dyn BackupStore>> {
    match provider {
        BackupProvider::Local => {
            let dir = commons::expand_arg(out.unwrap_or("."))?;
            Ok(Box::new(LocalStore::new(dir)))
        }
        BackupProvider::Gcs => {
            let bucket = out.filter(|b| !b.is_empty()).ok_or(BackupError::MissingBucket)?;
            let store = GcsStore::new(bucket, gcs_token)?;
            store
                .check_bucket()
                .with_context(|| format!("Cannot access bucket '{bucket}'"))?;
            Ok(Box::new(store))
        }
    }
}
