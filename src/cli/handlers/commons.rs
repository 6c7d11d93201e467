// src/cli/handlers/commons.rs

// Helpers shared by several handlers.

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::path::PathBuf;

use crate::core::paths;

/// Expands `~` and environment variables in a path given on the command line.
pub fn expand_arg(raw: &str) -> Result<PathBuf> {
    paths::expand_path(raw).with_context(|| format!("Invalid path argument '{raw}'"))
}

/// Expands a path given on the command line and resolves it to an existing directory.
pub fn existing_dir_arg(raw: &str) -> Result<PathBuf> {
    let path = paths::resolve_existing(raw)
        .with_context(|| format!("Directory '{raw}' does not exist"))?;
    if !path.is_dir() {
        anyhow::bail!("'{}' is not a directory", path.display());
    }
    Ok(path)
}

/// Prints the banner shown before a run that changes nothing.
pub fn print_dry_run_banner(dry_run: bool) {
    if dry_run {
        println!("{}", "Dry run: nothing will be written.".yellow());
    }
}

/// Asks a yes/no question, defaulting to "no".
pub fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

/// A `label: value` summary line.
pub fn print_count(label: &str, count: usize) {
    println!("  {:<22} {}", format!("{label}:").blue(), count);
}
