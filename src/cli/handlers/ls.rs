use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use crate::{
    models::{SearchResult, SearchType},
    state::AppContext,
    system::grafana::SearchQuery,
};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists the dashboards of the server.")]
struct LsArgs {
    /// Only show dashboards whose title matches this text.
    #[arg(long, short)]
    query: Option<String>,
}

/// Runs `ls`.
pub fn handle(args: Vec<String>, context: &AppContext) -> Result<()> {
    let ls_args = LsArgs::try_parse_from(&args)?;
    let client = context.client()?;

    let hits = client
        .search(&SearchQuery {
            query: ls_args.query,
            hit_type: Some(SearchType::Dashboard),
        })
        .context("Failed to search dashboards")?;

    if hits.is_empty() {
        println!("{}", "No dashboards found.".dimmed());
        return Ok(());
    }

    let uid_width = column_width(&hits, |hit| hit.uid.as_str(), "UID");
    let folder_width = column_width(&hits, folder_of, "FOLDER");
    let title_width = column_width(&hits, |hit| hit.title.as_str(), "TITLE");

    println!(
        "{}",
        format!(
            "{:<uid_width$}  {:<folder_width$}  {:<title_width$}  URL",
            "UID", "FOLDER", "TITLE"
        )
        .bold()
    );
    for hit in &hits {
        println!(
            "{}  {:<folder_width$}  {:<title_width$}  {}",
            format!("{:<uid_width$}", hit.uid).cyan(),
            folder_of(hit),
            hit.title,
            format!("{}{}", client.base_url(), hit.url).dimmed()
        );
    }
    Ok(())
}

/// Dashboards outside any folder live in "General".
fn folder_of(hit: &SearchResult) -> &str {
    if hit.folder_title.is_empty() {
        "General"
    } else {
        &hit.folder_title
    }
}

fn column_width<F>(hits: &[SearchResult], field: F, header: &str) -> usize
where
    F: Fn(&SearchResult) -> &str,
{
    hits.iter()
        .map(|hit| field(hit).chars().count())
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_width_covers_header_and_values() {
        let hits = vec![
            SearchResult {
                uid: "a".into(),
                title: "Node Exporter Full".into(),
                ..SearchResult::default()
            },
            SearchResult {
                uid: "bcdef".into(),
                folder_title: "Ops".into(),
                ..SearchResult::default()
            },
        ];
        assert_eq!(column_width(&hits, |h| h.uid.as_str(), "UID"), 5);
        assert_eq!(column_width(&hits, |h| h.title.as_str(), "TITLE"), 18);
        assert_eq!(column_width(&hits, folder_of, "FOLDER"), 7);
    }
}
