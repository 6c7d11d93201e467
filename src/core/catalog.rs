//! # Query Catalog
//!
//! An in-memory index of the query files found under a root directory. Each file is
//! keyed by its path relative to the root, using `/` as separator and keeping its
//! extension (`folder/dashboard/table-cpu.sql`). Lookups may omit the extension.

use crate::constants::{PROMQL_EXTENSION, QUERIES_SUBDIR, SQL_EXTENSION};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

lazy_static! {
    /// Keys written by older exports carry everything up to a `queries/` segment.
    static ref BEFORE_QUERIES_REGEX: Regex =
        Regex::new(&format!(r"^(?:.*/)?{}/(.+)$", QUERIES_SUBDIR)).expect("valid regex");
}

/// Errors raised while building the catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Query file '{}' is not supported (expected .sql or .promql)", path.display())]
    UnsupportedKind { path: PathBuf },
    #[error("Failed to read query file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk queries directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Queries directory '{}' does not exist", path.display())]
    RootNotFound { path: PathBuf },
}

/// The query language a file is written in, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Sql,
    PromQl,
}

impl QueryKind {
    /// Classifies a file name by extension.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(SQL_EXTENSION) {
            Some(Self::Sql)
        } else if name.ends_with(PROMQL_EXTENSION) {
            Some(Self::PromQl)
        } else {
            None
        }
    }

    /// The extension (with leading dot) files of this kind use.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Sql => SQL_EXTENSION,
            Self::PromQl => PROMQL_EXTENSION,
        }
    }
}

/// A query file loaded into the catalog. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Catalog-relative name, including the extension.
    pub name: String,
    /// The file content, verbatim.
    pub raw: String,
    /// Language of the query, from the file extension.
    pub kind: QueryKind,
}

/// Index of query files keyed by normalized relative path.
#[derive(Debug, Default)]
pub struct QueryCatalog {
    root: PathBuf,
    queries: HashMap<String, Query>,
}

impl QueryCatalog {
    /// Creates an empty catalog whose keys are computed relative to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            queries: HashMap::new(),
        }
    }

    /// Walks `root` and registers every supported query file beneath it.
    ///
    /// Directories and files with other extensions are skipped silently. The root is
    /// canonicalized first so that keys do not depend on how the path was spelled.
    pub fn load(root: &Path) -> Result<Self, CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::RootNotFound {
                path: root.to_path_buf(),
            });
        }
        let canonical_root = dunce::canonicalize(root).map_err(|source| CatalogError::Read {
            path: root.to_path_buf(),
            source,
        })?;

        let mut catalog = Self::new(&canonical_root);
        for entry in WalkDir::new(&canonical_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() || !Self::is_supported_file(entry.path()) {
                continue;
            }
            catalog.put(entry.path())?;
        }

        for name in catalog.ambiguous_names() {
            log::warn!(
                "both '{name}{SQL_EXTENSION}' and '{name}{PROMQL_EXTENSION}' exist; lookups by '{name}' resolve to the SQL file"
            );
        }
        log::debug!(
            "loaded {} queries from '{}'",
            catalog.len(),
            canonical_root.display()
        );
        Ok(catalog)
    }

    /// Returns `true` when the path carries a supported query extension.
    pub fn is_supported_file(path: &Path) -> bool {
        path.to_str()
            .and_then(QueryKind::from_file_name)
            .is_some()
    }

    /// Reads `file` and stores it under its normalized key. A later file with the
    /// same key replaces the earlier one.
    pub fn put(&mut self, file: &Path) -> Result<(), CatalogError> {
        let kind = file
            .to_str()
            .and_then(QueryKind::from_file_name)
            .ok_or_else(|| CatalogError::UnsupportedKind {
                path: file.to_path_buf(),
            })?;
        let raw = fs::read_to_string(file).map_err(|source| CatalogError::Read {
            path: file.to_path_buf(),
            source,
        })?;

        let name = self.key_for(file);
        log::trace!("catalog: {} -> {}", file.display(), name);
        self.insert(Query { name, raw, kind });
        Ok(())
    }

    /// Stores an already materialized query under its own name.
    pub fn insert(&mut self, query: Query) {
        self.queries.insert(query.name.clone(), query);
    }

    /// Looks a query up by exact key, then `key.sql`, then `key.promql`.
    pub fn get(&self, name: &str) -> Option<&Query> {
        self.queries
            .get(name)
            .or_else(|| self.queries.get(&format!("{name}{SQL_EXTENSION}")))
            .or_else(|| self.queries.get(&format!("{name}{PROMQL_EXTENSION}")))
    }

    /// Looks a query up by base path, falling back to the `base_<refid>` file that
    /// exports of multi-target panels produce.
    pub fn get_by_base_and_ref_id(&self, base: &str, ref_id: &str) -> Option<&Query> {
        if let Some(query) = self.get(base) {
            return Some(query);
        }
        if ref_id.is_empty() {
            return None;
        }
        let suffixed = format!("{base}_{}", ref_id.to_lowercase());
        self.queries
            .get(&format!("{suffixed}{SQL_EXTENSION}"))
            .or_else(|| self.queries.get(&format!("{suffixed}{PROMQL_EXTENSION}")))
    }

    /// Number of query files loaded.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// True when the query directory held no query files.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Base names that exist both as `.sql` and `.promql`, sorted.
    pub fn ambiguous_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .queries
            .keys()
            .filter_map(|key| key.strip_suffix(SQL_EXTENSION))
            .filter(|base| {
                self.queries
                    .contains_key(&format!("{base}{PROMQL_EXTENSION}"))
            })
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    /// Computes the catalog key of `file`: relative to the root, `/`-separated, and
    /// with any leading `.../queries/` prefix removed.
    fn key_for(&self, file: &Path) -> String {
        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        let normalized = relative
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches('/')
            .to_string();

        match BEFORE_QUERIES_REGEX
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
        {
            Some(rest) => rest.as_str().to_string(),
            None => normalized,
        }
    }
}
