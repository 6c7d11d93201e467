// src/core/rewriter.rs

//! Moves query text in and out of a panel's target objects. Which field holds the
//! text depends on the query language and on the panel's datasource type.

use crate::{
    constants::{
        DATASOURCE_PROMETHEUS, DATASOURCE_STACKDRIVER, DEFAULT_MIN_STEP, PROMQL_EXTENSION,
        SQL_EXTENSION,
    },
    core::{
        catalog::{Query, QueryKind},
        document::JsonPath,
    },
};
use serde::Serialize;
use serde_json::Value;

const RAW_SQL: &str = "rawSql";
const EXPR: &str = "expr";
const PROMQL_QUERY: &str = "promQLQuery";

/// The datasource family a panel queries, from `datasource.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceKind {
    /// Prometheus-compatible; PromQL lives in the flat `expr` field.
    Prometheus,
    /// PromQL lives in a nested `promQLQuery` object next to a project name and step.
    Stackdriver,
    /// Anything else. Treated as SQL on export.
    Other(String),
}

impl DatasourceKind {
    /// Maps a datasource `type` string to its kind.
    pub fn from_type(datasource_type: &str) -> Self {
        match datasource_type {
            DATASOURCE_PROMETHEUS => Self::Prometheus,
            DATASOURCE_STACKDRIVER => Self::Stackdriver,
            other => Self::Other(other.to_string()),
        }
    }

    /// Reads the datasource kind of a panel.
    pub fn of_panel(panel: &Value) -> Self {
        Self::from_type(panel.str_at(&["datasource", "type"]))
    }

    /// The datasource `type` string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Prometheus => DATASOURCE_PROMETHEUS,
            Self::Stackdriver => DATASOURCE_STACKDRIVER,
            Self::Other(name) => name,
        }
    }
}

/// The nested query object used by [`DatasourceKind::Stackdriver`] targets.
#[derive(Debug, Clone, Serialize)]
pub struct PromQlQuery {
    /// The PromQL expression.
    #[serde(rename = "expr")]
    pub expression: String,
    /// Cloud project the query runs in.
    #[serde(rename = "projectName")]
    pub project_name: String,
    /// Query resolution, e.g. `10s`.
    pub step: String,
}

/// What [`rewrite_target`] did to a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// The query text was written into the target.
    Applied,
    /// No rewrite exists for this query kind and datasource; the target is untouched.
    Unsupported,
}

/// Writes `query` into `target` according to the datasource kind.
///
/// SQL always lands in `rawSql`. PromQL lands in `expr` for Prometheus datasources
/// and in a rebuilt `promQLQuery` object for Stackdriver ones, carrying over the
/// existing project name and step (default `10s`). Other datasources are left alone.
pub fn rewrite_target(
    target: &mut Value,
    query: &Query,
    datasource: &DatasourceKind,
) -> RewriteOutcome {
    match (query.kind, datasource) {
        (QueryKind::Sql, _) => {
            target.set_at(&[RAW_SQL], Value::String(query.raw.clone()));
            RewriteOutcome::Applied
        }
        (QueryKind::PromQl, DatasourceKind::Prometheus) => {
            target.set_at(&[EXPR], Value::String(query.raw.clone()));
            RewriteOutcome::Applied
        }
        (QueryKind::PromQl, DatasourceKind::Stackdriver) => {
            let step = match target.str_at(&[PROMQL_QUERY, "step"]) {
                "" => DEFAULT_MIN_STEP.to_string(),
                step => step.to_string(),
            };
            let nested = PromQlQuery {
                expression: query.raw.clone(),
                project_name: target.str_at(&[PROMQL_QUERY, "projectName"]).to_string(),
                step,
            };
            target.set_at(&[PROMQL_QUERY], serde_json::json!(nested));
            RewriteOutcome::Applied
        }
        (QueryKind::PromQl, DatasourceKind::Other(_)) => RewriteOutcome::Unsupported,
    }
}

/// Reads the query text out of a target, with the extension its file should get.
///
/// An empty string means there is nothing to export for this target.
pub fn export_target(target: &Value, datasource: &DatasourceKind) -> (String, &'static str) {
    match datasource {
        DatasourceKind::Prometheus => (target.str_at(&[EXPR]).to_string(), PROMQL_EXTENSION),
        DatasourceKind::Stackdriver => {
            let content = match target.str_at(&[PROMQL_QUERY, EXPR]) {
                "" => target.str_at(&[EXPR]),
                nested => nested,
            };
            (content.to_string(), PROMQL_EXTENSION)
        }
        DatasourceKind::Other(_) => (target.str_at(&[RAW_SQL]).to_string(), SQL_EXTENSION),
    }
}
