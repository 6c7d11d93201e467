// src/constants.rs

/// The name of the directory holding grafctl configuration (inside the system config dir).
pub const APP_CONFIG_DIR: &str = "grafctl";

/// The name of the configuration file (inside the grafctl config dir).
pub const CONFIG_FILENAME: &str = "config.toml";

/// Every exported query lands under this sub-directory of the output directory.
pub const QUERIES_SUBDIR: &str = "queries";

/// The literal marker that introduces a query reference in a panel description.
pub const QUERY_MARKER: &str = "query=";

/// File extension of SQL query files.
pub const SQL_EXTENSION: &str = ".sql";

/// File extension of PromQL query files.
pub const PROMQL_EXTENSION: &str = ".promql";

/// Datasource type of Prometheus-compatible datasources (flat `expr` field).
pub const DATASOURCE_PROMETHEUS: &str = "prometheus";

/// Datasource type that nests PromQL inside a `promQLQuery` object.
pub const DATASOURCE_STACKDRIVER: &str = "stackdriver";

/// Minimum step the server applies when a nested PromQL query carries none.
pub const DEFAULT_MIN_STEP: &str = "10s";

/// Environment variable overriding the server URL.
pub const ENV_URL: &str = "GRAFCTL_URL";

/// Environment variable overriding the API key.
pub const ENV_API_KEY: &str = "GRAFCTL_API_KEY";

/// Environment variable selecting a configuration profile.
pub const ENV_PROFILE: &str = "GRAFCTL_PROFILE";

/// Environment variable holding the bearer token for GCS backups.
pub const ENV_GCS_TOKEN: &str = "GCS_ACCESS_TOKEN";
