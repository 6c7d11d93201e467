// src/cli/handlers/mod.rs

// One module per command; each parses its own arguments.

/// `backup`
pub mod backup;
/// Helpers shared by handlers.
pub mod commons;
/// `export`
pub mod export;
/// `import`
pub mod import;
/// `inspect`
pub mod inspect;
/// `ls`
pub mod ls;
/// `sync`
pub mod sync;
/// `update-descriptions`
pub mod update_descriptions;
