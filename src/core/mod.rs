// src/core/mod.rs

pub mod catalog;
pub mod config_loader;
pub mod description;
pub mod document;
pub mod events;
pub mod panel_walker;
pub mod path_generator;
/// Config directory lookup and path expansion.
pub mod paths;
pub mod reconciler;
pub mod rewriter;
pub mod workflows;
