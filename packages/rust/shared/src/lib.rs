//! Shared types, error model, and configuration for DocHarvest.
//!
//! This crate is the foundation depended on by all other DocHarvest crates.
//! It provides:
//! - [`HarvestError`] — the unified error type
//! - Domain types ([`PageRecord`], [`ContentType`], [`OutputFormat`])
//! - Configuration ([`AppConfig`], [`CrawlConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AssetsConfig, CrawlConfig, DefaultsConfig, OutputsConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{HarvestError, Result};
pub use types::{ContentType, OutputFormat, PageRecord};
