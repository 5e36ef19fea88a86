//! Shared types, error model, and configuration for ReportWeaver.
//!
//! This crate is the foundation depended on by all other ReportWeaver crates.
//! It provides:
//! - [`ReportWeaverError`] — the unified error type
//! - Domain types ([`ReportSession`], [`SessionManifest`], [`SourceId`], [`SessionId`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, FetchConfig, OpenRouterConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_output_dir, validate_api_key,
};
pub use error::{ReportWeaverError, Result};
pub use types::{
    CURRENT_SCHEMA_VERSION, ReportSession, SessionId, SessionManifest, SourceId, Stage,
};
