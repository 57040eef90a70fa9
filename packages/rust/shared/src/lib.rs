//! Shared types, error model, and configuration for rstindex.
//!
//! This crate is the foundation depended on by all other rstindex crates.
//! It provides:
//! - [`RstIndexError`] — the unified error type
//! - Domain types ([`ModuleReference`], [`PackageIndex`], [`PackageTree`], [`OutputManifest`])
//! - Configuration ([`AppConfig`], [`BuildOptions`], config and index loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BuildOptions, DefaultsConfig, DiscoveryConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, load_index_file, validate_config,
};
pub use error::{Result, RstIndexError};
pub use types::{
    AutodocFlags, CURRENT_SCHEMA_VERSION, IndexFile, ManifestFile, ModuleReference,
    OutputManifest, PackageIndex, PackageTree,
};
