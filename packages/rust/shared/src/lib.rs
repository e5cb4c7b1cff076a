//! Shared types, error model, and configuration for logosync.
//!
//! This crate is the foundation depended on by all other logosync crates.
//! It provides:
//! - [`LogoSyncError`]: the unified error type
//! - Domain types ([`WebsiteRecord`], [`LogoReference`], [`FailureLogEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_CONCURRENCY, DefaultsConfig, ResolverConfig, StoreConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{LogoSyncError, Result};
pub use types::{FailureKind, FailureLogEntry, LogoReference, WebsiteRecord, basename};
