//! Core types and shared functionality for wpbm.
//!
//! This crate provides:
//! - Response cache with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Site registry and secret stores
//! - Bulk operation results and timestamped report files

pub mod bulk;
pub mod cache;
pub mod config;
pub mod error;
pub mod report;
pub mod site;

pub use bulk::{BulkOperationResult, ItemOutcome, ItemResult};
pub use cache::{CacheStats, CacheStore};
pub use config::{AppConfig, ConfigError, SiteEntry};
pub use error::Error;
pub use report::{ReportEnvelope, ReportWriter, WrittenReport};
pub use site::{EnvSecretStore, MemorySecretStore, SecretStore, Site, SiteRegistry};
