//! SQLite-backed response cache for the transport client.
//!
//! This module provides a persistent key/value cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Site-qualified keys derived from SHA-256 hashing
//! - Lazy expiry on read plus an explicit sweep
//! - Automatic schema migrations
//! - WAL mode so several clients can share one database file

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheStore;
pub use entries::CacheStats;
pub use hash::compute_cache_key;
