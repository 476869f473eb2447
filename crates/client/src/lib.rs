//! Client code for wpbm.
//!
//! This crate provides the per-site HTTP client for the bulk manager REST
//! API: caching, retries, pacing and typed content, media and plugin helpers
//! shared by the operations crate and the CLI.

pub mod wp;

pub use wp::{
    ApiError, ClientOptions, ContentItem, ContentQuery, ContentUpdate, MediaItem, MediaQuery, MediaUpdate,
    PluginAction, PluginInfo, PluginResponse, PluginState, RemoteSearchReplace, RetryPolicy, Revision, Sleeper,
    TokioSleeper, WpClient,
};
