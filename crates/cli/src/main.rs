//! wpbm command-line entry point.
//!
//! Results are printed to stdout as JSON. Logging goes to stderr so output
//! can be piped; set `RUST_LOG` to control verbosity.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wpbm_core::{AppConfig, EnvSecretStore};

mod commands;

use commands::App;

#[derive(Parser)]
#[command(name = "wpbm")]
#[command(about = "Bulk content, media and plugin management for WordPress sites")]
#[command(long_about = "wpbm

Manages many WordPress sites through the wpbm companion plugin API.
Sites are configured in the file named by WPBM_CONFIG_FILE; API keys are read
from WPBM_API_KEY_<SITE> environment variables.

EXAMPLES:
  wpbm sites                                     List configured sites
  wpbm search-replace shop 'Acme Corp' 'Acme Ltd'  Preview a replacement
  wpbm search-replace shop 'Acme Corp' 'Acme Ltd' --apply
  wpbm media-unused shop                         Find unreferenced attachments
  wpbm plugins-update-all shop                   Update every outdated plugin")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List configured sites and whether an API key is available
    Sites,
    /// Check that a site's API answers
    Health { site: String },
    /// Replace literal text in titles and content
    ///
    /// Runs as a preview unless --apply is given. Applying first writes a
    /// backup of every scanned post type.
    SearchReplace {
        site: String,
        search: String,
        replace: String,
        /// Post type to scan (repeatable; default: post and page)
        #[arg(long = "type")]
        post_types: Vec<String>,
        /// Write the changes
        #[arg(long)]
        apply: bool,
        /// Skip the backup taken before applying
        #[arg(long)]
        no_backup: bool,
    },
    /// Back up content items
    Backup {
        site: String,
        /// Item id to back up (repeatable; default: every item of --type)
        #[arg(long = "id")]
        ids: Vec<u64>,
        /// Post type to back up when no ids are given
        #[arg(long = "type")]
        post_types: Vec<String>,
    },
    /// Restore title, content and status from a backup file
    Restore { site: String, file: PathBuf },
    /// List backup files, oldest first
    Backups,
    /// List attachments with no evidence of use in content
    MediaUnused {
        site: String,
        /// Post type to scan (repeatable; default: post and page)
        #[arg(long = "type")]
        post_types: Vec<String>,
    },
    /// Download attachments
    MediaDownload {
        site: String,
        /// Attachment id (repeatable; default: the whole library)
        #[arg(long = "id")]
        ids: Vec<u64>,
        #[arg(long, default_value = "./downloads")]
        dir: PathBuf,
    },
    /// List installed plugins
    Plugins {
        site: String,
        /// Ask the site to refresh update information first
        #[arg(long)]
        check_updates: bool,
    },
    /// Install plugins from local ZIP files or URLs
    PluginsInstall {
        site: String,
        /// ZIP path or http(s) URL
        #[arg(required = true)]
        sources: Vec<String>,
        #[arg(long)]
        activate: bool,
    },
    /// Update every plugin with an update available
    PluginsUpdateAll { site: String },
    /// Export installed plugins grouped by state
    PluginsInventory { site: String },
    /// Inspect or prune the response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
enum CacheAction {
    Stats,
    Clear,
    /// Remove expired entries
    Cleanup,
}

fn init_tracing(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    let config = AppConfig::load().context("failed to load configuration")?;
    let app = App::new(config, Arc::new(EnvSecretStore::default()));

    let output = match cli.command {
        Command::Sites => app.sites(),
        Command::Health { site } => app.health(&site).await?,
        Command::SearchReplace { site, search, replace, post_types, apply, no_backup } => {
            app.search_replace(&site, search, replace, post_types, apply, !no_backup).await?
        }
        Command::Backup { site, ids, post_types } => app.backup(&site, ids, post_types).await?,
        Command::Restore { site, file } => app.restore(&site, &file).await?,
        Command::Backups => app.backups()?,
        Command::MediaUnused { site, post_types } => app.media_unused(&site, &post_types).await?,
        Command::MediaDownload { site, ids, dir } => app.media_download(&site, ids, &dir).await?,
        Command::Plugins { site, check_updates } => app.plugins(&site, check_updates).await?,
        Command::PluginsInstall { site, sources, activate } => app.plugins_install(&site, &sources, activate).await?,
        Command::PluginsUpdateAll { site } => app.plugins_update_all(&site).await?,
        Command::PluginsInventory { site } => app.plugins_inventory(&site).await?,
        Command::Cache { action } => match action {
            CacheAction::Stats => app.cache_stats().await?,
            CacheAction::Clear => app.cache_clear().await?,
            CacheAction::Cleanup => app.cache_cleanup().await?,
        },
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
