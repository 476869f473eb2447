//! Subcommand implementations. Each returns the JSON value printed to stdout.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use wpbm_client::{ClientOptions, WpClient};
use wpbm_core::{AppConfig, CacheStore, ReportWriter, SecretStore, SiteRegistry};
use wpbm_ops::{
    BackupSelection, ContentOps, InstallSource, InstallSpec, LogProgress, MediaOps, MediaSelection, PluginOps,
    SearchReplaceRequest, list_backups,
};

/// Report type of search/replace runs written to the report directory.
const SEARCH_REPLACE_REPORT: &str = "search_replace";

/// A local path or an http(s) URL.
pub fn parse_install_source(raw: &str) -> InstallSource {
    let lower = raw.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        InstallSource::Url(raw.trim().to_string())
    } else {
        InstallSource::Path(raw.into())
    }
}

pub struct App {
    config: AppConfig,
    registry: SiteRegistry,
}

impl App {
    pub fn new(config: AppConfig, secrets: Arc<dyn SecretStore>) -> Self {
        let registry = SiteRegistry::new(config.sites.clone(), secrets);
        Self { config, registry }
    }

    async fn cache(&self) -> Result<CacheStore> {
        CacheStore::open(&self.config.db_path)
            .await
            .with_context(|| format!("failed to open cache at {}", self.config.db_path.display()))
    }

    async fn client(&self, site: &str) -> Result<WpClient> {
        let site = self.registry.resolve(site)?;
        let client = WpClient::new(site, ClientOptions::from_config(&self.config))?;
        if !self.config.cache_enabled {
            return Ok(client);
        }
        Ok(client.with_cache(&self.cache().await?))
    }

    fn backups_writer(&self) -> ReportWriter {
        ReportWriter::new(&self.config.backup_dir)
    }

    pub fn sites(&self) -> Value {
        let sites: Vec<Value> = self
            .registry
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "name": entry.name,
                    "url": entry.url,
                    "api_key": self.registry.get_api_key(&entry.name).is_ok(),
                })
            })
            .collect();
        json!({ "sites": sites })
    }

    pub async fn health(&self, site: &str) -> Result<Value> {
        Ok(self.client(site).await?.health().await?)
    }

    pub async fn search_replace(
        &self, site: &str, search: String, replace: String, post_types: Vec<String>, apply: bool, backup: bool,
    ) -> Result<Value> {
        let request = SearchReplaceRequest { search, replace, post_types, dry_run: !apply };
        request.validate()?;
        let ops = ContentOps::new(self.client(site).await?).with_page_size(self.config.page_size);

        let backup = if apply && backup {
            let selection = BackupSelection::All { post_types: request.effective_post_types() };
            Some(ops.backup_before_bulk_operation(&selection, &self.backups_writer()).await?)
        } else {
            None
        };

        let report = ops.search_replace(&request, &mut LogProgress).await?;
        let written = ReportWriter::new(&self.config.report_dir).write(SEARCH_REPLACE_REPORT, &report)?;

        Ok(json!({
            "dry_run": report.dry_run,
            "scanned": report.scanned,
            "matched": report.changes.len(),
            "total_replacements": report.total_replacements,
            "succeeded": report.result.succeeded,
            "failed": report.result.failed,
            "report": written.path,
            "backup": backup,
        }))
    }

    pub async fn backup(&self, site: &str, ids: Vec<u64>, post_types: Vec<String>) -> Result<Value> {
        let ops = ContentOps::new(self.client(site).await?).with_page_size(self.config.page_size);
        let selection = match (ids.is_empty(), post_types.is_empty()) {
            (false, _) => BackupSelection::Items(ids),
            (true, true) => BackupSelection::all(),
            (true, false) => BackupSelection::All { post_types },
        };
        let info = ops.backup_before_bulk_operation(&selection, &self.backups_writer()).await?;
        Ok(serde_json::to_value(info)?)
    }

    pub async fn restore(&self, site: &str, file: &Path) -> Result<Value> {
        let ops = ContentOps::new(self.client(site).await?);
        Ok(serde_json::to_value(ops.restore_backup(file).await?)?)
    }

    pub fn backups(&self) -> Result<Value> {
        Ok(json!({ "backups": list_backups(&self.backups_writer())? }))
    }

    pub async fn media_unused(&self, site: &str, post_types: &[String]) -> Result<Value> {
        let ops = MediaOps::new(self.client(site).await?).with_page_size(self.config.page_size);
        let unused = ops.find_unused_media(post_types).await?;
        Ok(json!({ "count": unused.len(), "media": unused }))
    }

    pub async fn media_download(&self, site: &str, ids: Vec<u64>, dir: &Path) -> Result<Value> {
        let ops = MediaOps::new(self.client(site).await?).with_page_size(self.config.page_size);
        let selection = if ids.is_empty() { MediaSelection::All } else { MediaSelection::Ids(ids) };
        Ok(serde_json::to_value(ops.bulk_download(&selection, dir, &mut LogProgress).await?)?)
    }

    pub async fn plugins(&self, site: &str, check_updates: bool) -> Result<Value> {
        let plugins = PluginOps::new(self.client(site).await?).list(check_updates).await?;
        Ok(json!({ "total": plugins.len(), "plugins": plugins }))
    }

    pub async fn plugins_install(&self, site: &str, sources: &[String], activate: bool) -> Result<Value> {
        let specs: Vec<InstallSpec> =
            sources.iter().map(|s| InstallSpec { source: parse_install_source(s), activate }).collect();
        let ops = PluginOps::new(self.client(site).await?);
        Ok(serde_json::to_value(ops.bulk_install(&specs, &mut LogProgress).await?)?)
    }

    pub async fn plugins_update_all(&self, site: &str) -> Result<Value> {
        let ops = PluginOps::new(self.client(site).await?);
        Ok(serde_json::to_value(ops.update_all_outdated(&mut LogProgress).await?)?)
    }

    pub async fn plugins_inventory(&self, site: &str) -> Result<Value> {
        let ops = PluginOps::new(self.client(site).await?);
        Ok(serde_json::to_value(ops.inventory().await?)?)
    }

    pub async fn cache_stats(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.cache().await?.stats().await?)?)
    }

    pub async fn cache_clear(&self) -> Result<Value> {
        Ok(json!({ "removed": self.cache().await?.clear().await? }))
    }

    pub async fn cache_cleanup(&self) -> Result<Value> {
        Ok(json!({ "removed": self.cache().await?.cleanup_expired().await? }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpbm_core::{MemorySecretStore, SiteEntry};

    fn config(dir: &Path) -> AppConfig {
        AppConfig {
            db_path: dir.join("cache.sqlite"),
            backup_dir: dir.join("backups"),
            report_dir: dir.join("reports"),
            sites: vec![
                SiteEntry { name: "shop".into(), url: "https://shop.example".into() },
                SiteEntry { name: "blog".into(), url: "https://blog.example".into() },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_install_source() {
        assert_eq!(parse_install_source("https://dl.example/p.zip"), InstallSource::Url("https://dl.example/p.zip".into()));
        assert_eq!(parse_install_source("HTTP://dl.example/p.zip"), InstallSource::Url("HTTP://dl.example/p.zip".into()));
        assert_eq!(parse_install_source("./forms.zip"), InstallSource::Path("./forms.zip".into()));
    }

    #[test]
    fn test_sites_reports_key_presence() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = MemorySecretStore::new();
        secrets.set("shop", "k").unwrap();
        let app = App::new(config(dir.path()), Arc::new(secrets));

        let out = app.sites();
        assert_eq!(out["sites"][0]["name"], "shop");
        assert_eq!(out["sites"][0]["api_key"], true);
        assert_eq!(out["sites"][1]["api_key"], false);
    }

    #[tokio::test]
    async fn test_unknown_site_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config(dir.path()), Arc::new(MemorySecretStore::new()));
        assert!(app.health("nowhere").await.is_err());
    }

    #[tokio::test]
    async fn test_cache_commands_on_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config(dir.path()), Arc::new(MemorySecretStore::new()));

        let stats = app.cache_stats().await.unwrap();
        assert_eq!(stats["entries"], 0);
        assert_eq!(app.cache_cleanup().await.unwrap()["removed"], 0);
        assert!(dir.path().join("cache.sqlite").exists());
    }

    #[tokio::test]
    async fn test_empty_search_takes_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.sites.push(SiteEntry { name: "local".into(), url: "http://127.0.0.1:9".into() });
        let secrets = MemorySecretStore::new();
        secrets.set("local", "k").unwrap();
        let app = App::new(config, Arc::new(secrets));

        let err = app.search_replace("local", String::new(), "x".into(), Vec::new(), true, true).await.unwrap_err();

        assert!(err.to_string().contains("search string must not be empty"));
        assert!(!dir.path().join("backups").exists());
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn test_backups_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let app = App::new(config(dir.path()), Arc::new(MemorySecretStore::new()));
        assert_eq!(app.backups().unwrap()["backups"], json!([]));
    }
}
