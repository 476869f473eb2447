//! Plugin operations: installs, lifecycle actions, bulk updates and inventory.
//!
//! State checks always use a fresh listing. A plugin moves between
//! `not installed`, `inactive` and `active`; only an inactive plugin may be
//! deleted.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wpbm_client::{PluginAction, PluginInfo, PluginResponse, PluginState, WpClient};
use wpbm_core::BulkOperationResult;

use crate::OpsError;
use crate::progress::{Progress, ProgressSink};

/// Where a plugin comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallSource {
    /// Local ZIP archive.
    Path(PathBuf),
    /// Remote ZIP fetched by the site itself.
    Url(String),
}

impl InstallSource {
    fn label(&self) -> String {
        match self {
            InstallSource::Path(p) => p.display().to_string(),
            InstallSource::Url(u) => u.clone(),
        }
    }
}

/// One entry of a bulk install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallSpec {
    #[serde(flatten)]
    pub source: InstallSource,
    #[serde(default)]
    pub activate: bool,
}

/// Outcome of a single install.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub success: bool,
    pub plugin_file: Option<String>,
    pub message: Option<String>,
    /// Set when activation was requested: whether it went through.
    pub activated: Option<bool>,
}

/// Installed plugins split by state, for auditing and replication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInventory {
    pub site_url: String,
    pub exported_at: DateTime<Utc>,
    pub active: Vec<PluginInfo>,
    pub inactive: Vec<PluginInfo>,
}

/// Plugin operations against one site.
#[derive(Debug, Clone)]
pub struct PluginOps {
    client: WpClient,
}

impl PluginOps {
    pub fn new(client: WpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WpClient {
        &self.client
    }

    pub async fn list(&self, check_updates: bool) -> Result<Vec<PluginInfo>, OpsError> {
        Ok(self.client.list_plugins(check_updates).await?)
    }

    /// Current state of `plugin_file`, from a fresh listing.
    pub async fn state(&self, plugin_file: &str) -> Result<PluginState, OpsError> {
        let plugins = self.client.list_plugins(false).await?;
        Ok(PluginState::of(plugin_file, &plugins))
    }

    /// Upload a local ZIP. The archive is checked before anything is sent.
    pub async fn upload(&self, zip_path: &std::path::Path, activate: bool) -> Result<InstallOutcome, OpsError> {
        let response = self.client.upload_plugin(zip_path).await?;
        self.finish_install(response, activate).await
    }

    /// Have the site fetch and install a ZIP from `plugin_url`.
    pub async fn install_from_url(&self, plugin_url: &str, activate: bool) -> Result<InstallOutcome, OpsError> {
        let response = self.client.install_plugin_from_url(plugin_url).await?;
        self.finish_install(response, activate).await
    }

    pub async fn install(&self, spec: &InstallSpec) -> Result<InstallOutcome, OpsError> {
        match &spec.source {
            InstallSource::Path(path) => self.upload(path, spec.activate).await,
            InstallSource::Url(url) => self.install_from_url(url, spec.activate).await,
        }
    }

    async fn finish_install(&self, response: PluginResponse, activate: bool) -> Result<InstallOutcome, OpsError> {
        let mut outcome = InstallOutcome {
            success: response.success,
            plugin_file: response.plugin_file.clone(),
            message: if response.success { response.message.clone() } else { Some(response.failure_message()) },
            activated: None,
        };
        if !response.success || !activate {
            return Ok(outcome);
        }

        if response.activated == Some(true) {
            outcome.activated = Some(true);
            return Ok(outcome);
        }

        let Some(plugin_file) = response.plugin_file.as_deref() else {
            tracing::warn!(site = %self.client.site().name, "install response has no plugin file; cannot activate");
            outcome.activated = Some(false);
            return Ok(outcome);
        };

        let activation = self.client.plugin_action(PluginAction::Activate, plugin_file).await;
        outcome.activated = Some(match activation {
            Ok(r) if r.success => true,
            Ok(r) => {
                tracing::warn!(site = %self.client.site().name, plugin_file, error = %r.failure_message(), "activation after install failed");
                false
            }
            Err(e) => {
                tracing::warn!(site = %self.client.site().name, plugin_file, error = %e, "activation after install failed");
                false
            }
        });
        Ok(outcome)
    }

    /// Activate an installed plugin. Activating an active plugin is a no-op
    /// on the server and succeeds.
    pub async fn activate(&self, plugin_file: &str) -> Result<PluginResponse, OpsError> {
        self.require_installed(plugin_file, "activate").await?;
        Ok(self.client.plugin_action(PluginAction::Activate, plugin_file).await?)
    }

    pub async fn deactivate(&self, plugin_file: &str) -> Result<PluginResponse, OpsError> {
        self.require_installed(plugin_file, "deactivate").await?;
        Ok(self.client.plugin_action(PluginAction::Deactivate, plugin_file).await?)
    }

    /// Delete a plugin. Refused unless it is installed and inactive.
    pub async fn delete(&self, plugin_file: &str) -> Result<PluginResponse, OpsError> {
        let state = self.state(plugin_file).await?;
        if state != PluginState::Inactive {
            return Err(OpsError::PluginState { plugin_file: plugin_file.to_string(), state, action: "delete" });
        }
        Ok(self.client.plugin_action(PluginAction::Delete, plugin_file).await?)
    }

    pub async fn update(&self, plugin_file: &str) -> Result<PluginResponse, OpsError> {
        self.require_installed(plugin_file, "update").await?;
        Ok(self.client.plugin_action(PluginAction::Update, plugin_file).await?)
    }

    async fn require_installed(&self, plugin_file: &str, action: &'static str) -> Result<PluginState, OpsError> {
        let state = self.state(plugin_file).await?;
        if state == PluginState::NotInstalled {
            return Err(OpsError::PluginState { plugin_file: plugin_file.to_string(), state, action });
        }
        Ok(state)
    }

    /// Install each spec in order. Failures are recorded and the run goes on.
    pub async fn bulk_install(
        &self, specs: &[InstallSpec], progress: &mut dyn ProgressSink,
    ) -> Result<BulkOperationResult, OpsError> {
        let total = specs.len();
        let mut result = BulkOperationResult::new(total);

        for (i, spec) in specs.iter().enumerate() {
            let label = spec.source.label();
            match self.install(spec).await {
                Ok(outcome) if outcome.success => {
                    let detail = json!({ "plugin_file": outcome.plugin_file, "activated": outcome.activated });
                    result.record_success(&label, outcome.plugin_file.clone(), Some(detail));
                }
                Ok(outcome) => {
                    let message = outcome.message.unwrap_or_else(|| "server reported failure".into());
                    tracing::warn!(site = %self.client.site().name, source = %label, error = %message, "plugin install failed");
                    result.record_failure(&label, None, message);
                }
                Err(e) => {
                    tracing::warn!(site = %self.client.site().name, source = %label, error = %e, "plugin install failed");
                    result.record_failure(&label, None, e);
                }
            }
            progress.report(Progress::new(i + 1, total, format!("Installed {label}")));
        }

        tracing::info!(
            site = %self.client.site().name,
            succeeded = result.succeeded,
            failed = result.failed,
            "bulk install finished"
        );
        Ok(result)
    }

    /// Update every plugin with an update available.
    ///
    /// The listing forces an update check; if it fails nothing is attempted.
    pub async fn update_all_outdated(&self, progress: &mut dyn ProgressSink) -> Result<BulkOperationResult, OpsError> {
        let outdated: Vec<PluginInfo> =
            self.client.list_plugins(true).await?.into_iter().filter(|p| p.update_available).collect();

        let total = outdated.len();
        let mut result = BulkOperationResult::new(total);

        for (i, plugin) in outdated.iter().enumerate() {
            let name = Some(plugin.name.clone());
            match self.client.plugin_action(PluginAction::Update, &plugin.plugin_file).await {
                Ok(r) if r.success => {
                    let detail = json!({ "from": plugin.version, "to": plugin.update_version });
                    result.record_success(&plugin.plugin_file, name, Some(detail));
                }
                Ok(r) => {
                    let message = r.failure_message();
                    tracing::warn!(site = %self.client.site().name, plugin_file = %plugin.plugin_file, error = %message, "plugin update failed");
                    result.record_failure(&plugin.plugin_file, name, message);
                }
                Err(e) => {
                    tracing::warn!(site = %self.client.site().name, plugin_file = %plugin.plugin_file, error = %e, "plugin update failed");
                    result.record_failure(&plugin.plugin_file, name, e);
                }
            }
            progress.report(Progress::new(i + 1, total, format!("Updated {}", plugin.name)));
        }

        tracing::info!(
            site = %self.client.site().name,
            outdated = total,
            succeeded = result.succeeded,
            failed = result.failed,
            "plugin updates finished"
        );
        Ok(result)
    }

    /// Snapshot of installed plugins grouped by state.
    pub async fn inventory(&self) -> Result<PluginInventory, OpsError> {
        let (active, inactive): (Vec<_>, Vec<_>) = self.client.list_plugins(false).await?.into_iter().partition(|p| p.active);
        Ok(PluginInventory { site_url: self.client.site_url(), exported_at: Utc::now(), active, inactive })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_spec_from_json() {
        let spec: InstallSpec = serde_json::from_str(r#"{"url": "https://dl.example/p.zip", "activate": true}"#).unwrap();
        assert_eq!(spec.source, InstallSource::Url("https://dl.example/p.zip".into()));
        assert!(spec.activate);

        let spec: InstallSpec = serde_json::from_str(r#"{"path": "./forms.zip"}"#).unwrap();
        assert_eq!(spec.source, InstallSource::Path(PathBuf::from("./forms.zip")));
        assert!(!spec.activate);
    }
}
