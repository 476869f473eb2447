//! Plugin management endpoints.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{ApiError, WpClient, unwrap_list, validate_plugin_archive};

/// Uploads and installs run the WordPress upgrader; they get at least this long.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Installed plugin as reported by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    #[serde(alias = "file")]
    pub plugin_file: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub update_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_version: Option<String>,
}

impl PluginInfo {
    pub fn state(&self) -> PluginState {
        if self.active { PluginState::Active } else { PluginState::Inactive }
    }
}

/// Lifecycle of a plugin on one site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginState {
    NotInstalled,
    Inactive,
    Active,
}

impl PluginState {
    /// State of `plugin_file` according to a listing.
    pub fn of(plugin_file: &str, plugins: &[PluginInfo]) -> Self {
        plugins
            .iter()
            .find(|p| p.plugin_file == plugin_file)
            .map_or(PluginState::NotInstalled, PluginInfo::state)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginState::NotInstalled => "not installed",
            PluginState::Inactive => "inactive",
            PluginState::Active => "active",
        })
    }
}

/// Actions addressed to an installed plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginAction {
    Activate,
    Deactivate,
    Delete,
    Update,
}

impl PluginAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginAction::Activate => "activate",
            PluginAction::Deactivate => "deactivate",
            PluginAction::Delete => "delete",
            PluginAction::Update => "update",
        }
    }
}

/// Answer of the install and action endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PluginResponse {
    /// Explanation to record when `success` is false.
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "server reported failure".into())
    }
}

fn parse_response(value: Value) -> Result<PluginResponse, ApiError> {
    Ok(serde_json::from_value(value)?)
}

impl WpClient {
    /// Installed plugins. Always read fresh: plugin state changes under the
    /// listing with every action. `force_update_check` makes the server refresh
    /// its update information first.
    pub async fn list_plugins(&self, force_update_check: bool) -> Result<Vec<PluginInfo>, ApiError> {
        let params: Vec<(&str, String)> =
            if force_update_check { vec![("force_update_check", "true".into())] } else { Vec::new() };
        let response = self.get("plugins", &params, false).await?;
        unwrap_list(response, "plugins")?
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(ApiError::from))
            .collect()
    }

    /// Upload a plugin archive. The archive is validated locally first; an
    /// invalid archive never reaches the network.
    pub async fn upload_plugin(&self, zip_path: &Path) -> Result<PluginResponse, ApiError> {
        let summary = validate_plugin_archive(zip_path)?;
        let bytes = tokio::fs::read(zip_path).await?;
        let file_name = zip_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plugin.zip".into());

        tracing::info!(
            site = %self.site().name,
            file = %file_name,
            entries = summary.entries,
            "uploading plugin"
        );

        let timeout = UPLOAD_TIMEOUT.max(self.options().timeout());
        let response = self
            .post_multipart("plugins/upload", timeout, || {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str("application/zip")
                    .map_err(|e| ApiError::InvalidInput(e.to_string()))?;
                Ok(reqwest::multipart::Form::new().part("plugin_file", part))
            })
            .await?;
        parse_response(response)
    }

    /// Ask the server to download and install a plugin archive.
    pub async fn install_plugin_from_url(&self, plugin_url: &str) -> Result<PluginResponse, ApiError> {
        let parsed = url::Url::parse(plugin_url).map_err(|e| ApiError::InvalidInput(format!("{plugin_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ApiError::InvalidInput(format!("unsupported scheme in {plugin_url}")));
        }
        tracing::info!(site = %self.site().name, url = %parsed, "installing plugin from url");
        parse_response(self.post("plugins/install-url", &json!({ "url": plugin_url })).await?)
    }

    pub async fn plugin_action(&self, action: PluginAction, plugin_file: &str) -> Result<PluginResponse, ApiError> {
        if plugin_file.trim().is_empty() {
            return Err(ApiError::InvalidInput("plugin_file must not be empty".into()));
        }
        tracing::info!(site = %self.site().name, action = action.as_str(), plugin_file, "plugin action");
        let endpoint = format!("plugins/{}", action.as_str());
        parse_response(self.post(&endpoint, &json!({ "plugin_file": plugin_file })).await?)
    }
}
