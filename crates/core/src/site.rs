//! Sites and the credential lookup used to reach them.
//!
//! The core never owns credential storage. A [`SecretStore`] is injected and
//! the [`SiteRegistry`] joins configured `{name, url}` pairs with it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::Error;
use crate::config::SiteEntry;

/// One remote WordPress installation.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub name: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl Site {
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self { name: name.into(), base_url: base_url.into(), api_key: api_key.into() }
    }
}

impl fmt::Debug for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Site")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Credential storage keyed by site name.
pub trait SecretStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, Error>;

    fn set(&self, name: &str, value: &str) -> Result<(), Error>;

    /// Returns true if a secret was removed.
    fn delete(&self, name: &str) -> Result<bool, Error>;
}

/// Process-local secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> Result<Option<String>, Error> {
        let secrets = self.secrets.read().unwrap_or_else(|e| e.into_inner());
        Ok(secrets.get(name).cloned())
    }

    fn set(&self, name: &str, value: &str) -> Result<(), Error> {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        secrets.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut secrets = self.secrets.write().unwrap_or_else(|e| e.into_inner());
        Ok(secrets.remove(name).is_some())
    }
}

/// Read-only store backed by environment variables.
///
/// The key for site `my-shop` is read from `WPBM_API_KEY_MY_SHOP`.
#[derive(Debug, Clone)]
pub struct EnvSecretStore {
    prefix: String,
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self { prefix: "WPBM_API_KEY_".into() }
    }
}

impl EnvSecretStore {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// Environment variable consulted for a site name.
    pub fn var_name(&self, name: &str) -> String {
        let suffix: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, suffix)
    }
}

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Result<Option<String>, Error> {
        Ok(std::env::var(self.var_name(name)).ok().filter(|v| !v.is_empty()))
    }

    fn set(&self, name: &str, _value: &str) -> Result<(), Error> {
        Err(Error::SecretReadOnly(format!("export {} instead", self.var_name(name))))
    }

    fn delete(&self, name: &str) -> Result<bool, Error> {
        Err(Error::SecretReadOnly(format!("unset {} instead", self.var_name(name))))
    }
}

/// Configured sites plus the secret store that holds their API keys.
#[derive(Clone)]
pub struct SiteRegistry {
    entries: Vec<SiteEntry>,
    secrets: Arc<dyn SecretStore>,
}

impl SiteRegistry {
    pub fn new(entries: Vec<SiteEntry>, secrets: Arc<dyn SecretStore>) -> Self {
        Self { entries, secrets }
    }

    /// Configured entries in declaration order.
    pub fn entries(&self) -> &[SiteEntry] {
        &self.entries
    }

    /// API key for a site name.
    pub fn get_api_key(&self, name: &str) -> Result<String, Error> {
        self.secrets.get(name)?.ok_or_else(|| Error::SecretMissing(name.to_string()))
    }

    /// Build a [`Site`] for the given name.
    pub fn resolve(&self, name: &str) -> Result<Site, Error> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::UnknownSite(name.to_string()))?;
        let api_key = self.get_api_key(name)?;
        Ok(Site::new(&entry.name, &entry.url, api_key))
    }

    /// Resolve every site, skipping (and logging) those without a key.
    pub fn resolve_all(&self) -> Vec<Site> {
        self.entries
            .iter()
            .filter_map(|entry| match self.resolve(&entry.name) {
                Ok(site) => Some(site),
                Err(e) => {
                    tracing::warn!(site = %entry.name, error = %e, "skipping site");
                    None
                }
            })
            .collect()
    }
}
