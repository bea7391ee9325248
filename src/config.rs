//! Configuration Management
//!
//! Handles persistent configuration storage for flowbridge. Values resolve
//! with environment variable > config file precedence.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Adapter configuration as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Base URL of the automation platform, e.g. `https://flow.example.com`
    #[serde(default)]
    pub host: Option<String>,
    /// Platform user name
    #[serde(default)]
    pub user: Option<String>,
    /// Platform credential secret
    #[serde(default)]
    pub secret: Option<String>,
    /// Tenant (account scope) all operations run under
    #[serde(default)]
    pub tenant: Option<String>,
    /// Contact email recorded on submitted jobs; defaults to `user@tenant`
    #[serde(default)]
    pub email: Option<String>,
}

impl Config {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flowbridge").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Validation(format!("cannot create config dir: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Validation(format!("cannot serialize config: {}", e)))?;
        std::fs::write(&path, content)
            .map_err(|e| Error::Validation(format!("cannot write config: {}", e)))?;

        Ok(())
    }

    /// Effective host (env > config file)
    pub fn effective_host(&self) -> Option<String> {
        std::env::var("FLOWBRIDGE_HOST").ok().or_else(|| self.host.clone())
    }

    /// Effective user (env > config file)
    pub fn effective_user(&self) -> Option<String> {
        std::env::var("FLOWBRIDGE_USER").ok().or_else(|| self.user.clone())
    }

    /// Effective secret (env > config file)
    pub fn effective_secret(&self) -> Option<String> {
        std::env::var("FLOWBRIDGE_SECRET").ok().or_else(|| self.secret.clone())
    }

    /// Effective tenant (env > config file)
    pub fn effective_tenant(&self) -> Option<String> {
        std::env::var("FLOWBRIDGE_TENANT").ok().or_else(|| self.tenant.clone())
    }

    /// Resolve into a complete configuration, or fail with a configuration
    /// error naming the first missing value.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        let host = self
            .effective_host()
            .ok_or_else(|| Error::Validation("host is not configured".into()))?;
        let user = self
            .effective_user()
            .ok_or_else(|| Error::Validation("user is not configured".into()))?;
        let secret = self
            .effective_secret()
            .ok_or_else(|| Error::Validation("secret is not configured".into()))?;
        let tenant = self
            .effective_tenant()
            .ok_or_else(|| Error::Validation("tenant is not configured".into()))?;

        let email = self
            .email
            .clone()
            .unwrap_or_else(|| format!("{}@{}", user, tenant));

        Ok(ResolvedConfig {
            host,
            user,
            secret,
            tenant,
            email,
        })
    }
}

/// A fully resolved configuration, ready to open a session with.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub host: String,
    pub user: String,
    pub secret: String,
    pub tenant: String,
    pub email: String,
}
