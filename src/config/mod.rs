//! Configuration management for k3sync

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};
use crate::warehouse::{WarehouseGroup, default_groups, default_query_order, query_codes};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// K3 Cloud connection and credentials
    #[serde(default)]
    pub k3: K3Settings,

    /// Cache locations
    #[serde(default)]
    pub cache: CacheSettings,

    /// Warehouse groups, in display order
    #[serde(default = "default_groups")]
    pub warehouses: Vec<WarehouseGroup>,

    /// Group keys in query (row concatenation) order
    #[serde(default = "default_query_order")]
    pub query_order: Vec<String>,
}

/// K3 Cloud connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct K3Settings {
    /// Server root, e.g. `http://host/K3Cloud`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// Data center (account set) ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acct_id: Option<String>,

    /// `<clientId>_<encodedSecret>` as issued by the K3 third-party app registry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    /// Application secret used for the KD signature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,

    /// Integration user name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Locale ID
    #[serde(default = "default_lcid")]
    pub lcid: u32,

    /// Organization number
    #[serde(default)]
    pub org_num: u32,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Row limit per warehouse query
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Client-side request throttle
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            k3: K3Settings::default(),
            cache: CacheSettings::default(),
            warehouses: default_groups(),
            query_order: default_query_order(),
        }
    }
}

fn default_lcid() -> u32 {
    2052
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_limit() -> usize {
    100
}

fn default_requests_per_second() -> u32 {
    10
}

impl Default for K3Settings {
    fn default() -> Self {
        Self {
            server_url: None,
            acct_id: None,
            app_id: None,
            app_secret: None,
            user_name: None,
            lcid: default_lcid(),
            org_num: 0,
            timeout_secs: default_timeout_secs(),
            page_limit: default_page_limit(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Validated K3 credentials, ready to build a client from
#[derive(Debug, Clone)]
pub struct K3Credentials {
    pub server_url: String,
    pub acct_id: String,
    pub app_id: String,
    pub app_secret: String,
    pub user_name: String,
    pub lcid: u32,
    pub org_num: u32,
}

/// Cache locations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Directory of the durable snapshot store (defaults to the XDG cache dir)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// Published snapshot: a file path or an http(s) URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".k3sync").join("config.yaml"))
    }

    /// Resolve the path to use: explicit override or the default location
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load from `path` (or the default location) and apply env overrides.
    ///
    /// A missing file yields the default configuration so that a fully
    /// env-driven setup works.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Override settings from `K3SYNC_*` variables supplied by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let k3 = &mut self.k3;
        for (var, slot) in [
            ("K3SYNC_SERVER_URL", &mut k3.server_url),
            ("K3SYNC_ACCT_ID", &mut k3.acct_id),
            ("K3SYNC_APP_ID", &mut k3.app_id),
            ("K3SYNC_APP_SECRET", &mut k3.app_secret),
            ("K3SYNC_USER_NAME", &mut k3.user_name),
            ("K3SYNC_PUBLISHED", &mut self.cache.published),
        ] {
            if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
                *slot = Some(value);
            }
        }
    }

    /// Validate that the credentials needed for a signed query are present
    pub fn credentials(&self) -> Result<K3Credentials> {
        fn required(value: &Option<String>, name: &'static str) -> Result<String> {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingCredentials(name).into())
        }

        Ok(K3Credentials {
            server_url: required(&self.k3.server_url, "server_url")?
                .trim_end_matches('/')
                .to_string(),
            acct_id: required(&self.k3.acct_id, "acct_id")?,
            app_id: required(&self.k3.app_id, "app_id")?,
            app_secret: required(&self.k3.app_secret, "app_secret")?,
            user_name: self.k3.user_name.clone().unwrap_or_default(),
            lcid: self.k3.lcid,
            org_num: self.k3.org_num,
        })
    }

    /// Directory of the durable snapshot store
    pub fn cache_dir(&self) -> Result<PathBuf> {
        match &self.cache.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(crate::cache::SnapshotStore::default_dir()?),
        }
    }

    /// Warehouse codes to fetch, in query order
    pub fn query_codes(&self) -> Vec<String> {
        query_codes(&self.warehouses, &self.query_order)
    }

    /// Check the warehouse layout is usable
    pub fn validate_warehouses(&self) -> Result<()> {
        if self.warehouses.is_empty() {
            return Err(ConfigError::Invalid("no warehouse groups configured".to_string()).into());
        }
        if let Some(group) = self.warehouses.iter().find(|g| g.codes.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "warehouse group `{}` has no codes",
                group.key
            ))
            .into());
        }
        Ok(())
    }
}
