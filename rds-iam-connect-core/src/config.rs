//! YAML configuration for rds-iam-connect.
//!
//! The file lives at `~/.rds-iam-connect/config.yaml` unless a path is given
//! on the command line. On first run the default location is seeded from an
//! embedded example so the user has something to edit.

use crate::error::{RdsConnectError, Result};
use crate::models::TagFilters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Per-user directory holding the configuration and cache snapshots.
pub const APP_DIR_NAME: &str = ".rds-iam-connect";

/// Configuration file name inside [`APP_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default environment tag name.
pub const DEFAULT_ENV_TAG_NAME: &str = "ReleaseState";

const EXAMPLE_CONFIG: &str = include_str!("../config.example.yaml");

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Classification tag identifying the team's clusters
    pub rds_tags: RdsTags,
    /// Tag carrying each cluster's release state
    #[serde(default = "default_env_tag_name")]
    pub env_tag_name: String,
    /// Database users that may be selected
    #[serde(default)]
    pub allowed_iam_users: Vec<String>,
    /// Environment scope name to release state and region
    #[serde(default)]
    pub env_tag: BTreeMap<String, EnvironmentConfig>,
    #[serde(default)]
    pub caching: CacheSettings,
    /// Simulate `rds-db:connect` before minting a token
    #[serde(default)]
    pub check_iam_permissions: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub discovery: DiscoverySettings,
}

/// Classification tag pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdsTags {
    pub tag_name: String,
    pub tag_value: String,
}

/// Release state and region for one environment scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub release_state: String,
    pub region: String,
}

/// Cache snapshot settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default)]
    pub enabled: bool,
    /// Validity window, e.g. `24h`, `30m` or `1d`
    #[serde(default = "default_cache_duration")]
    pub duration: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            duration: default_cache_duration(),
        }
    }
}

/// Native database client invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_client_program")]
    pub program: String,
    /// Arguments appended after the connection arguments
    #[serde(default = "default_client_args")]
    pub extra_args: Vec<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            program: default_client_program(),
            extra_args: default_client_args(),
        }
    }
}

/// Discovery tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoverySettings {
    /// Maximum tag lookups in flight per page (1 = sequential)
    #[serde(default = "default_tag_fetch_concurrency")]
    pub tag_fetch_concurrency: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            tag_fetch_concurrency: default_tag_fetch_concurrency(),
        }
    }
}

fn default_env_tag_name() -> String {
    DEFAULT_ENV_TAG_NAME.to_string()
}

fn default_cache_duration() -> String {
    "24h".to_string()
}

fn default_client_program() -> String {
    "mysql".to_string()
}

fn default_client_args() -> Vec<String> {
    vec!["--enable-cleartext-plugin".to_string()]
}

const fn default_tag_fetch_concurrency() -> usize {
    1
}

impl Config {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// The default file is created from the bundled example when missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                seed_default_config()?;
                Self::from_file(&default_config_path()?)
            }
        }
    }

    /// Reads and parses a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RdsConnectError::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(|e| {
            RdsConnectError::configuration(format!("Failed to decode config: {}", e))
        })
    }

    /// Checks the configuration for values that would make every run fail.
    pub fn validate(&self) -> Result<()> {
        if self.rds_tags.tag_name.is_empty() || self.rds_tags.tag_value.is_empty() {
            return Err(RdsConnectError::configuration(
                "RDS tags are not configured",
            ));
        }
        if self.env_tag_name.is_empty() {
            return Err(RdsConnectError::configuration(
                "environment tag name is empty",
            ));
        }
        if self.allowed_iam_users.is_empty() {
            return Err(RdsConnectError::configuration(
                "no allowed IAM users configured",
            ));
        }
        if self.env_tag.is_empty() {
            return Err(RdsConnectError::configuration(
                "no environment tags configured",
            ));
        }
        for (name, env) in &self.env_tag {
            if env.release_state.is_empty() || env.region.is_empty() {
                return Err(RdsConnectError::configuration(format!(
                    "environment '{}' needs both release_state and region",
                    name
                )));
            }
        }
        if self.caching.enabled {
            crate::cache::parse_cache_duration(&self.caching.duration).map_err(|e| {
                RdsConnectError::configuration(format!(
                    "invalid cache duration '{}': {}",
                    self.caching.duration, e
                ))
            })?;
        }
        if self.discovery.tag_fetch_concurrency == 0 {
            return Err(RdsConnectError::configuration(
                "discovery.tag_fetch_concurrency must be at least 1",
            ));
        }
        Ok(())
    }

    /// Environment names in display order.
    pub fn environment_names(&self) -> Vec<String> {
        self.env_tag.keys().cloned().collect()
    }

    /// Looks up an environment scope.
    pub fn environment(&self, scope: &str) -> Result<&EnvironmentConfig> {
        self.env_tag.get(scope).ok_or_else(|| {
            RdsConnectError::configuration(format!("unknown environment '{}'", scope))
        })
    }

    /// Builds the tag filters for an environment scope.
    pub fn filters_for(&self, scope: &str) -> Result<TagFilters> {
        let env = self.environment(scope)?;
        Ok(TagFilters::new(
            self.rds_tags.tag_name.clone(),
            self.rds_tags.tag_value.clone(),
            self.env_tag_name.clone(),
            env.release_state.clone(),
        ))
    }
}

/// Returns `~/.rds-iam-connect`.
pub fn app_dir() -> Result<PathBuf> {
    home::home_dir()
        .map(|home| home.join(APP_DIR_NAME))
        .ok_or_else(|| RdsConnectError::configuration("failed to get user home directory"))
}

/// Returns the default configuration file path.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(app_dir()?.join(CONFIG_FILE_NAME))
}

/// Creates the default configuration file if it does not exist yet.
///
/// Returns the path when a file was created.
pub fn seed_default_config() -> Result<Option<PathBuf>> {
    let path = default_config_path()?;
    if path.exists() {
        return Ok(None);
    }
    create_default_config(&path)?;
    Ok(Some(path))
}

/// Creates `dir` (and parents) and restricts it to the owner.
pub fn ensure_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;

    // The builder mode only applies to directories it creates.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Writes the bundled example configuration to `path` with mode 0600.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_private_dir(parent).map_err(|e| {
            RdsConnectError::io(
                format!("Failed to create config directory {}", parent.display()),
                e,
            )
        })?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| {
        RdsConnectError::io(format!("Failed to create default config {}", path.display()), e)
    })?;
    file.write_all(EXAMPLE_CONFIG.as_bytes()).map_err(|e| {
        RdsConnectError::io(format!("Failed to write default config {}", path.display()), e)
    })?;

    debug!("Created default config at {}", path.display());
    Ok(())
}
