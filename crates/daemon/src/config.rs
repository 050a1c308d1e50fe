//! On-disk configuration for the etcdfs binary
//!
//! The file is optional TOML. Every field has a default, so an empty file
//! and a missing file behave the same.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use common::namespace::AttrFailurePolicy;
use common::store::{Consistency, EtcdConfig, DEFAULT_ENDPOINT};

/// Directory under the user config dir holding `config.toml`
pub const APP_NAME: &str = "etcdfs";
/// Filesystem name and subtype reported to the kernel
pub const FS_NAME: &str = "etcdfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("at least one etcd endpoint is required")]
    NoEndpoints,
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// etcd client URLs, tried in order
    pub endpoints: Vec<String>,
    pub consistency: Consistency,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
    /// What attribute queries report when the store read fails
    pub attr_errors: AttrFailurePolicy,
    /// Let users other than the mounter see the filesystem
    pub allow_other: bool,
    /// Source name shown in the mount table
    pub fs_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            consistency: Consistency::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            attr_errors: AttrFailurePolicy::default(),
            allow_other: false,
            fs_name: FS_NAME.to_string(),
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/etcdfs/config.toml` (or the platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load an explicit file, else the default file if it exists, else
    /// built-in defaults. An explicit path that cannot be read is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Parse and check every endpoint
    pub fn endpoint_urls(&self) -> Result<Vec<Url>, ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        self.endpoints
            .iter()
            .map(|endpoint| parse_endpoint(endpoint))
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        self.endpoint_urls().map(|_| ())
    }

    pub fn etcd_config(&self) -> Result<EtcdConfig, ConfigError> {
        self.validate()?;
        Ok(EtcdConfig {
            endpoints: self.endpoint_urls()?,
            consistency: self.consistency,
            request_timeout: self.request_timeout(),
        })
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}
