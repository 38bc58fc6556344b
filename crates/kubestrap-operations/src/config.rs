use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use kubestrap_host::PackageManager;
use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/kubestrap/config.toml";
pub const DEFAULT_LOG_DIR: &str = "/var/log/kubestrap";

/// Pod network add-on applied after `kubeadm init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CniPlugin {
    #[default]
    Flannel,
    Calico,
}

impl CniPlugin {
    #[must_use]
    pub fn manifest_url(self) -> &'static str {
        match self {
            Self::Flannel => {
                "https://github.com/flannel-io/flannel/releases/latest/download/kube-flannel.yml"
            }
            Self::Calico => {
                "https://raw.githubusercontent.com/projectcalico/calico/v3.28.0/manifests/calico.yaml"
            }
        }
    }

    /// Pod CIDR the stock manifest expects.
    #[must_use]
    pub fn default_pod_cidr(self) -> &'static str {
        match self {
            Self::Flannel => "10.244.0.0/16",
            Self::Calico => "192.168.0.0/16",
        }
    }
}

impl fmt::Display for CniPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flannel => write!(f, "flannel"),
            Self::Calico => write!(f, "calico"),
        }
    }
}

impl FromStr for CniPlugin {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flannel" => Ok(Self::Flannel),
            "calico" => Ok(Self::Calico),
            other => Err(ConfigError::UnknownCni(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterConfig {
    pub kubernetes_version: Option<String>,
    pub pod_network_cidr: Option<String>,
    pub service_cidr: Option<String>,
    pub cni: CniPlugin,
    pub control_plane_endpoint: Option<String>,
    pub allow_schedule_on_control_plane: bool,
}

impl ClusterConfig {
    /// Configured pod CIDR, or the one the chosen CNI expects.
    #[must_use]
    pub fn effective_pod_cidr(&self) -> &str {
        self.pod_network_cidr
            .as_deref()
            .unwrap_or_else(|| self.cni.default_pod_cidr())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub package_manager: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub host_root: Option<PathBuf>,
}

impl RuntimeConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPackageManager`] for an unsupported name.
    pub fn package_manager(&self) -> Result<Option<PackageManager>, ConfigError> {
        self.package_manager
            .as_deref()
            .map(str::parse)
            .transpose()
            .map_err(ConfigError::from)
    }

    #[must_use]
    pub fn log_dir(&self) -> &Path {
        self.log_dir
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_LOG_DIR))
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubestrapConfig {
    pub cluster: ClusterConfig,
    pub runtime: RuntimeConfig,
}

impl KubestrapConfig {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.runtime.package_manager()?;
        Ok(config)
    }

    /// Load `path` if given, else the default location if it exists, else
    /// defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit path is missing or any file is invalid.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if `contents` is not valid TOML for this schema.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// Credentials a worker uses to join an existing control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinConfig {
    pub api_server: String,
    pub token: String,
    pub discovery_token_ca_cert_hash: String,
}
