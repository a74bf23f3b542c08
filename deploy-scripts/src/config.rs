//! Project & network configuration.
//!
//! A project is configured either by a project-native `networks.json` or by a
//! Truffle-style `truffle-config.json`; the native file wins when both exist.
//! The config is discovered once at startup and folded, together with the CLI
//! flags, into a [`ScriptConfig`] that is passed to every command.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use deploy_common::constants::DEFAULT_BUILD_DIR;
use serde::Deserialize;
use tracing::debug;

use crate::{
    cli::Cli,
    constants::{
        DEFAULT_QUERY_TIMEOUT_SECS, DEFAULT_RPC_PROTOCOL, NATIVE_CONFIG_FILE_NAME,
        TRUFFLE_CONFIG_FILE_NAME,
    },
    errors::ScriptError,
};

/// The connection settings of a single network, as written in a config file
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NetworkEntry {
    /// A full RPC url
    #[serde(default)]
    pub url: Option<String>,
    /// The RPC host, used when no url is given
    #[serde(default)]
    pub host: Option<String>,
    /// The RPC port, used when no url is given
    #[serde(default)]
    pub port: Option<u16>,
    /// The RPC protocol, used when no url is given
    #[serde(default)]
    pub protocol: Option<String>,
    /// The query timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl NetworkEntry {
    /// The RPC url of the network, if configured
    pub fn rpc_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }

        let host = self.host.as_ref()?;
        let protocol = self.protocol.as_deref().unwrap_or(DEFAULT_RPC_PROTOCOL);
        Some(match self.port {
            Some(port) => format!("{protocol}://{host}:{port}"),
            None => format!("{protocol}://{host}"),
        })
    }
}

/// The contents of a project config file
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    /// The directory holding the build artifacts, relative to the project root
    #[serde(default, rename = "buildDir", alias = "contracts_build_directory")]
    pub build_dir: Option<PathBuf>,
    /// The configured networks, by name
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkEntry>,
}

/// The config provider of a project
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectConfig {
    /// A project-native `networks.json`
    Native(ConfigFile),
    /// A Truffle `truffle-config.json`
    Truffle(ConfigFile),
}

impl ProjectConfig {
    /// Find & parse the config of the project rooted at `root`
    pub fn discover(root: &Path) -> Result<Self, ScriptError> {
        let native = root.join(NATIVE_CONFIG_FILE_NAME);
        if native.exists() {
            debug!("using project config {}", native.display());
            return read_config_file(&native).map(ProjectConfig::Native);
        }

        let truffle = root.join(TRUFFLE_CONFIG_FILE_NAME);
        if truffle.exists() {
            debug!("using truffle config {}", truffle.display());
            return read_config_file(&truffle).map(ProjectConfig::Truffle);
        }

        Err(ScriptError::ConfigLoading(format!(
            "could not find {NATIVE_CONFIG_FILE_NAME} or {TRUFFLE_CONFIG_FILE_NAME} in {}, \
             please remember to initialize your project",
            root.display()
        )))
    }

    /// The underlying config file
    pub fn file(&self) -> &ConfigFile {
        match self {
            ProjectConfig::Native(file) | ProjectConfig::Truffle(file) => file,
        }
    }

    /// The build artifact directory of the project rooted at `root`
    pub fn build_dir(&self, root: &Path) -> PathBuf {
        let dir = self
            .file()
            .build_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BUILD_DIR));
        root.join(dir)
    }

    /// The names of all configured networks
    pub fn network_names(&self) -> Vec<String> {
        self.file().networks.keys().cloned().collect()
    }

    /// The connection settings of the given network
    pub fn network(&self, name: &str) -> Option<&NetworkEntry> {
        self.file().networks.get(name)
    }
}

/// The resolved configuration of a script invocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptConfig {
    /// The project root directory
    pub root: PathBuf,
    /// The network operated on
    pub network: String,
    /// The RPC url of the network, if one is configured
    pub rpc_url: Option<String>,
    /// The timeout applied to each chain query
    pub timeout: Duration,
    /// The directory holding the build artifacts
    pub build_dir: PathBuf,
}

impl ScriptConfig {
    /// Resolve the configuration from the CLI flags and the project config,
    /// flags taking precedence
    pub fn load(cli: &Cli) -> Result<Self, ScriptError> {
        let project = ProjectConfig::discover(&cli.root)?;
        Self::resolve(cli, &project)
    }

    /// Resolve the configuration against an already discovered project config
    pub fn resolve(cli: &Cli, project: &ProjectConfig) -> Result<Self, ScriptError> {
        let entry = project.network(&cli.network);
        if entry.is_none() && cli.rpc_url.is_none() {
            return Err(ScriptError::ConfigLoading(format!(
                "network {} is not configured, known networks are: {}",
                cli.network,
                project.network_names().join(", ")
            )));
        }

        let rpc_url = cli
            .rpc_url
            .clone()
            .or_else(|| entry.and_then(NetworkEntry::rpc_url));
        let timeout_secs = cli
            .timeout
            .or_else(|| entry.and_then(|e| e.timeout))
            .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS);

        Ok(Self {
            root: cli.root.clone(),
            network: cli.network.clone(),
            rpc_url,
            timeout: Duration::from_secs(timeout_secs),
            build_dir: project.build_dir(&cli.root),
        })
    }

    /// The RPC url, required by commands that query the chain
    pub fn require_rpc_url(&self) -> Result<&str, ScriptError> {
        self.rpc_url.as_deref().ok_or_else(|| {
            ScriptError::ConfigLoading(format!("no RPC url configured for network {}", self.network))
        })
    }
}

/// Read & parse a config file
fn read_config_file(path: &Path) -> Result<ConfigFile, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ConfigLoading(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ConfigLoading(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::NetworkEntry;

    #[test]
    fn test_rpc_url_from_host_and_port() {
        let entry = NetworkEntry {
            host: Some("localhost".to_string()),
            port: Some(8545),
            ..Default::default()
        };
        assert_eq!(entry.rpc_url().unwrap(), "http://localhost:8545");
    }

    #[test]
    fn test_explicit_url_wins() {
        let entry = NetworkEntry {
            url: Some("https://rpc.example.org".to_string()),
            host: Some("localhost".to_string()),
            ..Default::default()
        };
        assert_eq!(entry.rpc_url().unwrap(), "https://rpc.example.org");
    }

    #[test]
    fn test_no_connection_settings() {
        assert_eq!(NetworkEntry::default().rpc_url(), None);
    }
}
