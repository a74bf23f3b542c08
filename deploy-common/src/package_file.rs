//! The project-level package file, declaring contracts & dependencies
//! independently of any network

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ProjectFileError;

/// The contents of the project's `zos.json`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    /// The package name
    pub name: String,
    /// The declared package version
    pub version: String,
    /// Whether the package is published to an on-chain registry. Unpublished
    /// ("lightweight") projects have no package, provider or application.
    #[serde(default = "default_publish")]
    pub publish: bool,
    /// Declared contracts, mapping alias to contract type name
    #[serde(default)]
    pub contracts: IndexMap<String, String>,
    /// Declared dependencies, mapping name to required version
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,
    /// Fields not interpreted by this crate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Projects are published unless they opt out
fn default_publish() -> bool {
    true
}

impl PackageFile {
    /// Parse a package file from its JSON contents
    pub fn from_json(contents: &str) -> Result<Self, ProjectFileError> {
        serde_json::from_str(contents).map_err(|e| ProjectFileError::Parse(e.to_string()))
    }

    /// Create an empty package file
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            publish: true,
            contracts: IndexMap::new(),
            dependencies: IndexMap::new(),
            extra: Map::new(),
        }
    }

    /// The contract type name declared for the given alias
    pub fn contract(&self, alias: &str) -> Option<&str> {
        self.contracts.get(alias).map(String::as_str)
    }

    /// Whether the given alias is declared
    pub fn has_contract(&self, alias: &str) -> bool {
        self.contracts.contains_key(alias)
    }

    /// Whether any contract is declared
    pub fn has_contracts(&self) -> bool {
        !self.contracts.is_empty()
    }

    /// The version requirement declared for the given dependency
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }

    /// Whether the given dependency is declared
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Whether any dependency is declared
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}
