//! Record types stored in the per-network project files

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::custom_serde::unknown_or;

/// The keccak digest of a piece of contract bytecode, rendered as un-prefixed hex
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BytecodeHash(pub B256);

impl Display for BytecodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for BytecodeHash {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw).map_err(|e| e.to_string())?;
        if bytes.len() != B256::len_bytes() {
            return Err(format!("expected a 32-byte hash, got {} bytes", bytes.len()));
        }

        Ok(BytecodeHash(B256::from_slice(&bytes)))
    }
}

/// A record holding nothing but an on-chain address, used for the package,
/// provider & application entries of a network file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// The on-chain address
    pub address: Address,
    /// Fields not interpreted by this crate, preserved across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AddressRecord {
    /// Create a record for the given address
    pub fn new(address: Address) -> Self {
        Self {
            address,
            extra: Map::new(),
        }
    }
}

/// The locally recorded deployment of a logic contract, keyed by alias
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    /// The address at which the implementation is deployed
    pub address: Address,
    /// The constructor portion of the creation code
    #[serde(default, with = "unknown_or")]
    pub constructor_code: Option<Bytes>,
    /// The digest of the runtime code, excluding constructor-only bytes
    #[serde(default, with = "unknown_or")]
    pub body_bytecode_hash: Option<BytecodeHash>,
    /// The digest of the creation code of the local build
    #[serde(default, with = "unknown_or")]
    pub local_bytecode_hash: Option<BytecodeHash>,
    /// The digest of the creation code that was deployed
    #[serde(default, with = "unknown_or")]
    pub deployed_bytecode_hash: Option<BytecodeHash>,
    /// Fields not interpreted by this crate, preserved across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContractRecord {
    /// A record for a contract at the given address about which nothing else
    /// is known
    pub fn unknown_at(address: Address) -> Self {
        Self {
            address,
            constructor_code: None,
            body_bytecode_hash: None,
            local_bytecode_hash: None,
            deployed_bytecode_hash: None,
            extra: Map::new(),
        }
    }
}

/// The locally recorded deployment of a proxy, stored under its package name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    /// The alias of the contract the proxy delegates to
    pub contract: String,
    /// The address of the proxy itself
    pub address: Address,
    /// The package version the proxy was created or last upgraded with
    pub version: String,
    /// The address of the implementation the proxy delegates to
    pub implementation: Address,
    /// Fields not interpreted by this crate, preserved across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ProxyRecord {
    /// Create a proxy record
    pub fn new(contract: &str, address: Address, version: &str, implementation: Address) -> Self {
        Self {
            contract: contract.to_string(),
            address,
            version: version.to_string(),
            implementation,
            extra: Map::new(),
        }
    }

    /// Whether this record is the one identified by the given alias & address
    pub fn matches(&self, alias: &str, address: Address) -> bool {
        self.contract == alias && self.address == address
    }
}

/// Identifies a single proxy record by its `(package, alias, address)` triple
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProxySelector {
    /// The name of the package the proxy belongs to
    pub package: String,
    /// The alias of the contract the proxy delegates to
    pub alias: String,
    /// The address of the proxy
    pub address: Address,
}

impl ProxySelector {
    /// Create a selector from its parts
    pub fn new(package: &str, alias: &str, address: Address) -> Self {
        Self {
            package: package.to_string(),
            alias: alias.to_string(),
            address,
        }
    }
}

impl Display for ProxySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} at {:#x}", self.package, self.alias, self.address)
    }
}

/// A linked dependency package, keyed by dependency name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// The address of the linked package's on-chain registry
    pub package: Address,
    /// The linked version
    pub version: String,
    /// Fields not interpreted by this crate, preserved across rewrites
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DependencyRecord {
    /// Create a dependency record
    pub fn new(package: Address, version: &str) -> Self {
        Self {
            package,
            version: version.to_string(),
            extra: Map::new(),
        }
    }
}
