//! Local build artifacts and the bytecode digests computed from them

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy_primitives::{keccak256, Bytes};
use serde::Deserialize;

use crate::{
    constants::{JSON_EXTENSION, METADATA_LENGTH_BYTES, METADATA_MAP_HEADERS},
    errors::ProjectFileError,
    types::BytecodeHash,
};

/// Strip the trailing CBOR-encoded Solidity metadata from a piece of bytecode,
/// if present.
///
/// The metadata embeds a hash of the compiler inputs, so two builds of the same
/// code from different source trees differ only there.
pub fn strip_metadata(code: &[u8]) -> &[u8] {
    if code.len() < METADATA_LENGTH_BYTES {
        return code;
    }

    let len_offset = code.len() - METADATA_LENGTH_BYTES;
    let metadata_len = u16::from_be_bytes([code[len_offset], code[len_offset + 1]]) as usize;
    if metadata_len == 0 || metadata_len > len_offset {
        return code;
    }

    let metadata_start = len_offset - metadata_len;
    if METADATA_MAP_HEADERS.contains(&code[metadata_start]) {
        &code[..metadata_start]
    } else {
        code
    }
}

/// The digest of a piece of bytecode, ignoring its metadata
pub fn bytecode_digest(code: &[u8]) -> BytecodeHash {
    BytecodeHash(keccak256(strip_metadata(code)))
}

/// The subset of a compiler build artifact used to reason about bytecode
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArtifact {
    /// The contract type name
    contract_name: Option<String>,
    /// The creation code, hex encoded
    bytecode: String,
    /// The runtime code, hex encoded
    deployed_bytecode: String,
}

/// A parsed build artifact
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildArtifact {
    /// The contract type name
    pub contract_name: String,
    /// The creation code
    pub bytecode: Bytes,
    /// The runtime code
    pub deployed_bytecode: Bytes,
}

impl BuildArtifact {
    /// Parse an artifact from its JSON contents
    pub fn from_json(contract_name: &str, contents: &str) -> Result<Self, ProjectFileError> {
        let raw: RawArtifact = serde_json::from_str(contents)
            .map_err(|e| ProjectFileError::ArtifactParsing(e.to_string()))?;

        // Unlinked library placeholders are not valid hex and are rejected here
        let bytecode = Bytes::from_str(&raw.bytecode)
            .map_err(|e| ProjectFileError::ArtifactParsing(e.to_string()))?;
        let deployed_bytecode = Bytes::from_str(&raw.deployed_bytecode)
            .map_err(|e| ProjectFileError::ArtifactParsing(e.to_string()))?;

        Ok(Self {
            contract_name: raw.contract_name.unwrap_or_else(|| contract_name.to_string()),
            bytecode,
            deployed_bytecode,
        })
    }

    /// The runtime code, i.e. the creation code minus its constructor
    pub fn body_code(&self) -> &[u8] {
        &self.deployed_bytecode
    }

    /// The constructor portion of the creation code: everything preceding the
    /// embedded runtime code. `None` if the runtime code is not embedded.
    pub fn constructor_code(&self) -> Option<Bytes> {
        let body = self.body_code();
        if body.is_empty() || body.len() > self.bytecode.len() {
            return None;
        }

        self.bytecode
            .windows(body.len())
            .position(|window| window == body)
            .map(|start| Bytes::copy_from_slice(&self.bytecode[..start]))
    }

    /// Whether the given runtime code is this artifact's body, ignoring metadata
    pub fn matches_body(&self, code: &[u8]) -> bool {
        strip_metadata(self.body_code()) == strip_metadata(code)
    }

    /// The digest of the creation code
    pub fn bytecode_hash(&self) -> BytecodeHash {
        bytecode_digest(&self.bytecode)
    }
}

/// A source of build artifacts, looked up by contract type name
pub trait ArtifactSource {
    /// The artifact for the given contract, or `None` if it was never built
    fn artifact(&self, contract_name: &str) -> Result<Option<BuildArtifact>, ProjectFileError>;
}

/// Build artifacts stored as `<build_dir>/<ContractName>.json`
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The directory containing the artifacts
    build_dir: PathBuf,
}

impl ArtifactStore {
    /// Create a store reading from the given build directory
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    /// The directory containing the artifacts
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// The path of the artifact for the given contract
    pub fn artifact_path(&self, contract_name: &str) -> PathBuf {
        self.build_dir
            .join(format!("{contract_name}.{JSON_EXTENSION}"))
    }
}

impl ArtifactSource for ArtifactStore {
    fn artifact(&self, contract_name: &str) -> Result<Option<BuildArtifact>, ProjectFileError> {
        let path = self.artifact_path(contract_name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| ProjectFileError::ReadFile(format!("{}: {}", path.display(), e)))?;
        BuildArtifact::from_json(contract_name, &contents).map(Some)
    }
}

impl ArtifactSource for HashMap<String, BuildArtifact> {
    fn artifact(&self, contract_name: &str) -> Result<Option<BuildArtifact>, ProjectFileError> {
        Ok(self.get(contract_name).cloned())
    }
}
