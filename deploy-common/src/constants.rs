//! Constants used in the local project files

/// The sentinel written in place of a bytecode hash or constructor code that
/// could not be determined
pub const UNKNOWN_SENTINEL: &str = "unknown";

/// The version recorded for a proxy discovered on-chain whose creation version
/// is not known locally
pub const UNKNOWN_VERSION: &str = "unknown";

/// The name of the project-level package file
pub const PACKAGE_FILE_NAME: &str = "zos.json";

/// The prefix of every per-network file, i.e. `zos.<network>.json`
pub const NETWORK_FILE_PREFIX: &str = "zos";

/// The extension of the package, network & build artifact files
pub const JSON_EXTENSION: &str = "json";

/// The default directory, relative to the project root, holding build artifacts
pub const DEFAULT_BUILD_DIR: &str = "build/contracts";

/// The number of trailing bytes encoding the length of the Solidity CBOR metadata
pub const METADATA_LENGTH_BYTES: usize = 2;

/// The range of CBOR major-type-5 headers that open a Solidity metadata map
/// holding between 1 and 5 entries
pub const METADATA_MAP_HEADERS: std::ops::RangeInclusive<u8> = 0xa1..=0xa5;
