//! Constants used in the scripts

/// The storage slot containing the implementation address of a proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: &str =
    "0x360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc";

/// The name of the project-native config file
pub const NATIVE_CONFIG_FILE_NAME: &str = "networks.json";

/// The name of the Truffle config file
pub const TRUFFLE_CONFIG_FILE_NAME: &str = "truffle-config.json";

/// The timeout applied to each chain query unless configured otherwise, in
/// seconds
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 600;

/// The protocol used to reach a network configured by host & port
pub const DEFAULT_RPC_PROTOCOL: &str = "http";

/// The block from which registry events are scanned
pub const EVENTS_FROM_BLOCK: u64 = 0;
