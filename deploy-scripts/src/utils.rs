//! Utilities for the scripts

use alloy::{
    network::Ethereum,
    providers::{DynProvider, ProviderBuilder},
    transports::http::reqwest::Url,
};
use itertools::Itertools;

use crate::errors::ScriptError;

/// The provider type used to observe the chain
pub type Client = DynProvider<Ethereum>;

/// Sets up a read-only client for the given RPC url
pub fn setup_client(rpc_url: &str) -> Result<Client, ScriptError> {
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new().on_http(url);
    Ok(DynProvider::new(provider))
}

/// Render an on-chain semantic version triple as `major.minor.patch`
pub fn format_version(version: &[u64; 3]) -> String {
    version.iter().join(".")
}

#[cfg(test)]
mod tests {
    use super::{format_version, setup_client};

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(&[1, 2, 0]), "1.2.0");
    }

    #[test]
    fn test_invalid_rpc_url() {
        assert!(setup_client("not a url").is_err());
    }
}
