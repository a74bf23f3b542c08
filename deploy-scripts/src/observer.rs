//! Observes a published project through its on-chain application registry

use std::{collections::HashMap, fmt::Display, str::FromStr};

use alloy::providers::Provider;
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use deploy_common::network_file::NetworkFile;
use deploy_core::{
    errors::ObserverError,
    observer::{ChainObserver, ObservedDependency, ObservedImplementation, ObservedProxy},
};
use tracing::debug;

use crate::{
    constants::{EVENTS_FROM_BLOCK, PROXY_IMPLEMENTATION_STORAGE_SLOT},
    errors::ScriptError,
    solidity::{IApp, IImplementationDirectory},
    utils::{format_version, Client},
};

/// A chain observer backed by an RPC client.
///
/// Registrations, proxies & linked dependencies are enumerated by replaying the
/// registry events; current values are read through view calls.
pub struct RpcObserver {
    /// The RPC client
    client: Client,
    /// The address of the application registry
    app: Address,
    /// The name of the project's package
    package_name: String,
}

impl RpcObserver {
    /// Create an observer of the application registry at `app`
    pub fn new(client: Client, app: Address, package_name: &str) -> Self {
        Self {
            client,
            app,
            package_name: package_name.to_string(),
        }
    }

    /// Create an observer of the application registry recorded in a network
    /// file
    pub fn for_network_file(client: Client, network_file: &NetworkFile) -> Result<Self, ScriptError> {
        let app = network_file.app_address().ok_or_else(|| {
            ScriptError::InvalidProject(format!(
                "no application is recorded for network {}",
                network_file.network()
            ))
        })?;

        Ok(Self::new(client, app, network_file.package_name()))
    }

    /// The implementation directory of the current version of a package
    async fn provider_of(&self, package_name: &str) -> Result<Option<Address>, ObserverError> {
        let app = IApp::new(self.app, self.client.clone());
        let provider = app
            .getProvider(package_name.to_string())
            .call()
            .await
            .map_err(rpc_error)?
            .provider;

        Ok(non_zero(provider))
    }

    /// The implementations currently registered in a directory, in
    /// registration order
    async fn implementations_in(
        &self,
        directory: Address,
    ) -> Result<Vec<ObservedImplementation>, ObserverError> {
        let directory = IImplementationDirectory::new(directory, self.client.clone());
        let events = directory
            .ImplementationChanged_filter()
            .from_block(EVENTS_FROM_BLOCK)
            .query()
            .await
            .map_err(rpc_error)?;

        let mut implementations: Vec<ObservedImplementation> = Vec::new();
        for (event, _) in events {
            implementations.retain(|i| i.alias != event.contractName);
            if let Some(address) = non_zero(event.implementation) {
                implementations.push(ObservedImplementation {
                    alias: event.contractName,
                    address,
                });
            }
        }

        Ok(implementations)
    }

    /// The implementation a proxy currently delegates to
    async fn implementation_of_proxy(&self, proxy: Address) -> Result<Address, ObserverError> {
        let slot = U256::from_str(PROXY_IMPLEMENTATION_STORAGE_SLOT)
            .map_err(|e| ObserverError::Decode(e.to_string()))?;
        let value = self
            .client
            .get_storage_at(proxy, slot)
            .await
            .map_err(rpc_error)?;

        Ok(Address::from_word(B256::from(value)))
    }

    /// The name of the linked dependency registering each implementation
    /// address
    async fn dependency_implementations(&self) -> Result<HashMap<Address, String>, ObserverError> {
        let mut owners = HashMap::new();
        for dependency in self.dependencies().await? {
            let Some(directory) = self.provider_of(&dependency.name).await? else {
                continue;
            };

            for implementation in self.implementations_in(directory).await? {
                owners.insert(implementation.address, dependency.name.clone());
            }
        }

        Ok(owners)
    }
}

#[async_trait]
impl ChainObserver for RpcObserver {
    async fn code_at(&self, address: Address) -> Result<Bytes, ObserverError> {
        self.client.get_code_at(address).await.map_err(rpc_error)
    }

    async fn registered_implementation(
        &self,
        alias: &str,
    ) -> Result<Option<Address>, ObserverError> {
        let Some(directory) = self.provider_of(&self.package_name).await? else {
            return Ok(None);
        };

        let directory = IImplementationDirectory::new(directory, self.client.clone());
        let implementation = directory
            .getImplementation(alias.to_string())
            .call()
            .await
            .map_err(rpc_error)?
            .implementation;

        Ok(non_zero(implementation))
    }

    async fn registered_implementations(
        &self,
    ) -> Result<Vec<ObservedImplementation>, ObserverError> {
        match self.provider_of(&self.package_name).await? {
            Some(directory) => self.implementations_in(directory).await,
            None => Ok(Vec::new()),
        }
    }

    /// The registry does not record which package a proxy was created for, so
    /// proxies are attributed through their current implementation: to the
    /// linked dependency registering it, else to the project's package
    async fn proxies_for(&self, package: &str) -> Result<Vec<ObservedProxy>, ObserverError> {
        let app = IApp::new(self.app, self.client.clone());
        let events = app
            .ProxyCreated_filter()
            .from_block(EVENTS_FROM_BLOCK)
            .query()
            .await
            .map_err(rpc_error)?;

        let owners = self.dependency_implementations().await?;
        let mut proxies = Vec::new();
        for (event, _) in events {
            let implementation = self.implementation_of_proxy(event.proxy).await?;
            let owner = owners
                .get(&implementation)
                .map(String::as_str)
                .unwrap_or(&self.package_name);

            if owner == package {
                proxies.push(ObservedProxy {
                    address: event.proxy,
                    implementation,
                });
            }
        }

        debug!("found {} proxies of {package}", proxies.len());
        Ok(proxies)
    }

    async fn package_registry_address(&self) -> Result<Option<Address>, ObserverError> {
        let app = IApp::new(self.app, self.client.clone());
        let package = app
            .getPackage(self.package_name.clone())
            .call()
            .await
            .map_err(rpc_error)?
            .package;

        Ok(non_zero(package))
    }

    async fn provider_address(&self) -> Result<Option<Address>, ObserverError> {
        self.provider_of(&self.package_name).await
    }

    async fn dependencies(&self) -> Result<Vec<ObservedDependency>, ObserverError> {
        let app = IApp::new(self.app, self.client.clone());
        let events = app
            .PackageChanged_filter()
            .from_block(EVENTS_FROM_BLOCK)
            .query()
            .await
            .map_err(rpc_error)?;

        let mut dependencies: Vec<ObservedDependency> = Vec::new();
        for (event, _) in events {
            // The project's own package is linked under its name too
            if event.providerName == self.package_name {
                continue;
            }

            dependencies.retain(|d| d.name != event.providerName);
            if let Some(package) = non_zero(event.package) {
                dependencies.push(ObservedDependency {
                    name: event.providerName,
                    package,
                    version: format_version(&event.version),
                });
            }
        }

        Ok(dependencies)
    }
}

/// The registries report absent entries as the zero address
fn non_zero(address: Address) -> Option<Address> {
    (!address.is_zero()).then_some(address)
}

/// Convert an RPC failure to an observer error
fn rpc_error(e: impl Display) -> ObserverError {
    ObserverError::Rpc(e.to_string())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy_primitives::{address, Address, B256, U256};

    use super::non_zero;
    use crate::constants::PROXY_IMPLEMENTATION_STORAGE_SLOT;

    #[test]
    fn test_zero_address_is_absent() {
        assert_eq!(non_zero(Address::ZERO), None);
        let a = address!("00000000000000000000000000000000000000aa");
        assert_eq!(non_zero(a), Some(a));
    }

    #[test]
    fn test_implementation_slot_parses() {
        let slot = U256::from_str(PROXY_IMPLEMENTATION_STORAGE_SLOT).unwrap();
        assert_eq!(
            B256::from(slot),
            B256::from_str(PROXY_IMPLEMENTATION_STORAGE_SLOT).unwrap()
        );
    }

    #[test]
    fn test_implementation_read_from_slot_word() {
        let a = address!("00000000000000000000000000000000000000aa");
        let word = U256::from_be_slice(a.as_slice());
        assert_eq!(Address::from_word(B256::from(word)), a);
    }
}
