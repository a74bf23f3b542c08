//! An in-memory chain observer and fixtures for exercising the comparator

use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use deploy_common::{
    artifacts::BuildArtifact, network_file::NetworkFile, package_file::PackageFile,
};

use crate::{
    errors::ObserverError,
    observer::{ChainObserver, ObservedDependency, ObservedImplementation, ObservedProxy},
};

/// The queries a [`MockObserver`] can be told to fail or stall on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockQuery {
    /// [`ChainObserver::code_at`]
    CodeAt,
    /// [`ChainObserver::registered_implementation`]
    RegisteredImplementation,
    /// [`ChainObserver::registered_implementations`]
    RegisteredImplementations,
    /// [`ChainObserver::proxies_for`]
    ProxiesFor,
    /// [`ChainObserver::package_registry_address`]
    PackageRegistryAddress,
    /// [`ChainObserver::provider_address`]
    ProviderAddress,
    /// [`ChainObserver::dependencies`]
    Dependencies,
}

/// A chain observer answering from in-memory state
#[derive(Debug, Default)]
pub struct MockObserver {
    /// The package registry address
    pub package: Option<Address>,
    /// The implementation directory address
    pub provider: Option<Address>,
    /// The registered implementations, in registration order
    pub implementations: Vec<ObservedImplementation>,
    /// The runtime code by address
    pub code: HashMap<Address, Bytes>,
    /// The proxies by package name
    pub proxies: HashMap<String, Vec<ObservedProxy>>,
    /// The linked dependencies
    pub dependencies: Vec<ObservedDependency>,
    /// A query that fails with an RPC error
    pub failing: Option<MockQuery>,
    /// A query that stalls for the given duration before answering
    pub stalling: Option<(MockQuery, Duration)>,
    /// The number of queries answered so far
    calls: AtomicUsize,
}

impl MockObserver {
    /// Create an observer of an empty chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an implementation with the given runtime code
    pub fn with_implementation(mut self, alias: &str, address: Address, code: Bytes) -> Self {
        self.implementations.push(ObservedImplementation {
            alias: alias.to_string(),
            address,
        });
        self.code.insert(address, code);
        self
    }

    /// Create a proxy of `package` delegating to `implementation`
    pub fn with_proxy(mut self, package: &str, address: Address, implementation: Address) -> Self {
        self.proxies
            .entry(package.to_string())
            .or_default()
            .push(ObservedProxy {
                address,
                implementation,
            });
        self
    }

    /// Link a dependency
    pub fn with_dependency(mut self, name: &str, package: Address, version: &str) -> Self {
        self.dependencies.push(ObservedDependency {
            name: name.to_string(),
            package,
            version: version.to_string(),
        });
        self
    }

    /// Set the package registry & implementation directory addresses
    pub fn with_package(mut self, package: Address, provider: Address) -> Self {
        self.package = Some(package);
        self.provider = Some(provider);
        self
    }

    /// Fail every call of the given query
    pub fn failing_on(mut self, query: MockQuery) -> Self {
        self.failing = Some(query);
        self
    }

    /// Stall every call of the given query
    pub fn stalling_on(mut self, query: MockQuery, delay: Duration) -> Self {
        self.stalling = Some((query, delay));
        self
    }

    /// The number of queries answered so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Apply the configured failure & delay injection to a query
    async fn enter(&self, query: MockQuery) -> Result<(), ObserverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((stalled, delay)) = self.stalling {
            if stalled == query {
                tokio::time::sleep(delay).await;
            }
        }

        if self.failing == Some(query) {
            return Err(ObserverError::Rpc(format!("injected failure on {query:?}")));
        }

        Ok(())
    }
}

#[async_trait]
impl ChainObserver for MockObserver {
    async fn code_at(&self, address: Address) -> Result<Bytes, ObserverError> {
        self.enter(MockQuery::CodeAt).await?;
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn registered_implementation(
        &self,
        alias: &str,
    ) -> Result<Option<Address>, ObserverError> {
        self.enter(MockQuery::RegisteredImplementation).await?;
        Ok(self
            .implementations
            .iter()
            .rev()
            .find(|i| i.alias == alias)
            .map(|i| i.address))
    }

    async fn registered_implementations(
        &self,
    ) -> Result<Vec<ObservedImplementation>, ObserverError> {
        self.enter(MockQuery::RegisteredImplementations).await?;
        Ok(self.implementations.clone())
    }

    async fn proxies_for(&self, package: &str) -> Result<Vec<ObservedProxy>, ObserverError> {
        self.enter(MockQuery::ProxiesFor).await?;
        Ok(self.proxies.get(package).cloned().unwrap_or_default())
    }

    async fn package_registry_address(&self) -> Result<Option<Address>, ObserverError> {
        self.enter(MockQuery::PackageRegistryAddress).await?;
        Ok(self.package)
    }

    async fn provider_address(&self) -> Result<Option<Address>, ObserverError> {
        self.enter(MockQuery::ProviderAddress).await?;
        Ok(self.provider)
    }

    async fn dependencies(&self) -> Result<Vec<ObservedDependency>, ObserverError> {
        self.enter(MockQuery::Dependencies).await?;
        Ok(self.dependencies.clone())
    }
}

// ------------
// | Fixtures |
// ------------

/// The name of the fixture package
pub const FIXTURE_PACKAGE: &str = "vault-app";

/// The version of the fixture package
pub const FIXTURE_VERSION: &str = "1.0.0";

/// The address `0x00..00<byte>`, for readable fixtures
pub fn addr(byte: u8) -> Address {
    Address::with_last_byte(byte)
}

/// Runtime code unique to `seed`, without metadata
pub fn code(seed: u8) -> Bytes {
    Bytes::from(vec![0x60, 0x80, 0x60, 0x40, 0x52, seed])
}

/// A build artifact whose runtime code is `code(seed)`, preceded by a short
/// constructor
pub fn artifact(contract_name: &str, seed: u8) -> BuildArtifact {
    let body = code(seed);
    let mut bytecode = vec![0x60, 0x0b, 0x38, 0x03];
    bytecode.extend_from_slice(&body);

    BuildArtifact {
        contract_name: contract_name.to_string(),
        bytecode: Bytes::from(bytecode),
        deployed_bytecode: body,
    }
}

/// A published package declaring the given contract aliases, each named after
/// its alias
pub fn package_file(aliases: &[&str]) -> PackageFile {
    let mut package_file = PackageFile::new(FIXTURE_PACKAGE, FIXTURE_VERSION);
    for alias in aliases {
        package_file
            .contracts
            .insert(alias.to_string(), alias.to_string());
    }

    package_file
}

/// An empty network file already at the package's version
pub fn network_file(aliases: &[&str]) -> NetworkFile {
    let mut network_file = NetworkFile::new("test", package_file(aliases));
    network_file.set_version(FIXTURE_VERSION);
    network_file
}
