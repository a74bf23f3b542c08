//! The query contract through which the comparator observes on-chain state

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use crate::errors::ObserverError;

/// An implementation registered on-chain under an alias
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedImplementation {
    /// The alias the implementation is registered under
    pub alias: String,
    /// The address of the implementation
    pub address: Address,
}

/// A proxy found on-chain, with the implementation it currently points to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObservedProxy {
    /// The address of the proxy
    pub address: Address,
    /// The address the proxy delegates to
    pub implementation: Address,
}

/// A dependency package linked on-chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedDependency {
    /// The name the dependency is linked under
    pub name: String,
    /// The address of the dependency's package registry entry
    pub package: Address,
    /// The linked version
    pub version: String,
}

/// Read-only access to the on-chain state of a project.
///
/// Observers never hold references into the local records; they only return
/// plain values. Entities that do not exist are reported as `None` or an empty
/// collection, and an `Err` always means the query itself failed.
#[async_trait]
pub trait ChainObserver: Send + Sync {
    /// The runtime code at `address`; empty if there is none
    async fn code_at(&self, address: Address) -> Result<Bytes, ObserverError>;

    /// The implementation currently registered under `alias`
    async fn registered_implementation(&self, alias: &str)
        -> Result<Option<Address>, ObserverError>;

    /// Every implementation currently registered, in registration order
    async fn registered_implementations(
        &self,
    ) -> Result<Vec<ObservedImplementation>, ObserverError>;

    /// Every proxy created for `package`, in creation order
    async fn proxies_for(&self, package: &str) -> Result<Vec<ObservedProxy>, ObserverError>;

    /// The address of the project's package registry entry
    async fn package_registry_address(&self) -> Result<Option<Address>, ObserverError>;

    /// The address of the implementation directory of the current version
    async fn provider_address(&self) -> Result<Option<Address>, ObserverError>;

    /// Every dependency currently linked, in linking order
    async fn dependencies(&self) -> Result<Vec<ObservedDependency>, ObserverError>;
}
