//! Compares a network file against the chain and classifies every difference.
//!
//! The comparison runs in fixed phases (version, package & provider,
//! implementations, proxies, dependencies), and within a phase follows the
//! order of the local records and then the order the chain reports entities
//! in, so the same inputs always yield the same discrepancy list. Queries are
//! issued one at a time; the first one that fails or times out aborts the
//! whole comparison.

use std::{collections::HashSet, future::Future, time::Duration};

use alloy_primitives::Address;
use deploy_common::{artifacts::bytecode_digest, network_file::NetworkFile};
use itertools::Itertools;
use tracing::debug;

use crate::{
    discrepancy::Discrepancy,
    errors::{ObserverError, ReconcileError},
    observer::{ChainObserver, ObservedImplementation, ObservedProxy},
};

/// Compares the records of a network file against an observer's view of the
/// chain
pub struct StatusComparator<'a, O> {
    /// The local records
    network_file: &'a NetworkFile,
    /// The view of the chain
    observer: &'a O,
    /// The timeout applied to each individual query
    timeout: Duration,
}

impl<'a, O: ChainObserver> StatusComparator<'a, O> {
    /// Create a comparator
    pub fn new(network_file: &'a NetworkFile, observer: &'a O, timeout: Duration) -> Self {
        Self {
            network_file,
            observer,
            timeout,
        }
    }

    /// Produce the ordered list of discrepancies between the local records and
    /// the chain
    pub async fn compare(&self) -> Result<Vec<Discrepancy>, ReconcileError> {
        let mut discrepancies = Vec::new();

        self.compare_version(&mut discrepancies);
        if self.network_file.is_published() {
            self.compare_package(&mut discrepancies).await?;
        } else {
            debug!("project is not published, skipping package comparison");
        }

        let implementations = self
            .query("registered implementations", self.observer.registered_implementations())
            .await?;
        self.compare_implementations(&implementations, &mut discrepancies)
            .await?;
        self.compare_proxies(&implementations, &mut discrepancies)
            .await?;
        self.compare_dependencies(&mut discrepancies).await?;

        debug!(
            "found {} discrepancies on {}",
            discrepancies.len(),
            self.network_file.network()
        );
        Ok(discrepancies)
    }

    // ----------
    // | Phases |
    // ----------

    /// Compare the recorded version against the declared version
    fn compare_version(&self, out: &mut Vec<Discrepancy>) {
        if self.network_file.has_matching_version() {
            return;
        }

        out.push(Discrepancy::MismatchingVersion {
            expected: self.network_file.version().map(str::to_string),
            observed: self.network_file.package_file().version.clone(),
        });
    }

    /// Compare the package registry entry & implementation directory
    async fn compare_package(&self, out: &mut Vec<Discrepancy>) -> Result<(), ReconcileError> {
        debug!("comparing package");

        let observed = self
            .query("package address", self.observer.package_registry_address())
            .await?;
        let expected = self.network_file.package_address();
        if observed != expected {
            out.push(Discrepancy::MismatchingPackage { expected, observed });
        }

        let observed = self
            .query("provider address", self.observer.provider_address())
            .await?;
        let expected = self.network_file.provider_address();
        if observed != expected {
            out.push(Discrepancy::MismatchingProvider { expected, observed });
        }

        Ok(())
    }

    /// Compare the recorded implementations against the registered ones
    async fn compare_implementations(
        &self,
        implementations: &[ObservedImplementation],
        out: &mut Vec<Discrepancy>,
    ) -> Result<(), ReconcileError> {
        debug!("comparing implementations");

        for (alias, record) in self.network_file.contracts() {
            let registered = self
                .query(
                    &format!("implementation of {alias}"),
                    self.observer.registered_implementation(alias),
                )
                .await?;
            let Some(observed) = registered else {
                out.push(Discrepancy::UnregisteredLocalImplementation {
                    alias: alias.to_string(),
                    address: record.address,
                });
                continue;
            };

            if observed != record.address {
                out.push(Discrepancy::MismatchingImplementationAddress {
                    alias: alias.to_string(),
                    expected: record.address,
                    observed,
                });
            }

            // The code is always read from the registered address
            let code = self
                .query(&format!("code at {observed:#x}"), self.observer.code_at(observed))
                .await?;
            let digest = bytecode_digest(&code);
            if record.body_bytecode_hash != Some(digest) {
                out.push(Discrepancy::MismatchingImplementationBodyBytecode {
                    alias: alias.to_string(),
                    address: observed,
                    expected: record.body_bytecode_hash,
                    observed: digest,
                });
            }
        }

        for implementation in implementations
            .iter()
            .filter(|i| !self.network_file.has_contract(&i.alias))
        {
            let remote_code = self
                .query(
                    &format!("code at {:#x}", implementation.address),
                    self.observer.code_at(implementation.address),
                )
                .await?;
            out.push(Discrepancy::MissingRemoteImplementation {
                alias: implementation.alias.clone(),
                address: implementation.address,
                remote_code,
            });
        }

        Ok(())
    }

    /// Compare the recorded proxies of the project's package against the ones
    /// found on-chain
    async fn compare_proxies(
        &self,
        implementations: &[ObservedImplementation],
        out: &mut Vec<Discrepancy>,
    ) -> Result<(), ReconcileError> {
        debug!("comparing proxies");

        let package = self.network_file.package_name();
        let remote = self
            .query(&format!("proxies of {package}"), self.observer.proxies_for(package))
            .await?;

        let mut seen = HashSet::new();
        for proxy in remote.iter() {
            seen.insert(proxy.address);

            let aliases = aliases_at(implementations, proxy.implementation);
            match aliases.len() {
                0 => out.push(Discrepancy::UnregisteredProxyImplementation {
                    package: package.to_string(),
                    address: proxy.address,
                    implementation: proxy.implementation,
                }),
                1 => self.compare_proxy(package, &aliases[0], proxy, out),
                _ => out.push(Discrepancy::MultipleProxyImplementations {
                    package: package.to_string(),
                    address: proxy.address,
                    implementation: proxy.implementation,
                    aliases,
                }),
            }
        }

        for local in self.network_file.proxies_of(package) {
            if !seen.contains(&local.address) {
                out.push(Discrepancy::UnregisteredLocalProxy {
                    package: package.to_string(),
                    alias: local.contract.clone(),
                    address: local.address,
                    implementation: local.implementation,
                });
            }
        }

        Ok(())
    }

    /// Compare a single on-chain proxy, whose implementation resolves to
    /// `alias`, against its local record
    fn compare_proxy(
        &self,
        package: &str,
        alias: &str,
        proxy: &ObservedProxy,
        out: &mut Vec<Discrepancy>,
    ) {
        let local = self
            .network_file
            .proxies_of(package)
            .iter()
            .find(|p| p.address == proxy.address);
        let Some(local) = local else {
            out.push(Discrepancy::MissingRemoteProxy {
                package: package.to_string(),
                alias: alias.to_string(),
                address: proxy.address,
                implementation: proxy.implementation,
            });
            return;
        };

        if local.contract != alias {
            out.push(Discrepancy::MismatchingProxyAlias {
                package: package.to_string(),
                address: proxy.address,
                version: local.version.clone(),
                implementation: local.implementation,
                expected: local.contract.clone(),
                observed: alias.to_string(),
            });
        }

        if local.implementation != proxy.implementation {
            out.push(Discrepancy::MismatchingProxyImplementation {
                package: package.to_string(),
                alias: alias.to_string(),
                address: proxy.address,
                expected: local.implementation,
                observed: proxy.implementation,
            });
        }
    }

    /// Compare the recorded dependencies against the linked ones
    async fn compare_dependencies(&self, out: &mut Vec<Discrepancy>) -> Result<(), ReconcileError> {
        debug!("comparing dependencies");

        let remote = self
            .query("linked dependencies", self.observer.dependencies())
            .await?;

        for dependency in remote.iter() {
            let Some(local) = self.network_file.dependency(&dependency.name) else {
                out.push(Discrepancy::MissingDependency {
                    name: dependency.name.clone(),
                    package: dependency.package,
                    version: dependency.version.clone(),
                });
                continue;
            };

            if local.package != dependency.package {
                out.push(Discrepancy::MismatchingDependencyAddress {
                    name: dependency.name.clone(),
                    expected: local.package,
                    observed: dependency.package,
                });
            }

            if local.version != dependency.version {
                out.push(Discrepancy::MismatchingDependencyVersion {
                    name: dependency.name.clone(),
                    expected: local.version.clone(),
                    observed: dependency.version.clone(),
                });
            }
        }

        for (name, local) in self.network_file.dependencies() {
            if !remote.iter().any(|d| d.name == name) {
                out.push(Discrepancy::UnregisteredDependency {
                    name: name.to_string(),
                    package: local.package,
                });
            }
        }

        Ok(())
    }

    // -----------
    // | Helpers |
    // -----------

    /// Await a single observer query, bounded by the configured timeout
    async fn query<T>(
        &self,
        description: &str,
        fut: impl Future<Output = Result<T, ObserverError>>,
    ) -> Result<T, ReconcileError> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(|e| {
                ReconcileError::Connectivity(format!("querying {description}: {e}"))
            }),
            Err(_) => Err(ReconcileError::Timeout {
                query: description.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}

/// The distinct aliases registered at `address`, in registration order
fn aliases_at(implementations: &[ObservedImplementation], address: Address) -> Vec<String> {
    implementations
        .iter()
        .filter(|i| i.address == address)
        .map(|i| i.alias.clone())
        .unique()
        .collect()
}
