//! Repairs the local records so that they match the chain.
//!
//! Every category has one deterministic repair, except proxies whose
//! implementation cannot be resolved to a single alias; those are logged and
//! counted as ambiguities without touching the records. Repairs act on the
//! in-memory network file only, persisting it is left to the caller.

use alloy_primitives::{Address, Bytes};
use deploy_common::{
    artifacts::{bytecode_digest, ArtifactSource},
    constants::UNKNOWN_VERSION,
    network_file::NetworkFile,
    types::{ContractRecord, DependencyRecord, ProxyRecord, ProxySelector},
};

use crate::{discrepancy::Discrepancy, errors::ReconcileError};

use super::{DiscrepancyHandler, LogLine, ReconciliationOutcome, Severity};

/// Rewrites the local records to match the chain
pub struct FixHandler<'a, A: ?Sized> {
    /// The records being repaired
    network_file: &'a mut NetworkFile,
    /// The local build artifacts, used to rebuild missing contract records
    artifacts: &'a A,
    /// The outcome accumulated so far
    outcome: ReconciliationOutcome,
}

impl<'a, A: ArtifactSource + ?Sized> FixHandler<'a, A> {
    /// Create a fix handler over the given records
    pub fn new(network_file: &'a mut NetworkFile, artifacts: &'a A) -> Self {
        Self {
            network_file,
            artifacts,
            outcome: ReconciliationOutcome::default(),
        }
    }

    /// Log a line for the discrepancy being handled
    fn log(&mut self, severity: Severity, discrepancy: &Discrepancy, message: String) {
        let category = discrepancy.category();
        let message = format!("{category}: {message}");
        self.outcome
            .lines
            .push(LogLine::emit(severity, category, message));
    }

    /// Rebuild the record of a contract registered on-chain but missing locally
    fn add_missing_implementation(
        &mut self,
        discrepancy: &Discrepancy,
        alias: &str,
        address: Address,
        remote_code: &Bytes,
    ) {
        let contract_name = self.network_file.contract_name(alias).to_string();
        let change = format!("from {} to {}", discrepancy.expected(), discrepancy.observed());
        let mut record = ContractRecord::unknown_at(address);
        record.body_bytecode_hash = Some(bytecode_digest(remote_code));

        match self.artifacts.artifact(&contract_name) {
            Ok(Some(artifact)) if artifact.matches_body(remote_code) => {
                if let Some(constructor) = artifact.constructor_code() {
                    let creation_code = [&constructor[..], &remote_code[..]].concat();
                    let bytecode_hash = bytecode_digest(&creation_code);
                    record.constructor_code = Some(constructor);
                    record.local_bytecode_hash = Some(bytecode_hash);
                    record.deployed_bytecode_hash = Some(bytecode_hash);
                }

                self.outcome.integrity_warnings += 1;
                self.log(
                    Severity::Warn,
                    discrepancy,
                    format!(
                        "adding contract {alias} {change}, assuming the constructor of the \
                         local build of {contract_name} was the one deployed"
                    ),
                );
            }
            Ok(Some(_)) => self.log(
                Severity::Error,
                discrepancy,
                format!(
                    "adding contract {alias} {change}, but the local build of \
                     {contract_name} has different code than the one deployed"
                ),
            ),
            Ok(None) => self.log(
                Severity::Error,
                discrepancy,
                format!(
                    "adding contract {alias} {change}, but no local build of \
                     {contract_name} was found"
                ),
            ),
            Err(e) => self.log(
                Severity::Error,
                discrepancy,
                format!(
                    "adding contract {alias} {change}, but the local build of \
                     {contract_name} could not be read: {e}"
                ),
            ),
        }

        self.network_file.set_contract(alias, record);
        self.outcome.mutated = true;
    }
}

impl<'a, A: ArtifactSource + ?Sized> DiscrepancyHandler for FixHandler<'a, A> {
    fn apply(&mut self, discrepancy: &Discrepancy) -> Result<(), ReconcileError> {
        self.outcome.discrepancies += 1;
        let expected = discrepancy.expected();
        let observed = discrepancy.observed();

        match discrepancy {
            Discrepancy::MismatchingVersion { observed: version, .. } => {
                self.network_file.set_version(version);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating version from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingPackage { observed: address, .. } => {
                self.network_file.set_package_address(*address);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating package address from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingProvider { observed: address, .. } => {
                self.network_file.set_provider_address(*address);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating provider address from {expected} to {observed}"),
                );
            }
            Discrepancy::MissingRemoteImplementation {
                alias,
                address,
                remote_code,
            } => {
                self.add_missing_implementation(discrepancy, alias, *address, remote_code);
                return Ok(());
            }
            Discrepancy::UnregisteredLocalImplementation { alias, .. } => {
                self.network_file.unset_contract(alias);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("removing contract {alias} from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingImplementationAddress {
                alias,
                observed: address,
                ..
            } => {
                self.network_file
                    .update_implementation(alias, |record| record.address = *address)?;
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating address of contract {alias} from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingImplementationBodyBytecode {
                alias,
                observed: hash,
                ..
            } => {
                self.network_file
                    .update_implementation(alias, |record| record.body_bytecode_hash = Some(*hash))?;
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!(
                        "updating body bytecode hash of contract {alias} from {expected} to \
                         {observed}"
                    ),
                );
            }
            Discrepancy::MissingRemoteProxy {
                package,
                alias,
                address,
                implementation,
            } => {
                let record = ProxyRecord::new(alias, *address, UNKNOWN_VERSION, *implementation);
                self.network_file.add_proxy(package, alias, record);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!(
                        "adding proxy {package}/{alias} pointing to {implementation:#x} from \
                         {expected} to {observed}"
                    ),
                );
            }
            Discrepancy::UnregisteredLocalProxy {
                package,
                alias,
                address,
                ..
            } => {
                self.network_file.remove_proxy(package, alias, *address);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("removing proxy {package}/{alias} from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingProxyAlias {
                package,
                address,
                version,
                implementation,
                expected: old_alias,
                observed: new_alias,
            } => {
                let selector = ProxySelector::new(package, old_alias, *address);
                let record = self
                    .network_file
                    .proxy(&selector)
                    .cloned()
                    .unwrap_or_else(|| {
                        ProxyRecord::new(new_alias, *address, version, *implementation)
                    });
                self.network_file.remove_proxy(package, old_alias, *address);
                self.network_file.add_proxy(package, new_alias, record);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!(
                        "changing contract of proxy {package} at {address:#x} from {old_alias} \
                         to {new_alias}"
                    ),
                );
            }
            Discrepancy::MismatchingProxyImplementation {
                package,
                alias,
                address,
                observed: implementation,
                ..
            } => {
                let selector = ProxySelector::new(package, alias, *address);
                self.network_file
                    .update_proxy(&selector, |record| record.implementation = *implementation)?;
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating implementation of proxy {selector} from {expected} to {observed}"),
                );
            }
            Discrepancy::UnregisteredProxyImplementation {
                package,
                address,
                implementation,
            } => {
                self.outcome.ambiguities += 1;
                self.log(
                    Severity::Error,
                    discrepancy,
                    format!(
                        "proxy {package} at {address:#x} points to {implementation:#x}, which is \
                         not registered under any alias; please check it manually"
                    ),
                );
                return Ok(());
            }
            Discrepancy::MultipleProxyImplementations {
                package,
                address,
                implementation,
                ..
            } => {
                self.outcome.ambiguities += 1;
                self.log(
                    Severity::Warn,
                    discrepancy,
                    format!(
                        "proxy {package} at {address:#x} points to {implementation:#x}, which is \
                         registered under {observed}; please check it manually"
                    ),
                );
                return Ok(());
            }
            Discrepancy::MissingDependency {
                name,
                package,
                version,
            } => {
                self.network_file
                    .set_dependency(name, DependencyRecord::new(*package, version));
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("adding dependency {name} from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingDependencyAddress {
                name,
                observed: package,
                ..
            } => {
                self.network_file
                    .update_dependency(name, |record| record.package = *package)?;
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating address of dependency {name} from {expected} to {observed}"),
                );
            }
            Discrepancy::MismatchingDependencyVersion {
                name,
                observed: version,
                ..
            } => {
                self.network_file
                    .update_dependency(name, |record| record.version = version.clone())?;
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("updating version of dependency {name} from {expected} to {observed}"),
                );
            }
            Discrepancy::UnregisteredDependency { name, .. } => {
                self.network_file.unset_dependency(name);
                self.log(
                    Severity::Info,
                    discrepancy,
                    format!("removing dependency {name} from {expected} to {observed}"),
                );
            }
        }

        self.outcome.mutated = true;
        Ok(())
    }

    fn finish(self) -> ReconciliationOutcome {
        self.outcome
    }
}
