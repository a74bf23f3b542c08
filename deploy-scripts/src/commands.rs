//! Implementations of the status scripts

use std::time::Duration;

use deploy_common::{
    artifacts::{ArtifactSource, ArtifactStore},
    constants::{UNKNOWN_SENTINEL, UNKNOWN_VERSION},
    network_file::NetworkFile,
    store::LocalFileStore,
    types::ContractRecord,
};
use deploy_core::{
    comparator::StatusComparator,
    handlers::{run_handler, FixHandler, ReconciliationOutcome, ReportHandler, Severity},
    observer::ChainObserver,
};
use tracing::{debug, error, info, warn};

use crate::{config::ScriptConfig, errors::ScriptError, observer::RpcObserver, utils::setup_client};

/// What to do with the discrepancies found
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Only report them
    Report,
    /// Repair the local records and persist them
    Fix,
}

/// Report every discrepancy between the local records and the chain
pub async fn compare(config: &ScriptConfig) -> Result<(), ScriptError> {
    reconcile_network(config, Mode::Report).await
}

/// Repair the local records to match the chain
pub async fn pull(config: &ScriptConfig) -> Result<(), ScriptError> {
    reconcile_network(config, Mode::Fix).await
}

/// Summarize the local deployment state of the project
pub fn status(config: &ScriptConfig) -> Result<(), ScriptError> {
    let store = LocalFileStore::new(&config.root);
    let network_file = store.read_network_file(&config.network)?;
    let artifacts = ArtifactStore::new(&config.build_dir);

    info!("Project status for network {}", config.network);
    for line in status_summary(&network_file, &artifacts) {
        line.log();
    }

    Ok(())
}

/// Load the records of the configured network and reconcile them against the
/// chain
async fn reconcile_network(config: &ScriptConfig, mode: Mode) -> Result<(), ScriptError> {
    let store = LocalFileStore::new(&config.root);
    let network_file = store.read_network_file(&config.network)?;
    ensure_published(&network_file)?;

    let client = setup_client(config.require_rpc_url()?)?;
    let observer = RpcObserver::for_network_file(client, &network_file)?;
    let artifacts = ArtifactStore::new(&config.build_dir);

    let outcome = reconcile(&store, network_file, &observer, &artifacts, config.timeout, mode).await?;
    check_outcome(&outcome)
}

/// Compare a network file against the chain and handle the discrepancies found.
///
/// In fix mode the repaired records are written back only if they changed, and
/// only once every discrepancy has been handled; any failure before that
/// leaves the stored file untouched.
pub async fn reconcile<O, A>(
    store: &LocalFileStore,
    mut network_file: NetworkFile,
    observer: &O,
    artifacts: &A,
    timeout: Duration,
    mode: Mode,
) -> Result<ReconciliationOutcome, ScriptError>
where
    O: ChainObserver,
    A: ArtifactSource + ?Sized,
{
    ensure_published(&network_file)?;
    let discrepancies = StatusComparator::new(&network_file, observer, timeout)
        .compare()
        .await?;

    let outcome = match mode {
        Mode::Report => run_handler(ReportHandler::new(), &discrepancies)?,
        Mode::Fix => {
            let outcome = run_handler(FixHandler::new(&mut network_file, artifacts), &discrepancies)?;
            if outcome.mutated {
                store.write_network_file(&network_file)?;
                info!("updated {}", store.network_file_path(network_file.network()).display());
            }

            outcome
        }
    };

    Ok(outcome)
}

/// Fail if any discrepancy was left without a deterministic resolution
pub fn check_outcome(outcome: &ReconciliationOutcome) -> Result<(), ScriptError> {
    if outcome.is_success() {
        Ok(())
    } else {
        Err(ScriptError::UnresolvedAmbiguities(outcome.ambiguities))
    }
}

/// Only published projects have an on-chain registry to compare against
fn ensure_published(network_file: &NetworkFile) -> Result<(), ScriptError> {
    if network_file.is_published() {
        return Ok(());
    }

    Err(ScriptError::InvalidProject(format!(
        "package {} is not published, its status cannot be compared",
        network_file.package_name()
    )))
}

// ------------------
// | Status Summary |
// ------------------

/// A line of the status summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    /// The severity the line is logged at
    pub severity: Severity,
    /// The line itself
    pub message: String,
}

impl StatusLine {
    /// An informational line
    fn info(message: String) -> Self {
        Self {
            severity: Severity::Info,
            message,
        }
    }

    /// A warning line
    fn warn(message: String) -> Self {
        Self {
            severity: Severity::Warn,
            message,
        }
    }

    /// An error line
    fn error(message: String) -> Self {
        Self {
            severity: Severity::Error,
            message,
        }
    }

    /// Emit the line to the logger
    pub fn log(&self) {
        match self.severity {
            Severity::Info => info!("{}", self.message),
            Severity::Warn => warn!("{}", self.message),
            Severity::Error => error!("{}", self.message),
        }
    }
}

/// Summarize the deployment state recorded in a network file
pub fn status_summary<A: ArtifactSource + ?Sized>(
    network_file: &NetworkFile,
    artifacts: &A,
) -> Vec<StatusLine> {
    let mut lines = Vec::new();
    if network_file.is_published() {
        if !app_summary(network_file, &mut lines) || !version_summary(network_file, &mut lines) {
            return lines;
        }

        dependencies_summary(network_file, &mut lines);
    }

    contracts_summary(network_file, artifacts, &mut lines);
    proxies_summary(network_file, &mut lines);
    lines
}

/// Summarize the application & package; false if there is no application
fn app_summary(network_file: &NetworkFile, lines: &mut Vec<StatusLine>) -> bool {
    let Some(app) = network_file.app_address() else {
        lines.push(StatusLine::warn(
            "Application is not yet deployed to the network".to_string(),
        ));
        return false;
    };

    let package = network_file
        .package_address()
        .map(|a| format!("{a:#x}"))
        .unwrap_or_else(|| UNKNOWN_SENTINEL.to_string());
    lines.push(StatusLine::info(format!("Application is deployed at {app:#x}")));
    lines.push(StatusLine::info(format!(
        "- Package {} is at {package}",
        network_file.package_name()
    )));
    true
}

/// Summarize the deployed version; false if it is out of date
fn version_summary(network_file: &NetworkFile, lines: &mut Vec<StatusLine>) -> bool {
    let version = network_file.version().unwrap_or(UNKNOWN_VERSION);
    if network_file.has_matching_version() {
        lines.push(StatusLine::info(format!(
            "- Deployed version {version} matches the latest one defined"
        )));
        true
    } else {
        lines.push(StatusLine::info(format!(
            "- Deployed version {version} is out of date (latest is {})",
            network_file.package_file().version
        )));
        false
    }
}

/// Summarize the declared & linked dependencies
fn dependencies_summary(network_file: &NetworkFile, lines: &mut Vec<StatusLine>) {
    let package_file = network_file.package_file();
    if !package_file.has_dependencies() && !network_file.has_dependencies() {
        return;
    }

    lines.push(StatusLine::info("Application dependencies:".to_string()));
    for (name, required) in package_file.dependencies.iter() {
        let head = format!("- {name}@{required}");
        let line = match network_file.dependency(name) {
            None => format!("{head} is required but is not linked"),
            Some(linked) if linked.version == *required => format!("{head} is linked"),
            Some(linked) => format!("{head} is linked to version {}", linked.version),
        };
        lines.push(StatusLine::info(line));
    }

    for name in network_file.dependency_names_missing_from_package() {
        lines.push(StatusLine::info(format!("- {name} will be unlinked on next push")));
    }
}

/// Summarize the declared & deployed contracts
fn contracts_summary<A: ArtifactSource + ?Sized>(
    network_file: &NetworkFile,
    artifacts: &A,
    lines: &mut Vec<StatusLine>,
) {
    let package_file = network_file.package_file();
    lines.push(StatusLine::info("Application contracts:".to_string()));
    if !package_file.has_contracts() && !network_file.has_contracts() {
        lines.push(StatusLine::info("- No contracts registered".to_string()));
        return;
    }

    for (alias, name) in package_file.contracts.iter() {
        let full_name = if alias == name {
            alias.clone()
        } else {
            format!("{alias} (implemented by {name})")
        };

        let line = match network_file.contract(alias) {
            None => StatusLine::warn(format!("- {full_name} is not deployed")),
            Some(record) if has_changed(record, name, artifacts) => StatusLine::error(format!(
                "- {full_name} is out of date with respect to the local version"
            )),
            Some(_) => StatusLine::info(format!("- {full_name} is deployed and up to date")),
        };
        lines.push(line);
    }

    for alias in network_file.contract_aliases_missing_from_package() {
        lines.push(StatusLine::warn(format!("- {alias} will be removed on next push")));
    }
}

/// Summarize the recorded proxies
fn proxies_summary(network_file: &NetworkFile, lines: &mut Vec<StatusLine>) {
    lines.push(StatusLine::info("Deployed proxies:".to_string()));
    if !network_file.has_proxies() {
        lines.push(StatusLine::info("- No proxies created".to_string()));
        return;
    }

    for (package, proxy) in network_file.proxies() {
        lines.push(StatusLine::info(format!(
            "- {package}/{} at {:#x} version {}",
            proxy.contract, proxy.address, proxy.version
        )));
    }
}

/// Whether the local build of a contract differs from the one recorded as
/// deployed. A contract without a readable local build counts as changed.
fn has_changed<A: ArtifactSource + ?Sized>(
    record: &ContractRecord,
    contract_name: &str,
    artifacts: &A,
) -> bool {
    match artifacts.artifact(contract_name) {
        Ok(Some(artifact)) => record.local_bytecode_hash != Some(artifact.bytecode_hash()),
        Ok(None) => true,
        Err(e) => {
            debug!("could not read the build of {contract_name}: {e}");
            true
        }
    }
}
