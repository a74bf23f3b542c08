//! Reports discrepancies without touching the local records

use crate::{
    discrepancy::{Category, Discrepancy},
    errors::ReconcileError,
};

use super::{DiscrepancyHandler, LogLine, ReconciliationOutcome, Severity};

/// Logs one line per discrepancy
#[derive(Debug, Default)]
pub struct ReportHandler {
    /// The outcome accumulated so far
    outcome: ReconciliationOutcome,
}

impl ReportHandler {
    /// Create a report handler
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiscrepancyHandler for ReportHandler {
    fn apply(&mut self, discrepancy: &Discrepancy) -> Result<(), ReconcileError> {
        let category = discrepancy.category();
        self.outcome.discrepancies += 1;
        if category.is_terminal() {
            self.outcome.ambiguities += 1;
        }

        let message = format!(
            "{}: {} (local: {}, on-chain: {})",
            category,
            describe(discrepancy),
            discrepancy.expected(),
            discrepancy.observed()
        );
        self.outcome
            .lines
            .push(LogLine::emit(severity(category), category, message));

        Ok(())
    }

    fn finish(self) -> ReconciliationOutcome {
        self.outcome
    }
}

/// The severity a discrepancy is reported at
fn severity(category: Category) -> Severity {
    match category {
        Category::MismatchingImplementationBodyBytecode
        | Category::MismatchingProxyAlias
        | Category::MultipleProxyImplementations => Severity::Warn,
        Category::UnregisteredLocalImplementation
        | Category::UnregisteredLocalProxy
        | Category::UnregisteredProxyImplementation
        | Category::UnregisteredDependency => Severity::Error,
        _ => Severity::Info,
    }
}

/// A human readable description of a discrepancy
fn describe(discrepancy: &Discrepancy) -> String {
    match discrepancy {
        Discrepancy::MismatchingVersion { .. } => {
            "the version recorded for the network differs from the package version".to_string()
        }
        Discrepancy::MismatchingPackage { .. } => {
            "the recorded package address differs from the registered one".to_string()
        }
        Discrepancy::MismatchingProvider { .. } => {
            "the recorded provider address differs from the current version's directory"
                .to_string()
        }
        Discrepancy::MissingRemoteImplementation { alias, .. } => {
            format!("contract {alias} is registered on-chain but missing locally")
        }
        Discrepancy::UnregisteredLocalImplementation { alias, .. } => {
            format!("contract {alias} is recorded locally but not registered on-chain")
        }
        Discrepancy::MismatchingImplementationAddress { alias, .. } => {
            format!("contract {alias} is registered at a different address")
        }
        Discrepancy::MismatchingImplementationBodyBytecode { alias, address, .. } => {
            format!("the code of contract {alias} at {address:#x} differs from the recorded one")
        }
        Discrepancy::MissingRemoteProxy {
            package,
            alias,
            address,
            ..
        } => format!("proxy {package}/{alias} at {address:#x} exists on-chain but not locally"),
        Discrepancy::UnregisteredLocalProxy {
            package,
            alias,
            address,
            ..
        } => format!("proxy {package}/{alias} at {address:#x} is recorded but not found on-chain"),
        Discrepancy::MismatchingProxyAlias {
            package, address, ..
        } => format!("proxy {package} at {address:#x} points to a different contract"),
        Discrepancy::MismatchingProxyImplementation {
            package,
            alias,
            address,
            ..
        } => format!("proxy {package}/{alias} at {address:#x} points to a different implementation"),
        Discrepancy::UnregisteredProxyImplementation {
            package,
            address,
            implementation,
        } => format!(
            "proxy {package} at {address:#x} points to {implementation:#x}, which is not \
             registered under any alias"
        ),
        Discrepancy::MultipleProxyImplementations {
            package,
            address,
            implementation,
            ..
        } => format!(
            "proxy {package} at {address:#x} points to {implementation:#x}, which is registered \
             under several aliases"
        ),
        Discrepancy::MissingDependency { name, .. } => {
            format!("dependency {name} is linked on-chain but missing locally")
        }
        Discrepancy::MismatchingDependencyAddress { name, .. } => {
            format!("dependency {name} is linked to a different package")
        }
        Discrepancy::MismatchingDependencyVersion { name, .. } => {
            format!("dependency {name} is linked at a different version")
        }
        Discrepancy::UnregisteredDependency { name, .. } => {
            format!("dependency {name} is recorded locally but not linked on-chain")
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use crate::{
        discrepancy::Discrepancy,
        handlers::{run_handler, Severity},
    };

    use super::ReportHandler;

    #[test]
    fn test_report_logs_one_line_per_discrepancy() {
        let discrepancies = vec![
            Discrepancy::MismatchingVersion {
                expected: Some("1.0.0".to_string()),
                observed: "1.1.0".to_string(),
            },
            Discrepancy::UnregisteredLocalImplementation {
                alias: "Token".to_string(),
                address: address!("00000000000000000000000000000000000000aa"),
            },
        ];

        let outcome = run_handler(ReportHandler::new(), &discrepancies).unwrap();
        assert_eq!(outcome.discrepancies, 2);
        assert_eq!(outcome.lines.len(), 2);
        assert!(!outcome.mutated);
        assert!(outcome.is_success());

        let errors: Vec<_> = outcome.lines_at(Severity::Error).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("Token"));
        assert!(errors[0].message.contains("0x00000000000000000000000000000000000000aa"));
        assert!(outcome.lines[0].message.contains("1.1.0"));
    }

    #[test]
    fn test_report_counts_ambiguities() {
        let discrepancies = vec![Discrepancy::MultipleProxyImplementations {
            package: "vault-app".to_string(),
            address: address!("00000000000000000000000000000000000000cc"),
            implementation: address!("00000000000000000000000000000000000000aa"),
            aliases: vec!["TokenV1".to_string(), "TokenV2".to_string()],
        }];

        let outcome = run_handler(ReportHandler::new(), &discrepancies).unwrap();
        assert_eq!(outcome.ambiguities, 1);
        assert!(!outcome.is_success());
        assert_eq!(outcome.lines[0].severity, Severity::Warn);
        assert!(outcome.lines[0].message.contains("TokenV1, TokenV2"));
    }

    #[test]
    fn test_empty_stream_is_up_to_date() {
        let outcome = run_handler(ReportHandler::new(), &[]).unwrap();
        assert!(outcome.is_up_to_date());
        assert!(outcome.lines.is_empty());
    }
}
