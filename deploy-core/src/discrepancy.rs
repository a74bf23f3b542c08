//! The classified differences between the local records and the chain

use std::fmt::{self, Display, Formatter};

use alloy_primitives::{Address, Bytes};
use deploy_common::types::BytecodeHash;
use itertools::Itertools;

/// The rendering of a value that is absent on one side of a comparison
const NONE: &str = "none";

/// The category of a discrepancy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// The recorded version differs from the declared version
    MismatchingVersion,
    /// The recorded package registry entry differs from the chain
    MismatchingPackage,
    /// The recorded implementation directory differs from the chain
    MismatchingProvider,
    /// An implementation is registered on-chain but not recorded
    MissingRemoteImplementation,
    /// A recorded implementation is not registered on-chain
    UnregisteredLocalImplementation,
    /// An alias is registered on-chain at a different address
    MismatchingImplementationAddress,
    /// The code registered under an alias differs from the recorded digest
    MismatchingImplementationBodyBytecode,
    /// A proxy exists on-chain but is not recorded
    MissingRemoteProxy,
    /// A recorded proxy does not exist on-chain
    UnregisteredLocalProxy,
    /// A proxy is recorded under a different alias than it resolves to
    MismatchingProxyAlias,
    /// A proxy delegates to a different implementation than recorded
    MismatchingProxyImplementation,
    /// A proxy delegates to an address registered under no alias
    UnregisteredProxyImplementation,
    /// A proxy delegates to an address registered under several aliases
    MultipleProxyImplementations,
    /// A dependency is linked on-chain but not recorded
    MissingDependency,
    /// A dependency is linked on-chain to a different package address
    MismatchingDependencyAddress,
    /// A dependency is linked on-chain at a different version
    MismatchingDependencyVersion,
    /// A recorded dependency is not linked on-chain
    UnregisteredDependency,
}

impl Category {
    /// Whether no deterministic repair exists for the category
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Category::UnregisteredProxyImplementation | Category::MultipleProxyImplementations
        )
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::MismatchingVersion => "MismatchingVersion",
            Category::MismatchingPackage => "MismatchingPackage",
            Category::MismatchingProvider => "MismatchingProvider",
            Category::MissingRemoteImplementation => "MissingRemoteImplementation",
            Category::UnregisteredLocalImplementation => "UnregisteredLocalImplementation",
            Category::MismatchingImplementationAddress => "MismatchingImplementationAddress",
            Category::MismatchingImplementationBodyBytecode => {
                "MismatchingImplementationBodyBytecode"
            }
            Category::MissingRemoteProxy => "MissingRemoteProxy",
            Category::UnregisteredLocalProxy => "UnregisteredLocalProxy",
            Category::MismatchingProxyAlias => "MismatchingProxyAlias",
            Category::MismatchingProxyImplementation => "MismatchingProxyImplementation",
            Category::UnregisteredProxyImplementation => "UnregisteredProxyImplementation",
            Category::MultipleProxyImplementations => "MultipleProxyImplementations",
            Category::MissingDependency => "MissingDependency",
            Category::MismatchingDependencyAddress => "MismatchingDependencyAddress",
            Category::MismatchingDependencyVersion => "MismatchingDependencyVersion",
            Category::UnregisteredDependency => "UnregisteredDependency",
        };

        write!(f, "{name}")
    }
}

/// A single difference between the local records and the chain, carrying the
/// context a handler needs to report or repair it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Discrepancy {
    /// The recorded version differs from the declared version
    MismatchingVersion {
        /// The recorded version
        expected: Option<String>,
        /// The version declared by the package file
        observed: String,
    },
    /// The recorded package registry entry differs from the chain
    MismatchingPackage {
        /// The recorded address
        expected: Option<Address>,
        /// The address found on-chain
        observed: Option<Address>,
    },
    /// The recorded implementation directory differs from the chain
    MismatchingProvider {
        /// The recorded address
        expected: Option<Address>,
        /// The address found on-chain
        observed: Option<Address>,
    },
    /// An implementation is registered on-chain but not recorded
    MissingRemoteImplementation {
        /// The alias it is registered under
        alias: String,
        /// The registered address
        address: Address,
        /// The runtime code at the registered address
        remote_code: Bytes,
    },
    /// A recorded implementation is not registered on-chain
    UnregisteredLocalImplementation {
        /// The recorded alias
        alias: String,
        /// The recorded address
        address: Address,
    },
    /// An alias is registered on-chain at a different address
    MismatchingImplementationAddress {
        /// The alias
        alias: String,
        /// The recorded address
        expected: Address,
        /// The registered address
        observed: Address,
    },
    /// The code registered under an alias differs from the recorded digest
    MismatchingImplementationBodyBytecode {
        /// The alias
        alias: String,
        /// The registered address the code was read from
        address: Address,
        /// The recorded digest
        expected: Option<BytecodeHash>,
        /// The digest of the registered code
        observed: BytecodeHash,
    },
    /// A proxy exists on-chain but is not recorded
    MissingRemoteProxy {
        /// The package the proxy belongs to
        package: String,
        /// The alias its implementation resolves to
        alias: String,
        /// The proxy address
        address: Address,
        /// The implementation the proxy delegates to
        implementation: Address,
    },
    /// A recorded proxy does not exist on-chain
    UnregisteredLocalProxy {
        /// The package the proxy belongs to
        package: String,
        /// The recorded alias
        alias: String,
        /// The proxy address
        address: Address,
        /// The recorded implementation
        implementation: Address,
    },
    /// A proxy is recorded under a different alias than it resolves to
    MismatchingProxyAlias {
        /// The package the proxy belongs to
        package: String,
        /// The proxy address
        address: Address,
        /// The recorded version of the proxy
        version: String,
        /// The recorded implementation of the proxy
        implementation: Address,
        /// The recorded alias
        expected: String,
        /// The alias its on-chain implementation resolves to
        observed: String,
    },
    /// A proxy delegates to a different implementation than recorded
    MismatchingProxyImplementation {
        /// The package the proxy belongs to
        package: String,
        /// The alias the on-chain implementation resolves to
        alias: String,
        /// The proxy address
        address: Address,
        /// The recorded implementation
        expected: Address,
        /// The on-chain implementation
        observed: Address,
    },
    /// A proxy delegates to an address registered under no alias
    UnregisteredProxyImplementation {
        /// The package the proxy belongs to
        package: String,
        /// The proxy address
        address: Address,
        /// The on-chain implementation
        implementation: Address,
    },
    /// A proxy delegates to an address registered under several aliases
    MultipleProxyImplementations {
        /// The package the proxy belongs to
        package: String,
        /// The proxy address
        address: Address,
        /// The on-chain implementation
        implementation: Address,
        /// Every alias registered at the implementation address
        aliases: Vec<String>,
    },
    /// A dependency is linked on-chain but not recorded
    MissingDependency {
        /// The name it is linked under
        name: String,
        /// The linked package address
        package: Address,
        /// The linked version
        version: String,
    },
    /// A dependency is linked on-chain to a different package address
    MismatchingDependencyAddress {
        /// The dependency name
        name: String,
        /// The recorded package address
        expected: Address,
        /// The linked package address
        observed: Address,
    },
    /// A dependency is linked on-chain at a different version
    MismatchingDependencyVersion {
        /// The dependency name
        name: String,
        /// The recorded version
        expected: String,
        /// The linked version
        observed: String,
    },
    /// A recorded dependency is not linked on-chain
    UnregisteredDependency {
        /// The dependency name
        name: String,
        /// The recorded package address
        package: Address,
    },
}

impl Discrepancy {
    /// The category of the discrepancy
    pub fn category(&self) -> Category {
        match self {
            Discrepancy::MismatchingVersion { .. } => Category::MismatchingVersion,
            Discrepancy::MismatchingPackage { .. } => Category::MismatchingPackage,
            Discrepancy::MismatchingProvider { .. } => Category::MismatchingProvider,
            Discrepancy::MissingRemoteImplementation { .. } => {
                Category::MissingRemoteImplementation
            }
            Discrepancy::UnregisteredLocalImplementation { .. } => {
                Category::UnregisteredLocalImplementation
            }
            Discrepancy::MismatchingImplementationAddress { .. } => {
                Category::MismatchingImplementationAddress
            }
            Discrepancy::MismatchingImplementationBodyBytecode { .. } => {
                Category::MismatchingImplementationBodyBytecode
            }
            Discrepancy::MissingRemoteProxy { .. } => Category::MissingRemoteProxy,
            Discrepancy::UnregisteredLocalProxy { .. } => Category::UnregisteredLocalProxy,
            Discrepancy::MismatchingProxyAlias { .. } => Category::MismatchingProxyAlias,
            Discrepancy::MismatchingProxyImplementation { .. } => {
                Category::MismatchingProxyImplementation
            }
            Discrepancy::UnregisteredProxyImplementation { .. } => {
                Category::UnregisteredProxyImplementation
            }
            Discrepancy::MultipleProxyImplementations { .. } => {
                Category::MultipleProxyImplementations
            }
            Discrepancy::MissingDependency { .. } => Category::MissingDependency,
            Discrepancy::MismatchingDependencyAddress { .. } => {
                Category::MismatchingDependencyAddress
            }
            Discrepancy::MismatchingDependencyVersion { .. } => {
                Category::MismatchingDependencyVersion
            }
            Discrepancy::UnregisteredDependency { .. } => Category::UnregisteredDependency,
        }
    }

    /// The value held by the local records
    pub fn expected(&self) -> String {
        match self {
            Discrepancy::MismatchingVersion { expected, .. } => {
                expected.clone().unwrap_or_else(|| NONE.to_string())
            }
            Discrepancy::MismatchingPackage { expected, .. }
            | Discrepancy::MismatchingProvider { expected, .. } => fmt_address(expected),
            Discrepancy::MissingRemoteImplementation { .. }
            | Discrepancy::MissingRemoteProxy { .. }
            | Discrepancy::MissingDependency { .. } => NONE.to_string(),
            Discrepancy::UnregisteredLocalImplementation { address, .. }
            | Discrepancy::UnregisteredLocalProxy { address, .. } => format!("{address:#x}"),
            Discrepancy::MismatchingImplementationAddress { expected, .. }
            | Discrepancy::MismatchingProxyImplementation { expected, .. }
            | Discrepancy::MismatchingDependencyAddress { expected, .. } => {
                format!("{expected:#x}")
            }
            Discrepancy::MismatchingImplementationBodyBytecode { expected, .. } => expected
                .map(|hash| hash.to_string())
                .unwrap_or_else(|| NONE.to_string()),
            Discrepancy::MismatchingProxyAlias { expected, .. }
            | Discrepancy::MismatchingDependencyVersion { expected, .. } => expected.clone(),
            Discrepancy::UnregisteredProxyImplementation { .. }
            | Discrepancy::MultipleProxyImplementations { .. } => "1 alias".to_string(),
            Discrepancy::UnregisteredDependency { package, .. } => format!("{package:#x}"),
        }
    }

    /// The value found on-chain
    pub fn observed(&self) -> String {
        match self {
            Discrepancy::MismatchingVersion { observed, .. }
            | Discrepancy::MismatchingProxyAlias { observed, .. }
            | Discrepancy::MismatchingDependencyVersion { observed, .. } => observed.clone(),
            Discrepancy::MismatchingPackage { observed, .. }
            | Discrepancy::MismatchingProvider { observed, .. } => fmt_address(observed),
            Discrepancy::MissingRemoteImplementation { address, .. }
            | Discrepancy::MissingRemoteProxy { address, .. } => format!("{address:#x}"),
            Discrepancy::UnregisteredLocalImplementation { .. }
            | Discrepancy::UnregisteredLocalProxy { .. }
            | Discrepancy::UnregisteredDependency { .. } => NONE.to_string(),
            Discrepancy::MismatchingImplementationAddress { observed, .. }
            | Discrepancy::MismatchingProxyImplementation { observed, .. }
            | Discrepancy::MismatchingDependencyAddress { observed, .. } => {
                format!("{observed:#x}")
            }
            Discrepancy::MismatchingImplementationBodyBytecode { observed, .. } => {
                observed.to_string()
            }
            Discrepancy::UnregisteredProxyImplementation { .. } => "0 aliases".to_string(),
            Discrepancy::MultipleProxyImplementations { aliases, .. } => aliases.iter().join(", "),
            Discrepancy::MissingDependency {
                package, version, ..
            } => format!("{version} at {package:#x}"),
        }
    }

    /// The entity the discrepancy concerns, e.g. `contract Token`
    pub fn subject(&self) -> String {
        match self {
            Discrepancy::MismatchingVersion { .. } => "version".to_string(),
            Discrepancy::MismatchingPackage { .. } => "package".to_string(),
            Discrepancy::MismatchingProvider { .. } => "provider".to_string(),
            Discrepancy::MissingRemoteImplementation { alias, .. }
            | Discrepancy::UnregisteredLocalImplementation { alias, .. }
            | Discrepancy::MismatchingImplementationAddress { alias, .. }
            | Discrepancy::MismatchingImplementationBodyBytecode { alias, .. } => {
                format!("contract {alias}")
            }
            Discrepancy::MissingRemoteProxy {
                package, address, ..
            }
            | Discrepancy::UnregisteredLocalProxy {
                package, address, ..
            }
            | Discrepancy::MismatchingProxyAlias {
                package, address, ..
            }
            | Discrepancy::MismatchingProxyImplementation {
                package, address, ..
            }
            | Discrepancy::UnregisteredProxyImplementation {
                package, address, ..
            }
            | Discrepancy::MultipleProxyImplementations {
                package, address, ..
            } => format!("proxy {package} at {address:#x}"),
            Discrepancy::MissingDependency { name, .. }
            | Discrepancy::MismatchingDependencyAddress { name, .. }
            | Discrepancy::MismatchingDependencyVersion { name, .. }
            | Discrepancy::UnregisteredDependency { name, .. } => format!("dependency {name}"),
        }
    }
}

impl Display for Discrepancy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (local: {}, on-chain: {})",
            self.category(),
            self.subject(),
            self.expected(),
            self.observed()
        )
    }
}

/// Render an optional address, `none` if absent
fn fmt_address(address: &Option<Address>) -> String {
    address
        .map(|a| format!("{a:#x}"))
        .unwrap_or_else(|| NONE.to_string())
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;

    use super::{Category, Discrepancy};

    #[test]
    fn test_terminal_categories() {
        assert!(Category::UnregisteredProxyImplementation.is_terminal());
        assert!(Category::MultipleProxyImplementations.is_terminal());
        assert!(!Category::MismatchingProxyAlias.is_terminal());
        assert!(!Category::UnregisteredLocalImplementation.is_terminal());
    }

    #[test]
    fn test_unregistered_proxy_implementation_views() {
        let d = Discrepancy::UnregisteredProxyImplementation {
            package: "vault-app".to_string(),
            address: address!("00000000000000000000000000000000000000cc"),
            implementation: address!("00000000000000000000000000000000000000aa"),
        };

        assert_eq!(d.expected(), "1 alias");
        assert_eq!(d.observed(), "0 aliases");
        assert_eq!(d.category().to_string(), "UnregisteredProxyImplementation");
    }

    #[test]
    fn test_multiple_implementations_lists_aliases() {
        let d = Discrepancy::MultipleProxyImplementations {
            package: "vault-app".to_string(),
            address: address!("00000000000000000000000000000000000000cc"),
            implementation: address!("00000000000000000000000000000000000000aa"),
            aliases: vec!["TokenV1".to_string(), "TokenV2".to_string()],
        };

        assert_eq!(d.observed(), "TokenV1, TokenV2");
    }

    #[test]
    fn test_display_names_both_sides() {
        let d = Discrepancy::MismatchingImplementationAddress {
            alias: "Token".to_string(),
            expected: address!("00000000000000000000000000000000000000aa"),
            observed: address!("00000000000000000000000000000000000000bb"),
        };

        assert_eq!(
            d.to_string(),
            "MismatchingImplementationAddress: contract Token \
             (local: 0x00000000000000000000000000000000000000aa, \
             on-chain: 0x00000000000000000000000000000000000000bb)"
        );
    }
}
