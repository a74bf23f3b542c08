//! Tests of the discrepancy stream produced by the comparator

use std::time::Duration;

use deploy_common::{
    artifacts::bytecode_digest,
    network_file::NetworkFile,
    types::{ContractRecord, DependencyRecord, ProxyRecord},
};

use crate::{
    comparator::StatusComparator,
    discrepancy::{Category, Discrepancy},
    errors::ReconcileError,
    test_helpers::{
        addr, code, network_file, package_file, MockObserver, MockQuery, FIXTURE_PACKAGE,
        FIXTURE_VERSION,
    },
};

use super::{compare, record};

#[tokio::test]
async fn test_matching_project_is_up_to_date() {
    let mut local = network_file(&["Token"]);
    local.set_package_address(Some(addr(0x01)));
    local.set_provider_address(Some(addr(0x02)));
    local.set_contract("Token", record(addr(0xaa), 1));
    local.add_proxy(
        FIXTURE_PACKAGE,
        "Token",
        ProxyRecord::new("Token", addr(0xcc), "1.0.0", addr(0xaa)),
    );
    local.set_dependency("lib", DependencyRecord::new(addr(0xdd), "2.0.0"));

    let chain = MockObserver::new()
        .with_package(addr(0x01), addr(0x02))
        .with_implementation("Token", addr(0xaa), code(1))
        .with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xaa))
        .with_dependency("lib", addr(0xdd), "2.0.0");

    assert!(compare(&local, &chain).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_version_mismatch() {
    let mut local = network_file(&[]);
    local.set_version("0.9.0");

    let discrepancies = compare(&local, &MockObserver::new()).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::MismatchingVersion {
            expected: Some("0.9.0".to_string()),
            observed: "1.0.0".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_package_and_provider_mismatch() {
    let mut local = network_file(&[]);
    local.set_package_address(Some(addr(0x01)));

    let chain = MockObserver::new().with_package(addr(0x11), addr(0x12));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![
            Discrepancy::MismatchingPackage {
                expected: Some(addr(0x01)),
                observed: Some(addr(0x11)),
            },
            Discrepancy::MismatchingProvider {
                expected: None,
                observed: Some(addr(0x12)),
            },
        ]
    );
}

#[tokio::test]
async fn test_unpublished_project_skips_package_phase() {
    let mut unpublished = package_file(&[]);
    unpublished.publish = false;
    let mut local = NetworkFile::new("test", unpublished);
    local.set_version(FIXTURE_VERSION);

    let chain = MockObserver::new()
        .with_package(addr(0x11), addr(0x12))
        .failing_on(MockQuery::PackageRegistryAddress);
    assert!(compare(&local, &chain).await.unwrap().is_empty());
}

/// A contract recorded locally but unknown to the chain is reported as
/// unregistered
#[tokio::test]
async fn test_unregistered_local_implementation() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", record(addr(0xaa), 1));

    let discrepancies = compare(&local, &MockObserver::new()).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::UnregisteredLocalImplementation {
            alias: "Token".to_string(),
            address: addr(0xaa),
        }]
    );
}

/// Contracts are compared in the order they are recorded, not by alias
#[tokio::test]
async fn test_contracts_compared_in_recorded_order() {
    let mut local = network_file(&["Zeta", "Alpha"]);
    local.set_contract("Zeta", record(addr(0xaa), 1));
    local.set_contract("Alpha", record(addr(0xbb), 2));

    let discrepancies = compare(&local, &MockObserver::new()).await.unwrap();
    let subjects: Vec<String> = discrepancies.iter().map(Discrepancy::subject).collect();
    assert_eq!(subjects, vec!["contract Zeta", "contract Alpha"]);
}

#[tokio::test]
async fn test_address_mismatch_precedes_bytecode_mismatch() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", record(addr(0xaa), 1));

    let chain = MockObserver::new().with_implementation("Token", addr(0xbb), code(2));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![
            Discrepancy::MismatchingImplementationAddress {
                alias: "Token".to_string(),
                expected: addr(0xaa),
                observed: addr(0xbb),
            },
            Discrepancy::MismatchingImplementationBodyBytecode {
                alias: "Token".to_string(),
                address: addr(0xbb),
                expected: Some(bytecode_digest(&code(1))),
                observed: bytecode_digest(&code(2)),
            },
        ]
    );
}

#[tokio::test]
async fn test_bytecode_is_read_from_the_registered_address() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", record(addr(0xaa), 2));

    // The registered address holds the recorded code, the recorded one doesn't
    let chain = MockObserver::new().with_implementation("Token", addr(0xbb), code(2));
    let categories: Vec<_> = compare(&local, &chain)
        .await
        .unwrap()
        .iter()
        .map(Discrepancy::category)
        .collect();
    assert_eq!(categories, vec![Category::MismatchingImplementationAddress]);
}

#[tokio::test]
async fn test_unknown_body_hash_is_a_bytecode_mismatch() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", ContractRecord::unknown_at(addr(0xaa)));

    let chain = MockObserver::new().with_implementation("Token", addr(0xaa), code(1));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::MismatchingImplementationBodyBytecode {
            alias: "Token".to_string(),
            address: addr(0xaa),
            expected: None,
            observed: bytecode_digest(&code(1)),
        }]
    );
}

#[tokio::test]
async fn test_missing_remote_implementation_carries_code() {
    let local = network_file(&["Token"]);
    let chain = MockObserver::new().with_implementation("Token", addr(0xaa), code(1));

    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::MissingRemoteImplementation {
            alias: "Token".to_string(),
            address: addr(0xaa),
            remote_code: code(1),
        }]
    );
}

/// A proxy of a known implementation that is not recorded locally is reported
/// as missing
#[tokio::test]
async fn test_missing_remote_proxy() {
    let mut local = network_file(&["Vault"]);
    local.set_contract("Vault", record(addr(0xaa), 1));

    let chain = MockObserver::new()
        .with_implementation("Vault", addr(0xaa), code(1))
        .with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xaa));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::MissingRemoteProxy {
            package: FIXTURE_PACKAGE.to_string(),
            alias: "Vault".to_string(),
            address: addr(0xcc),
            implementation: addr(0xaa),
        }]
    );
}

/// A proxy pointing to an address registered under two aliases cannot be
/// attributed to either
#[tokio::test]
async fn test_multiple_proxy_implementations() {
    let mut local = network_file(&["TokenV1", "TokenV2"]);
    local.set_contract("TokenV1", record(addr(0xaa), 1));
    local.set_contract("TokenV2", record(addr(0xaa), 1));

    let chain = MockObserver::new()
        .with_implementation("TokenV1", addr(0xaa), code(1))
        .with_implementation("TokenV2", addr(0xaa), code(1))
        .with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xaa));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::MultipleProxyImplementations {
            package: FIXTURE_PACKAGE.to_string(),
            address: addr(0xcc),
            implementation: addr(0xaa),
            aliases: vec!["TokenV1".to_string(), "TokenV2".to_string()],
        }]
    );
    assert_eq!(discrepancies[0].observed(), "TokenV1, TokenV2");
}

#[tokio::test]
async fn test_unregistered_proxy_implementation() {
    let local = network_file(&[]);
    let chain = MockObserver::new().with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xee));

    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::UnregisteredProxyImplementation {
            package: FIXTURE_PACKAGE.to_string(),
            address: addr(0xcc),
            implementation: addr(0xee),
        }]
    );
}

#[tokio::test]
async fn test_proxy_alias_and_implementation_mismatch() {
    let mut local = network_file(&["Token", "Vault"]);
    local.set_contract("Token", record(addr(0xaa), 1));
    local.set_contract("Vault", record(addr(0xbb), 2));
    local.add_proxy(
        FIXTURE_PACKAGE,
        "Token",
        ProxyRecord::new("Token", addr(0xcc), "1.0.0", addr(0xaa)),
    );

    let chain = MockObserver::new()
        .with_implementation("Token", addr(0xaa), code(1))
        .with_implementation("Vault", addr(0xbb), code(2))
        .with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xbb));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![
            Discrepancy::MismatchingProxyAlias {
                package: FIXTURE_PACKAGE.to_string(),
                address: addr(0xcc),
                version: "1.0.0".to_string(),
                implementation: addr(0xaa),
                expected: "Token".to_string(),
                observed: "Vault".to_string(),
            },
            Discrepancy::MismatchingProxyImplementation {
                package: FIXTURE_PACKAGE.to_string(),
                alias: "Vault".to_string(),
                address: addr(0xcc),
                expected: addr(0xaa),
                observed: addr(0xbb),
            },
        ]
    );
}

#[tokio::test]
async fn test_unregistered_local_proxy_ignores_other_packages() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", record(addr(0xaa), 1));
    local.add_proxy(
        FIXTURE_PACKAGE,
        "Token",
        ProxyRecord::new("Token", addr(0xcc), "1.0.0", addr(0xaa)),
    );
    local.add_proxy(
        "openzeppelin-eth",
        "StandaloneERC20",
        ProxyRecord::new("StandaloneERC20", addr(0xc1), "2.0.0", addr(0xa1)),
    );

    let chain = MockObserver::new().with_implementation("Token", addr(0xaa), code(1));
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![Discrepancy::UnregisteredLocalProxy {
            package: FIXTURE_PACKAGE.to_string(),
            alias: "Token".to_string(),
            address: addr(0xcc),
            implementation: addr(0xaa),
        }]
    );
}

#[tokio::test]
async fn test_dependency_discrepancies() {
    let mut local = network_file(&[]);
    local.set_dependency("moved", DependencyRecord::new(addr(0xd1), "1.0.0"));
    local.set_dependency("bumped", DependencyRecord::new(addr(0xd2), "1.0.0"));
    local.set_dependency("unlinked", DependencyRecord::new(addr(0xd3), "1.0.0"));

    let chain = MockObserver::new()
        .with_dependency("moved", addr(0xe1), "1.0.0")
        .with_dependency("bumped", addr(0xd2), "1.1.0")
        .with_dependency("added", addr(0xe4), "3.0.0");
    let discrepancies = compare(&local, &chain).await.unwrap();
    assert_eq!(
        discrepancies,
        vec![
            Discrepancy::MismatchingDependencyAddress {
                name: "moved".to_string(),
                expected: addr(0xd1),
                observed: addr(0xe1),
            },
            Discrepancy::MismatchingDependencyVersion {
                name: "bumped".to_string(),
                expected: "1.0.0".to_string(),
                observed: "1.1.0".to_string(),
            },
            Discrepancy::MissingDependency {
                name: "added".to_string(),
                package: addr(0xe4),
                version: "3.0.0".to_string(),
            },
            Discrepancy::UnregisteredDependency {
                name: "unlinked".to_string(),
                package: addr(0xd3),
            },
        ]
    );
}

#[tokio::test]
async fn test_phases_are_ordered() {
    let mut local = network_file(&["Token"]);
    local.set_version("0.9.0");
    local.set_contract("Token", record(addr(0xaa), 1));
    local.set_dependency("lib", DependencyRecord::new(addr(0xd1), "1.0.0"));

    let chain = MockObserver::new()
        .with_package(addr(0x01), addr(0x02))
        .with_proxy(FIXTURE_PACKAGE, addr(0xcc), addr(0xee));
    let categories: Vec<_> = compare(&local, &chain)
        .await
        .unwrap()
        .iter()
        .map(Discrepancy::category)
        .collect();
    assert_eq!(
        categories,
        vec![
            Category::MismatchingVersion,
            Category::MismatchingPackage,
            Category::MismatchingProvider,
            Category::UnregisteredLocalImplementation,
            Category::UnregisteredProxyImplementation,
            Category::UnregisteredDependency,
        ]
    );
}

#[tokio::test]
async fn test_observer_failure_aborts_comparison() {
    let mut local = network_file(&["Token"]);
    local.set_contract("Token", record(addr(0xaa), 1));

    let chain = MockObserver::new()
        .with_implementation("Token", addr(0xaa), code(1))
        .failing_on(MockQuery::Dependencies);
    let err = compare(&local, &chain).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Connectivity(_)));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_stalled_query_times_out() {
    let local = network_file(&[]);
    let chain = MockObserver::new().stalling_on(MockQuery::ProxiesFor, Duration::from_secs(1));

    let err = StatusComparator::new(&local, &chain, Duration::from_millis(20))
        .compare()
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Timeout { .. }));
    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_app_record_is_not_compared() {
    let mut local = network_file(&[]);
    local.set_app_address(Some(addr(0x03)));

    assert!(compare(&local, &MockObserver::new()).await.unwrap().is_empty());
}
