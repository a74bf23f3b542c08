//! The per-network project file, mirroring the on-chain state of the package on
//! a single network.
//!
//! A [`NetworkFile`] is the root aggregate of the deployment records: it
//! exclusively owns the package, contract, proxy & dependency records, and all
//! mutation goes through the accessors defined here. Mutators act on memory
//! only; persisting is the job of [`crate::store::LocalFileStore`].

use indexmap::IndexMap;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    errors::ProjectFileError,
    package_file::PackageFile,
    types::{AddressRecord, ContractRecord, DependencyRecord, ProxyRecord, ProxySelector},
};

/// The serialized form of a network file.
///
/// Field names match the files already stored on disk, and any top-level field
/// not listed here is carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFileData {
    /// The package version last pushed to the network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// The on-chain package registry entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<AddressRecord>,
    /// The on-chain implementation directory of the current version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AddressRecord>,
    /// The on-chain application registry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app: Option<AddressRecord>,
    /// Deployed implementations, keyed by alias
    #[serde(default)]
    pub contracts: IndexMap<String, ContractRecord>,
    /// Deployed proxies, keyed by package name
    #[serde(default)]
    pub proxies: IndexMap<String, Vec<ProxyRecord>>,
    /// Linked dependencies, keyed by name
    #[serde(default)]
    pub dependencies: IndexMap<String, DependencyRecord>,
    /// Fields not interpreted by this crate
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The deployment records of a package on one network, together with the
/// project-level package file they are declared in
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkFile {
    /// The name of the network
    network: String,
    /// The records themselves
    data: NetworkFileData,
    /// The project-level package file
    package_file: PackageFile,
}

impl NetworkFile {
    /// Create an empty network file for the given network
    pub fn new(network: &str, package_file: PackageFile) -> Self {
        Self {
            network: network.to_string(),
            data: NetworkFileData::default(),
            package_file,
        }
    }

    /// Parse a network file from its JSON contents
    pub fn from_json(
        network: &str,
        contents: &str,
        package_file: PackageFile,
    ) -> Result<Self, ProjectFileError> {
        let data =
            serde_json::from_str(contents).map_err(|e| ProjectFileError::Parse(e.to_string()))?;

        Ok(Self {
            network: network.to_string(),
            data,
            package_file,
        })
    }

    /// Render the network file as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, ProjectFileError> {
        let mut contents = serde_json::to_string_pretty(&self.data)
            .map_err(|e| ProjectFileError::Parse(e.to_string()))?;
        contents.push('\n');
        Ok(contents)
    }

    /// The name of the network this file tracks
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The project-level package file
    pub fn package_file(&self) -> &PackageFile {
        &self.package_file
    }

    /// The raw records
    pub fn data(&self) -> &NetworkFileData {
        &self.data
    }

    /// The name of the project's package
    pub fn package_name(&self) -> &str {
        &self.package_file.name
    }

    /// Whether the project is published to an on-chain package registry
    pub fn is_published(&self) -> bool {
        self.package_file.publish
    }

    // -----------------------
    // | Version & Addresses |
    // -----------------------

    /// The version last pushed to the network
    pub fn version(&self) -> Option<&str> {
        self.data.version.as_deref()
    }

    /// Set the version last pushed to the network
    pub fn set_version(&mut self, version: &str) {
        self.data.version = Some(version.to_string());
    }

    /// Whether the pushed version is the one declared in the package file
    pub fn has_matching_version(&self) -> bool {
        self.version() == Some(self.package_file.version.as_str())
    }

    /// The address of the package registry entry
    pub fn package_address(&self) -> Option<Address> {
        self.data.package.as_ref().map(|p| p.address)
    }

    /// Set or clear the address of the package registry entry
    pub fn set_package_address(&mut self, address: Option<Address>) {
        set_address_record(&mut self.data.package, address);
    }

    /// The address of the implementation directory of the current version
    pub fn provider_address(&self) -> Option<Address> {
        self.data.provider.as_ref().map(|p| p.address)
    }

    /// Set or clear the address of the implementation directory
    pub fn set_provider_address(&mut self, address: Option<Address>) {
        set_address_record(&mut self.data.provider, address);
    }

    /// The address of the application registry
    pub fn app_address(&self) -> Option<Address> {
        self.data.app.as_ref().map(|a| a.address)
    }

    /// Set or clear the address of the application registry
    pub fn set_app_address(&mut self, address: Option<Address>) {
        set_address_record(&mut self.data.app, address);
    }

    // -------------
    // | Contracts |
    // -------------

    /// The contract registered under the given alias
    pub fn contract(&self, alias: &str) -> Option<&ContractRecord> {
        self.data.contracts.get(alias)
    }

    /// All registered contracts, in the order they are recorded
    pub fn contracts(&self) -> impl Iterator<Item = (&str, &ContractRecord)> {
        self.data.contracts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The aliases of all registered contracts
    pub fn contract_aliases(&self) -> Vec<String> {
        self.data.contracts.keys().cloned().collect()
    }

    /// Whether a contract is registered under the given alias
    pub fn has_contract(&self, alias: &str) -> bool {
        self.data.contracts.contains_key(alias)
    }

    /// Whether any contract is registered
    pub fn has_contracts(&self) -> bool {
        !self.data.contracts.is_empty()
    }

    /// The contract type name behind an alias, falling back to the alias itself
    /// when the package file does not declare it
    pub fn contract_name<'a>(&'a self, alias: &'a str) -> &'a str {
        self.package_file.contract(alias).unwrap_or(alias)
    }

    /// Registered aliases that the package file no longer declares
    pub fn contract_aliases_missing_from_package(&self) -> Vec<String> {
        self.data
            .contracts
            .keys()
            .filter(|alias| !self.package_file.has_contract(alias))
            .cloned()
            .collect()
    }

    /// Insert or fully replace the contract registered under the given alias
    pub fn set_contract(&mut self, alias: &str, record: ContractRecord) {
        self.data.contracts.insert(alias.to_string(), record);
    }

    /// Remove the contract registered under the given alias, if any
    pub fn unset_contract(&mut self, alias: &str) {
        self.data.contracts.shift_remove(alias);
    }

    /// Modify the contract registered under the given alias in place
    pub fn update_implementation<F>(&mut self, alias: &str, f: F) -> Result<(), ProjectFileError>
    where
        F: FnOnce(&mut ContractRecord),
    {
        let record = self
            .data
            .contracts
            .get_mut(alias)
            .ok_or_else(|| ProjectFileError::MissingContract(alias.to_string()))?;
        f(record);
        Ok(())
    }

    // -----------
    // | Proxies |
    // -----------

    /// All proxies, paired with the name of the package they belong to
    pub fn proxies(&self) -> impl Iterator<Item = (&str, &ProxyRecord)> {
        self.data
            .proxies
            .iter()
            .flat_map(|(package, proxies)| proxies.iter().map(move |p| (package.as_str(), p)))
    }

    /// The proxies belonging to the given package
    pub fn proxies_of(&self, package: &str) -> &[ProxyRecord] {
        self.data
            .proxies
            .get(package)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether any proxy is recorded
    pub fn has_proxies(&self) -> bool {
        self.data.proxies.values().any(|proxies| !proxies.is_empty())
    }

    /// The proxy identified by the given selector
    pub fn proxy(&self, selector: &ProxySelector) -> Option<&ProxyRecord> {
        self.proxies_of(&selector.package)
            .iter()
            .find(|p| p.matches(&selector.alias, selector.address))
    }

    /// Record a proxy of `package` delegating to `alias`.
    ///
    /// A record already stored under the same triple is replaced.
    pub fn add_proxy(&mut self, package: &str, alias: &str, mut record: ProxyRecord) {
        record.contract = alias.to_string();
        let proxies = self.data.proxies.entry(package.to_string()).or_default();
        match proxies
            .iter_mut()
            .find(|p| p.matches(alias, record.address))
        {
            Some(existing) => *existing = record,
            None => proxies.push(record),
        }
    }

    /// Remove the proxy identified by the given triple; a no-op if none matches
    pub fn remove_proxy(&mut self, package: &str, alias: &str, address: Address) {
        let Some(proxies) = self.data.proxies.get_mut(package) else {
            return;
        };

        proxies.retain(|p| !p.matches(alias, address));
        if proxies.is_empty() {
            self.data.proxies.shift_remove(package);
        }
    }

    /// Modify the proxy identified by the given selector in place
    pub fn update_proxy<F>(&mut self, selector: &ProxySelector, f: F) -> Result<(), ProjectFileError>
    where
        F: FnOnce(&mut ProxyRecord),
    {
        let record = self
            .data
            .proxies
            .get_mut(&selector.package)
            .and_then(|proxies| {
                proxies
                    .iter_mut()
                    .find(|p| p.matches(&selector.alias, selector.address))
            })
            .ok_or_else(|| ProjectFileError::MissingProxy(selector.to_string()))?;
        f(record);
        Ok(())
    }

    // ----------------
    // | Dependencies |
    // ----------------

    /// The dependency linked under the given name
    pub fn dependency(&self, name: &str) -> Option<&DependencyRecord> {
        self.data.dependencies.get(name)
    }

    /// All linked dependencies, in the order they are recorded
    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &DependencyRecord)> {
        self.data.dependencies.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a dependency is linked under the given name
    pub fn has_dependency(&self, name: &str) -> bool {
        self.data.dependencies.contains_key(name)
    }

    /// Whether any dependency is linked
    pub fn has_dependencies(&self) -> bool {
        !self.data.dependencies.is_empty()
    }

    /// Linked dependencies that the package file no longer declares
    pub fn dependency_names_missing_from_package(&self) -> Vec<String> {
        self.data
            .dependencies
            .keys()
            .filter(|name| !self.package_file.has_dependency(name))
            .cloned()
            .collect()
    }

    /// Insert or fully replace the dependency linked under the given name
    pub fn set_dependency(&mut self, name: &str, record: DependencyRecord) {
        self.data.dependencies.insert(name.to_string(), record);
    }

    /// Remove the dependency linked under the given name, if any
    pub fn unset_dependency(&mut self, name: &str) {
        self.data.dependencies.shift_remove(name);
    }

    /// Modify the dependency linked under the given name in place
    pub fn update_dependency<F>(&mut self, name: &str, f: F) -> Result<(), ProjectFileError>
    where
        F: FnOnce(&mut DependencyRecord),
    {
        let record = self
            .data
            .dependencies
            .get_mut(name)
            .ok_or_else(|| ProjectFileError::MissingDependency(name.to_string()))?;
        f(record);
        Ok(())
    }
}

/// Point an optional address record at `address`, keeping any extra fields it
/// already carries
fn set_address_record(slot: &mut Option<AddressRecord>, address: Option<Address>) {
    match (slot.as_mut(), address) {
        (Some(record), Some(address)) => record.address = address,
        (None, Some(address)) => *slot = Some(AddressRecord::new(address)),
        (_, None) => *slot = None,
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{address, Address};

    use crate::{
        errors::ProjectFileError,
        package_file::PackageFile,
        types::{ContractRecord, DependencyRecord, ProxyRecord, ProxySelector},
    };

    use super::NetworkFile;

    const PROXY: Address = address!("00000000000000000000000000000000000000cc");
    const IMPL_A: Address = address!("00000000000000000000000000000000000000aa");
    const IMPL_B: Address = address!("00000000000000000000000000000000000000bb");

    fn network_file() -> NetworkFile {
        let mut package_file = PackageFile::new("vault-app", "1.0.0");
        package_file
            .contracts
            .insert("Token".to_string(), "ERC20Token".to_string());
        NetworkFile::new("ropsten", package_file)
    }

    #[test]
    fn test_set_contract_replaces_in_full() {
        let mut file = network_file();
        let mut first = ContractRecord::unknown_at(IMPL_A);
        first
            .extra
            .insert("storage".to_string(), serde_json::json!([]));
        file.set_contract("Token", first);
        file.set_contract("Token", ContractRecord::unknown_at(IMPL_B));

        let record = file.contract("Token").unwrap();
        assert_eq!(record.address, IMPL_B);
        assert!(record.extra.is_empty());
    }

    #[test]
    fn test_unset_missing_contract_is_noop() {
        let mut file = network_file();
        let before = file.clone();
        file.unset_contract("Nope");
        assert_eq!(file, before);
    }

    #[test]
    fn test_update_missing_implementation_fails() {
        let mut file = network_file();
        let res = file.update_implementation("Token", |r| r.address = IMPL_A);
        assert_eq!(
            res,
            Err(ProjectFileError::MissingContract("Token".to_string()))
        );
    }

    #[test]
    fn test_contract_name_falls_back_to_alias() {
        let file = network_file();
        assert_eq!(file.contract_name("Token"), "ERC20Token");
        assert_eq!(file.contract_name("Vault"), "Vault");
    }

    #[test]
    fn test_proxy_triple_is_unique() {
        let mut file = network_file();
        file.add_proxy("vault-app", "Token", ProxyRecord::new("", PROXY, "1.0.0", IMPL_A));
        file.add_proxy("vault-app", "Token", ProxyRecord::new("", PROXY, "1.1.0", IMPL_B));

        let proxies = file.proxies_of("vault-app");
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0].contract, "Token");
        assert_eq!(proxies[0].implementation, IMPL_B);
    }

    #[test]
    fn test_remove_proxy_with_other_triple_is_noop() {
        let mut file = network_file();
        file.add_proxy("vault-app", "Token", ProxyRecord::new("", PROXY, "1.0.0", IMPL_A));
        let before = file.clone();

        file.remove_proxy("vault-app", "Vault", PROXY);
        file.remove_proxy("other-app", "Token", PROXY);
        file.remove_proxy("vault-app", "Token", IMPL_A);
        assert_eq!(file, before);

        file.remove_proxy("vault-app", "Token", PROXY);
        assert!(!file.has_proxies());
        assert!(file.data().proxies.is_empty());
    }

    #[test]
    fn test_update_proxy_requires_match() {
        let mut file = network_file();
        file.add_proxy("vault-app", "Token", ProxyRecord::new("", PROXY, "1.0.0", IMPL_A));

        let selector = ProxySelector::new("vault-app", "Token", PROXY);
        file.update_proxy(&selector, |p| p.implementation = IMPL_B)
            .unwrap();
        assert_eq!(file.proxy(&selector).unwrap().implementation, IMPL_B);

        let wrong = ProxySelector::new("vault-app", "Vault", PROXY);
        assert!(matches!(
            file.update_proxy(&wrong, |_| {}),
            Err(ProjectFileError::MissingProxy(_))
        ));
    }

    #[test]
    fn test_dependency_mutators() {
        let mut file = network_file();
        file.set_dependency("stdlib", DependencyRecord::new(IMPL_A, "2.0.0"));
        file.update_dependency("stdlib", |d| d.version = "2.1.0".to_string())
            .unwrap();
        assert_eq!(file.dependency("stdlib").unwrap().version, "2.1.0");
        assert_eq!(
            file.dependency_names_missing_from_package(),
            vec!["stdlib".to_string()]
        );

        file.unset_dependency("stdlib");
        assert!(!file.has_dependencies());
        assert!(file.update_dependency("stdlib", |_| {}).is_err());
    }

    #[test]
    fn test_unrelated_top_level_fields_survive() {
        let raw = r#"{
            "version": "1.0.0",
            "frozen": false,
            "solidityLibs": {},
            "manifestVersion": "2.2",
            "package": {"address": "0x00000000000000000000000000000000000000aa"},
            "contracts": {},
            "proxies": {},
            "dependencies": {}
        }"#;
        let mut file = NetworkFile::from_json("ropsten", raw, network_file().package_file().clone())
            .unwrap();
        file.set_package_address(Some(IMPL_B));

        let rewritten: serde_json::Value = serde_json::from_str(&file.to_json().unwrap()).unwrap();
        assert_eq!(rewritten["manifestVersion"], "2.2");
        assert_eq!(rewritten["frozen"], false);
        assert_eq!(
            rewritten["package"]["address"].as_str().unwrap().to_lowercase(),
            format!("{IMPL_B:#x}")
        );
    }

    #[test]
    fn test_rewrite_keeps_recorded_order() {
        let raw = r#"{
            "zebra": 1,
            "apple": 2,
            "contracts": {
                "Zeta": {"address": "0x00000000000000000000000000000000000000aa"},
                "Alpha": {"address": "0x00000000000000000000000000000000000000bb"}
            },
            "dependencies": {
                "zlib": {"package": "0x00000000000000000000000000000000000000aa", "version": "1.0.0"},
                "alib": {"package": "0x00000000000000000000000000000000000000bb", "version": "1.0.0"}
            }
        }"#;
        let mut file = NetworkFile::from_json("ropsten", raw, network_file().package_file().clone())
            .unwrap();
        let aliases: Vec<&str> = file.contracts().map(|(alias, _)| alias).collect();
        assert_eq!(aliases, vec!["Zeta", "Alpha"]);

        // New records go last, removals keep the rest in place
        file.set_contract("Beta", ContractRecord::unknown_at(IMPL_A));
        file.set_contract("Zeta", ContractRecord::unknown_at(IMPL_B));
        file.unset_dependency("zlib");
        file.set_dependency("mlib", DependencyRecord::new(IMPL_A, "1.0.0"));
        assert_eq!(file.contract_aliases(), vec!["Zeta", "Alpha", "Beta"]);
        let names: Vec<&str> = file.dependencies().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["alib", "mlib"]);

        let json = file.to_json().unwrap();
        let position = |key: &str| json.find(&format!("\"{key}\"")).unwrap();
        assert!(position("Zeta") < position("Alpha"));
        assert!(position("Alpha") < position("Beta"));
        assert!(position("zebra") < position("apple"));
    }

    #[test]
    fn test_version_match() {
        let mut file = network_file();
        assert!(!file.has_matching_version());
        file.set_version("1.0.0");
        assert!(file.has_matching_version());
    }
}
