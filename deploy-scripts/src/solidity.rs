//! Definitions of the Solidity interfaces queried to observe a project

use alloy::sol;

sol! {
    /// The application registry of a published project
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IApp {
        /// Emitted when the registry creates a proxy
        event ProxyCreated(address proxy);
        /// Emitted when a package is linked, re-linked or unlinked
        event PackageChanged(string providerName, address package, uint64[3] version);

        function getPackage(string packageName) external view returns (address package, uint64[3] version);
        function getProvider(string packageName) external view returns (address provider);
    }

    /// The per-version registry of implementations by alias
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IImplementationDirectory {
        /// Emitted when an alias is registered, re-registered or unregistered
        event ImplementationChanged(string contractName, address implementation);

        function getImplementation(string contractName) external view returns (address implementation);
    }
}
