//! Local project files tracking the deployment state of a package:
//! the project-level package file, the per-network files mirroring on-chain
//! state, the build artifacts they are checked against, and the store that
//! reads & atomically writes them.

#![deny(missing_docs)]

pub mod artifacts;
pub mod constants;
pub mod custom_serde;
pub mod errors;
pub mod network_file;
pub mod package_file;
pub mod store;
pub mod types;
