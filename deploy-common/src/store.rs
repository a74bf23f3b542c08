//! Reading & writing the project files of a project rooted at a directory.
//!
//! Writes are all-or-nothing: the new contents are written to a temporary file
//! in the same directory and then renamed over the previous snapshot, so an
//! interrupted write leaves the old file in place.
//!
//! Two invocations against the same project are not coordinated; the files are
//! not locked and the last writer wins.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::{
    constants::{JSON_EXTENSION, NETWORK_FILE_PREFIX, PACKAGE_FILE_NAME},
    errors::ProjectFileError,
    network_file::NetworkFile,
    package_file::PackageFile,
};

/// A store for the project files of a single project
#[derive(Clone, Debug)]
pub struct LocalFileStore {
    /// The project root directory
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at the given project directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path of the project-level package file
    pub fn package_file_path(&self) -> PathBuf {
        self.root.join(PACKAGE_FILE_NAME)
    }

    /// The path of the file tracking the given network
    pub fn network_file_path(&self, network: &str) -> PathBuf {
        self.root
            .join(format!("{NETWORK_FILE_PREFIX}.{network}.{JSON_EXTENSION}"))
    }

    /// Read the project-level package file
    pub fn read_package_file(&self) -> Result<PackageFile, ProjectFileError> {
        let contents = read_file(&self.package_file_path())?;
        PackageFile::from_json(&contents)
    }

    /// Read the file tracking the given network, along with the package file
    pub fn read_network_file(&self, network: &str) -> Result<NetworkFile, ProjectFileError> {
        let package_file = self.read_package_file()?;
        let contents = read_file(&self.network_file_path(network))?;
        NetworkFile::from_json(network, &contents, package_file)
    }

    /// Atomically replace the file tracking the network of `network_file`
    pub fn write_network_file(&self, network_file: &NetworkFile) -> Result<(), ProjectFileError> {
        let path = self.network_file_path(network_file.network());
        let contents = network_file.to_json()?;
        write_file_atomic(&self.root, &path, contents.as_bytes())?;

        debug!("wrote network file {}", path.display());
        Ok(())
    }
}

/// Read a file to a string
fn read_file(path: &Path) -> Result<String, ProjectFileError> {
    fs::read_to_string(path)
        .map_err(|e| ProjectFileError::ReadFile(format!("{}: {}", path.display(), e)))
}

/// Write `contents` to a temporary file in `dir` and rename it over `path`
fn write_file_atomic(dir: &Path, path: &Path, contents: &[u8]) -> Result<(), ProjectFileError> {
    let mut tmp =
        NamedTempFile::new_in(dir).map_err(|e| ProjectFileError::WriteFile(e.to_string()))?;
    tmp.write_all(contents)
        .map_err(|e| ProjectFileError::WriteFile(e.to_string()))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| ProjectFileError::WriteFile(e.to_string()))?;
    tmp.persist(path)
        .map_err(|e| ProjectFileError::WriteFile(format!("{}: {}", path.display(), e)))?;

    Ok(())
}
