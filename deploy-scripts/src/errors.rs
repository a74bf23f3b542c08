//! Definitions of errors that can occur while running the scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use deploy_common::errors::ProjectFileError;
use deploy_core::errors::ReconcileError;

/// An error raised by a script
#[derive(Debug)]
pub enum ScriptError {
    /// Error loading the project or network config
    ConfigLoading(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error reading the project files
    ReadProjectFiles(String),
    /// Error writing the project files
    WriteProjectFiles(String),
    /// The project is not in a state the script can operate on
    InvalidProject(String),
    /// The chain could not be observed
    Connectivity(String),
    /// Some discrepancies have no deterministic resolution
    UnresolvedAmbiguities(usize),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ConfigLoading(s) => write!(f, "error loading config: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ReadProjectFiles(s) => write!(f, "error reading project files: {}", s),
            ScriptError::WriteProjectFiles(s) => write!(f, "error writing project files: {}", s),
            ScriptError::InvalidProject(s) => write!(f, "invalid project: {}", s),
            ScriptError::Connectivity(s) => write!(f, "{}", s),
            ScriptError::UnresolvedAmbiguities(n) => {
                write!(f, "{} discrepancies need to be resolved manually", n)
            }
        }
    }
}

impl Error for ScriptError {}

impl From<ProjectFileError> for ScriptError {
    fn from(value: ProjectFileError) -> Self {
        match value {
            ProjectFileError::WriteFile(_) => ScriptError::WriteProjectFiles(value.to_string()),
            _ => ScriptError::ReadProjectFiles(value.to_string()),
        }
    }
}

impl From<ReconcileError> for ScriptError {
    fn from(value: ReconcileError) -> Self {
        match value {
            ReconcileError::LocalState(e) => e.into(),
            _ => ScriptError::Connectivity(value.to_string()),
        }
    }
}
