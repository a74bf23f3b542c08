//! Definitions of errors that can occur while reading, mutating or writing the
//! local project files

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur while handling the local project files
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectFileError {
    /// Error reading a project file from disk
    ReadFile(String),
    /// Error writing a project file to disk
    WriteFile(String),
    /// Error parsing the contents of a project file
    Parse(String),
    /// No contract is registered locally under the given alias
    MissingContract(String),
    /// No proxy matches the given selector
    MissingProxy(String),
    /// No dependency is registered locally under the given name
    MissingDependency(String),
    /// Error parsing a build artifact
    ArtifactParsing(String),
}

impl Display for ProjectFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProjectFileError::ReadFile(s) => write!(f, "error reading project file: {}", s),
            ProjectFileError::WriteFile(s) => write!(f, "error writing project file: {}", s),
            ProjectFileError::Parse(s) => write!(f, "error parsing project file: {}", s),
            ProjectFileError::MissingContract(s) => {
                write!(f, "no contract registered under alias {}", s)
            }
            ProjectFileError::MissingProxy(s) => write!(f, "no proxy matches {}", s),
            ProjectFileError::MissingDependency(s) => {
                write!(f, "no dependency registered under name {}", s)
            }
            ProjectFileError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
        }
    }
}

impl Error for ProjectFileError {}
