//! Errors stemming from status reconciliation

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    time::Duration,
};

use deploy_common::errors::ProjectFileError;

/// An error raised by a chain observer for a genuine I/O failure.
///
/// An entity that simply does not exist on-chain is not an error; observers
/// return `None` or an empty result for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    /// The RPC request failed or the node could not be reached
    Rpc(String),
    /// The node answered with data that could not be decoded
    Decode(String),
}

impl Display for ObserverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ObserverError::Rpc(s) => write!(f, "rpc error: {}", s),
            ObserverError::Decode(s) => write!(f, "error decoding response: {}", s),
        }
    }
}

impl Error for ObserverError {}

/// Errors that abort a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A chain query failed; nothing observed so far may be acted upon
    Connectivity(String),
    /// A chain query did not complete within the configured timeout
    Timeout {
        /// A description of the query that timed out
        query: String,
        /// The timeout that elapsed
        timeout: Duration,
    },
    /// The local records could not be read or updated
    LocalState(ProjectFileError),
}

impl ReconcileError {
    /// Whether the error stems from the chain rather than the local records.
    /// Timeouts are connectivity failures.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ReconcileError::Connectivity(_) | ReconcileError::Timeout { .. }
        )
    }
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::Connectivity(s) => write!(f, "connectivity error: {}", s),
            ReconcileError::Timeout { query, timeout } => write!(
                f,
                "connectivity error: {} timed out after {}s",
                query,
                timeout.as_secs_f64()
            ),
            ReconcileError::LocalState(e) => write!(f, "local state error: {}", e),
        }
    }
}

impl Error for ReconcileError {}

impl From<ObserverError> for ReconcileError {
    fn from(value: ObserverError) -> Self {
        ReconcileError::Connectivity(value.to_string())
    }
}

impl From<ProjectFileError> for ReconcileError {
    fn from(value: ProjectFileError) -> Self {
        ReconcileError::LocalState(value)
    }
}
