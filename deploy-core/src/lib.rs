//! The status reconciliation engine: compares the deployment records of a
//! network file against live on-chain state, classifies every discrepancy, and
//! either reports it or repairs the local records.

#![deny(missing_docs)]

pub mod comparator;
pub mod discrepancy;
pub mod errors;
pub mod handlers;
pub mod observer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
