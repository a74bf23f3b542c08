//! Scripts for comparing the deployment records of a project against the chain
//! and pulling on-chain state into them.

#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
mod constants;
pub mod errors;
pub mod observer;
mod solidity;
pub mod utils;
