//! # rectrade
//!
//! Operator binary for a Renewable Energy Certificate ledger.
//!
//! The library half exposes the CLI definitions and command functions so
//! they can be driven from tests without spawning a process.

pub mod cli;
pub mod config;
