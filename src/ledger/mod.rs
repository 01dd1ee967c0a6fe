//! Ledger integration module for the Kaspa REST API
//!
//! This module provides the client and types for interacting with the public
//! Kaspa REST API. The API exposes address balances and transaction history;
//! it is a non-consensus source, so everything fetched through it is treated
//! as uncertified data by the wallet layer.

/// REST client for the Kaspa ledger API
mod client;
/// Type definitions for ledger API data structures
mod types;

pub use client::{KaspaRestClient, RemoteLedgerClient};
pub use types::*;
