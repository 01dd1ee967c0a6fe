//! Kaspa wallet synchronization
//!
//! This module contains the chain-specific side of the sync service: the
//! address-format descriptor, the pure transaction classifier, the wallet
//! data model and the orchestrator that drives the recurring sync job.

/// Address-format descriptor and locking-script decoding
pub mod address;
/// Pure transaction classification
pub mod classifier;
/// Orchestrator composing timer, retry and classifier
pub mod scheduler;
/// Wallet data model and errors
pub mod types;

pub use address::NetworkVariant;
pub use scheduler::{SyncParams, WALLET_SYNC_INTERVAL, WalletSyncScheduler};
