//! Chain-agnostic scheduling primitives
//!
//! This module provides the periodic job engine and the bounded-retry
//! wrapper used by chain-specific orchestrators. Nothing in here knows about
//! wallets or ledgers.

/// Bounded-retry wrapper for async operations
mod retry;
/// Periodic job engine and consumer messaging
mod timer;

pub use retry::RetryPolicy;
pub use timer::{ConsumerPort, Envelope, JobError, SchedulerJob, SchedulerTimer};
