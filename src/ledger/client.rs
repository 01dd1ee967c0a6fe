//!
//! REST client for the public Kaspa ledger API.
//!
//! This module provides an async client for fetching address balances and
//! recent transaction history. All methods are async and designed for use
//! with Tokio. The client is deliberately thin: it owns no wallet state and
//! performs no interpretation of the data beyond deserialization.

use super::types::{ApiBalance, ApiTransaction, LedgerError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Read-only view of the remote ledger, as consumed by the sync job.
///
/// Implemented by [`KaspaRestClient`] in production; tests substitute their
/// own implementations.
#[async_trait]
pub trait RemoteLedgerClient: Send + Sync {
	/// Fetch the balance for an address, in sompi.
	///
	/// Returns `None` when the ledger has never seen the address. The value
	/// originates from a non-consensus REST source and must be treated as
	/// uncertified by callers.
	async fn balance(&self, address: &str) -> Result<Option<u64>, LedgerError>;

	/// Fetch the most recent transactions touching an address,
	/// most-recent-first, at most `limit` entries.
	async fn recent_transactions(
		&self,
		address: &str,
		limit: usize,
	) -> Result<Vec<ApiTransaction>, LedgerError>;
}

/// Kaspa REST API client
#[derive(Clone)]
pub struct KaspaRestClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// The base URL for the REST endpoint, without a trailing slash.
	base_url: String,
}

impl KaspaRestClient {
	/// Create a new REST client.
	///
	/// # Arguments
	/// * `base_url` - The REST endpoint base URL, e.g. `https://api.kaspa.org`.
	///
	/// # Returns
	/// A new `KaspaRestClient` instance.
	pub fn new(base_url: String) -> Self {
		let http_client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.expect("Failed to create HTTP client");

		Self {
			http_client,
			base_url,
		}
	}

	async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, LedgerError> {
		debug!("GET {}", url);

		let response = self.http_client.get(url).send().await?;

		if !response.status().is_success() {
			return Err(LedgerError::StatusError(response.status()));
		}

		let body = response.bytes().await?;
		Ok(serde_json::from_slice(&body)?)
	}
}

#[async_trait]
impl RemoteLedgerClient for KaspaRestClient {
	async fn balance(&self, address: &str) -> Result<Option<u64>, LedgerError> {
		let url = format!("{}/addresses/{}/balance", self.base_url, address);
		let body: ApiBalance = self.get_json(&url).await?;
		Ok(body.balance)
	}

	async fn recent_transactions(
		&self,
		address: &str,
		limit: usize,
	) -> Result<Vec<ApiTransaction>, LedgerError> {
		let url = format!(
			"{}/addresses/{}/full-transactions?limit={}&resolve_previous_outpoints=no",
			self.base_url, address, limit
		);
		self.get_json(&url).await
	}
}
