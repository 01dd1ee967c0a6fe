//! Types for the Kaspa REST ledger API.

use serde::{Deserialize, Serialize};

/// Balance entry as returned by `GET /addresses/{address}/balance`.
///
/// The API reports `null` for addresses that have never appeared on chain,
/// which is distinct from a zero balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiBalance {
	/// The queried address, echoed back by the API.
	pub address: String,
	/// The balance in sompi, or `None` for unknown addresses.
	pub balance: Option<u64>,
}

/// A raw transaction as returned by the ledger API.
///
/// Kaspa is a UTXO chain: outputs are enumerated, inputs are not resolved to
/// addresses by this endpoint. Classification therefore works from outputs
/// alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTransaction {
	/// The transaction id (hash).
	pub transaction_id: String,
	/// Whether an accepting block exists for this transaction.
	#[serde(default)]
	pub is_accepted: bool,
	/// Block time in seconds, when known.
	#[serde(default)]
	pub block_time: Option<u64>,
	/// Blue score of the accepting block, the DAG ordering metric.
	#[serde(default)]
	pub accepting_block_blue_score: Option<u64>,
	/// The transaction outputs. May be empty for mass-only transactions.
	#[serde(default)]
	pub outputs: Vec<ApiTransactionOutput>,
}

/// A single transaction output.
///
/// The API is inconsistent about where the destination address lives: newer
/// responses carry `script_public_key_address` directly, older ones only the
/// verbose sub-structure or the raw locking script. All three shapes are
/// modeled so the classifier can fall back in priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTransactionOutput {
	/// Output amount in sompi.
	pub amount: u64,
	/// Already-resolved destination address, when the API provides it.
	#[serde(default)]
	pub script_public_key_address: Option<String>,
	/// Raw locking script as a hex string.
	#[serde(default)]
	pub script_public_key: Option<String>,
	/// Structured locking script, carried by some response variants.
	#[serde(default, rename = "scriptPublicKey")]
	pub script_public_key_data: Option<ApiScriptPublicKey>,
	/// Verbose sub-structure, carried by some response variants.
	#[serde(default, rename = "verboseData")]
	pub verbose_data: Option<ApiOutputVerboseData>,
}

/// Structured locking-script variant of an output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiScriptPublicKey {
	/// The locking script as a hex string.
	#[serde(default, rename = "scriptPublicKey")]
	pub script_public_key: Option<String>,
	/// Script version.
	#[serde(default)]
	pub version: Option<u16>,
}

/// Verbose output data variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiOutputVerboseData {
	/// Already-resolved destination address.
	#[serde(default, rename = "scriptPublicKeyAddress")]
	pub script_public_key_address: Option<String>,
}

/// Error types for ledger API operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("ledger API returned status {0}")]
	StatusError(reqwest::StatusCode),

	#[error("JSON parse error: {0}")]
	JsonError(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn malformed_body_surfaces_as_a_json_error() {
		let parsed: Result<ApiBalance, serde_json::Error> = serde_json::from_slice(b"not json");
		let error = LedgerError::from(parsed.expect_err("Expected a parse failure"));
		assert!(matches!(error, LedgerError::JsonError(_)));
	}
}
