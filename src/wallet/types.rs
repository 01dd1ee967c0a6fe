use crate::ledger::LedgerError;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// A Kaspa address string, e.g. `kaspa1...`.
pub type Address = String;

/// A transaction id (hash) as reported by the ledger API.
pub type TransactionId = String;

/// Native token amount in sompi.
///
/// Serialized as a decimal string: consumers decode messages as JSON, and
/// JSON numeric encoding silently loses precision beyond 2^53, which real
/// balances exceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Amount(pub u64);

impl From<u64> for Amount {
	fn from(value: u64) -> Self {
		Amount(value)
	}
}

impl fmt::Display for Amount {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Serialize for Amount {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.collect_str(&self.0)
	}
}

impl<'de> Deserialize<'de> for Amount {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		struct AmountVisitor;

		impl<'de> Visitor<'de> for AmountVisitor {
			type Value = Amount;

			fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str("a u64 amount as a number or decimal string")
			}

			fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
				Ok(Amount(value))
			}

			fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
				value.parse().map(Amount).map_err(de::Error::custom)
			}
		}

		deserializer.deserialize_any(AmountVisitor)
	}
}

/// A value tagged with its provenance trust level.
///
/// `certified` is true only for data verified against a trusted source.
/// Everything fetched through the REST API is uncertified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertifiedValue<T> {
	pub data: T,
	pub certified: bool,
}

impl<T> CertifiedValue<T> {
	/// Wrap data fetched from a non-consensus source.
	pub fn uncertified(data: T) -> Self {
		Self {
			data,
			certified: false,
		}
	}
}

/// Direction of a transaction relative to the account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
	Send,
	Receive,
}

/// Acceptance status. Reorg handling stops at this binary flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
	Confirmed,
	Pending,
}

/// Directional user-facing transaction record.
///
/// `from` is absent for receives because the ledger API does not enumerate
/// inputs, so the sender is unknown from outputs alone. `to` can name
/// multiple recipients, since UTXO transactions fan out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
	pub id: TransactionId,
	#[serde(rename = "type")]
	pub kind: TransactionKind,
	pub status: TransactionStatus,
	pub value: Amount,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub from: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub to: Option<Vec<Address>>,
	/// Block time in seconds, passed through from the API unconverted.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<u64>,
	/// Blue score of the accepting block. A DAG total-ordering metric,
	/// analogous to block height on linear chains.
	#[serde(
		default,
		rename = "orderingKey",
		skip_serializing_if = "Option::is_none"
	)]
	pub ordering_key: Option<u64>,
}

/// In-memory wallet state owned by the sync job.
///
/// Never exposed for direct external mutation; consumers observe it only
/// through emitted messages. The transaction map is additive-only.
#[derive(Debug, Default)]
pub struct WalletSnapshot {
	pub balance: Option<CertifiedValue<Option<Amount>>>,
	pub transactions: HashMap<TransactionId, CertifiedValue<TransactionRecord>>,
}

/// Message payloads emitted to the consumer channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "tag", rename_all = "kebab-case")]
pub enum WalletPayload {
	/// Observable wallet state changed: the latest balance plus only the
	/// newly discovered transactions, never the full map.
	SyncOk {
		balance: CertifiedValue<Option<Amount>>,
		#[serde(rename = "newTransactions")]
		new_transactions: Vec<CertifiedValue<TransactionRecord>>,
	},
	/// A sync cycle failed after exhausting retries.
	SyncError { error: String },
}

/// Error types for wallet synchronization
#[derive(Debug, thiserror::Error)]
pub enum WalletSyncError {
	/// Required job parameters were absent. Reported immediately, never
	/// retried.
	#[error("no parameters provided to sync the wallet")]
	MissingParams,

	/// A remote fetch failed. Retried, reported only after exhaustion.
	#[error("ledger error: {0}")]
	LedgerError(#[from] LedgerError),

	/// A certified balance would have been replaced by an uncertified one.
	/// This is a logic defect, not an environment failure.
	#[error("balance certification cannot be downgraded")]
	CertificationDowngrade,
}
