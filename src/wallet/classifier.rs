//! Pure classification of raw ledger transactions into directional records.
//!
//! Kaspa uses a UTXO model and the ledger API lists outputs only, never
//! resolved inputs. Direction is therefore inferred from the outputs:
//! - Receive: the account address appears in the outputs (new UTXOs arrive)
//! - Send: outputs exist but none pay the account address
//!
//! The send case is a best-effort heuristic. A transaction created by
//! someone else that merely omits this address from its outputs is
//! indistinguishable from a self-initiated send; the data source cannot do
//! better, so neither can this classifier.

use crate::ledger::{ApiTransaction, ApiTransactionOutput};
use crate::wallet::address::AddressFormat;
use crate::wallet::types::{
	Amount, TransactionKind, TransactionRecord, TransactionStatus,
};
use itertools::Itertools;

/// Resolve an output's destination address.
///
/// Priority order: the explicit resolved field, then the verbose
/// sub-structure, then decoding the raw locking script with the format
/// descriptor. An unresolvable destination yields `None` and silently
/// degrades the record; it is not an error.
fn resolve_output_address(output: &ApiTransactionOutput, format: &AddressFormat) -> Option<String> {
	if let Some(address) = &output.script_public_key_address {
		return Some(address.clone());
	}

	if let Some(address) = output
		.verbose_data
		.as_ref()
		.and_then(|verbose| verbose.script_public_key_address.as_ref())
	{
		return Some(address.clone());
	}

	let script_hex = output.script_public_key.as_deref().or_else(|| {
		output
			.script_public_key_data
			.as_ref()
			.and_then(|script| script.script_public_key.as_deref())
	})?;

	format.script_to_address(script_hex)
}

/// Map a raw ledger transaction to a directional record for the given
/// account address.
///
/// A transaction paying the account anywhere classifies as a receive of the
/// amounts paid to the account, so a send never carries change back to self
/// and its value is the total over resolved outputs; the fee would require
/// input enumeration and is not reported. Outputs with unresolvable
/// destinations are excluded from sums and recipient lists, but never drop
/// the transaction itself.
pub fn classify_transaction(
	tx: &ApiTransaction,
	account: &str,
	format: &AddressFormat,
) -> TransactionRecord {
	let output_addresses: Vec<Option<String>> = tx
		.outputs
		.iter()
		.map(|output| resolve_output_address(output, format))
		.collect();

	let receiving = output_addresses
		.iter()
		.flatten()
		.any(|address| address == account);
	let sending = !receiving && !tx.outputs.is_empty();

	let (kind, value, from, to) = if receiving {
		let value = tx
			.outputs
			.iter()
			.zip(&output_addresses)
			.filter(|(_, address)| address.as_deref() == Some(account))
			.fold(0u64, |sum, (output, _)| sum.saturating_add(output.amount));

		// The sender is unknown from outputs alone; every resolved output
		// address is a potential recipient.
		let to: Vec<String> = output_addresses.iter().flatten().cloned().unique().collect();

		(TransactionKind::Receive, value, None, to)
	} else if sending {
		let value = tx
			.outputs
			.iter()
			.zip(&output_addresses)
			.filter(|(_, address)| address.is_some())
			.fold(0u64, |sum, (output, _)| sum.saturating_add(output.amount));

		// An output back to self would have classified the transaction as
		// a receive, so every resolved output here is a foreign recipient.
		let to: Vec<String> = output_addresses.iter().flatten().cloned().unique().collect();

		(
			TransactionKind::Send,
			value,
			Some(account.to_string()),
			to,
		)
	} else {
		// Zero outputs: keep a degenerate receive record rather than
		// dropping the transaction.
		(TransactionKind::Receive, 0, None, Vec::new())
	};

	TransactionRecord {
		id: tx.transaction_id.clone(),
		kind,
		status: if tx.is_accepted {
			TransactionStatus::Confirmed
		} else {
			TransactionStatus::Pending
		},
		value: Amount(value),
		from,
		to: (!to.is_empty()).then_some(to),
		timestamp: tx.block_time,
		ordering_key: tx.accepting_block_blue_score,
	}
}
