//! Wallet sync orchestrator for Kaspa.
//!
//! This module composes the generic scheduler timer, the retry policy and
//! the transaction classifier into the recurring sync job: fetch balance and
//! recent transactions concurrently, classify what is new, merge into the
//! snapshot under the certification invariant, and notify the consumer only
//! when observable state changed.
//!
//! The snapshot is owned exclusively by the sync job and mutated nowhere
//! else; everything external observes it through emitted messages. Merge and
//! emission happen under one snapshot lock, so a consumer never sees new
//! transactions without the balance that changed alongside them.

use crate::ledger::RemoteLedgerClient;
use crate::scheduler::{ConsumerPort, JobError, RetryPolicy, SchedulerJob, SchedulerTimer};
use crate::wallet::address::{AddressFormat, NetworkVariant};
use crate::wallet::classifier::classify_transaction;
use crate::wallet::types::{
	Address, Amount, CertifiedValue, TransactionRecord, WalletPayload, WalletSnapshot,
	WalletSyncError,
};

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Token symbol used in consumer references.
pub const KASPA_TOKEN_SYMBOL: &str = "KAS";

/// Default cadence of the periodic sync job.
pub const WALLET_SYNC_INTERVAL: Duration = Duration::from_secs(10);

/// Most recent transactions fetched per cycle.
const TRANSACTION_FETCH_LIMIT: usize = 50;

/// Retries for one sync cycle's fetch phase.
const SYNC_MAX_RETRIES: usize = 10;

/// Parameters for one wallet sync job.
#[derive(Debug, Clone)]
pub struct SyncParams {
	/// Opaque identity / auth context. Not needed by the public REST API,
	/// carried for collaborators that require it.
	pub identity: Option<String>,
	/// Target network variant.
	pub network: NetworkVariant,
	/// The account address to synchronize.
	pub address: Address,
}

/// Everything one cycle fetched from the ledger.
struct FetchedWallet {
	balance: CertifiedValue<Option<Amount>>,
	transactions: Vec<CertifiedValue<TransactionRecord>>,
}

/// Chain-specific orchestrator driving the periodic wallet sync.
pub struct WalletSyncScheduler<C: RemoteLedgerClient + 'static> {
	timer: SchedulerTimer<WalletPayload>,
	job: Arc<SyncJob<C>>,
	interval: Duration,
}

impl<C: RemoteLedgerClient + 'static> WalletSyncScheduler<C> {
	/// Create a stopped scheduler with an empty snapshot.
	pub fn new(client: C, consumer: ConsumerPort<WalletPayload>, interval: Duration) -> Self {
		let mut timer = SchedulerTimer::new("sync-kaspa-wallet");
		timer.set_consumer(consumer);

		let job = Arc::new(SyncJob {
			client,
			retry: RetryPolicy {
				max_retries: SYNC_MAX_RETRIES,
				..RetryPolicy::default()
			},
			snapshot: Mutex::new(WalletSnapshot::default()),
			reference: StdMutex::new(None),
			consumer: timer.consumer(),
		});

		Self {
			timer,
			job,
			interval,
		}
	}

	/// Derive the consumer reference and start the periodic sync.
	///
	/// Absent params leave the reference unset, which disables all message
	/// emission; the job itself then reports the missing parameters.
	pub fn start(&mut self, params: Option<SyncParams>) {
		self.job.set_reference(params.as_ref());
		self.timer
			.start(self.interval, self.job.clone(), params);
	}

	/// Run one sync cycle immediately, outside the periodic cadence.
	pub async fn trigger(&self, params: Option<SyncParams>) {
		self.timer.trigger(self.job.clone(), params).await;
	}

	/// Cancel future ticks; an in-flight cycle finishes on its own.
	pub fn stop(&mut self) {
		self.timer.stop();
	}
}

/// The recurring sync job. Owns the wallet snapshot.
struct SyncJob<C> {
	client: C,
	retry: RetryPolicy,
	snapshot: Mutex<WalletSnapshot>,
	reference: StdMutex<Option<String>>,
	consumer: ConsumerPort<WalletPayload>,
}

#[async_trait::async_trait]
impl<C: RemoteLedgerClient> SchedulerJob<SyncParams> for SyncJob<C> {
	async fn run(&self, params: Option<SyncParams>) -> Result<(), JobError> {
		if let Err(error) = self.sync_cycle(params.as_ref()).await {
			self.post_error(&error);
			return Err(error.into());
		}
		Ok(())
	}
}

impl<C: RemoteLedgerClient> SyncJob<C> {
	fn set_reference(&self, params: Option<&SyncParams>) {
		let reference =
			params.map(|params| format!("{}-{}", KASPA_TOKEN_SYMBOL, params.network));
		*self.reference.lock().expect("Reference lock poisoned") = reference;
	}

	fn reference(&self) -> Option<String> {
		self.reference
			.lock()
			.expect("Reference lock poisoned")
			.clone()
	}

	/// One fetch-classify-merge-notify cycle.
	///
	/// Only the fetch phase sits inside the retry wrapper: a failing merge
	/// is a logic defect and retrying it cannot succeed, so it is reported
	/// once instead.
	async fn sync_cycle(&self, params: Option<&SyncParams>) -> Result<(), WalletSyncError> {
		let params = params.ok_or(WalletSyncError::MissingParams)?;

		let format = AddressFormat::new(params.network);

		let fetched = self
			.retry
			.run(|| self.fetch_wallet(params, &format))
			.await?;

		self.merge_and_notify(fetched).await
	}

	/// Fetch balance and recent transactions concurrently.
	async fn fetch_wallet(
		&self,
		params: &SyncParams,
		format: &AddressFormat,
	) -> Result<FetchedWallet, WalletSyncError> {
		let (balance, transactions) = futures::future::try_join(
			self.load_balance(params),
			self.load_transactions(params, format),
		)
		.await?;

		Ok(FetchedWallet {
			balance,
			transactions,
		})
	}

	async fn load_balance(
		&self,
		params: &SyncParams,
	) -> Result<CertifiedValue<Option<Amount>>, WalletSyncError> {
		let balance = self.client.balance(&params.address).await?;

		// The REST API is not a consensus source; its balance is never
		// certified.
		Ok(CertifiedValue::uncertified(
			balance.map(Amount),
		))
	}

	async fn load_transactions(
		&self,
		params: &SyncParams,
		format: &AddressFormat,
	) -> Result<Vec<CertifiedValue<TransactionRecord>>, WalletSyncError> {
		let raw = self
			.client
			.recent_transactions(&params.address, TRANSACTION_FETCH_LIMIT)
			.await?;

		let snapshot = self.snapshot.lock().await;

		Ok(raw
			.iter()
			.map(|tx| {
				CertifiedValue::uncertified(classify_transaction(tx, &params.address, format))
			})
			.filter(|tx| !snapshot.transactions.contains_key(&tx.data.id))
			.collect())
	}

	/// Merge the fetched data into the snapshot and emit at most one
	/// message, atomically relative to each other.
	async fn merge_and_notify(&self, fetched: FetchedWallet) -> Result<(), WalletSyncError> {
		let mut snapshot = self.snapshot.lock().await;

		if let Some(stored) = &snapshot.balance {
			if stored.certified && !fetched.balance.certified {
				return Err(WalletSyncError::CertificationDowngrade);
			}
		}

		let balance_changed = snapshot
			.balance
			.as_ref()
			.is_none_or(|stored| stored.data != fetched.balance.data);

		// Transactions were filtered against the snapshot at fetch time;
		// filter again under the merge lock so an id can never be
		// overwritten or re-announced.
		let new_transactions: Vec<CertifiedValue<TransactionRecord>> = fetched
			.transactions
			.into_iter()
			.filter(|tx| !snapshot.transactions.contains_key(&tx.data.id))
			.collect();
		let has_new_transactions = !new_transactions.is_empty();

		if !balance_changed && !has_new_transactions {
			debug!("Wallet state unchanged, nothing to report");
			return Ok(());
		}

		if balance_changed {
			snapshot.balance = Some(fetched.balance.clone());
		}

		for tx in &new_transactions {
			snapshot
				.transactions
				.entry(tx.data.id.clone())
				.or_insert_with(|| tx.clone());
		}

		info!(
			"Wallet state changed: balance_changed={}, new_transactions={}",
			balance_changed,
			new_transactions.len()
		);

		// Emit before releasing the snapshot lock, so no later cycle can
		// interleave between merge and notification.
		self.post_wallet(fetched.balance, new_transactions);

		Ok(())
	}

	fn post_wallet(
		&self,
		balance: CertifiedValue<Option<Amount>>,
		new_transactions: Vec<CertifiedValue<TransactionRecord>>,
	) {
		let Some(reference) = self.reference() else {
			return;
		};

		self.consumer.post_msg(
			&reference,
			WalletPayload::SyncOk {
				balance,
				new_transactions,
			},
		);
	}

	fn post_error(&self, error: &WalletSyncError) {
		let Some(reference) = self.reference() else {
			return;
		};

		self.consumer.post_msg(
			&reference,
			WalletPayload::SyncError {
				error: error.to_string(),
			},
		);
	}
}
