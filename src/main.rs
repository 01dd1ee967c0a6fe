mod ledger;
mod scheduler;
mod wallet;

use crate::ledger::KaspaRestClient;
use crate::scheduler::ConsumerPort;
use crate::wallet::{NetworkVariant, SyncParams, WALLET_SYNC_INTERVAL, WalletSyncScheduler};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::from_default_env()
				.add_directive(tracing::Level::INFO.into()),
		)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false)
		.with_file(false)
		.with_line_number(false)
		.with_timer(tracing_subscriber::fmt::time::time())
		.init();

	info!("Starting wallet sync service");

	let network = std::env::var("KASPA_NETWORK")
		.ok()
		.and_then(|value| value.parse().ok())
		.unwrap_or(NetworkVariant::Mainnet);

	let address = match std::env::var("KASPA_ADDRESS") {
		Ok(address) => address,
		Err(_) => {
			error!("KASPA_ADDRESS must be set to the account address to synchronize");
			return;
		}
	};

	let interval = std::env::var("SYNC_INTERVAL_SECONDS")
		.ok()
		.and_then(|value| value.parse().ok())
		.map(Duration::from_secs)
		.unwrap_or(WALLET_SYNC_INTERVAL);

	info!(
		"Synchronizing {} on {} every {:?}",
		address, network, interval
	);

	let client = KaspaRestClient::new(network.rest_base_url().to_string());

	let (sender, mut receiver) = mpsc::unbounded_channel();
	let mut wallet_scheduler =
		WalletSyncScheduler::new(client, ConsumerPort::new(sender), interval);

	wallet_scheduler.start(Some(SyncParams {
		identity: None,
		network,
		address,
	}));

	info!("Created wallet sync scheduler");

	let consumer = tokio::spawn(async move {
		while let Some(envelope) = receiver.recv().await {
			match serde_json::to_string(&envelope) {
				Ok(json) => info!("{}", json),
				Err(e) => error!("Failed to serialize consumer message: {}", e),
			}
		}
	});

	if let Err(e) = tokio::signal::ctrl_c().await {
		error!("Failed to listen for shutdown signal: {}", e);
	}

	info!("Shutting down");
	wallet_scheduler.stop();
	consumer.abort();
}
