//! Generic periodic job engine with explicit cancellation.
//!
//! This module defines the `SchedulerTimer`, a small reusable engine that
//! runs a supplied job immediately and then on a fixed cadence, with at most
//! one execution in flight at any time. It is chain-agnostic: the wallet
//! orchestrator composes it with a chain-specific sync job, and other chains
//! can reuse it unchanged.
//!
//! Messages to the consumer cross the worker boundary through a
//! `ConsumerPort`, an optional mpsc sender. The timer does not care whether
//! the other end lives on another task, another thread, or another process.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Errors surfaced by a job run. The timer logs them and keeps ticking; a
/// failing job never terminates the loop.
pub type JobError = Box<dyn std::error::Error + Send + Sync>;

/// A unit of work driven by the timer.
///
/// `params` is whatever the orchestration layer passed to `start` or
/// `trigger`; jobs that require parameters report their absence themselves.
#[async_trait::async_trait]
pub trait SchedulerJob<P>: Send + Sync {
	/// Run one execution of the job.
	async fn run(&self, params: Option<P>) -> Result<(), JobError>;
}

/// A tagged message addressed to a consumer reference.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<M> {
	/// The consumer reference this message is addressed to.
	#[serde(rename = "ref")]
	pub reference: String,
	/// The message payload. The tag rides on the payload's serialization.
	#[serde(flatten)]
	pub payload: M,
}

/// Outbound port for consumer messages.
///
/// Cloneable so the job can emit through the same channel as the timer.
/// A disconnected port swallows messages, which is what disables emission
/// when no consumer is registered.
#[derive(Debug)]
pub struct ConsumerPort<M> {
	sender: Option<mpsc::UnboundedSender<Envelope<M>>>,
}

// The derived impl would bound `M: Clone`; the sender clones for any `M`.
impl<M> Clone for ConsumerPort<M> {
	fn clone(&self) -> Self {
		Self {
			sender: self.sender.clone(),
		}
	}
}

impl<M> ConsumerPort<M> {
	/// Create a port delivering into the given channel.
	pub fn new(sender: mpsc::UnboundedSender<Envelope<M>>) -> Self {
		Self {
			sender: Some(sender),
		}
	}

	/// Create a port with no consumer attached. Messages are dropped.
	pub fn disconnected() -> Self {
		Self { sender: None }
	}

	/// Deliver a tagged message to the consumer; no-op if no consumer is
	/// attached.
	pub fn post_msg(&self, reference: &str, payload: M) {
		let Some(sender) = &self.sender else {
			return;
		};

		let envelope = Envelope {
			reference: reference.to_string(),
			payload,
		};

		if sender.send(envelope).is_err() {
			warn!("Consumer channel closed, dropping message");
		}
	}
}

/// Repeating / triggerable job engine.
///
/// Overlap policy: the periodic loop awaits the job body inline, so tick N+1
/// never begins before tick N (including its retries) has settled. Ticks
/// missed while a run is active are skipped, and the overrun is reported via
/// a warning. `trigger` runs serialize against the periodic loop through a
/// shared lock, so at most one job body executes at any time.
pub struct SchedulerTimer<M> {
	name: &'static str,
	consumer: ConsumerPort<M>,
	cancel: Option<watch::Sender<bool>>,
	in_flight: Arc<Mutex<()>>,
}

impl<M: Send + 'static> SchedulerTimer<M> {
	/// Create a stopped timer with no consumer attached.
	pub fn new(name: &'static str) -> Self {
		Self {
			name,
			consumer: ConsumerPort::disconnected(),
			cancel: None,
			in_flight: Arc::new(Mutex::new(())),
		}
	}

	/// Attach the consumer port used by `post_msg`.
	pub fn set_consumer(&mut self, consumer: ConsumerPort<M>) {
		self.consumer = consumer;
	}

	/// Get a clone of the consumer port, for jobs that emit messages of
	/// their own.
	pub fn consumer(&self) -> ConsumerPort<M> {
		self.consumer.clone()
	}

	/// Deliver a tagged message to the consumer; no-op if no consumer is
	/// attached.
	pub fn post_msg(&self, reference: &str, payload: M) {
		self.consumer.post_msg(reference, payload);
	}

	/// Run the job immediately, then every `interval`, until `stop`.
	///
	/// Starting an already-started timer is a no-op.
	pub fn start<P>(
		&mut self,
		interval: Duration,
		job: Arc<dyn SchedulerJob<P>>,
		params: Option<P>,
	) where
		P: Clone + Send + Sync + 'static,
	{
		if self.cancel.is_some() {
			warn!("{}: timer already started", self.name);
			return;
		}

		let (cancel_tx, mut cancel_rx) = watch::channel(false);
		self.cancel = Some(cancel_tx);

		let in_flight = self.in_flight.clone();
		let name = self.name;

		tokio::spawn(async move {
			let mut ticker = tokio::time::interval(interval);
			ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

			loop {
				tokio::select! {
					_ = ticker.tick() => {
						let _guard = in_flight.lock().await;
						let started = Instant::now();

						if let Err(e) = job.run(params.clone()).await {
							error!("{}: job failed: {}", name, e);
						}

						if started.elapsed() >= interval {
							warn!(
								"{}: job overran the {:?} tick interval, missed ticks skipped",
								name, interval
							);
						}
					}
					_ = cancel_rx.changed() => {
						debug!("{}: periodic loop exiting", name);
						break;
					}
				}
			}
		});

		info!("{}: started with interval {:?}", self.name, interval);
	}

	/// Run the job once immediately, independent of the periodic cadence.
	///
	/// Waits for any in-flight run to settle first, so the at-most-one rule
	/// holds for shared state. Works on a stopped timer.
	pub async fn trigger<P>(&self, job: Arc<dyn SchedulerJob<P>>, params: Option<P>)
	where
		P: Clone + Send + Sync + 'static,
	{
		let _guard = self.in_flight.lock().await;

		if let Err(e) = job.run(params).await {
			error!("{}: job failed: {}", self.name, e);
		}
	}

	/// Cancel future ticks. An in-flight run is allowed to finish.
	pub fn stop(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			let _ = cancel.send(true);
			info!("{}: stopped", self.name);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

	struct CountingJob {
		runs: AtomicUsize,
		fail: bool,
	}

	impl CountingJob {
		fn new(fail: bool) -> Arc<Self> {
			Arc::new(Self {
				runs: AtomicUsize::new(0),
				fail,
			})
		}

		fn runs(&self) -> usize {
			self.runs.load(Ordering::SeqCst)
		}
	}

	#[async_trait::async_trait]
	impl SchedulerJob<()> for CountingJob {
		async fn run(&self, _params: Option<()>) -> Result<(), JobError> {
			self.runs.fetch_add(1, Ordering::SeqCst);
			if self.fail {
				return Err("job failed on purpose".into());
			}
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn runs_immediately_then_periodically_until_stopped() {
		let job = CountingJob::new(false);
		let mut timer = SchedulerTimer::<()>::new("test-timer");

		timer.start(Duration::from_secs(1), job.clone(), None::<()>);

		// First run fires on the immediate tick.
		tokio::time::sleep(Duration::from_millis(10)).await;
		assert_eq!(job.runs(), 1);

		tokio::time::sleep(Duration::from_secs(3)).await;
		assert!(job.runs() >= 3, "expected periodic runs, got {}", job.runs());

		timer.stop();
		tokio::time::sleep(Duration::from_millis(10)).await;
		let after_stop = job.runs();

		tokio::time::sleep(Duration::from_secs(5)).await;
		assert_eq!(job.runs(), after_stop);
	}

	#[tokio::test(start_paused = true)]
	async fn trigger_runs_once_even_after_stop() {
		let job = CountingJob::new(false);
		let mut timer = SchedulerTimer::<()>::new("test-timer");

		timer.start(Duration::from_secs(60), job.clone(), None::<()>);
		tokio::time::sleep(Duration::from_millis(10)).await;
		timer.stop();
		tokio::time::sleep(Duration::from_millis(10)).await;

		let before = job.runs();
		timer.trigger(job.clone(), None::<()>).await;
		assert_eq!(job.runs(), before + 1);
	}

	#[tokio::test(start_paused = true)]
	async fn job_failure_does_not_terminate_the_loop() {
		let job = CountingJob::new(true);
		let mut timer = SchedulerTimer::<()>::new("test-timer");

		timer.start(Duration::from_secs(1), job.clone(), None::<()>);

		tokio::time::sleep(Duration::from_secs(3)).await;
		assert!(job.runs() >= 3, "loop stopped after {} runs", job.runs());

		timer.stop();
	}

	struct SlowJob {
		runs: AtomicUsize,
		active: AtomicUsize,
		overlapped: AtomicBool,
	}

	#[async_trait::async_trait]
	impl SchedulerJob<()> for SlowJob {
		async fn run(&self, _params: Option<()>) -> Result<(), JobError> {
			if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
				self.overlapped.store(true, Ordering::SeqCst);
			}
			tokio::time::sleep(Duration::from_millis(500)).await;
			self.active.fetch_sub(1, Ordering::SeqCst);
			self.runs.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn concurrent_triggers_never_overlap() {
		let job = Arc::new(SlowJob {
			runs: AtomicUsize::new(0),
			active: AtomicUsize::new(0),
			overlapped: AtomicBool::new(false),
		});
		let timer = SchedulerTimer::<()>::new("test-timer");

		tokio::join!(
			timer.trigger(job.clone(), None::<()>),
			timer.trigger(job.clone(), None::<()>)
		);

		assert_eq!(job.runs.load(Ordering::SeqCst), 2);
		assert!(!job.overlapped.load(Ordering::SeqCst));
	}

	#[tokio::test]
	async fn post_msg_without_consumer_is_a_noop() {
		let timer = SchedulerTimer::<&'static str>::new("test-timer");
		timer.post_msg("KAS-mainnet", "payload");
	}

	#[tokio::test]
	async fn consumer_port_clones_for_non_clone_messages() {
		struct Opaque(String);

		let (sender, mut receiver) = mpsc::unbounded_channel();
		let mut timer = SchedulerTimer::<Opaque>::new("test-timer");
		timer.set_consumer(ConsumerPort::new(sender));

		let port = timer.consumer();
		port.post_msg("KAS-mainnet", Opaque("payload".to_string()));

		let envelope = receiver.recv().await.expect("Expected an envelope");
		assert_eq!(envelope.payload.0, "payload");
	}

	#[tokio::test]
	async fn post_msg_delivers_envelope_to_consumer() {
		let (sender, mut receiver) = mpsc::unbounded_channel();
		let mut timer = SchedulerTimer::<&'static str>::new("test-timer");
		timer.set_consumer(ConsumerPort::new(sender));

		timer.post_msg("KAS-mainnet", "payload");

		let envelope = receiver.recv().await.expect("Expected an envelope");
		assert_eq!(envelope.reference, "KAS-mainnet");
		assert_eq!(envelope.payload, "payload");
	}
}
