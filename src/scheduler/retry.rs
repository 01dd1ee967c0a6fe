//! Bounded retry wrapper for async operations.

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Bounded-retry policy for a fallible async operation.
///
/// An operation is attempted exactly `max_retries + 1` times; after
/// exhaustion the final error is returned unchanged so the caller decides
/// final disposition. Inter-attempt delays follow a deterministic
/// exponential schedule with no jitter, so they are non-decreasing and the
/// remote service is not hammered under sustained failure.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Additional attempts after the first failure.
	pub max_retries: usize,
	/// Delay before the first retry.
	pub initial_delay: Duration,
	/// Upper bound on the inter-attempt delay.
	pub max_delay: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 10,
			initial_delay: Duration::from_millis(500),
			max_delay: Duration::from_secs(30),
		}
	}
}

impl RetryPolicy {
	fn delays(&self) -> ExponentialBackoff {
		ExponentialBackoffBuilder::new()
			.with_initial_interval(self.initial_delay)
			.with_max_interval(self.max_delay)
			.with_randomization_factor(0.0)
			.with_max_elapsed_time(None)
			.build()
	}

	/// Run `operation`, retrying failures up to `max_retries` times.
	pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, E>>,
		E: std::fmt::Display,
	{
		let mut delays = self.delays();
		let mut attempt = 0usize;

		loop {
			match operation().await {
				Ok(value) => return Ok(value),
				Err(error) if attempt < self.max_retries => {
					attempt += 1;
					let delay = delays.next_backoff().unwrap_or(self.max_delay);
					warn!(
						"Attempt {}/{} failed: {}, retrying in {:?}",
						attempt,
						self.max_retries + 1,
						error,
						delay
					);
					tokio::time::sleep(delay).await;
				}
				Err(error) => return Err(error),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn quick_policy(max_retries: usize) -> RetryPolicy {
		RetryPolicy {
			max_retries,
			initial_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(100),
		}
	}

	#[tokio::test(start_paused = true)]
	async fn always_failing_operation_is_attempted_exactly_max_retries_plus_one_times() {
		let attempts = AtomicUsize::new(0);

		let result: Result<(), String> = quick_policy(3)
			.run(|| async {
				attempts.fetch_add(1, Ordering::SeqCst);
				Err("remote unavailable".to_string())
			})
			.await;

		assert_eq!(result, Err("remote unavailable".to_string()));
		assert_eq!(attempts.load(Ordering::SeqCst), 4);
	}

	#[tokio::test(start_paused = true)]
	async fn succeeds_without_retrying() {
		let attempts = AtomicUsize::new(0);

		let result: Result<u64, String> = quick_policy(10)
			.run(|| async {
				attempts.fetch_add(1, Ordering::SeqCst);
				Ok(42)
			})
			.await;

		assert_eq!(result, Ok(42));
		assert_eq!(attempts.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn recovers_after_transient_failures() {
		let attempts = AtomicUsize::new(0);

		let result: Result<&str, String> = quick_policy(5)
			.run(|| async {
				let attempt = attempts.fetch_add(1, Ordering::SeqCst);
				if attempt < 2 {
					Err("not yet".to_string())
				} else {
					Ok("synced")
				}
			})
			.await;

		assert_eq!(result, Ok("synced"));
		assert_eq!(attempts.load(Ordering::SeqCst), 3);
	}

	#[test]
	fn delays_are_non_decreasing() {
		let mut delays = quick_policy(8).delays();
		let mut previous = Duration::ZERO;

		for _ in 0..20 {
			let delay = delays.next_backoff().expect("Schedule must not expire");
			assert!(delay >= previous);
			previous = delay;
		}
	}
}
