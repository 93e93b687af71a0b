//! Retry with exponential backoff around provider calls.

use std::{future::Future, time::Duration};

use tokio::time;

use prospect_providers::{Error, ErrorKind, Result};

const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Retries after the first attempt; the operation runs at most `max_retries + 1` times.
	pub max_retries: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	/// Whether rejected requests are worth another attempt.
	pub allow_rejected: bool,
}
impl RetryPolicy {
	pub fn from_config(cfg: &prospect_config::Retry) -> Self {
		Self {
			max_retries: cfg.max_retries,
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
			allow_rejected: false,
		}
	}

	pub fn allowing_rejected(self) -> Self {
		Self { allow_rejected: true, ..self }
	}

	pub fn with_max_retries(self, max_retries: u32) -> Self {
		Self { max_retries, ..self }
	}

	pub fn should_retry(&self, kind: ErrorKind) -> bool {
		match kind {
			ErrorKind::Transient | ErrorKind::RateLimited => true,
			ErrorKind::Rejected => self.allow_rejected,
			ErrorKind::TooLarge | ErrorKind::Fatal => false,
		}
	}

	/// Delay after the failed attempt `attempt` (0-indexed).
	///
	/// `min(base * 2^attempt, max)`, doubled for throttling and rejection errors.
	pub fn delay_for(&self, attempt: u32, kind: ErrorKind) -> Duration {
		let exp = attempt.min(MAX_BACKOFF_EXPONENT);
		let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);

		match kind {
			ErrorKind::RateLimited | ErrorKind::Rejected => delay.saturating_mul(2),
			_ => delay,
		}
	}
}

/// Runs `op` until it succeeds, the policy refuses the error, or retries run out.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
{
	retry_with(policy, label, |err| policy.should_retry(err.kind()), op).await
}

/// [`retry`] with a caller-supplied predicate deciding which errors are retried.
///
/// Oversized payloads are never retried, whatever the predicate says.
pub async fn retry_with<T, F, Fut, P>(
	policy: &RetryPolicy,
	label: &str,
	mut should_retry: P,
	mut op: F,
) -> Result<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T>>,
	P: FnMut(&Error) -> bool,
{
	let mut attempt = 0;

	loop {
		match op().await {
			Ok(value) => {
				if attempt > 0 {
					tracing::info!(label, attempts = attempt + 1, "Provider call succeeded after retry.");
				}

				return Ok(value);
			},
			Err(err) => {
				let kind = err.kind();

				if attempt >= policy.max_retries || kind == ErrorKind::TooLarge || !should_retry(&err) {
					tracing::warn!(
						label,
						attempts = attempt + 1,
						kind = ?kind,
						error = %err,
						"Provider call failed."
					);

					return Err(err);
				}

				let delay = policy.delay_for(attempt, kind);

				tracing::debug!(
					label,
					attempt = attempt + 1,
					kind = ?kind,
					delay_ms = delay.as_millis() as u64,
					error = %err,
					"Provider call failed. Retrying."
				);

				time::sleep(delay).await;

				attempt += 1;
			},
		}
	}
}
