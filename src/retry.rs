//! Bounded retry policy with deterministic exponential backoff.
//!
//! The backoff is intentionally jitter-free so behavior stays reproducible in tests and
//! incident analysis; callers fanning out many relays against one upstream should layer
//! their own smearing on top if herd retries become a concern.

// self
use crate::{_prelude::*, http::RequestMethod};

/// Retry budget applied to one logical forwarded call.
///
/// A call makes `1 + max_retries` attempts at most. Only the transient status class
/// ({429, 502, 503, 504}) and transport failures (timeouts included) are retried; every
/// other status is terminal and surfaces immediately.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
	/// Maximum retries after the initial attempt.
	pub max_retries: u32,
	/// Delay before the first retry; doubles each attempt.
	pub base_delay: StdDuration,
	/// Upper bound on any single backoff delay.
	pub max_delay: StdDuration,
	/// Whether non-idempotent methods (POST, PATCH) are retried too.
	///
	/// Defaults to `true`, which assumes the upstream tolerates repeated submissions.
	/// That assumption is the caller's to make; flip this off when it does not hold.
	pub retry_non_idempotent: bool,
}
impl RetryPolicy {
	/// Whether the status belongs to the transient class worth retrying.
	pub const fn is_retryable_status(status: u16) -> bool {
		matches!(status, 429 | 502 | 503 | 504)
	}

	/// Total attempts this policy permits, including the initial call.
	pub const fn max_attempts(&self) -> u32 {
		self.max_retries + 1
	}

	/// Backoff delay applied after the given zero-based attempt.
	pub fn delay_for_attempt(&self, attempt: u32) -> StdDuration {
		let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}

	/// Whether this policy retries calls issued with the given method.
	pub const fn permits_method(&self, method: RequestMethod) -> bool {
		self.retry_non_idempotent || method.is_idempotent()
	}

	/// Overrides the retry count.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Overrides the initial backoff delay.
	pub fn with_base_delay(mut self, base_delay: StdDuration) -> Self {
		self.base_delay = base_delay;

		self
	}

	/// Overrides the backoff ceiling.
	pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
		self.max_delay = max_delay;

		self
	}

	/// Overrides the non-idempotent retry toggle.
	pub fn with_retry_non_idempotent(mut self, allowed: bool) -> Self {
		self.retry_non_idempotent = allowed;

		self
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			base_delay: StdDuration::from_millis(1_000),
			max_delay: StdDuration::from_millis(4_000),
			retry_non_idempotent: true,
		}
	}
}
