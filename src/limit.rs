//! Rate limiting contracts and the built-in per-key token bucket.
//!
//! The trait seam exists so multi-instance deployments can swap the in-process bucket
//! map for a shared counter store without touching call sites; the relay only ever
//! speaks [`RateLimitPolicy`].

pub mod bucket;

pub use bucket::*;

// self
use crate::_prelude::*;

/// Strategy consulted before every forwarded call.
///
/// Evaluation is synchronous on purpose: the built-in bucket arithmetic is a handful of
/// float operations under a mutex, and keeping the seam sync means the relay never
/// suspends between the admission decision and the outbound call.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Evaluates whether a call for `key` may proceed at `now`.
	fn check(&self, key: &str, now: OffsetDateTime) -> RateLimitDecision;

	/// Convenience wrapper evaluating against the current wall clock.
	fn allow(&self, key: &str) -> bool {
		matches!(self.check(key, OffsetDateTime::now_utc()), RateLimitDecision::Allow)
	}
}

/// Result emitted by a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The call may proceed immediately.
	Allow,
	/// The call should be rejected and retried later.
	Deny {
		/// Time until at least one token is available again.
		retry_after: Duration,
	},
}
