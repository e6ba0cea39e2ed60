//! In-process token bucket limiter keyed by caller identity.

// self
use crate::{
	_prelude::*,
	limit::{RateLimitDecision, RateLimitPolicy},
};

struct Bucket {
	tokens: f64,
	updated_at: OffsetDateTime,
}

/// Per-key token bucket with time-proportional refill.
///
/// Each key owns an independent bucket that starts full (burst-permissive) and refills
/// `capacity` tokens per `window`, clamped at `capacity`. State lives in a process-local
/// map; buckets are created lazily and only removed by [`sweep_idle`](Self::sweep_idle).
/// Key cardinality is expected to stay bounded by the active caller population, so
/// long-lived processes should run the sweep periodically (ten idle windows is a
/// reasonable threshold) rather than rely on eviction.
pub struct TokenBucketLimiter {
	capacity: f64,
	window: Duration,
	buckets: Mutex<HashMap<String, Bucket>>,
}
impl TokenBucketLimiter {
	/// Creates a limiter admitting `capacity` calls per `window` per key.
	///
	/// # Panics
	///
	/// Panics when `capacity` is below one token or `window` is not positive; both make
	/// the refill arithmetic meaningless.
	pub fn new(capacity: f64, window: Duration) -> Self {
		assert!(capacity >= 1., "Token bucket capacity must admit at least one call.");
		assert!(window.is_positive(), "Token bucket window must be positive.");

		Self { capacity, window, buckets: Mutex::new(HashMap::new()) }
	}

	/// Removes buckets that have not been touched for at least `idle_for`, returning the
	/// number of evicted keys.
	pub fn sweep_idle(&self, idle_for: Duration, now: OffsetDateTime) -> usize {
		let mut buckets = self.buckets.lock();
		let before = buckets.len();

		buckets.retain(|_, bucket| now - bucket.updated_at < idle_for);

		before - buckets.len()
	}

	fn check_at(&self, key: &str, now: OffsetDateTime) -> RateLimitDecision {
		let mut buckets = self.buckets.lock();
		let bucket = buckets
			.entry(key.to_owned())
			.or_insert(Bucket { tokens: self.capacity, updated_at: now });
		let elapsed = now - bucket.updated_at;

		// Clock skew can move `now` backwards; never refill negatively.
		if elapsed.is_positive() {
			let refill =
				elapsed.as_seconds_f64() / self.window.as_seconds_f64() * self.capacity;

			bucket.tokens = (bucket.tokens + refill).min(self.capacity);
		}

		bucket.updated_at = now;

		if bucket.tokens >= 1. {
			bucket.tokens -= 1.;

			RateLimitDecision::Allow
		} else {
			let deficit = (1. - bucket.tokens) / self.capacity;

			RateLimitDecision::Deny {
				retry_after: Duration::seconds_f64(deficit * self.window.as_seconds_f64()),
			}
		}
	}
}
impl RateLimitPolicy for TokenBucketLimiter {
	fn check(&self, key: &str, now: OffsetDateTime) -> RateLimitDecision {
		self.check_at(key, now)
	}
}
impl Debug for TokenBucketLimiter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenBucketLimiter")
			.field("capacity", &self.capacity)
			.field("window", &self.window)
			.field("tracked_keys", &self.buckets.lock().len())
			.finish()
	}
}
