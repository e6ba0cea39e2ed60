//! Resilient request-forwarding relay: per-key token buckets, bounded retry with backoff,
//! and HMAC-signed upstream calls behind a small guarded facade.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod http;
pub mod limit;
pub mod obs;
pub mod relay;
pub mod retry;
pub mod sign;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::RelayConfig,
		limit::{RateLimitPolicy, TokenBucketLimiter},
		relay::{Relay, ReqwestRelay},
		retry::RetryPolicy,
	};

	/// Retry policy with millisecond-scale backoff so retry tests finish quickly while keeping
	/// the production attempt count and status classification.
	pub fn test_retry_policy() -> RetryPolicy {
		RetryPolicy::default()
			.with_base_delay(StdDuration::from_millis(10))
			.with_max_delay(StdDuration::from_millis(40))
	}

	/// Builds a reqwest-backed relay with a generous limiter and fast backoff for tests.
	pub fn build_reqwest_test_relay(config: RelayConfig) -> ReqwestRelay {
		let limiter: Arc<dyn RateLimitPolicy> =
			Arc::new(TokenBucketLimiter::new(1_000., Duration::seconds(60)));

		Relay::new(config, limiter).with_retry_policy(test_retry_policy())
	}

	/// Builds a relay whose limiter denies after `capacity` immediate calls per key.
	pub fn build_reqwest_test_relay_with_capacity(
		config: RelayConfig,
		capacity: f64,
	) -> ReqwestRelay {
		let limiter: Arc<dyn RateLimitPolicy> =
			Arc::new(TokenBucketLimiter::new(capacity, Duration::seconds(60)));

		Relay::new(config, limiter).with_retry_policy(test_retry_policy())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, flow_relay as _, httpmock as _};
