//! Environment-sourced relay configuration.
//!
//! The upstream base URL intentionally stays optional: a relay built without one still
//! constructs, and every forwarded call fails fast with the configuration taxonomy
//! (HTTP 503 at the boundary) instead of panicking at startup. This mirrors deployments
//! where the upstream is provisioned independently of the front end.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the upstream base URL.
pub const ENV_UPSTREAM_URL: &str = "RELAY_UPSTREAM_URL";
/// Environment variable holding the optional upstream API key.
pub const ENV_API_KEY: &str = "RELAY_API_KEY";
/// Environment variable holding the optional HMAC signing secret.
pub const ENV_SIGNING_SECRET: &str = "RELAY_SIGNING_SECRET";
/// Environment variable overriding the outbound timeout, in whole seconds.
pub const ENV_TIMEOUT_SECS: &str = "RELAY_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Immutable configuration consumed by the relay facade.
#[derive(Clone, Debug)]
pub struct RelayConfig {
	/// Base URL of the upstream service; checked at forward time.
	pub base_url: Option<Url>,
	/// Optional API key attached as a bearer token on every outbound call.
	pub api_key: Option<String>,
	/// Optional HMAC-SHA256 signing secret for outbound request signatures.
	pub signing_secret: Option<String>,
	/// Hard timeout applied to each outbound attempt.
	pub timeout: StdDuration,
}
impl RelayConfig {
	/// Creates a configuration pointing at the provided upstream base URL.
	pub fn new(base_url: Url) -> Self {
		Self {
			base_url: Some(base_url),
			api_key: None,
			signing_secret: None,
			timeout: DEFAULT_TIMEOUT,
		}
	}

	/// Loads the configuration from the process environment.
	///
	/// A missing [`ENV_UPSTREAM_URL`] leaves `base_url` unset rather than failing, so the
	/// relay surfaces [`ConfigError::MissingBaseUrl`] per call instead of at startup.
	pub fn from_env() -> Result<Self, ConfigError> {
		let base_url = match env::var(ENV_UPSTREAM_URL) {
			Ok(raw) =>
				Some(Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl { source })?),
			Err(_) => None,
		};
		let timeout = match env::var(ENV_TIMEOUT_SECS) {
			Ok(raw) => StdDuration::from_secs(
				raw.parse::<u64>().map_err(|_| ConfigError::InvalidTimeout { raw })?,
			),
			Err(_) => DEFAULT_TIMEOUT,
		};

		Ok(Self {
			base_url,
			api_key: env::var(ENV_API_KEY).ok().filter(|value| !value.is_empty()),
			signing_secret: env::var(ENV_SIGNING_SECRET).ok().filter(|value| !value.is_empty()),
			timeout,
		})
	}

	/// Sets or replaces the upstream API key.
	pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
		self.api_key = Some(key.into());

		self
	}

	/// Sets or replaces the HMAC signing secret.
	pub fn with_signing_secret(mut self, secret: impl Into<String>) -> Self {
		self.signing_secret = Some(secret.into());

		self
	}

	/// Overrides the outbound timeout (defaults to 30 seconds).
	pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Returns the configured base URL or the config-taxonomy failure.
	pub fn require_base_url(&self) -> Result<&Url, ConfigError> {
		self.base_url.as_ref().ok_or(ConfigError::MissingBaseUrl)
	}
}
impl Default for RelayConfig {
	fn default() -> Self {
		Self { base_url: None, api_key: None, signing_secret: None, timeout: DEFAULT_TIMEOUT }
	}
}
