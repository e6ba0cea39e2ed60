//! Relay-level error types shared across forwarding, limiting, and configuration.

// self
use crate::{_prelude::*, relay::IdentifierError};

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; never reaches the network.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Caller input rejected before any upstream call.
	#[error(transparent)]
	Validation(#[from] ValidationError),
	/// The local limiter denied the call; retry after the hinted delay.
	#[error("Rate limit exceeded for key `{key}`.")]
	RateLimited {
		/// Rate-limit key (user id or IP fallback) that was throttled.
		key: String,
		/// Time until at least one token is available again.
		retry_after: Duration,
	},
	/// Upstream call failed after the retry budget was applied.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
}
impl Error {
	/// Stable kind label used in the error envelope.
	pub const fn kind(&self) -> &'static str {
		match self {
			Error::Config(_) => "config_error",
			Error::Validation(_) => "validation_error",
			Error::RateLimited { .. } => "rate_limited",
			Error::Upstream(_) => "upstream_error",
		}
	}

	/// HTTP status the caller-facing boundary should mirror for this error.
	///
	/// Upstream statuses pass through verbatim; connectivity and parse failures map to
	/// 502, configuration failures to 503, validation to 400, and local throttling
	/// to 429.
	pub fn status_code(&self) -> u16 {
		match self {
			Error::Config(_) => 503,
			Error::Validation(_) => 400,
			Error::RateLimited { .. } => 429,
			Error::Upstream(UpstreamError::Status { status, .. }) => *status,
			Error::Upstream(_) => 502,
		}
	}

	/// Normalizes the error into the JSON envelope returned to callers.
	pub fn envelope(&self) -> ErrorEnvelope {
		let details = match self {
			Error::Upstream(UpstreamError::Status { body: Some(body), .. }) => body.clone(),
			other => Value::String(other.to_string()),
		};

		ErrorEnvelope { error: self.kind().into(), details }
	}
}

/// JSON error envelope surfaced at the route boundary.
///
/// `details` carries the upstream response body verbatim when one was observed,
/// otherwise a human-readable message.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorEnvelope {
	/// Stable kind label (`config_error`, `validation_error`, `rate_limited`,
	/// `upstream_error`).
	pub error: String,
	/// Upstream body or message payload.
	pub details: Value,
}

/// Configuration failures raised before any network activity.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Upstream base URL was not configured.
	#[error("Upstream base URL is not configured.")]
	MissingBaseUrl,
	/// Upstream base URL could not be parsed.
	#[error("Upstream base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Allow-list pattern failed to compile.
	#[error("Allow-list pattern `{pattern}` is invalid.")]
	InvalidAllowListPattern {
		/// Pattern source text.
		pattern: String,
		/// Underlying compilation failure.
		#[source]
		source: regex::Error,
	},
	/// Timeout value sourced from the environment could not be parsed.
	#[error("Timeout value `{raw}` is not a valid number of seconds.")]
	InvalidTimeout {
		/// Raw environment value.
		raw: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Caller-input failures; the request never leaves the process.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// Requested proxy path did not match the allow-list.
	#[error("Path `{path}` is not covered by the proxy allow-list.")]
	PathNotAllowed {
		/// Rejected downstream path.
		path: String,
	},
	/// Flow/run identifier failed validation.
	#[error(transparent)]
	Identifier(#[from] IdentifierError),
	/// Path could not be joined onto the upstream base URL.
	#[error("Path `{path}` cannot be resolved against the upstream base URL.")]
	InvalidPath {
		/// Rejected downstream path.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Failures observed while calling the upstream service.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Upstream answered with a non-success status (terminal, or retries exhausted).
	#[error("Upstream returned HTTP {status} after {attempts} attempt(s).")]
	Status {
		/// Last observed HTTP status.
		status: u16,
		/// Upstream response body, when one was readable.
		body: Option<Value>,
		/// Total attempts made, including the initial call.
		attempts: u32,
	},
	/// No HTTP response was obtained (network failure or timeout; retries exhausted).
	#[error("Upstream is unreachable after {attempts} attempt(s): {message}.")]
	Unreachable {
		/// Last transport failure, rendered for diagnostics.
		message: String,
		/// Total attempts made, including the initial call.
		attempts: u32,
	},
	/// Upstream returned a success status with a malformed JSON body.
	#[error("Upstream returned malformed JSON with HTTP {status}.")]
	BodyParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status that carried the malformed body.
		status: u16,
	},
}
