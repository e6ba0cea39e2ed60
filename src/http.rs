//! Transport primitives for upstream forwarding.
//!
//! The module exposes [`RelayTransport`] so downstream services can integrate custom
//! HTTP clients (or scripted fakes in tests) without the relay depending on a concrete
//! stack. Implementations translate an [`OutboundRequest`] into one HTTP exchange and
//! report the outcome as an [`UpstreamResponse`], including any `Retry-After` hint, so
//! the forwarding loop can classify failures consistently.

// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::RETRY_AFTER;
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::UpstreamError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP methods the relay forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestMethod {
	/// HTTP GET.
	Get,
	/// HTTP POST.
	Post,
	/// HTTP PUT.
	Put,
	/// HTTP PATCH.
	Patch,
	/// HTTP DELETE.
	Delete,
}
impl RequestMethod {
	/// Returns the canonical wire name.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestMethod::Get => "GET",
			RequestMethod::Post => "POST",
			RequestMethod::Put => "PUT",
			RequestMethod::Patch => "PATCH",
			RequestMethod::Delete => "DELETE",
		}
	}

	/// Whether the method is idempotent at the HTTP level.
	///
	/// Retrying non-idempotent methods assumes the upstream operation is safe to repeat;
	/// [`RetryPolicy::retry_non_idempotent`](crate::retry::RetryPolicy) controls whether
	/// the relay takes that risk.
	pub const fn is_idempotent(self) -> bool {
		matches!(self, RequestMethod::Get | RequestMethod::Put | RequestMethod::Delete)
	}
}
impl Display for RequestMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Fully assembled outbound request, constructed fresh per attempt.
#[derive(Clone, Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: RequestMethod,
	/// Absolute target URL (base + path + query).
	pub url: Url,
	/// Header map; names are lowercase.
	pub headers: BTreeMap<String, String>,
	/// Serialized JSON body, when present.
	pub body: Option<String>,
}

/// Response observed from the upstream service.
#[derive(Clone, Debug)]
pub struct UpstreamResponse {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body.
	pub body: Vec<u8>,
	/// `Retry-After` hint expressed as a relative duration, when supplied.
	pub retry_after: Option<Duration>,
}
impl UpstreamResponse {
	/// Whether the status belongs to the 2xx success class.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Parses the body as JSON; empty and whitespace-only bodies parse to `Value::Null`.
	pub fn json_body(&self) -> Result<Value, UpstreamError> {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return Ok(Value::Null);
		}

		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| UpstreamError::BodyParse { source, status: self.status })
	}

	/// Best-effort body for error envelopes: JSON when it parses, lossy text otherwise,
	/// `None` when empty.
	pub fn lossy_body(&self) -> Option<Value> {
		if self.body.iter().all(u8::is_ascii_whitespace) {
			return None;
		}

		match serde_json::from_slice(&self.body) {
			Ok(value) => Some(value),
			Err(_) => Some(Value::String(String::from_utf8_lossy(&self.body).into_owned())),
		}
	}
}

/// Boxed future returned by [`RelayTransport::execute`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<UpstreamResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing one forwarded exchange.
///
/// The trait is the relay's only dependency on an HTTP stack. Implementations must
/// enforce their own hard timeout and surface it as [`TransportError::Timeout`] so the
/// forwarding loop can classify it as transient.
pub trait RelayTransport
where
	Self: Send + Sync,
{
	/// Executes one HTTP exchange.
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_>;
}

/// Transport-level failures (network, timeout, IO).
///
/// All variants are classified transient by the forwarding loop: a request that never
/// produced an HTTP status is assumed worth retrying while attempts remain.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The attempt exceeded the configured hard timeout and was aborted.
	#[error("Upstream call exceeded the configured timeout.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// The hard per-request timeout is attached here rather than on the client builder so a
/// caller-provided client keeps its own connection settings while the relay still bounds
/// every attempt.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	timeout: StdDuration,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Creates a transport with a default client and the provided attempt timeout.
	pub fn new(timeout: StdDuration) -> Self {
		Self::with_client(ReqwestClient::default(), timeout)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, timeout: StdDuration) -> Self {
		Self { client, timeout }
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
#[cfg(feature = "reqwest")]
impl RelayTransport for ReqwestTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		let client = self.client.clone();
		let timeout = self.timeout;

		Box::pin(async move {
			let method = match request.method {
				RequestMethod::Get => reqwest::Method::GET,
				RequestMethod::Post => reqwest::Method::POST,
				RequestMethod::Put => reqwest::Method::PUT,
				RequestMethod::Patch => reqwest::Method::PATCH,
				RequestMethod::Delete => reqwest::Method::DELETE,
			};
			let mut builder = client.request(method, request.url).timeout(timeout);

			for (name, value) in &request.headers {
				builder = builder.header(name, value);
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(TransportError::from)?;
			let status = response.status().as_u16();
			let retry_after = parse_retry_after(response.headers());
			let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

			Ok(UpstreamResponse { status, body, retry_after })
		})
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Some(Duration::seconds(secs as i64));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
