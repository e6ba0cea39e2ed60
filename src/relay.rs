//! High-level guarded operations powered by the relay facade.

pub mod allowlist;
pub mod forward;
pub mod id;

mod ops;

pub use allowlist::*;
pub use forward::*;
pub use id::*;

// self
use crate::{
	_prelude::*, config::RelayConfig, http::RelayTransport, limit::RateLimitPolicy,
	retry::RetryPolicy, sign::RequestSigner,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

/// Header carrying the caller identity to the upstream.
pub const USER_HEADER: &str = "x-relay-user";
/// Header carrying the caller's request correlation id to the upstream.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[cfg(feature = "reqwest")]
/// Relay specialized for the crate's default reqwest transport stack.
pub type ReqwestRelay = Relay<ReqwestTransport>;

/// Coordinates guarded forwarding against a single upstream service.
///
/// The relay owns the transport, rate limiter, retry policy, proxy allow-list, and
/// configuration so individual operations can focus on their path + method specifics.
/// The signer is derived from the configured secret once at construction and reused for
/// every attempt.
#[derive(Clone)]
pub struct Relay<T>
where
	T: ?Sized + RelayTransport,
{
	/// HTTP transport used for every outbound upstream request.
	pub transport: Arc<T>,
	/// Admission policy consulted before any network work.
	pub limiter: Arc<dyn RateLimitPolicy>,
	/// Upstream endpoint + credential configuration.
	pub config: RelayConfig,
	/// Retry budget applied to each forwarded call.
	pub retry_policy: RetryPolicy,
	/// Path patterns the generic proxy may reach.
	pub allow_list: PathAllowList,
	pub(crate) signer: Option<RequestSigner>,
}
impl<T> Relay<T>
where
	T: ?Sized + RelayTransport,
{
	/// Creates a relay that reuses the caller-provided transport.
	pub fn with_transport(
		config: RelayConfig,
		limiter: Arc<dyn RateLimitPolicy>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let signer = config.signing_secret.as_deref().map(RequestSigner::new);

		Self {
			transport: transport.into(),
			limiter,
			retry_policy: RetryPolicy::default(),
			allow_list: PathAllowList::default(),
			signer,
			config,
		}
	}

	/// Overrides the retry policy.
	pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
		self.retry_policy = policy;

		self
	}

	/// Overrides the proxy allow-list.
	pub fn with_allow_list(mut self, allow_list: PathAllowList) -> Self {
		self.allow_list = allow_list;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestTransport> {
	/// Creates a new relay with the crate's default reqwest transport.
	///
	/// The transport inherits the configured per-attempt timeout. Use
	/// [`Relay::with_transport`] to supply a custom client or a scripted fake.
	pub fn new(config: RelayConfig, limiter: Arc<dyn RateLimitPolicy>) -> Self {
		let transport = ReqwestTransport::new(config.timeout);

		Self::with_transport(config, limiter, transport)
	}
}
impl<T> Debug for Relay<T>
where
	T: ?Sized + RelayTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("base_url", &self.config.base_url)
			.field("api_key_set", &self.config.api_key.is_some())
			.field("signing_secret_set", &self.signer.is_some())
			.field("retry_policy", &self.retry_policy)
			.finish()
	}
}

/// Per-call caller identity shared by every guarded operation.
///
/// `key` drives rate limiting (a user id, or the caller's IP as a fallback). The
/// optional fields are the complete set of inbound headers the relay will forward;
/// cookies and the caller's own `Authorization` header have no representation here by
/// construction, so they can never leak to the upstream.
#[derive(Clone, Debug)]
pub struct CallerContext {
	/// Rate-limit key.
	pub key: String,
	/// Caller identity forwarded as [`USER_HEADER`], when present.
	pub user_id: Option<String>,
	/// Correlation id forwarded as [`REQUEST_ID_HEADER`], when present.
	pub request_id: Option<String>,
}
impl CallerContext {
	/// Creates a context for the provided rate-limit key.
	pub fn new(key: impl Into<String>) -> Self {
		Self { key: key.into(), user_id: None, request_id: None }
	}

	/// Attaches the caller identity header value.
	pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
		self.user_id = Some(user_id.into());

		self
	}

	/// Attaches the request correlation header value.
	pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = Some(request_id.into());

		self
	}
}
