//! Core forwarding loop: URL + header construction, signing, bounded retry with backoff.

// self
use crate::{
	_prelude::*,
	error::{UpstreamError, ValidationError},
	http::{OutboundRequest, RelayTransport, RequestMethod},
	obs::{self, RelayOp, RelayOutcome},
	relay::{CallerContext, REQUEST_ID_HEADER, Relay, USER_HEADER},
	retry::RetryPolicy,
	sign::{SIGNATURE_HEADER, TIMESTAMP_HEADER},
};

/// One logical request to forward upstream.
#[derive(Clone, Debug)]
pub struct ForwardRequest {
	/// HTTP method.
	pub method: RequestMethod,
	/// Upstream path, starting with `/`.
	pub path: String,
	/// Query parameters appended to the target URL.
	pub query: Vec<(String, String)>,
	/// JSON body, when present.
	pub body: Option<Value>,
}
impl ForwardRequest {
	/// Creates a body-less request for the provided method and path.
	pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None }
	}

	/// Attaches a JSON body.
	pub fn with_body(mut self, body: Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Appends one query parameter.
	pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}
}

impl<T> Relay<T>
where
	T: ?Sized + RelayTransport,
{
	/// Forwards one request upstream, absorbing transient failures within the retry
	/// budget.
	///
	/// Rate limiting is the guard layer's concern; this method goes straight to the
	/// network. Each attempt rebuilds the header map so signatures carry a fresh
	/// timestamp. On a 2xx response the parsed JSON body is returned verbatim; any other
	/// status either re-enters the loop (transient class, attempts remaining, method
	/// permitted by the policy) or surfaces immediately with the observed status and
	/// body. Transport failures, timeouts included, are classified transient.
	pub async fn forward(
		&self,
		op: RelayOp,
		context: &CallerContext,
		request: ForwardRequest,
	) -> Result<Value> {
		let url = self.build_url(&request)?;
		// `Value` renders as compact JSON infallibly, so the payload is serialized once
		// and shared by every attempt and its signature.
		let payload = request.body.as_ref().map(Value::to_string);
		let mut attempts = 0;

		loop {
			attempts += 1;

			let outbound = OutboundRequest {
				method: request.method,
				url: url.clone(),
				headers: self.build_headers(context, payload.as_deref()),
				body: payload.clone(),
			};

			match self.transport.execute(outbound).await {
				Ok(response) if response.is_success() =>
					return response.json_body().map_err(Error::from),
				Ok(response) => {
					let status = response.status;

					if RetryPolicy::is_retryable_status(status)
						&& self.may_retry(request.method, attempts)
					{
						self.backoff(op, attempts, Some(status)).await;

						continue;
					}

					return Err(UpstreamError::Status {
						status,
						body: response.lossy_body(),
						attempts,
					}
					.into());
				},
				Err(transport_error) => {
					if self.may_retry(request.method, attempts) {
						self.backoff(op, attempts, None).await;

						continue;
					}

					let mut message = transport_error.to_string();

					message.truncate(message.trim_end_matches('.').len());

					return Err(UpstreamError::Unreachable { message, attempts }.into());
				},
			}
		}
	}

	fn build_url(&self, request: &ForwardRequest) -> Result<Url> {
		let base = self.config.require_base_url()?;
		let joined = format!("{}{}", base.as_str().trim_end_matches('/'), request.path);
		let mut url = Url::parse(&joined).map_err(|source| ValidationError::InvalidPath {
			path: request.path.clone(),
			source,
		})?;

		if !request.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&request.query);
		}

		Ok(url)
	}

	fn build_headers(
		&self,
		context: &CallerContext,
		payload: Option<&str>,
	) -> BTreeMap<String, String> {
		let mut headers = BTreeMap::new();

		headers.insert("content-type".into(), "application/json".into());

		if let Some(api_key) = &self.config.api_key {
			headers.insert("authorization".into(), format!("Bearer {api_key}"));
		}
		if let Some(signer) = &self.signer {
			let signed =
				signer.signed_headers_at(payload.unwrap_or(""), OffsetDateTime::now_utc());

			headers.insert(TIMESTAMP_HEADER.into(), signed.timestamp);
			headers.insert(SIGNATURE_HEADER.into(), signed.signature);
		}
		if let Some(user_id) = &context.user_id {
			headers.insert(USER_HEADER.into(), user_id.clone());
		}
		if let Some(request_id) = &context.request_id {
			headers.insert(REQUEST_ID_HEADER.into(), request_id.clone());
		}

		headers
	}

	fn may_retry(&self, method: RequestMethod, attempts: u32) -> bool {
		self.retry_policy.permits_method(method) && attempts < self.retry_policy.max_attempts()
	}

	async fn backoff(&self, op: RelayOp, attempts: u32, status: Option<u16>) {
		let delay = self.retry_policy.delay_for_attempt(attempts - 1);

		obs::warn_retry(attempts, status, delay);
		obs::record_op_outcome(op, RelayOutcome::Retry);
		tokio::time::sleep(delay).await;
	}
}
