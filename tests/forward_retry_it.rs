// std
use std::{collections::VecDeque, time::Instant};
// self
use flow_relay::{
	_preludet::*,
	config::RelayConfig,
	error::{ConfigError, UpstreamError},
	http::{
		OutboundRequest, RelayTransport, RequestMethod, TransportError, TransportFuture,
		UpstreamResponse,
	},
	limit::{RateLimitPolicy, TokenBucketLimiter},
	obs::RelayOp,
	relay::{CallerContext, ForwardRequest, Relay},
};

enum Step {
	Status(u16, &'static str),
	Timeout,
}

/// Transport that replays a scripted sequence of outcomes and records every request it
/// was handed, so tests can assert attempt counts and per-attempt headers without a
/// network.
struct ScriptedTransport {
	steps: Mutex<VecDeque<Step>>,
	seen: Mutex<Vec<OutboundRequest>>,
}
impl ScriptedTransport {
	fn new(steps: impl IntoIterator<Item = Step>) -> Self {
		Self { steps: Mutex::new(steps.into_iter().collect()), seen: Mutex::new(Vec::new()) }
	}

	fn calls(&self) -> usize {
		self.seen.lock().len()
	}

	fn requests(&self) -> Vec<OutboundRequest> {
		self.seen.lock().clone()
	}
}
impl RelayTransport for ScriptedTransport {
	fn execute(&self, request: OutboundRequest) -> TransportFuture<'_> {
		self.seen.lock().push(request);

		let step = self.steps.lock().pop_front();

		Box::pin(async move {
			match step.expect("Transport script must not be exhausted.") {
				Step::Status(status, body) =>
					Ok(UpstreamResponse { status, body: body.as_bytes().to_vec(), retry_after: None }),
				Step::Timeout => Err(TransportError::Timeout),
			}
		})
	}
}

fn scripted_relay(
	config: RelayConfig,
	steps: impl IntoIterator<Item = Step>,
) -> (Relay<ScriptedTransport>, Arc<ScriptedTransport>) {
	let transport = Arc::new(ScriptedTransport::new(steps));
	let limiter: Arc<dyn RateLimitPolicy> =
		Arc::new(TokenBucketLimiter::new(1_000., Duration::seconds(60)));
	let relay = Relay::with_transport(config, limiter, transport.clone())
		.with_retry_policy(test_retry_policy());

	(relay, transport)
}

fn base_config() -> RelayConfig {
	RelayConfig::new(
		Url::parse("https://sim.example.com").expect("Base URL fixture should parse."),
	)
}

fn context() -> CallerContext {
	CallerContext::new("user-1")
}

#[tokio::test]
async fn recovers_after_two_transient_failures() {
	let (relay, transport) = scripted_relay(
		base_config(),
		[
			Step::Status(503, ""),
			Step::Status(503, ""),
			Step::Status(200, "{\"ok\":true}"),
		],
	);
	let body = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect("Forward should succeed once the upstream recovers.");

	assert_eq!(body, serde_json::json!({ "ok": true }));
	assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn terminal_status_surfaces_immediately_with_the_body() {
	let (relay, transport) =
		scripted_relay(base_config(), [Step::Status(404, "{\"message\":\"missing\"}")]);
	let err = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-404"),
		)
		.await
		.expect_err("A 404 must never be retried.");

	assert_eq!(transport.calls(), 1);
	assert_eq!(err.status_code(), 404);

	match err {
		Error::Upstream(UpstreamError::Status { status, body, attempts }) => {
			assert_eq!(status, 404);
			assert_eq!(attempts, 1);
			assert_eq!(body, Some(serde_json::json!({ "message": "missing" })));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn timeouts_are_classified_transient() {
	let (relay, transport) =
		scripted_relay(base_config(), [Step::Timeout, Step::Status(200, "{}")]);
	let body = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect("A single timeout should be absorbed by the retry budget.");

	assert_eq!(body, serde_json::json!({}));
	assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn exhausted_budget_reports_the_last_status() {
	let (relay, transport) = scripted_relay(
		base_config(),
		[
			Step::Status(503, "busy"),
			Step::Status(503, "busy"),
			Step::Status(503, "busy"),
			Step::Status(503, "still busy"),
		],
	);
	let err = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect_err("Four 503s must exhaust the default budget.");

	assert_eq!(transport.calls(), 4);

	match err {
		Error::Upstream(UpstreamError::Status { status, body, attempts }) => {
			assert_eq!(status, 503);
			assert_eq!(attempts, 4);
			assert_eq!(body, Some(Value::String("still busy".into())));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn repeated_transport_failures_surface_as_unreachable() {
	let (relay, transport) = scripted_relay(
		base_config(),
		[Step::Timeout, Step::Timeout, Step::Timeout, Step::Timeout],
	);
	let err = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect_err("Persistent timeouts must exhaust the budget.");

	assert_eq!(transport.calls(), 4);
	assert_eq!(err.status_code(), 502);
	assert!(matches!(err, Error::Upstream(UpstreamError::Unreachable { attempts: 4, .. })));
}

#[tokio::test]
async fn strict_policy_skips_non_idempotent_retries() {
	let (relay, transport) = scripted_relay(base_config(), [Step::Status(503, "")]);
	let relay =
		relay.with_retry_policy(test_retry_policy().with_retry_non_idempotent(false));
	let err = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Post, "/api/flows").with_body(Value::Null),
		)
		.await
		.expect_err("A strict policy must not replay a POST.");

	assert_eq!(transport.calls(), 1);
	assert!(matches!(err, Error::Upstream(UpstreamError::Status { attempts: 1, .. })));

	// The same policy still retries idempotent methods.
	let (relay, transport) =
		scripted_relay(base_config(), [Step::Status(503, ""), Step::Status(200, "{}")]);
	let relay =
		relay.with_retry_policy(test_retry_policy().with_retry_non_idempotent(false));

	relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect("GETs stay retryable under the strict policy.");

	assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn backoff_sleeps_between_attempts() {
	let (relay, _) = scripted_relay(
		base_config(),
		[Step::Status(503, ""), Step::Status(503, ""), Step::Status(200, "{}")],
	);
	let relay = relay.with_retry_policy(
		test_retry_policy()
			.with_base_delay(StdDuration::from_millis(50))
			.with_max_delay(StdDuration::from_millis(200)),
	);
	let started = Instant::now();

	relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect("Forward should succeed after two backoffs.");

	// Two backoffs of 50 ms and 100 ms; allow scheduler slack below the exact sum.
	assert!(started.elapsed() >= StdDuration::from_millis(140));
}

#[tokio::test]
async fn every_attempt_rebuilds_headers_and_reuses_the_payload() {
	let config = base_config().with_api_key("key-1").with_signing_secret("secret-1");
	let (relay, transport) =
		scripted_relay(config, [Step::Status(503, ""), Step::Status(200, "{}")]);
	let context = CallerContext::new("user-1").with_user_id("user-1").with_request_id("req-9");

	relay
		.forward(
			RelayOp::Proxy,
			&context,
			ForwardRequest::new(RequestMethod::Post, "/api/flows")
				.with_body(serde_json::json!({ "a": 1 })),
		)
		.await
		.expect("Forward should succeed on the second attempt.");

	let requests = transport.requests();

	assert_eq!(requests.len(), 2);

	for request in &requests {
		// Exactly the allow-listed header set; nothing from the inbound caller leaks.
		assert_eq!(request.headers.len(), 6);
		assert_eq!(request.url.as_str(), "https://sim.example.com/api/flows");
		assert_eq!(request.body.as_deref(), Some("{\"a\":1}"));
		assert_eq!(
			request.headers.get("content-type").map(String::as_str),
			Some("application/json"),
		);
		assert_eq!(
			request.headers.get("authorization").map(String::as_str),
			Some("Bearer key-1"),
		);
		assert_eq!(request.headers.get("x-relay-user").map(String::as_str), Some("user-1"));
		assert_eq!(request.headers.get("x-request-id").map(String::as_str), Some("req-9"));
		assert_eq!(
			request.headers.get("x-relay-signature").map(String::len),
			Some(64),
			"Each attempt must carry a full-width signature.",
		);

		request
			.headers
			.get("x-relay-timestamp")
			.expect("Each attempt must carry a signing timestamp.")
			.parse::<i128>()
			.expect("Signing timestamps are unix milliseconds.");
	}
}

#[tokio::test]
async fn missing_base_url_fails_fast_without_network() {
	let (relay, transport) = scripted_relay(RelayConfig::default(), []);
	let err = relay
		.forward(
			RelayOp::Proxy,
			&context(),
			ForwardRequest::new(RequestMethod::Get, "/api/runs/run-1"),
		)
		.await
		.expect_err("A relay without an upstream must fail fast.");

	assert_eq!(transport.calls(), 0);
	assert_eq!(err.status_code(), 503);
	assert!(matches!(err, Error::Config(ConfigError::MissingBaseUrl)));
}
