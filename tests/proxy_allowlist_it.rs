// crates.io
use httpmock::prelude::*;
// self
use flow_relay::{
	_preludet::*,
	config::RelayConfig,
	error::ValidationError,
	http::RequestMethod,
	relay::{CallerContext, ForwardRequest, PathAllowList},
};

fn server_config(server: &MockServer) -> RelayConfig {
	RelayConfig::new(
		Url::parse(&server.url("")).expect("Mock server URL should parse successfully."),
	)
}

#[tokio::test]
async fn proxy_rejects_paths_outside_the_list_before_any_network() {
	let server = MockServer::start_async().await;
	let relay = build_reqwest_test_relay(server_config(&server));
	let catch_all = server
		.mock_async(|when, then| {
			let _ = when;

			then.status(200).body("{}");
		})
		.await;
	let err = relay
		.proxy(
			&CallerContext::new("user-1"),
			ForwardRequest::new(RequestMethod::Get, "/api/other"),
		)
		.await
		.expect_err("A path outside the allow-list must be rejected.");

	catch_all.assert_calls_async(0).await;

	assert_eq!(err.status_code(), 400);
	assert!(matches!(
		err,
		Error::Validation(ValidationError::PathNotAllowed { ref path }) if path == "/api/other",
	));
	assert_eq!(err.envelope().error, "validation_error");
}

#[tokio::test]
async fn proxy_forwards_allowed_paths_with_query_parameters() {
	let server = MockServer::start_async().await;
	let relay = build_reqwest_test_relay(server_config(&server));
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/flows").query_param("limit", "10");
			then.status(200)
				.header("content-type", "application/json")
				.body("[{\"id\":\"flow-1\"}]");
		})
		.await;
	let body = relay
		.proxy(
			&CallerContext::new("user-1"),
			ForwardRequest::new(RequestMethod::Get, "/api/flows").with_query("limit", "10"),
		)
		.await
		.expect("An allow-listed proxy call should succeed.");

	assert_eq!(body, serde_json::json!([{ "id": "flow-1" }]));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn execute_flow_rejects_identifiers_that_escape_their_segment() {
	let server = MockServer::start_async().await;
	let relay = build_reqwest_test_relay(server_config(&server));
	let catch_all = server
		.mock_async(|when, then| {
			let _ = when;

			then.status(200).body("{}");
		})
		.await;
	let err = relay
		.execute_flow(
			&CallerContext::new("user-1"),
			"flow-1/../../admin",
			serde_json::json!({}),
		)
		.await
		.expect_err("A path-escaping flow identifier must be rejected.");

	catch_all.assert_calls_async(0).await;

	assert_eq!(err.status_code(), 400);
	assert!(matches!(err, Error::Validation(ValidationError::Identifier(_))));
}

#[tokio::test]
async fn custom_allow_list_replaces_the_default() {
	let server = MockServer::start_async().await;
	let allow_list = PathAllowList::new(["^/api/custom$"])
		.expect("Custom allow-list pattern should compile.");
	let relay = build_reqwest_test_relay(server_config(&server)).with_allow_list(allow_list);
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/custom");
			then.status(200).body("{}");
		})
		.await;

	relay
		.proxy(
			&CallerContext::new("user-1"),
			ForwardRequest::new(RequestMethod::Get, "/api/custom"),
		)
		.await
		.expect("The custom allow-list should admit its own pattern.");

	mock.assert_calls_async(1).await;

	let err = relay
		.proxy(
			&CallerContext::new("user-1"),
			ForwardRequest::new(RequestMethod::Get, "/api/flows"),
		)
		.await
		.expect_err("The default patterns must no longer apply.");

	assert_eq!(err.status_code(), 400);
}
