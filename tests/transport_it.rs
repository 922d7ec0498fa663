#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use vault_token_broker::{
	auth::TokenSecret,
	error::{Error, ServiceError, TransportError},
	http::{ReqwestHttpClient, VaultHttpClient, VaultRequest},
};

fn transport(server: &MockServer) -> ReqwestHttpClient {
	ReqwestHttpClient::new(server.base_url()).expect("Transport should build for the mock server.")
}

#[tokio::test]
async fn requests_are_versioned_and_authenticated() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/auth/token/lookup-self")
				.header("X-Vault-Token", "s.transport");
			then.status(200).json_body(json!({ "data": { "id": "s.transport" } }));
		})
		.await;
	let value = transport(&server)
		.execute(
			VaultRequest::get("/auth/token/lookup-self")
				.with_token(&TokenSecret::new("s.transport")),
		)
		.await
		.expect("Lookup should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(value["data"]["id"], "s.transport");
}

#[tokio::test]
async fn json_bodies_are_posted() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/auth/approle/login")
				.json_body(json!({ "role_id": "role123" }));
			then.status(200).json_body(json!({ "auth": { "client_token": "s.login" } }));
		})
		.await;
	let value = transport(&server)
		.execute(
			VaultRequest::post("/auth/approle/login").with_body(json!({ "role_id": "role123" })),
		)
		.await
		.expect("Login should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(value["auth"]["client_token"], "s.login");
}

#[tokio::test]
async fn error_statuses_carry_service_messages() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.path("/v1/secret/forbidden");
			then.status(403)
				.header("retry-after", "7")
				.json_body(json!({ "errors": ["permission denied"] }));
		})
		.await;

	let err = transport(&server)
		.execute(VaultRequest::get("/secret/forbidden"))
		.await
		.expect_err("A 403 should be an error.");
	let Error::Service(ServiceError::Status { status, errors, retry_after }) = &err else {
		panic!("Expected a service status error, got {err:?}.");
	};

	assert_eq!(*status, 403);
	assert_eq!(errors, &vec!["permission denied".to_owned()]);
	assert_eq!(*retry_after, Some(time::Duration::seconds(7)));
}

#[tokio::test]
async fn empty_bodies_become_null() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/auth/token/renew-self");
			then.status(204);
		})
		.await;

	let value = transport(&server)
		.execute(VaultRequest::post("/auth/token/renew-self"))
		.await
		.expect("Empty success should be accepted.");

	assert!(value.is_null());
}

#[tokio::test]
async fn malformed_json_reports_status() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.path("/v1/secret/garbled");
			then.status(200).header("content-type", "application/json").body("{not json");
		})
		.await;

	let err = transport(&server)
		.execute(VaultRequest::get("/secret/garbled"))
		.await
		.expect_err("Malformed JSON should be rejected.");

	assert!(matches!(err, Error::Service(ServiceError::MalformedResponse { .. })));
	assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn list_requests_reach_the_listing_route() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.path("/v1/secret/");
			then.status(200).json_body(json!({ "data": { "keys": ["app"] } }));
		})
		.await;
	let value = transport(&server)
		.execute(VaultRequest::list("/secret/"))
		.await
		.expect("Listing should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(value["data"]["keys"], json!(["app"]));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
	let err = ReqwestHttpClient::new("http://127.0.0.1:1")
		.expect("Transport should build.")
		.execute(VaultRequest::get("/sys/health"))
		.await
		.expect_err("A closed port should fail.");

	assert!(matches!(err, Error::Transport(TransportError::Network { .. })));
}
