#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::{Duration, OffsetDateTime};
// self
use vault_token_broker::{
	backend::{AppRoleAuth, AuthKind, AuthOptions},
	error::Error,
	http::{ReqwestHttpClient, VaultHttpClient},
	manager::TokenManager,
};

fn transport(server: &MockServer) -> Arc<dyn VaultHttpClient> {
	Arc::new(
		ReqwestHttpClient::new(server.base_url())
			.expect("Transport should build for the mock server."),
	)
}

fn lookup_body(id: &str, created_at: OffsetDateTime, ttl: i64) -> serde_json::Value {
	json!({
		"data": {
			"id": id,
			"accessor": "accessor",
			"creation_time": created_at.unix_timestamp(),
			"ttl": ttl,
			"renewable": true
		}
	})
}

#[tokio::test]
async fn role_secret_login_end_to_end() {
	let server = MockServer::start_async().await;
	let created_at = OffsetDateTime::now_utc().replace_nanosecond(0).expect("Zero is valid.");
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/auth/approle/login")
				.json_body(json!({ "role_id": "role123", "secret_id": "secret456" }));
			then.status(200).json_body(json!({ "auth": { "client_token": "s.e2e" } }));
		})
		.await;
	let lookup = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth/token/lookup-self").header("X-Vault-Token", "s.e2e");
			then.status(200).json_body(lookup_body("s.e2e", created_at, 120));
		})
		.await;
	let options = AuthOptions::new(AuthKind::RoleSecret)
		.with_config(json!({ "role_id": "role123", "secret_id": "secret456" }));
	let manager = TokenManager::from_options(transport(&server), &options)
		.expect("Manager should build from options.");
	let token = manager.get_token().await.expect("Login should succeed.");

	login.assert_calls_async(1).await;
	lookup.assert_calls_async(1).await;

	assert_eq!(token.id().expose(), "s.e2e");
	assert_eq!(token.expires_at(), Some(created_at + Duration::seconds(60)));
	assert!(token.is_renewable());
	assert!(manager.renewal_scheduled());
}

#[tokio::test]
async fn concurrent_callers_hit_login_once() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/auth/approle/login");
			then.status(200)
				.delay(std::time::Duration::from_millis(100))
				.json_body(json!({ "auth": { "client_token": "s.singleflight" } }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth/token/lookup-self");
			then.status(200).json_body(lookup_body(
				"s.singleflight",
				OffsetDateTime::now_utc(),
				3_600,
			));
		})
		.await;

	let backend = AppRoleAuth::new("role123").expect("Role id should be accepted.");
	let manager = TokenManager::new(transport(&server), Arc::new(backend));
	let (first, second, third) =
		tokio::join!(manager.get_token(), manager.get_token(), manager.get_token());

	login.assert_calls_async(1).await;

	for token in [first, second, third] {
		let token = token.expect("Every caller should get a token.");

		assert_eq!(token.id().expose(), "s.singleflight");
	}
}

#[tokio::test]
async fn login_rejection_reaches_the_caller() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/auth/approle/login");
			then.status(400).json_body(json!({ "errors": ["invalid role or secret ID"] }));
		})
		.await;

	let backend = AppRoleAuth::new("role123").expect("Role id should be accepted.");
	let manager = TokenManager::new(transport(&server), Arc::new(backend));
	let err = manager.get_token().await.expect_err("Rejected login should fail.");

	assert_eq!(err.status(), Some(400));
	assert!(err.to_string().contains("invalid role or secret ID"));
	assert!(manager.cached_token().is_none());
	assert!(!manager.renewal_scheduled());
}

#[tokio::test]
async fn namespace_is_sent_on_login_only() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/auth/approle/login")
				.header("X-Vault-Namespace", "team-a");
			then.status(200).json_body(json!({ "auth": { "client_token": "s.ns" } }));
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth/token/lookup-self");
			then.status(200).json_body(lookup_body("s.ns", OffsetDateTime::now_utc(), 3_600));
		})
		.await;

	let backend = AppRoleAuth::new("role123")
		.expect("Role id should be accepted.")
		.with_namespace("team-a");
	let manager = TokenManager::new(transport(&server), Arc::new(backend));

	manager.get_token().await.expect("Namespaced login should succeed.");
	login.assert_calls_async(1).await;
}

#[tokio::test]
async fn expired_static_token_is_terminal() {
	let server = MockServer::start_async().await;
	let lookup = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth/token/lookup-self");
			then.status(200).json_body(lookup_body(
				"s.static",
				OffsetDateTime::now_utc() - Duration::hours(1),
				120,
			));
		})
		.await;
	let options =
		AuthOptions::new(AuthKind::StaticToken).with_config(json!({ "token": "s.static" }));
	let manager = TokenManager::from_options(transport(&server), &options)
		.expect("Manager should build from options.");

	manager.get_token().await.expect("Initial lookup should succeed.");

	let err = manager.get_token().await.expect_err("Expired static token should fail.");

	assert!(matches!(err, Error::AuthTokenExpired));
	lookup.assert_calls_async(1).await;
}
