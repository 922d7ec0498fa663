#![cfg(feature = "reqwest")]

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use vault_token_broker::{
	backend::{AuthKind, AuthOptions},
	client::{ClientRegistry, VaultClient},
	error::Error,
	http::ReqwestHttpClient,
};

async fn client(server: &MockServer) -> VaultClient {
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/auth/token/lookup-self").header("X-Vault-Token", "s.root");
			then.status(200).json_body(json!({
				"data": {
					"id": "s.root",
					"creation_time": time::OffsetDateTime::now_utc().unix_timestamp(),
					"ttl": 0
				}
			}));
		})
		.await;

	let api = ReqwestHttpClient::new(server.base_url()).expect("Transport should build.");
	let options = AuthOptions::new(AuthKind::StaticToken).with_config(json!({ "token": "s.root" }));

	VaultClient::from_options(Arc::new(api), &options).expect("Client should build.")
}

#[tokio::test]
async fn write_then_read_round_trips_through_the_service() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;
	let write = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/secret/tst-val")
				.header("X-Vault-Token", "s.root")
				.json_body(json!({ "tst": "testData", "tstInt": 12345 }));
			then.status(204);
		})
		.await;
	let read = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/secret/tst-val").header("X-Vault-Token", "s.root");
			then.status(200).json_body(json!({
				"request_id": "req-1",
				"lease_id": "",
				"lease_duration": 2_764_800,
				"renewable": false,
				"data": { "tst": "testData", "tstInt": 12345 }
			}));
		})
		.await;

	client
		.write("/secret/tst-val", json!({ "tst": "testData", "tstInt": 12345 }))
		.await
		.expect("Write should succeed.");

	let lease = client.read("secret/tst-val").await.expect("Read should succeed.");

	write.assert_calls_async(1).await;
	read.assert_calls_async(1).await;

	assert_eq!(lease.data().get("tstInt"), Some(&json!(12345)));
	assert!(!lease.is_renewable());
	assert!(matches!(lease.value("absent"), Err(Error::MissingLeaseKey { .. })));
}

#[tokio::test]
async fn list_returns_keys() {
	let server = MockServer::start_async().await;
	let client = client(&server).await;

	server
		.mock_async(|when, then| {
			when.path("/v1/secret/");
			then.status(200).json_body(json!({ "data": { "keys": ["tst-val", "other"] } }));
		})
		.await;

	let lease = client.list("secret/").await.expect("List should succeed.");

	assert_eq!(lease.value("keys").expect("Keys should be present."), &json!(["tst-val", "other"]));
}

#[tokio::test]
async fn registry_hands_out_booted_clients() {
	let server = MockServer::start_async().await;
	let registry = ClientRegistry::new();

	registry.boot("main", client(&server).await).expect("Boot should succeed.");

	let token = registry
		.get("main")
		.expect("Booted client should be available.")
		.token_manager()
		.get_token()
		.await
		.expect("Static token lookup should succeed.");

	assert_eq!(token.id().expose(), "s.root");
	assert!(token.expires_at().is_none());
	assert!(registry.get("other").is_err());
}
