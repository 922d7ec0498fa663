//! Client-side credential broker for Vault-compatible secrets services: pluggable auth backends,
//! singleflight token acquisition, and background lease renewal in one crate.
//!
//! Build a [`manager::TokenManager`] from an [`http::VaultHttpClient`] and an
//! [`backend::AuthBackend`] (or from [`backend::AuthOptions`]), then call
//! [`manager::TokenManager::get_token`] whenever a valid token is needed. [`client::VaultClient`]
//! layers secret reads, writes and listings on top of the manager.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod backend;
pub mod client;
pub mod error;
pub mod http;
pub mod manager;
pub mod obs;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// self
	use crate::{
		error::ServiceError,
		http::{HttpFuture, Method, VaultHttpClient, VaultRequest},
	};

	type Route = (Method, String);

	#[derive(Debug, Default)]
	struct Script {
		queued: VecDeque<Result<serde_json::Value>>,
		last: Option<Result<serde_json::Value>>,
		latency: Option<std::time::Duration>,
	}

	/// In-memory transport that records requests and replays scripted responses.
	///
	/// Responses queue per `(method, path)` and are served in order; once a route's queue is
	/// drained its last response is replayed for every further call. Unscripted routes fail with
	/// a 404 service error.
	#[derive(Debug, Default)]
	pub struct ScriptedHttpClient {
		routes: Mutex<HashMap<Route, Script>>,
		requests: Mutex<Vec<VaultRequest>>,
		latency: Option<std::time::Duration>,
	}
	impl ScriptedHttpClient {
		/// Delays every response by `latency` (honors a paused tokio clock).
		pub fn with_latency(mut self, latency: std::time::Duration) -> Self {
			self.latency = Some(latency);

			self
		}

		/// Queues a response for `method` + `path`.
		pub fn respond(&self, method: Method, path: &str, response: Result<serde_json::Value>) {
			self.routes
				.lock()
				.entry((method, path.to_owned()))
				.or_default()
				.queued
				.push_back(response);
		}

		/// Delays responses for `method` + `path` by `latency`, overriding the client-wide delay.
		pub fn delay(&self, method: Method, path: &str, latency: std::time::Duration) {
			self.routes.lock().entry((method, path.to_owned())).or_default().latency =
				Some(latency);
		}

		/// Returns every request executed so far, in order.
		pub fn requests(&self) -> Vec<VaultRequest> {
			self.requests.lock().clone()
		}

		/// Counts executed requests for `method` + `path`.
		pub fn calls(&self, method: Method, path: &str) -> usize {
			self.requests.lock().iter().filter(|r| r.method == method && r.path == path).count()
		}

		fn next_response(
			&self,
			request: &VaultRequest,
		) -> (Result<serde_json::Value>, Option<std::time::Duration>) {
			let mut routes = self.routes.lock();
			let script = routes.entry((request.method, request.path.clone())).or_default();
			let latency = script.latency.or(self.latency);

			if let Some(response) = script.queued.pop_front() {
				script.last = Some(response.clone());

				return (response, latency);
			}

			let response = script.last.clone().unwrap_or_else(|| {
				Err(ServiceError::Status {
					status: 404,
					errors: vec![format!(
						"no scripted response for {} {}",
						request.method, request.path
					)],
					retry_after: None,
				}
				.into())
			});

			(response, latency)
		}
	}
	impl VaultHttpClient for ScriptedHttpClient {
		fn execute(&self, request: VaultRequest) -> HttpFuture<'_, serde_json::Value> {
			Box::pin(async move {
				let (response, latency) = self.next_response(&request);

				self.requests.lock().push(request);

				if let Some(latency) = latency {
					tokio::time::sleep(latency).await;
				}

				response
			})
		}
	}

	/// Builds a `lookup-self` payload for a token created now.
	pub fn lookup_payload(id: &str, ttl_secs: i64, renewable: bool) -> serde_json::Value {
		lookup_payload_created_at(id, OffsetDateTime::now_utc(), ttl_secs, renewable)
	}

	/// Builds a `lookup-self` payload for a token created at `created_at`.
	pub fn lookup_payload_created_at(
		id: &str,
		created_at: OffsetDateTime,
		ttl_secs: i64,
		renewable: bool,
	) -> serde_json::Value {
		serde_json::json!({
			"data": {
				"id": id,
				"accessor": format!("accessor-{id}"),
				"creation_time": created_at.unix_timestamp(),
				"ttl": ttl_secs,
				"explicit_max_ttl": 0,
				"num_uses": 0,
				"renewable": renewable,
			}
		})
	}

	/// Builds a login payload issuing `client_token`.
	pub fn login_payload(client_token: &str) -> serde_json::Value {
		serde_json::json!({ "auth": { "client_token": client_token } })
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tempfile as _};
