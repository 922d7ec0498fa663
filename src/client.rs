//! Secret operations authenticated through a [`TokenManager`].

pub mod lease;
pub mod registry;

pub use lease::*;
pub use registry::*;

// self
use crate::{
	_prelude::*,
	backend::AuthOptions,
	error,
	http::{VaultHttpClient, VaultRequest},
	manager::TokenManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Reads, writes and lists secrets, obtaining a valid token for every call.
#[derive(Clone, Debug)]
pub struct VaultClient {
	manager: TokenManager,
}
impl VaultClient {
	/// Wraps an existing manager; the manager's transport is used for secret calls.
	pub fn new(manager: TokenManager) -> Self {
		Self { manager }
	}

	/// Builds the backend described by `options` and a manager around it.
	pub fn from_options(api: Arc<dyn VaultHttpClient>, options: &AuthOptions) -> Result<Self> {
		Ok(Self::new(TokenManager::from_options(api, options)?))
	}

	/// Token manager backing this client.
	pub fn token_manager(&self) -> &TokenManager {
		&self.manager
	}

	/// Reads the secret at `path`.
	pub async fn read(&self, path: &str) -> Result<Lease> {
		let payload = self.send("read", VaultRequest::get(normalize(path))).await?;

		error::decode(payload)
	}

	/// Lists keys under `path`.
	pub async fn list(&self, path: &str) -> Result<Lease> {
		let payload = self.send("list", VaultRequest::list(normalize(path))).await?;

		error::decode(payload)
	}

	/// Writes `data` to `path`, returning the raw response (`null` for empty bodies).
	pub async fn write(&self, path: &str, data: serde_json::Value) -> Result<serde_json::Value> {
		self.send("write", VaultRequest::post(normalize(path)).with_body(data)).await
	}

	async fn send(&self, stage: &'static str, request: VaultRequest) -> Result<serde_json::Value> {
		let span = FlowSpan::new(FlowKind::Secret, stage);

		obs::record_flow_outcome(FlowKind::Secret, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let token = self.manager.get_token().await?;

				self.manager.http_client().execute(request.with_token(token.id())).await
			})
			.await;

		obs::record_result(FlowKind::Secret, &result);

		result
	}
}

fn normalize(path: &str) -> String {
	format!("/{}", path.trim_start_matches('/'))
}
