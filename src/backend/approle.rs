//! Role-secret (AppRole) backend.

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	backend::{self, AuthBackend, AuthKind},
	error::ConfigError,
	http::{HttpFuture, NAMESPACE_HEADER, VaultHttpClient, VaultRequest},
};

/// Logs in with a role identifier and optional secret identifier.
#[derive(Clone, Debug)]
pub struct AppRoleAuth {
	role_id: String,
	secret_id: Option<TokenSecret>,
	namespace: Option<String>,
	mount: String,
}
impl AppRoleAuth {
	/// Creates the backend for `role_id` on the default `approle` mount.
	pub fn new(role_id: impl Into<String>) -> Result<Self, ConfigError> {
		let role_id = role_id.into();

		if role_id.trim().is_empty() {
			return Err(ConfigError::MissingRoleId);
		}

		Ok(Self {
			role_id,
			secret_id: None,
			namespace: None,
			mount: AuthKind::RoleSecret.default_mount().into(),
		})
	}

	/// Sets the secret identifier (required when the role binds one).
	pub fn with_secret_id(mut self, secret_id: impl Into<TokenSecret>) -> Self {
		self.secret_id = Some(secret_id.into());

		self
	}

	/// Scopes the login request to a namespace.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());

		self
	}

	/// Overrides the mount.
	pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
		self.mount = mount.into();

		self
	}

	fn login_request(&self) -> VaultRequest {
		let mut body = serde_json::Map::new();

		body.insert("role_id".into(), self.role_id.clone().into());

		if let Some(secret_id) = &self.secret_id {
			body.insert("secret_id".into(), secret_id.expose().into());
		}

		let request = VaultRequest::post(backend::login_path(&self.mount)).with_body(body.into());

		match &self.namespace {
			Some(namespace) => request.with_header(NAMESPACE_HEADER, namespace),
			None => request,
		}
	}
}
impl AuthBackend for AppRoleAuth {
	fn kind(&self) -> AuthKind {
		AuthKind::RoleSecret
	}

	fn mount(&self) -> &str {
		&self.mount
	}

	fn authenticate<'a>(&'a self, api: &'a dyn VaultHttpClient) -> HttpFuture<'a, Token> {
		Box::pin(backend::login(api, self.login_request()))
	}
}
