//! Platform-identity-file (Kubernetes service account) backend.

// std
use std::path::{Path, PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	backend::{self, AuthBackend, AuthKind},
	error::ConfigError,
	http::{HttpFuture, VaultHttpClient, VaultRequest},
};

/// Service account token mounted into every pod.
pub const DEFAULT_JWT_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Logs in with a role name and the platform identity JWT.
///
/// Without an inline JWT the identity file is re-read on every login, so rotated service
/// account tokens are picked up.
#[derive(Clone, Debug)]
pub struct KubernetesAuth {
	role: String,
	jwt: Option<TokenSecret>,
	jwt_path: PathBuf,
	mount: String,
}
impl KubernetesAuth {
	/// Creates the backend for `role` on the default `kubernetes` mount.
	pub fn new(role: impl Into<String>) -> Result<Self, ConfigError> {
		let role = role.into();

		if role.trim().is_empty() {
			return Err(ConfigError::MissingRole {
				backend: AuthKind::PlatformIdentityFile.as_str(),
			});
		}

		Ok(Self {
			role,
			jwt: None,
			jwt_path: PathBuf::from(DEFAULT_JWT_PATH),
			mount: AuthKind::PlatformIdentityFile.default_mount().into(),
		})
	}

	/// Uses an inline JWT instead of reading the identity file.
	pub fn with_jwt(mut self, jwt: impl Into<TokenSecret>) -> Self {
		self.jwt = Some(jwt.into());

		self
	}

	/// Overrides the identity file path.
	pub fn with_jwt_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.jwt_path = path.into();

		self
	}

	/// Overrides the mount.
	pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
		self.mount = mount.into();

		self
	}

	/// Identity file read when no inline JWT is configured.
	pub fn jwt_path(&self) -> &Path {
		&self.jwt_path
	}

	fn identity(&self) -> Result<TokenSecret, ConfigError> {
		if let Some(jwt) = &self.jwt {
			return Ok(jwt.clone());
		}

		let raw = std::fs::read_to_string(&self.jwt_path).map_err(|e| ConfigError::IdentityFile {
			path: self.jwt_path.display().to_string(),
			source: Arc::new(e),
		})?;

		Ok(TokenSecret::new(raw.trim()))
	}

	async fn login(&self, api: &dyn VaultHttpClient) -> Result<Token> {
		let jwt = self.identity()?;
		let request = VaultRequest::post(backend::login_path(&self.mount))
			.with_body(serde_json::json!({ "role": self.role, "jwt": jwt.expose() }));

		backend::login(api, request).await
	}
}
impl AuthBackend for KubernetesAuth {
	fn kind(&self) -> AuthKind {
		AuthKind::PlatformIdentityFile
	}

	fn mount(&self) -> &str {
		&self.mount
	}

	fn authenticate<'a>(&'a self, api: &'a dyn VaultHttpClient) -> HttpFuture<'a, Token> {
		Box::pin(self.login(api))
	}
}
