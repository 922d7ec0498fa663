//! Tag-dispatched backend construction from `{type, mount, config}` options.

// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	backend::{
		AppRoleAuth, AuthBackend, AuthKind, AwsCredentials, AwsIamAuth, CredentialChain,
		KubernetesAuth, StaticTokenAuth,
	},
	error::ConfigError,
};

/// Backend selection as it appears in configuration files.
///
/// ```
/// use vault_token_broker::backend::{AuthKind, AuthOptions};
///
/// let options: AuthOptions = serde_json::from_value(serde_json::json!({
/// 	"type": "role-secret",
/// 	"config": { "role_id": "role123", "secret_id": "secret456" }
/// }))
/// .expect("Options should deserialize.");
///
/// assert_eq!(options.kind, AuthKind::RoleSecret);
/// assert_eq!(options.build().expect("Backend should build.").mount(), "approle");
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthOptions {
	/// Backend kind tag.
	#[serde(rename = "type")]
	pub kind: AuthKind,
	/// Mount override; the backend's default mount is used when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub mount: Option<String>,
	/// Backend-specific options, decoded when the backend is built.
	#[serde(default)]
	pub config: serde_json::Value,
}
impl AuthOptions {
	/// Creates options for `kind` with an empty backend config.
	pub fn new(kind: AuthKind) -> Self {
		Self { kind, mount: None, config: serde_json::Value::Null }
	}

	/// Overrides the mount.
	pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
		self.mount = Some(mount.into());

		self
	}

	/// Replaces the backend-specific config.
	pub fn with_config(mut self, config: serde_json::Value) -> Self {
		self.config = config;

		self
	}

	/// Mount the built backend will use.
	pub fn effective_mount(&self) -> &str {
		self.mount.as_deref().unwrap_or(self.kind.default_mount())
	}

	/// Decodes the backend-specific config and constructs the backend.
	pub fn build(&self) -> Result<Arc<dyn AuthBackend>, ConfigError> {
		let mount = self.effective_mount();
		let backend: Arc<dyn AuthBackend> = match self.kind {
			AuthKind::StaticToken => {
				// Static tokens are introspected through the token routes, never a login mount.
				if mount != AuthKind::StaticToken.default_mount() {
					return Err(ConfigError::MountNotSupported { backend: self.kind.as_str() });
				}

				let config = self.decode::<StaticTokenConfig>()?;

				Arc::new(StaticTokenAuth::new(config.token.unwrap_or_default())?)
			},
			AuthKind::RoleSecret => {
				let config = self.decode::<RoleSecretConfig>()?;
				let mut backend = AppRoleAuth::new(config.role_id)?.with_mount(mount);

				if let Some(secret_id) = config.secret_id {
					backend = backend.with_secret_id(secret_id);
				}
				if let Some(namespace) = config.namespace {
					backend = backend.with_namespace(namespace);
				}

				Arc::new(backend)
			},
			AuthKind::SignedCloudIdentity => {
				let config = self.decode::<SignedCloudIdentityConfig>()?;
				let chain = match config.credentials {
					Some(CredentialsSource::Named(NamedSource::Environment)) =>
						CredentialChain::environment(),
					Some(CredentialsSource::One(credentials)) =>
						CredentialChain::from_credentials(credentials),
					Some(CredentialsSource::Many(list)) => list.into_iter().collect(),
					None => CredentialChain::new(),
				};
				let mut backend = AwsIamAuth::new(config.role, chain)?.with_mount(mount);

				if let Some(server_id) = config.iam_server_id_header_value {
					backend = backend.with_server_id(server_id);
				}
				if let Some(region) = config.region {
					backend = backend.with_region(region);
				}
				if let Some(endpoint) = config.sts_endpoint {
					backend = backend.with_sts_endpoint(endpoint);
				}

				Arc::new(backend)
			},
			AuthKind::PlatformIdentityFile => {
				let config = self.decode::<PlatformIdentityFileConfig>()?;
				let mut backend = KubernetesAuth::new(config.role)?.with_mount(mount);

				if let Some(jwt) = config.jwt {
					backend = backend.with_jwt(jwt);
				}
				if let Some(path) = config.jwt_path {
					backend = backend.with_jwt_path(path);
				}

				Arc::new(backend)
			},
		};

		Ok(backend)
	}

	fn decode<T>(&self) -> Result<T, ConfigError>
	where
		T: serde::de::DeserializeOwned,
	{
		let config = match &self.config {
			serde_json::Value::Null => serde_json::Value::Object(Default::default()),
			config => config.clone(),
		};

		serde_path_to_error::deserialize(config)
			.map_err(|e| ConfigError::invalid_options(self.kind.as_str(), e))
	}
}

#[derive(Deserialize)]
struct StaticTokenConfig {
	#[serde(default)]
	token: Option<String>,
}

#[derive(Deserialize)]
struct RoleSecretConfig {
	#[serde(default)]
	role_id: String,
	#[serde(default)]
	secret_id: Option<String>,
	#[serde(default)]
	namespace: Option<String>,
}

#[derive(Deserialize)]
struct SignedCloudIdentityConfig {
	#[serde(default)]
	role: String,
	#[serde(default)]
	credentials: Option<CredentialsSource>,
	#[serde(default)]
	iam_server_id_header_value: Option<String>,
	#[serde(default)]
	region: Option<String>,
	#[serde(default)]
	sts_endpoint: Option<Url>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CredentialsSource {
	Named(NamedSource),
	One(AwsCredentials),
	Many(Vec<AwsCredentials>),
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum NamedSource {
	Environment,
}

#[derive(Deserialize)]
struct PlatformIdentityFileConfig {
	#[serde(default)]
	role: String,
	#[serde(default)]
	jwt: Option<String>,
	#[serde(default)]
	jwt_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn options(value: serde_json::Value) -> AuthOptions {
		serde_json::from_value(value).expect("Options should deserialize.")
	}

	#[test]
	fn each_tag_builds_its_backend_on_the_default_mount() {
		let cases = [
			(serde_json::json!({ "type": "static-token", "config": { "token": "s.x" } }), "token"),
			(serde_json::json!({ "type": "role-secret", "config": { "role_id": "r" } }), "approle"),
			(
				serde_json::json!({
					"type": "signed-cloud-identity",
					"config": {
						"role": "r",
						"credentials": { "access_key_id": "KEY", "secret_access_key": "SECRET" }
					}
				}),
				"aws",
			),
			(
				serde_json::json!({
					"type": "platform-identity-file",
					"config": { "role": "r", "jwt": "inline" }
				}),
				"kubernetes",
			),
		];

		for (value, mount) in cases {
			let options = options(value);
			let backend = options.build().expect("Backend should build.");

			assert_eq!(backend.kind(), options.kind);
			assert_eq!(backend.mount(), mount);
		}
	}

	#[test]
	fn mount_override_is_applied() {
		let backend = options(serde_json::json!({
			"type": "role-secret",
			"mount": "ci-approle",
			"config": { "role_id": "role123" }
		}))
		.build()
		.expect("Backend should build.");

		assert_eq!(backend.mount(), "ci-approle");
	}

	#[test]
	fn static_token_rejects_a_custom_mount() {
		let err = options(serde_json::json!({
			"type": "static-token",
			"mount": "custom-token",
			"config": { "token": "s.x" }
		}))
		.build()
		.err()
		.expect("A custom mount should be rejected for static tokens.");

		assert!(matches!(err, ConfigError::MountNotSupported { backend: "static-token" }));
	}

	#[test]
	fn static_token_without_token_is_invalid() {
		let err = AuthOptions::new(AuthKind::StaticToken)
			.build()
			.err()
			.expect("A missing token should be rejected.");

		assert!(matches!(err, ConfigError::MissingToken));
	}

	#[test]
	fn cloud_identity_credentials_shapes() {
		let base = AuthOptions::new(AuthKind::SignedCloudIdentity);
		let absent = base
			.clone()
			.with_config(serde_json::json!({ "role": "r" }))
			.build()
			.err()
			.expect("Absent credentials should be rejected.");
		let empty_list = base
			.clone()
			.with_config(serde_json::json!({ "role": "r", "credentials": [] }))
			.build()
			.err()
			.expect("An empty credential list should be rejected.");

		assert!(matches!(absent, ConfigError::InvalidCredentials { .. }));
		assert!(matches!(empty_list, ConfigError::InvalidCredentials { .. }));
		assert!(
			base.with_config(serde_json::json!({ "role": "r", "credentials": "environment" }))
				.build()
				.is_ok()
		);
	}

	#[test]
	fn type_mismatch_reports_field_path() {
		let err = AuthOptions::new(AuthKind::RoleSecret)
			.with_config(serde_json::json!({ "role_id": 42 }))
			.build()
			.err()
			.expect("A numeric role_id should be rejected.");
		let ConfigError::InvalidOptions { backend, source } = &err else {
			panic!("Expected invalid options, got {err:?}.");
		};

		assert_eq!(*backend, "role-secret");
		assert_eq!(source.path().to_string(), "role_id");
	}

	#[test]
	fn sts_endpoint_is_decoded_as_a_url() {
		let base = AuthOptions::new(AuthKind::SignedCloudIdentity);
		let config = base
			.clone()
			.with_config(serde_json::json!({
				"role": "r",
				"credentials": "environment",
				"sts_endpoint": "https://sts.eu-west-1.amazonaws.com/"
			}))
			.decode::<SignedCloudIdentityConfig>()
			.expect("A valid endpoint should decode.");

		assert_eq!(
			config.sts_endpoint.as_ref().map(Url::as_str),
			Some("https://sts.eu-west-1.amazonaws.com/"),
		);

		let err = base
			.with_config(serde_json::json!({ "role": "r", "sts_endpoint": "not a url" }))
			.build()
			.err()
			.expect("An unparsable endpoint should be rejected.");
		let ConfigError::InvalidOptions { source, .. } = &err else {
			panic!("Expected invalid options, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "sts_endpoint");
	}
}
