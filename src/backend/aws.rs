//! Signed-cloud-identity backend (AWS IAM auth method).
//!
//! The backend signs an STS `GetCallerIdentity` request locally and hands the signed request
//! to the service, which replays it against STS to prove the caller's identity. Credentials are
//! never sent to the service itself.

pub mod credentials;
pub mod sigv4;

pub use credentials::*;
pub use sigv4::{SERVER_ID_HEADER, STS_REQUEST_BODY, SignedRequest};

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::{
	_prelude::*,
	auth::Token,
	backend::{self, AuthBackend, AuthKind},
	error::ConfigError,
	http::{HttpFuture, VaultHttpClient, VaultRequest},
};

/// Region the identity request is signed for unless overridden.
pub const DEFAULT_REGION: &str = "us-east-1";
/// Global STS endpoint.
pub const DEFAULT_STS_ENDPOINT: &str = "https://sts.amazonaws.com/";

/// Logs in with a SigV4-signed STS identity request.
#[derive(Clone, Debug)]
pub struct AwsIamAuth {
	role: String,
	credentials: CredentialChain,
	server_id: Option<String>,
	region: String,
	sts_endpoint: Url,
	mount: String,
}
impl AwsIamAuth {
	/// Creates the backend for `role`, resolving credentials from `credentials` at each login.
	///
	/// An empty chain is rejected up front.
	pub fn new(role: impl Into<String>, credentials: CredentialChain) -> Result<Self, ConfigError> {
		let role = role.into();

		if role.trim().is_empty() {
			return Err(ConfigError::MissingRole {
				backend: AuthKind::SignedCloudIdentity.as_str(),
			});
		}
		if credentials.is_empty() {
			return Err(ConfigError::InvalidCredentials {
				reason: "credentials or credential providers must be supplied".into(),
			});
		}

		let sts_endpoint =
			Url::parse(DEFAULT_STS_ENDPOINT).map_err(|source| ConfigError::InvalidUrl { source })?;

		Ok(Self {
			role,
			credentials,
			server_id: None,
			region: DEFAULT_REGION.into(),
			sts_endpoint,
			mount: AuthKind::SignedCloudIdentity.default_mount().into(),
		})
	}

	/// Binds the identity proof to a server ID (`X-Vault-AWS-IAM-Server-ID`).
	pub fn with_server_id(mut self, server_id: impl Into<String>) -> Self {
		self.server_id = Some(server_id.into());

		self
	}

	/// Signs for a different region.
	pub fn with_region(mut self, region: impl Into<String>) -> Self {
		self.region = region.into();

		self
	}

	/// Targets a regional or private STS endpoint.
	pub fn with_sts_endpoint(mut self, endpoint: Url) -> Self {
		self.sts_endpoint = endpoint;

		self
	}

	/// Overrides the mount.
	pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
		self.mount = mount.into();

		self
	}

	/// Builds the login request for the instant `now`.
	pub fn login_request(&self, now: OffsetDateTime) -> Result<VaultRequest, ConfigError> {
		let credentials = self.credentials.resolve()?;
		let signed = sigv4::sign_caller_identity(
			&credentials,
			&self.region,
			&self.sts_endpoint,
			self.server_id.as_deref(),
			now,
		)?;
		// The service expects Go's `http.Header` shape: every value wrapped in a list.
		let headers = signed
			.headers
			.iter()
			.map(|(name, value)| (name.clone(), vec![value.clone()]))
			.collect::<BTreeMap<_, _>>();
		let headers = serde_json::to_vec(&headers).map_err(|e| ConfigError::InvalidCredentials {
			reason: format!("signed headers cannot be encoded: {e}"),
		})?;

		Ok(VaultRequest::post(backend::login_path(&self.mount)).with_body(serde_json::json!({
			"iam_http_request_method": signed.method,
			"iam_request_url": STANDARD.encode(signed.url.as_str()),
			"iam_request_body": STANDARD.encode(signed.body),
			"iam_request_headers": STANDARD.encode(headers),
			"role": self.role,
		})))
	}

	async fn login(&self, api: &dyn VaultHttpClient) -> Result<Token> {
		let request = self.login_request(OffsetDateTime::now_utc())?;

		backend::login(api, request).await
	}
}
impl AuthBackend for AwsIamAuth {
	fn kind(&self) -> AuthKind {
		AuthKind::SignedCloudIdentity
	}

	fn mount(&self) -> &str {
		&self.mount
	}

	fn authenticate<'a>(&'a self, api: &'a dyn VaultHttpClient) -> HttpFuture<'a, Token> {
		Box::pin(self.login(api))
	}
}
