//! Authentication backends and the configuration surface that selects one.
//!
//! Every backend logs in through the transport and then introspects the returned credential,
//! so the token manager only ever deals with [`Token`] values and the [`AuthBackend`] trait.

pub mod approle;
pub mod aws;
pub mod kubernetes;
pub mod options;
pub mod static_token;

pub use approle::*;
pub use aws::{
	AwsCredentials, AwsIamAuth, CredentialChain, CredentialProvider, EnvironmentCredentials,
};
pub use kubernetes::*;
pub use options::*;
pub use static_token::*;

// self
use crate::{
	_prelude::*,
	auth::{self, Token, TokenSecret},
	error,
	http::{HttpFuture, VaultHttpClient, VaultRequest},
};

/// Capability every authentication backend exposes to the token manager.
///
/// Implementors are required to be `Send + Sync`; the manager shares one backend between
/// foreground acquisitions and the renewal timer.
pub trait AuthBackend
where
	Self: Send + Sync,
{
	/// Backend kind, used for logging and configuration round-trips.
	fn kind(&self) -> AuthKind;

	/// Mount the backend logs in under.
	fn mount(&self) -> &str;

	/// Produces a fresh token by logging in and introspecting the returned credential.
	fn authenticate<'a>(&'a self, api: &'a dyn VaultHttpClient) -> HttpFuture<'a, Token>;

	/// Whether the manager may call [`AuthBackend::authenticate`] again once the cached token
	/// expired.
	fn reauthentication_allowed(&self) -> bool {
		true
	}
}

/// Backend kinds selectable through [`AuthOptions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthKind {
	/// Pre-issued token supplied by configuration.
	StaticToken,
	/// Role identifier plus optional secret identifier.
	RoleSecret,
	/// Signed cloud-identity (AWS IAM) request.
	SignedCloudIdentity,
	/// Platform service-identity file (Kubernetes service account JWT).
	PlatformIdentityFile,
}
impl AuthKind {
	/// Returns the configuration tag.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthKind::StaticToken => "static-token",
			AuthKind::RoleSecret => "role-secret",
			AuthKind::SignedCloudIdentity => "signed-cloud-identity",
			AuthKind::PlatformIdentityFile => "platform-identity-file",
		}
	}

	/// Mount used when configuration does not name one.
	pub const fn default_mount(self) -> &'static str {
		match self {
			AuthKind::StaticToken => "token",
			AuthKind::RoleSecret => "approle",
			AuthKind::SignedCloudIdentity => "aws",
			AuthKind::PlatformIdentityFile => "kubernetes",
		}
	}
}
impl Display for AuthKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Returns the login route for `mount`.
pub fn login_path(mount: &str) -> String {
	format!("/auth/{}/login", mount.trim_matches('/'))
}

#[derive(Deserialize)]
struct LoginResponse {
	auth: LoginAuth,
}

#[derive(Deserialize)]
struct LoginAuth {
	client_token: TokenSecret,
}

/// Posts `request` to a login route, then introspects the issued credential.
pub(crate) async fn login(api: &dyn VaultHttpClient, request: VaultRequest) -> Result<Token> {
	let payload = api.execute(request).await?;
	let response = error::decode::<LoginResponse>(payload)?;

	auth::lookup_self(api, &response.auth.client_token).await
}
