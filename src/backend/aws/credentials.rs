//! AWS credential sources resolved in order, first success wins.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Static AWS credential triple used to sign the identity request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
	/// Access key identifier.
	pub access_key_id: String,
	/// Secret access key.
	pub secret_access_key: TokenSecret,
	/// Session token for temporary credentials.
	#[serde(default)]
	pub session_token: Option<TokenSecret>,
}
impl AwsCredentials {
	/// Creates long-lived credentials.
	pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
		Self {
			access_key_id: access_key_id.into(),
			secret_access_key: TokenSecret::new(secret_access_key),
			session_token: None,
		}
	}

	/// Attaches a session token (temporary credentials).
	pub fn with_session_token(mut self, session_token: impl Into<String>) -> Self {
		self.session_token = Some(TokenSecret::new(session_token));

		self
	}

	fn is_usable(&self) -> bool {
		!self.access_key_id.trim().is_empty() && !self.secret_access_key.is_blank()
	}
}
impl Debug for AwsCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AwsCredentials")
			.field("access_key_id", &self.access_key_id)
			.field("secret_access_key", &self.secret_access_key)
			.field("session_token", &self.session_token)
			.finish()
	}
}

/// Source of AWS credentials.
///
/// Returning `None` hands resolution to the next provider in the chain. Closures of the shape
/// `Fn() -> Option<AwsCredentials>` implement the trait directly.
pub trait CredentialProvider
where
	Self: Send + Sync,
{
	/// Attempts to produce credentials.
	fn resolve(&self) -> Option<AwsCredentials>;
}
impl CredentialProvider for AwsCredentials {
	fn resolve(&self) -> Option<AwsCredentials> {
		Some(self.clone())
	}
}
impl<F> CredentialProvider for F
where
	F: Send + Sync + Fn() -> Option<AwsCredentials>,
{
	fn resolve(&self) -> Option<AwsCredentials> {
		self()
	}
}

/// Reads `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN` at resolution time.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvironmentCredentials;
impl EnvironmentCredentials {
	const ACCESS_KEY_ID: &'static str = "AWS_ACCESS_KEY_ID";
	const SECRET_ACCESS_KEY: &'static str = "AWS_SECRET_ACCESS_KEY";
	const SESSION_TOKEN: &'static str = "AWS_SESSION_TOKEN";
}
impl CredentialProvider for EnvironmentCredentials {
	fn resolve(&self) -> Option<AwsCredentials> {
		let access_key_id = std::env::var(Self::ACCESS_KEY_ID).ok()?;
		let secret_access_key = std::env::var(Self::SECRET_ACCESS_KEY).ok()?;
		let credentials = AwsCredentials::new(access_key_id, secret_access_key);

		match std::env::var(Self::SESSION_TOKEN) {
			Ok(token) if !token.is_empty() => Some(credentials.with_session_token(token)),
			_ => Some(credentials),
		}
	}
}

/// Ordered list of credential providers.
#[derive(Clone, Default)]
pub struct CredentialChain {
	providers: Vec<Arc<dyn CredentialProvider>>,
}
impl CredentialChain {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Chain holding a single explicit credential value.
	pub fn from_credentials(credentials: AwsCredentials) -> Self {
		Self::new().with_provider(credentials)
	}

	/// Chain reading the process environment.
	pub fn environment() -> Self {
		Self::new().with_provider(EnvironmentCredentials)
	}

	/// Appends a provider; earlier providers take precedence.
	pub fn with_provider(mut self, provider: impl 'static + CredentialProvider) -> Self {
		self.providers.push(Arc::new(provider));

		self
	}

	/// Number of providers in the chain.
	pub fn len(&self) -> usize {
		self.providers.len()
	}

	/// Returns `true` when no provider has been registered.
	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}

	/// Returns the first usable credentials, or an invalid-credentials error.
	pub fn resolve(&self) -> Result<AwsCredentials, ConfigError> {
		self.providers
			.iter()
			.filter_map(|provider| provider.resolve())
			.find(AwsCredentials::is_usable)
			.ok_or_else(|| ConfigError::InvalidCredentials {
				reason: format!("none of the {} credential provider(s) resolved", self.len()),
			})
	}
}
impl FromIterator<AwsCredentials> for CredentialChain {
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = AwsCredentials>,
	{
		iter.into_iter().fold(Self::new(), |chain, credentials| chain.with_provider(credentials))
	}
}
impl Debug for CredentialChain {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialChain").field("providers", &self.providers.len()).finish()
	}
}
