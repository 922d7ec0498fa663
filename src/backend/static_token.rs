//! Backend wrapping a pre-issued token.

// self
use crate::{
	_prelude::*,
	auth::{self, Token, TokenSecret},
	backend::{AuthBackend, AuthKind},
	error::ConfigError,
	http::{HttpFuture, VaultHttpClient},
};

/// Introspects a configured token instead of logging in.
///
/// A static token cannot be re-minted, so reauthentication is never allowed.
#[derive(Clone, Debug)]
pub struct StaticTokenAuth {
	token: TokenSecret,
}
impl StaticTokenAuth {
	/// Wraps `token`, rejecting blank values.
	pub fn new(token: impl Into<TokenSecret>) -> Result<Self, ConfigError> {
		let token = token.into();

		if token.is_blank() {
			return Err(ConfigError::MissingToken);
		}

		Ok(Self { token })
	}
}
impl AuthBackend for StaticTokenAuth {
	fn kind(&self) -> AuthKind {
		AuthKind::StaticToken
	}

	fn mount(&self) -> &str {
		AuthKind::StaticToken.default_mount()
	}

	fn authenticate<'a>(&'a self, api: &'a dyn VaultHttpClient) -> HttpFuture<'a, Token> {
		Box::pin(auth::lookup_self(api, &self.token))
	}

	fn reauthentication_allowed(&self) -> bool {
		false
	}
}
