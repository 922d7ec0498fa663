//! Immutable token snapshots, the expiry rule, and their builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Safety margin subtracted from service-reported TTLs so a token is never used right up to the
/// instant the service expires it.
pub const NETWORK_LATENCY_SKEW: Duration = Duration::seconds(60);

/// Shortest delay the renewal timer is ever armed with.
pub const MIN_RENEWAL_DELAY: Duration = Duration::seconds(1);

/// Immutable snapshot of a service credential.
///
/// Tokens are only produced by introspection and are superseded (never mutated) on renewal or
/// reauthentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
	/// Credential identifier sent as `X-Vault-Token`.
	pub id: TokenSecret,
	/// Audit handle for the credential.
	pub accessor: String,
	/// Creation instant reported by the service.
	pub created_at: OffsetDateTime,
	/// Expiry instant; `None` means the token never expires.
	pub expires_at: Option<OffsetDateTime>,
	/// Hard TTL ceiling reported by the service (informational).
	pub explicit_max_ttl: Duration,
	/// Remaining uses; zero means unlimited (informational).
	pub num_uses: u64,
	/// Service-reported renewability flag.
	pub renewable: bool,
}
impl Token {
	/// Returns a builder seeded with the credential identifier.
	pub fn builder(id: impl Into<TokenSecret>) -> TokenBuilder {
		TokenBuilder::new(id.into())
	}

	/// Returns the credential identifier.
	pub fn id(&self) -> &TokenSecret {
		&self.id
	}

	/// Returns the expiry instant, or `None` for tokens that never expire.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.expires_at
	}

	/// Returns `true` if the token is past its expiry at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant > expires_at)
	}

	/// Returns `true` if the token is past its expiry relative to the current clock.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// A token without expiry cannot be meaningfully renewed, whatever the service flag says.
	pub fn is_renewable(&self) -> bool {
		self.renewable && self.expires_at.is_some()
	}

	/// Delay after which a renewal should be attempted, measured from `now`.
	///
	/// Half of the remaining lifetime, floored at [`MIN_RENEWAL_DELAY`]. Returns `None` for
	/// tokens that never expire.
	pub fn renewal_delay_at(&self, now: OffsetDateTime) -> Option<Duration> {
		let remaining = self.expires_at? - now;

		Some((remaining / 2_i32).max(MIN_RENEWAL_DELAY))
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("id", &self.id)
			.field("accessor", &"<redacted>")
			.field("created_at", &self.created_at)
			.field("expires_at", &self.expires_at)
			.field("explicit_max_ttl", &self.explicit_max_ttl)
			.field("num_uses", &self.num_uses)
			.field("renewable", &self.renewable)
			.finish()
	}
}

/// Builder for [`Token`] that applies the expiry rule to raw service metadata.
#[derive(Clone, Debug)]
pub struct TokenBuilder {
	id: TokenSecret,
	accessor: String,
	created_at: OffsetDateTime,
	last_renewed_at: Option<OffsetDateTime>,
	ttl: Duration,
	explicit_max_ttl: Duration,
	num_uses: u64,
	renewable: bool,
}
impl TokenBuilder {
	fn new(id: TokenSecret) -> Self {
		Self {
			id,
			accessor: String::new(),
			created_at: OffsetDateTime::now_utc(),
			last_renewed_at: None,
			ttl: Duration::ZERO,
			explicit_max_ttl: Duration::ZERO,
			num_uses: 0,
			renewable: false,
		}
	}

	/// Sets the audit accessor.
	pub fn accessor(mut self, accessor: impl Into<String>) -> Self {
		self.accessor = accessor.into();

		self
	}

	/// Sets the creation instant (defaults to now).
	pub fn created_at(mut self, instant: OffsetDateTime) -> Self {
		self.created_at = instant;

		self
	}

	/// Sets the last renewal instant; it takes precedence over the creation instant.
	pub fn last_renewed_at(mut self, instant: Option<OffsetDateTime>) -> Self {
		self.last_renewed_at = instant;

		self
	}

	/// Sets the service-reported TTL. Zero means the token never expires.
	pub fn ttl(mut self, ttl: Duration) -> Self {
		self.ttl = ttl;

		self
	}

	/// Sets the explicit max TTL.
	pub fn explicit_max_ttl(mut self, ttl: Duration) -> Self {
		self.explicit_max_ttl = ttl;

		self
	}

	/// Sets the remaining-use counter.
	pub fn num_uses(mut self, num_uses: u64) -> Self {
		self.num_uses = num_uses;

		self
	}

	/// Sets the renewability flag.
	pub fn renewable(mut self, renewable: bool) -> Self {
		self.renewable = renewable;

		self
	}

	/// Finalizes the token, deriving `expires_at` from the reference instant and TTL.
	pub fn build(self) -> Token {
		let expires_at = if self.ttl.is_positive() {
			let reference = self.last_renewed_at.unwrap_or(self.created_at);
			// TTLs within the skew are kept as-is rather than collapsing to zero.
			let lifetime = if self.ttl > NETWORK_LATENCY_SKEW {
				self.ttl - NETWORK_LATENCY_SKEW
			} else {
				self.ttl
			};

			Some(reference + lifetime)
		} else {
			None
		};

		Token {
			id: self.id,
			accessor: self.accessor,
			created_at: self.created_at,
			expires_at,
			explicit_max_ttl: self.explicit_max_ttl,
			num_uses: self.num_uses,
			renewable: self.renewable,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const T0: OffsetDateTime = datetime!(2025-01-01 00:00 UTC);

	#[test]
	fn zero_ttl_never_expires() {
		let token = Token::builder("s.root").created_at(T0).renewable(true).build();

		assert_eq!(token.expires_at(), None);
		assert!(!token.is_expired_at(T0 + Duration::days(36_500)));
		assert!(!token.is_renewable());
		assert_eq!(token.renewal_delay_at(T0), None);
	}

	#[test]
	fn ttl_above_skew_is_reduced() {
		let token = Token::builder("s.app").created_at(T0).ttl(Duration::seconds(120)).build();

		assert_eq!(token.expires_at(), Some(T0 + Duration::seconds(60)));
		assert!(!token.is_expired_at(T0 + Duration::seconds(60)));
		assert!(token.is_expired_at(T0 + Duration::seconds(61)));
	}

	#[test]
	fn ttl_within_skew_is_not_reduced() {
		for secs in [1, 30, 60] {
			let token =
				Token::builder("s.short").created_at(T0).ttl(Duration::seconds(secs)).build();

			assert_eq!(token.expires_at(), Some(T0 + Duration::seconds(secs)));
		}
	}

	#[test]
	fn last_renewal_overrides_creation_time() {
		let renewed = T0 + Duration::minutes(10);
		let token = Token::builder("s.app")
			.created_at(T0)
			.last_renewed_at(Some(renewed))
			.ttl(Duration::seconds(3_600))
			.build();

		assert_eq!(token.expires_at(), Some(renewed + Duration::seconds(3_540)));
	}

	#[test]
	fn renewability_requires_flag_and_expiry() {
		let builder = Token::builder("s.app").created_at(T0).ttl(Duration::seconds(300));

		assert!(builder.clone().renewable(true).build().is_renewable());
		assert!(!builder.renewable(false).build().is_renewable());
	}

	#[test]
	fn renewal_delay_halves_remaining_lifetime_with_floor() {
		let token = Token::builder("s.app")
			.created_at(T0)
			.ttl(Duration::seconds(120))
			.renewable(true)
			.build();

		assert_eq!(token.renewal_delay_at(T0), Some(Duration::seconds(30)));
		assert_eq!(token.renewal_delay_at(T0 + Duration::seconds(59)), Some(MIN_RENEWAL_DELAY));
		assert_eq!(token.renewal_delay_at(T0 + Duration::seconds(90)), Some(MIN_RENEWAL_DELAY));
	}

	#[test]
	fn debug_redacts_identifiers() {
		let token = Token::builder("s.secret").accessor("acc-secret").created_at(T0).build();
		let rendered = format!("{token:?}");

		assert!(!rendered.contains("s.secret"));
		assert!(!rendered.contains("acc-secret"));
	}
}
