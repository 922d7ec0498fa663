//! Token introspection (`lookup-self`) and in-place renewal (`renew-self`).

// self
use crate::{
	_prelude::*,
	auth::{Token, TokenSecret},
	error::{self, ConfigError},
	http::{VaultHttpClient, VaultRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Route returning canonical metadata for the authenticating credential.
pub const LOOKUP_SELF_PATH: &str = "/auth/token/lookup-self";
/// Route extending the authenticating credential's lease.
pub const RENEW_SELF_PATH: &str = "/auth/token/renew-self";

#[derive(Deserialize)]
struct LookupResponse {
	data: LookupData,
}

#[derive(Deserialize)]
struct LookupData {
	id: String,
	#[serde(default)]
	accessor: String,
	#[serde(with = "time::serde::timestamp")]
	creation_time: OffsetDateTime,
	#[serde(default, with = "time::serde::timestamp::option")]
	last_renewal_time: Option<OffsetDateTime>,
	#[serde(default)]
	ttl: i64,
	#[serde(default)]
	explicit_max_ttl: i64,
	#[serde(default)]
	num_uses: u64,
	#[serde(default)]
	renewable: bool,
}
impl From<LookupData> for Token {
	fn from(data: LookupData) -> Self {
		Token::builder(data.id)
			.accessor(data.accessor)
			.created_at(data.creation_time)
			.last_renewed_at(data.last_renewal_time)
			.ttl(Duration::seconds(data.ttl))
			.explicit_max_ttl(Duration::seconds(data.explicit_max_ttl))
			.num_uses(data.num_uses)
			.renewable(data.renewable)
			.build()
	}
}

/// Fetches metadata for `token` and materializes a [`Token`].
///
/// Transport and service failures are returned unchanged; nothing is retried here.
pub async fn lookup_self(api: &dyn VaultHttpClient, token: &TokenSecret) -> Result<Token> {
	if token.is_blank() {
		return Err(ConfigError::MissingToken.into());
	}

	let span = FlowSpan::new(FlowKind::Lookup, "lookup_self");

	obs::record_flow_outcome(FlowKind::Lookup, FlowOutcome::Attempt);

	let result = span
		.instrument(async move {
			let payload = api.execute(VaultRequest::get(LOOKUP_SELF_PATH).with_token(token)).await?;
			let response = error::decode::<LookupResponse>(payload)?;

			Ok(Token::from(response.data))
		})
		.await;

	obs::record_result(FlowKind::Lookup, &result);

	result
}

/// Asks the service to extend `token`'s lease.
///
/// The acknowledgment carries no usable metadata, so callers follow up with [`lookup_self`].
pub async fn renew_self(api: &dyn VaultHttpClient, token: &TokenSecret) -> Result<()> {
	api.execute(VaultRequest::post(RENEW_SELF_PATH).with_token(token)).await?;

	Ok(())
}
