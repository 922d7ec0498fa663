//! AWS Signature Version 4 for the STS `GetCallerIdentity` identity proof.

// crates.io
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{_prelude::*, backend::aws::AwsCredentials, error::ConfigError};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "sts";
const AMZ_DATE: &[BorrowedFormatItem<'static>] =
	format_description!("[year][month][day]T[hour][minute][second]Z");
const DATE_STAMP: &[BorrowedFormatItem<'static>] = format_description!("[year][month][day]");

/// Form body of the identity request.
pub const STS_REQUEST_BODY: &str = "Action=GetCallerIdentity&Version=2011-06-15";
/// Header naming the service instance the identity proof is bound to.
pub const SERVER_ID_HEADER: &str = "X-Vault-AWS-IAM-Server-ID";

/// Signed STS request, ready to be encoded into a login payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedRequest {
	/// HTTP verb.
	pub method: &'static str,
	/// Absolute STS URL.
	pub url: Url,
	/// Form-encoded body.
	pub body: &'static str,
	/// Headers including `Authorization`, in their canonical casing.
	pub headers: BTreeMap<String, String>,
}

/// Signs a `GetCallerIdentity` request for `endpoint` at instant `now`.
pub fn sign_caller_identity(
	credentials: &AwsCredentials,
	region: &str,
	endpoint: &Url,
	server_id: Option<&str>,
	now: OffsetDateTime,
) -> Result<SignedRequest, ConfigError> {
	let now = now.to_offset(time::UtcOffset::UTC);
	let amz_date = stamp(now, AMZ_DATE)?;
	let date_stamp = stamp(now, DATE_STAMP)?;
	let host = match (endpoint.host_str(), endpoint.port()) {
		(Some(host), Some(port)) => format!("{host}:{port}"),
		(Some(host), None) => host.to_owned(),
		(None, _) =>
			return Err(ConfigError::InvalidCredentials {
				reason: format!("STS endpoint {endpoint} has no host"),
			}),
	};
	let mut headers = BTreeMap::from([
		("Host".to_owned(), host),
		(
			"Content-Type".to_owned(),
			"application/x-www-form-urlencoded; charset=utf-8".to_owned(),
		),
		("X-Amz-Date".to_owned(), amz_date.clone()),
	]);

	if let Some(token) = &credentials.session_token {
		headers.insert("X-Amz-Security-Token".into(), token.expose().to_owned());
	}
	if let Some(server_id) = server_id {
		headers.insert(SERVER_ID_HEADER.into(), server_id.to_owned());
	}

	let canonical = headers
		.iter()
		.map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
		.collect::<BTreeMap<_, _>>();
	let signed_headers = canonical.keys().map(String::as_str).collect::<Vec<_>>().join(";");
	let canonical_headers =
		canonical.iter().map(|(name, value)| format!("{name}:{value}\n")).collect::<String>();
	let canonical_request = format!(
		"POST\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{}",
		endpoint.path(),
		endpoint.query().unwrap_or_default(),
		hex(&Sha256::digest(STS_REQUEST_BODY.as_bytes())),
	);
	let scope = format!("{date_stamp}/{region}/{SERVICE}/aws4_request");
	let string_to_sign = format!(
		"{ALGORITHM}\n{amz_date}\n{scope}\n{}",
		hex(&Sha256::digest(canonical_request.as_bytes()))
	);
	let signing_key =
		derive_signing_key(credentials.secret_access_key.expose(), &date_stamp, region, SERVICE)?;
	let signature = hex(&hmac(&signing_key, string_to_sign.as_bytes())?);

	headers.insert(
		"Authorization".into(),
		format!(
			"{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
			credentials.access_key_id
		),
	);

	Ok(SignedRequest { method: "POST", url: endpoint.clone(), body: STS_REQUEST_BODY, headers })
}

fn derive_signing_key(
	secret: &str,
	date_stamp: &str,
	region: &str,
	service: &str,
) -> Result<Vec<u8>, ConfigError> {
	let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes())?;
	let k_region = hmac(&k_date, region.as_bytes())?;
	let k_service = hmac(&k_region, service.as_bytes())?;

	hmac(&k_service, b"aws4_request")
}

fn hmac(key: &[u8], message: &[u8]) -> Result<Vec<u8>, ConfigError> {
	let mut mac = <Hmac<Sha256>>::new_from_slice(key).map_err(|e| {
		ConfigError::InvalidCredentials { reason: format!("signing key rejected: {e}") }
	})?;

	mac.update(message);

	Ok(mac.finalize().into_bytes().to_vec())
}

fn hex(bytes: &[u8]) -> String {
	const DIGITS: &[u8; 16] = b"0123456789abcdef";

	bytes
		.iter()
		.flat_map(|b| [DIGITS[(b >> 4) as usize] as char, DIGITS[(b & 0x0f) as usize] as char])
		.collect()
}

fn stamp(
	instant: OffsetDateTime,
	description: &[BorrowedFormatItem<'_>],
) -> Result<String, ConfigError> {
	instant.format(description).map_err(|e| ConfigError::InvalidCredentials {
		reason: format!("signing timestamp cannot be formatted: {e}"),
	})
}
