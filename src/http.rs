//! Transport primitives for calls against the secrets service.
//!
//! The module exposes [`VaultHttpClient`], the broker's only dependency on an HTTP stack,
//! together with the [`VaultRequest`] value it executes. Implementations resolve with the
//! parsed JSON body (or [`serde_json::Value::Null`] for empty bodies) and reject with a broker
//! [`Error`] so backends, introspection, and the token manager can propagate failures
//! unchanged.

// crates.io
#[cfg(feature = "reqwest")]
use reqwest::{
	Method as ReqwestMethod,
	header::{HeaderMap, RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, auth::TokenSecret};
#[cfg(feature = "reqwest")] use crate::error::{ConfigError, ServiceError, TransportError};

/// Header carrying the authenticating credential.
pub const TOKEN_HEADER: &str = "X-Vault-Token";
/// Header scoping a request to a namespace.
pub const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Boxed future returned by [`VaultHttpClient::execute`].
pub type HttpFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing service requests.
///
/// The trait is object safe so backends and the token manager can share one transport behind
/// `Arc<dyn VaultHttpClient>`. Implementations own timeouts and retries; the broker adds
/// neither.
pub trait VaultHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and resolves with the parsed response body.
	fn execute(&self, request: VaultRequest) -> HttpFuture<'_, serde_json::Value>;
}

/// HTTP verbs understood by the secrets service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `LIST`, the service's custom listing verb.
	List,
}
impl Method {
	/// Returns the verb as sent on the wire.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::List => "LIST",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Request handed to a [`VaultHttpClient`].
#[derive(Clone, PartialEq)]
pub struct VaultRequest {
	/// HTTP verb.
	pub method: Method,
	/// Service-relative route, e.g. `/auth/token/lookup-self`.
	pub path: String,
	/// Optional JSON payload.
	pub body: Option<serde_json::Value>,
	/// Header name to value mapping.
	pub headers: BTreeMap<String, String>,
}
impl VaultRequest {
	/// Creates a request without body or headers.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None, headers: BTreeMap::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `LIST` request.
	pub fn list(path: impl Into<String>) -> Self {
		Self::new(Method::List, path)
	}

	/// Attaches a JSON payload.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Authenticates the request with the provided credential.
	pub fn with_token(self, token: &TokenSecret) -> Self {
		self.with_header(TOKEN_HEADER, token.expose())
	}

	/// Returns a header value, if present.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).map(String::as_str)
	}
}
impl Debug for VaultRequest {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let headers = self
			.headers
			.iter()
			.map(|(name, value)| {
				if name.eq_ignore_ascii_case(TOKEN_HEADER) {
					(name.as_str(), "<redacted>")
				} else {
					(name.as_str(), value.as_str())
				}
			})
			.collect::<BTreeMap<_, _>>();

		f.debug_struct("VaultRequest")
			.field("method", &self.method)
			.field("path", &self.path)
			.field("body_set", &self.body.is_some())
			.field("headers", &headers)
			.finish()
	}
}

/// reqwest-backed transport that joins request paths onto `{base}/{api_version}`.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient {
	client: ReqwestClient,
	base_url: Url,
	api_version: String,
}
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	const DEFAULT_API_VERSION: &'static str = "v1";

	/// Creates a transport for the service at `base_url`.
	pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
		let client = ReqwestClient::builder().build().map_err(ConfigError::from)?;

		Self::with_client(client, base_url)
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient, base_url: impl AsRef<str>) -> Result<Self> {
		let base_url = Url::parse(base_url.as_ref())
			.map_err(|source| ConfigError::InvalidUrl { source })?;

		Ok(Self { client, base_url, api_version: Self::DEFAULT_API_VERSION.into() })
	}

	/// Overrides the API version prefix (defaults to `v1`).
	pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
		self.api_version = version.into();

		self
	}

	/// Resolves the absolute URL for a service-relative path.
	pub fn endpoint(&self, path: &str) -> Result<Url> {
		let mut joined = self.base_url.as_str().trim_end_matches('/').to_owned();

		for segment in [self.api_version.as_str(), path] {
			let segment = segment.trim_matches('/');

			if !segment.is_empty() {
				joined.push('/');
				joined.push_str(segment);
			}
		}

		Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { source }.into())
	}

	async fn dispatch(&self, request: VaultRequest) -> Result<serde_json::Value> {
		let url = self.endpoint(&request.path)?;
		let method = match request.method {
			Method::Get => ReqwestMethod::GET,
			Method::Post => ReqwestMethod::POST,
			Method::List =>
				ReqwestMethod::from_bytes(b"LIST").map_err(ConfigError::http_client_build)?,
		};
		let mut builder = self.client.request(method, url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(map_send_error)?;
		let status = response.status();
		let retry_after = parse_retry_after(response.headers());
		let bytes = response.bytes().await.map_err(TransportError::from)?;

		if !status.is_success() {
			return Err(ServiceError::Status {
				status: status.as_u16(),
				errors: service_errors(&bytes),
				retry_after,
			}
			.into());
		}
		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(serde_json::Value::Null);
		}

		let mut de = serde_json::Deserializer::from_slice(&bytes);

		serde_path_to_error::deserialize(&mut de).map_err(|source| {
			ServiceError::MalformedResponse {
				source: Arc::new(source),
				status: Some(status.as_u16()),
			}
			.into()
		})
	}
}
#[cfg(feature = "reqwest")]
impl VaultHttpClient for ReqwestHttpClient {
	fn execute(&self, request: VaultRequest) -> HttpFuture<'_, serde_json::Value> {
		Box::pin(self.dispatch(request))
	}
}

#[cfg(feature = "reqwest")]
fn map_send_error(err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}

	TransportError::from(err).into()
}

#[cfg(feature = "reqwest")]
fn service_errors(body: &[u8]) -> Vec<String> {
	#[derive(Deserialize)]
	struct ErrorBody {
		#[serde(default)]
		errors: Vec<String>,
	}

	match serde_json::from_slice::<ErrorBody>(body) {
		Ok(parsed) if !parsed.errors.is_empty() => parsed.errors,
		_ => {
			let raw = String::from_utf8_lossy(body).trim().to_owned();

			if raw.is_empty() { Vec::new() } else { vec![raw] }
		},
	}
}

#[cfg(feature = "reqwest")]
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return i64::try_from(secs).ok().map(Duration::seconds);
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}
