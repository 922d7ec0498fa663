//! Broker-level error types shared across backends, the token manager, and the transport.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn std::error::Error + Send + Sync>;
type DecodeError = serde_path_to_error::Error<serde_json::Error>;

/// Canonical broker error exposed by public APIs.
///
/// Every variant is cheap to clone so one failed acquisition can be handed to all callers that
/// were waiting on it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Malformed or missing configuration; never retried.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The service answered, but not with a usable payload.
	#[error(transparent)]
	Service(#[from] ServiceError),
	/// Transport failure (DNS, TCP, TLS, IO).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Cached token expired and the backend cannot mint a new one.
	#[error("Auth token expired and reauthentication is not allowed.")]
	AuthTokenExpired,
	/// Requested key is absent from a lease payload.
	#[error("Lease data does not contain the `{key}` key.")]
	MissingLeaseKey {
		/// Key that was looked up.
		key: String,
	},
}
impl Error {
	/// Returns the HTTP status reported by the service, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Service(err) => err.status(),
			_ => None,
		}
	}
}

/// Invalid-Arguments failures raised while building or using a backend.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// Service base URL cannot be parsed or joined.
	#[error("Service URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Static-token backend was configured without a token.
	#[error("Auth token should be provided for the static-token backend.")]
	MissingToken,
	/// Role-secret backend was configured without a role identifier.
	#[error("A role_id should be provided for the role-secret backend.")]
	MissingRoleId,
	/// A role name is required by the backend.
	#[error("A role should be provided for the {backend} backend.")]
	MissingRole {
		/// Backend label.
		backend: &'static str,
	},
	/// Signed-cloud-identity backend could not resolve any credentials.
	#[error("Invalid AWS credentials: {reason}.")]
	InvalidCredentials {
		/// Why resolution failed.
		reason: String,
	},
	/// A mount was configured for a backend that does not log in through one.
	#[error("The {backend} backend does not accept a custom mount.")]
	MountNotSupported {
		/// Backend label.
		backend: &'static str,
	},
	/// Backend-specific options failed to decode.
	#[error("Auth options for the {backend} backend are invalid.")]
	InvalidOptions {
		/// Backend label.
		backend: &'static str,
		/// Structured decoding failure.
		#[source]
		source: Arc<DecodeError>,
	},
	/// Platform identity file could not be read.
	#[error("Identity file {path} cannot be read.")]
	IdentityFile {
		/// File that was read.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: Arc<std::io::Error>,
	},
	/// A client is already registered under the name.
	#[error("Instance `{name}` is already booted.")]
	InstanceAlreadyBooted {
		/// Conflicting name.
		name: String,
	},
	/// No client is registered under the name.
	#[error("Instance `{name}` is not booted.")]
	UnknownInstance {
		/// Requested name.
		name: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}

	pub(crate) fn invalid_options(backend: &'static str, source: DecodeError) -> Self {
		Self::InvalidOptions { backend, source: Arc::new(source) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures reported by (or decoded from) the secrets service.
#[derive(Clone, Debug, ThisError)]
pub enum ServiceError {
	/// Service answered with a non-success HTTP status.
	#[error("Service responded with status {status}: {}.", .errors.join("; "))]
	Status {
		/// HTTP status code.
		status: u16,
		/// Messages from the service's `errors` array (or the raw body).
		errors: Vec<String>,
		/// Retry-After hint, when the service supplied one.
		retry_after: Option<Duration>,
	},
	/// Service responded with JSON that does not match the expected shape.
	#[error("Service returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure, including the offending field path.
		#[source]
		source: Arc<DecodeError>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl ServiceError {
	/// Returns the HTTP status code, when known.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } => Some(*status),
			Self::MalformedResponse { status, .. } => *status,
		}
	}

	pub(crate) fn malformed(source: DecodeError) -> Self {
		Self::MalformedResponse { source: Arc::new(source), status: None }
	}
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the service.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

/// Decodes a service payload into `T`, reporting the failing field path on mismatch.
pub(crate) fn decode<T>(value: serde_json::Value) -> Result<T>
where
	T: serde::de::DeserializeOwned,
{
	serde_path_to_error::deserialize(value).map_err(|e| ServiceError::malformed(e).into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn status_is_exposed_for_service_errors() {
		let err = Error::from(ServiceError::Status {
			status: 403,
			errors: vec!["permission denied".into()],
			retry_after: None,
		});

		assert_eq!(err.status(), Some(403));
		assert!(err.to_string().contains("permission denied"));
		assert_eq!(Error::AuthTokenExpired.status(), None);
	}

	#[test]
	fn decode_reports_field_path() {
		#[derive(Debug, Deserialize)]
		struct Auth {
			#[allow(dead_code)]
			client_token: String,
		}
		#[derive(Debug, Deserialize)]
		struct Login {
			#[allow(dead_code)]
			auth: Auth,
		}

		let err = decode::<Login>(serde_json::json!({ "auth": { "client_token": 7 } }))
			.expect_err("A numeric client_token should be rejected.");
		let Error::Service(ServiceError::MalformedResponse { source, .. }) = &err else {
			panic!("Expected a malformed response error, got {err:?}.");
		};

		assert_eq!(source.path().to_string(), "auth.client_token");
	}

	#[test]
	fn errors_clone_with_shared_sources() {
		let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
		let err = Error::from(TransportError::from(io));
		let cloned = err.clone();

		assert_eq!(err.to_string(), cloned.to_string());
		assert!(std::error::Error::source(&cloned).is_some());
	}
}
