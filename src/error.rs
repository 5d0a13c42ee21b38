//! Client-level error types shared across the coordinator, transports, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// No response was received (connectivity, DNS, TLS, timeout).
	#[error(transparent)]
	Network(#[from] TransportError),
	/// The session refresh endpoint failed; see [`RefreshError`].
	#[error(transparent)]
	Refresh(#[from] RefreshError),
	/// Session cache failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The API answered with a non-2xx status that was not recovered by a refresh.
	#[error("API responded with HTTP {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Raw response body (lossy UTF-8).
		body: String,
	},
	/// The response body could not be decoded into the expected shape.
	#[error("API returned a malformed JSON body.")]
	Decode {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: u16,
	},
	/// The request body could not be serialized.
	#[error("Request body could not be serialized.")]
	Encode(#[source] serde_json::Error),
	/// The API answered successfully but omitted a field the caller depends on.
	#[error("API returned an unexpected response: {reason}.")]
	UnexpectedResponse {
		/// Human-readable description of what was missing.
		reason: String,
	},
}
impl Error {
	/// HTTP status associated with the failure, when one was received.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Http { status, .. } | Self::Decode { status, .. } => Some(*status),
			Self::Refresh(err) => err.status(),
			_ => None,
		}
	}

	/// Server-supplied `message` field of an HTTP error body, if present.
	pub fn message(&self) -> Option<String> {
		match self {
			Self::Http { body, .. } => server_message(body),
			_ => None,
		}
	}

	/// Returns `true` when the failure means the session can no longer be recovered.
	pub fn is_session_expired(&self) -> bool {
		match self {
			Self::Refresh(err) => err.is_session_expired(),
			Self::Http { status, .. } => *status == 401,
			_ => false,
		}
	}
}

/// Failure of the session refresh call.
///
/// The value is cloned to every caller parked behind the same refresh, so transport errors
/// are shared through an [`Arc`].
#[derive(Clone, Debug, ThisError)]
pub enum RefreshError {
	/// The refresh endpoint answered with a non-2xx status.
	#[error("Session refresh was rejected with HTTP {status}.")]
	Rejected {
		/// HTTP status code returned by the refresh endpoint.
		status: u16,
	},
	/// The refresh endpoint could not be reached.
	#[error("Session refresh received no response.")]
	Unreachable {
		/// Underlying transport failure.
		#[source]
		source: Arc<TransportError>,
	},
	/// The task driving the refresh was dropped before it settled.
	#[error("Session refresh was abandoned before it settled.")]
	Abandoned,
}
impl RefreshError {
	/// HTTP status returned by the refresh endpoint, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status } => Some(*status),
			_ => None,
		}
	}

	/// Returns `true` when the server refused the refresh credential (HTTP 401).
	pub fn is_session_expired(&self) -> bool {
		self.status() == Some(401)
	}
}
impl From<TransportError> for RefreshError {
	fn from(e: TransportError) -> Self {
		Self::Unreachable { source: Arc::new(e) }
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Required environment variable is not set.
	#[error("Environment variable `{var}` is not set.")]
	MissingEnv {
		/// Variable name.
		var: &'static str,
	},
	/// Environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{var}` holds an invalid value: {value}.")]
	InvalidEnv {
		/// Variable name.
		var: &'static str,
		/// Raw value that failed to parse.
		value: String,
	},
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S) or cannot carry paths.
	#[error("Base URL must be an http(s) URL that can carry paths: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Endpoint path or view does not start with `/`.
	#[error("The {name} path must start with '/': {path}.")]
	InvalidPath {
		/// Which path failed validation.
		name: &'static str,
		/// Offending path.
		path: String,
	},
	/// Request timeout must be positive.
	#[error("Request timeout must be greater than zero.")]
	ZeroTimeout,
	/// A request path could not be joined onto the base URL.
	#[error("Request path `{path}` cannot be resolved against the base URL.")]
	InvalidRequestPath {
		/// Offending request path.
		path: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures where no HTTP response was received.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("No response received from the server.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out before the server responded.")]
	Timeout,
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// Extracts the `message` field from a JSON error body.
pub(crate) fn server_message(body: &str) -> Option<String> {
	#[derive(Deserialize)]
	struct MessageBody {
		message: Option<String>,
	}

	serde_json::from_str::<MessageBody>(body)
		.ok()
		.and_then(|parsed| parsed.message)
		.filter(|message| !message.trim().is_empty())
}
