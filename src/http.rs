//! Transport primitives for API calls.
//!
//! The module exposes [`ApiHttpClient`], the client's only dependency on an HTTP stack, and
//! [`ReqwestHttpClient`], the default implementation. Session credentials travel as cookies,
//! so any transport must keep a cookie jar that is shared between ordinary calls and the
//! refresh call; the refresh response replaces the session cookie as a side effect.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	request::{ApiRequest, ApiResponse},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::ClientConfig,
	error::ConfigError,
	request::{Method, MultipartForm, RequestBody},
};

/// Boxed future returned by [`ApiHttpClient::execute`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP transports capable of executing API calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by every
/// clone of a client, and the returned futures must be `Send` so callers can spawn them.
/// A transport reports every received response as `Ok`, whatever its status; `Err` is
/// reserved for calls that produced no response at all.
pub trait ApiHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` against the already-resolved `url`.
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> HttpFuture<'a>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Clients built through [`ReqwestHttpClient::from_config`] keep a cookie store, apply the
/// configured timeout, and send JSON `Content-Type`/`Accept` headers by default. When
/// supplying a custom [`ReqwestClient`], enable its cookie store or session cookies will
/// never be replayed.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a cookie-aware client honoring the configured timeout.
	pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
		use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};

		let mut headers = HeaderMap::new();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		let client = ReqwestClient::builder()
			.cookie_store(true)
			.timeout(config.timeout)
			.default_headers(headers)
			.build()?;

		Ok(Self(client))
	}

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	async fn dispatch(&self, url: Url, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
		let mut builder = self.0.request(reqwest_method(request.method), url);

		for (name, value) in &request.headers {
			builder = builder.header(name.as_str(), value.as_str());
		}
		match request.body.as_ref() {
			Some(RequestBody::Json(body)) => {
				let bytes = serde_json::to_vec(body)
					.map_err(|e| TransportError::Io(std::io::Error::other(e)))?;

				builder = builder.body(bytes);
			},
			// The form sets its own boundary-bearing `Content-Type` over the JSON default.
			Some(RequestBody::Multipart(form)) => builder = builder.multipart(reqwest_form(form)?),
			None => {},
		}

		let response = builder.send().await?;
		let status = response.status().as_u16();
		let headers = response
			.headers()
			.iter()
			.filter_map(|(name, value)| {
				value.to_str().ok().map(|v| (name.as_str().to_owned(), v.to_owned()))
			})
			.collect();
		let body = response.bytes().await?.to_vec();

		Ok(ApiResponse { status, headers, body })
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl std::ops::Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl ApiHttpClient for ReqwestHttpClient {
	fn execute<'a>(&'a self, url: Url, request: &'a ApiRequest) -> HttpFuture<'a> {
		Box::pin(self.dispatch(url, request))
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_method(method: Method) -> reqwest::Method {
	match method {
		Method::Get => reqwest::Method::GET,
		Method::Post => reqwest::Method::POST,
		Method::Put => reqwest::Method::PUT,
		Method::Patch => reqwest::Method::PATCH,
		Method::Delete => reqwest::Method::DELETE,
	}
}

#[cfg(feature = "reqwest")]
fn reqwest_form(form: &MultipartForm) -> Result<reqwest::multipart::Form, TransportError> {
	use reqwest::multipart::{Form, Part};

	form.parts.iter().try_fold(Form::new(), |acc, part| -> Result<Form, TransportError> {
		let mut encoded = Part::bytes(part.bytes.clone());

		if let Some(file_name) = &part.file_name {
			encoded = encoded.file_name(file_name.clone());
		}
		if let Some(content_type) = &part.content_type {
			encoded = encoded.mime_str(content_type)?;
		}

		Ok(acc.part(part.name.clone(), encoded))
	})
}
