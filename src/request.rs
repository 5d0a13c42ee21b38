//! Transport-neutral request and response values.
//!
//! [`ApiRequest`] is the descriptor of one logical call. It carries a `retried` marker that
//! the coordinator flips exactly once, when the call is replayed after a session refresh.
//! Bodies are owned values (JSON or [`MultipartForm`]) so a replay resends the same bytes.

// self
use crate::_prelude::*;

/// HTTP methods used by the API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
	/// `GET`
	Get,
	/// `POST`
	Post,
	/// `PUT`
	Put,
	/// `PATCH`
	Patch,
	/// `DELETE`
	Delete,
}
impl Method {
	/// Returns the canonical method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Descriptor of one outbound API call.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL (absolute URLs are accepted as well).
	pub path: String,
	/// Optional body.
	pub body: Option<RequestBody>,
	/// Extra headers layered over the transport defaults.
	pub headers: BTreeMap<String, String>,
	retried: bool,
}
impl ApiRequest {
	/// Creates a request without a body.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), body: None, headers: BTreeMap::new(), retried: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Attaches a pre-built JSON body.
	pub fn with_body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(RequestBody::Json(body));

		self
	}

	/// Attaches a multipart form body.
	pub fn with_form(mut self, form: MultipartForm) -> Self {
		self.body = Some(RequestBody::Multipart(form));

		self
	}

	/// JSON body, if the request carries one.
	pub fn json_body(&self) -> Option<&serde_json::Value> {
		match &self.body {
			Some(RequestBody::Json(value)) => Some(value),
			_ => None,
		}
	}

	/// Multipart form, if the request carries one.
	pub fn form(&self) -> Option<&MultipartForm> {
		match &self.body {
			Some(RequestBody::Multipart(form)) => Some(form),
			_ => None,
		}
	}

	/// Serializes `payload` into the JSON body.
	pub fn with_json<T>(self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_value(payload).map_err(Error::Encode)?;

		Ok(self.with_body(body))
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.headers.insert(name.into(), value.into());

		self
	}

	/// Whether this call has already been replayed once.
	pub fn is_retried(&self) -> bool {
		self.retried
	}

	pub(crate) fn mark_retried(&mut self) {
		self.retried = true;
	}
}

/// Body of an outbound call.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
	/// JSON document, sent as `application/json`.
	Json(serde_json::Value),
	/// Multipart form, sent as `multipart/form-data`.
	Multipart(MultipartForm),
}

/// Transport-neutral `multipart/form-data` body.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartForm {
	/// Parts in the order they are sent.
	pub parts: Vec<FormPart>,
}
impl MultipartForm {
	/// Creates an empty form.
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a plain text field.
	pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.parts.push(FormPart {
			name: name.into(),
			file_name: None,
			content_type: None,
			bytes: value.into().into_bytes(),
		});

		self
	}

	/// Appends a file field.
	pub fn file(
		mut self,
		name: impl Into<String>,
		file_name: impl Into<String>,
		content_type: impl Into<String>,
		bytes: impl Into<Vec<u8>>,
	) -> Self {
		self.parts.push(FormPart {
			name: name.into(),
			file_name: Some(file_name.into()),
			content_type: Some(content_type.into()),
			bytes: bytes.into(),
		});

		self
	}

	/// First part named `name`.
	pub fn part(&self, name: &str) -> Option<&FormPart> {
		self.parts.iter().find(|part| part.name == name)
	}
}

/// One field of a [`MultipartForm`].
#[derive(Clone, PartialEq, Eq)]
pub struct FormPart {
	/// Field name.
	pub name: String,
	/// File name reported to the server, for file fields.
	pub file_name: Option<String>,
	/// MIME type of the payload, for file fields.
	pub content_type: Option<String>,
	/// Raw payload.
	pub bytes: Vec<u8>,
}
impl Debug for FormPart {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FormPart")
			.field("name", &self.name)
			.field("file_name", &self.file_name)
			.field("content_type", &self.content_type)
			.field("len", &self.bytes.len())
			.finish()
	}
}

/// Response returned by a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers with lowercase names.
	pub headers: BTreeMap<String, String>,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response without headers.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: BTreeMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Returns the body as (lossy) UTF-8 text.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on error.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body: &[u8] = if self.body.is_empty() { b"null" } else { &self.body };
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Decodes the standard `{ message, data }` envelope.
	pub fn envelope<T>(&self) -> Result<Envelope<T>>
	where
		T: DeserializeOwned,
	{
		self.json()
	}

	/// Decodes the envelope and requires its `data` member.
	pub fn data<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.envelope::<T>()?.data.ok_or_else(|| Error::UnexpectedResponse {
			reason: format!("HTTP {} response carried no data", self.status),
		})
	}
}

/// Standard response body shape used by the API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
	/// Human-readable status message.
	pub message: Option<String>,
	/// Payload, when the endpoint returns one.
	pub data: Option<T>,
}
