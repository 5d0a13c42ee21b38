//! Session-aware REST client for the task tracker API: cookie sessions, deduplicated
//! refresh-and-retry, and typed task endpoints in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

#[macro_use]
mod macros;

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod model;
pub mod obs;
pub mod request;
pub mod store;
pub mod surface;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::{HashSet, VecDeque},
		sync::atomic::{AtomicBool, Ordering},
	};
	// crates.io
	use async_lock::MutexGuardArc;
	// self
	use crate::{
		client::ApiClient,
		config::ClientConfig,
		error::TransportError,
		http::{ApiHttpClient, HttpFuture},
		model::{UserId, UserProfile},
		request::{ApiRequest, ApiResponse, Method, MultipartForm},
		store::MemoryStore,
		surface::{MemoryNavigator, MemoryNotifier},
	};

	/// Client type alias used by scripted-transport tests.
	pub type ScriptedTestClient = ApiClient<ScriptedHttpClient>;

	/// Collaborators wired into a test client so assertions can inspect side effects.
	#[derive(Clone, Debug)]
	pub struct TestHarness {
		/// Session cache backing the client.
		pub store: Arc<MemoryStore>,
		/// Notice sink backing the client.
		pub notifier: Arc<MemoryNotifier>,
		/// Navigator backing the client.
		pub navigator: Arc<MemoryNavigator>,
	}
	impl TestHarness {
		/// Creates a harness whose navigator starts at `location`.
		pub fn at(location: &str) -> Self {
			Self {
				store: Default::default(),
				notifier: Default::default(),
				navigator: Arc::new(MemoryNavigator::new(location)),
			}
		}

		/// Attaches the harness collaborators to `client`.
		pub fn attach<C>(&self, client: ApiClient<C>) -> ApiClient<C>
		where
			C: ?Sized + ApiHttpClient,
		{
			client
				.with_store(self.store.clone())
				.with_notifier(self.notifier.clone())
				.with_navigator(self.navigator.clone())
		}
	}

	/// Call observed by [`ScriptedHttpClient`].
	#[derive(Clone, Debug, PartialEq)]
	pub struct RecordedCall {
		/// HTTP method of the call.
		pub method: Method,
		/// Request path as issued by the caller.
		pub path: String,
		/// JSON body, if any.
		pub body: Option<serde_json::Value>,
		/// Multipart body, if any.
		pub form: Option<MultipartForm>,
		/// Whether the call was a replay.
		pub retried: bool,
	}

	/// In-process transport that emulates a cookie session for coordinator tests.
	///
	/// Every non-refresh call answers 401 until a refresh succeeds; afterwards calls answer
	/// 200 with `{"data":{"path":..}}` unless a path is scripted otherwise. Refresh calls wait
	/// on a gate so tests can park a refresh mid-flight; an unreachable refresh path fails
	/// before reaching the gate.
	#[derive(Debug)]
	pub struct ScriptedHttpClient {
		refresh_path: String,
		session_valid: AtomicBool,
		refresh_statuses: Mutex<VecDeque<u16>>,
		refresh_gate: Arc<AsyncMutex<()>>,
		stubborn_paths: Mutex<HashSet<String>>,
		failing_paths: Mutex<HashMap<String, u16>>,
		unreachable_paths: Mutex<HashSet<String>>,
		payloads: Mutex<HashMap<String, serde_json::Value>>,
		calls: Mutex<Vec<RecordedCall>>,
	}
	impl ScriptedHttpClient {
		/// Creates a transport with an expired session that treats `refresh_path` as the
		/// refresh endpoint.
		pub fn new(refresh_path: impl Into<String>) -> Self {
			Self {
				refresh_path: refresh_path.into(),
				session_valid: AtomicBool::new(false),
				refresh_statuses: Default::default(),
				refresh_gate: Default::default(),
				stubborn_paths: Default::default(),
				failing_paths: Default::default(),
				unreachable_paths: Default::default(),
				payloads: Default::default(),
				calls: Default::default(),
			}
		}

		/// Queues the status returned by the next refresh call (defaults to 200).
		pub fn script_refresh(&self, status: u16) -> &Self {
			self.refresh_statuses.lock().push_back(status);

			self
		}

		/// Makes `path` answer 401 even with a valid session.
		pub fn always_unauthorized(&self, path: &str) -> &Self {
			self.stubborn_paths.lock().insert(path.to_owned());

			self
		}

		/// Makes `path` answer `status` once the session is valid.
		pub fn fail_with(&self, path: &str, status: u16) -> &Self {
			self.failing_paths.lock().insert(path.to_owned(), status);

			self
		}

		/// Makes `path` fail without a response.
		pub fn unreachable(&self, path: &str) -> &Self {
			self.unreachable_paths.lock().insert(path.to_owned());

			self
		}

		/// Makes `path` answer 200 with `{"data": data}` once the session is valid.
		pub fn respond_with(&self, path: &str, data: serde_json::Value) -> &Self {
			self.payloads.lock().insert(path.to_owned(), data);

			self
		}

		/// Marks the session as valid without a refresh.
		pub fn authenticate(&self) {
			self.session_valid.store(true, Ordering::SeqCst);
		}

		/// Holds the refresh gate; refresh calls stay in flight until the guard drops.
		pub fn hold_refresh(&self) -> MutexGuardArc<()> {
			self.refresh_gate
				.try_lock_arc()
				.expect("Refresh gate should not already be held by another test step.")
		}

		/// Returns every call observed so far.
		pub fn calls(&self) -> Vec<RecordedCall> {
			self.calls.lock().clone()
		}

		/// Returns the calls that hit `path`.
		pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
			self.calls().into_iter().filter(|call| call.path == path).collect()
		}

		/// Returns how many refresh calls reached the transport.
		pub fn refresh_calls(&self) -> usize {
			self.calls_to(&self.refresh_path).len()
		}

		async fn answer(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
			self.calls.lock().push(RecordedCall {
				method: request.method,
				path: request.path.clone(),
				body: request.json_body().cloned(),
				form: request.form().cloned(),
				retried: request.is_retried(),
			});

			if self.unreachable_paths.lock().contains(&request.path) {
				return Err(TransportError::Timeout);
			}
			if request.path == self.refresh_path {
				let _open = self.refresh_gate.lock().await;
				let status = self.refresh_statuses.lock().pop_front().unwrap_or(200);

				if (200..300).contains(&status) {
					self.session_valid.store(true, Ordering::SeqCst);
				}

				return Ok(json_response(status, serde_json::json!({ "message": "refresh" })));
			}
			if !self.session_valid.load(Ordering::SeqCst)
				|| self.stubborn_paths.lock().contains(&request.path)
			{
				return Ok(json_response(401, serde_json::json!({ "message": "Unauthorized" })));
			}
			if let Some(status) = self.failing_paths.lock().get(&request.path).copied() {
				return Ok(json_response(status, serde_json::json!({ "message": "scripted" })));
			}
			if let Some(data) = self.payloads.lock().get(&request.path).cloned() {
				return Ok(json_response(200, serde_json::json!({ "data": data })));
			}

			Ok(json_response(200, serde_json::json!({ "data": { "path": request.path } })))
		}
	}
	impl ApiHttpClient for ScriptedHttpClient {
		fn execute<'a>(&'a self, _url: Url, request: &'a ApiRequest) -> HttpFuture<'a> {
			Box::pin(self.answer(request))
		}
	}

	/// Builds a scripted client plus the harness that records its side effects.
	pub fn build_scripted_test_client(
		location: &str,
	) -> (ScriptedTestClient, Arc<ScriptedHttpClient>, TestHarness) {
		let config = ClientConfig::builder(
			Url::parse("http://tasktrack.test").expect("Fixture base URL should parse."),
		)
		.build()
		.expect("Fixture configuration should be valid.");
		let http = Arc::new(ScriptedHttpClient::new(config.endpoints.refresh.clone()));
		let harness = TestHarness::at(location);
		let client = harness.attach(ApiClient::with_http_client(config, http.clone()));

		(client, http, harness)
	}

	/// Profile fixture used to seed session caches.
	pub fn sample_profile() -> UserProfile {
		UserProfile {
			id: Some(UserId::new("65f1c2a9e4b0").expect("Fixture user id should be valid.")),
			fullname: "Ada Lovelace".into(),
			username: "ada".into(),
			email: "ada@example.com".into(),
			timezone: Some("Europe/London".into()),
			profile_picture_url: None,
		}
	}

	fn json_response(status: u16, body: serde_json::Value) -> ApiResponse {
		ApiResponse::new(status, body.to_string().into_bytes())
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use thiserror::Error as ThisError;
	pub use time::{Date, Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
