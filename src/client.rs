//! Session-aware API client built on top of the refresh coordinator.
//!
//! [`ApiClient`] owns the transport, the validated configuration, the session cache, and the
//! UI collaborators. Every call funnels through [`ApiClient::send`], which recovers expired
//! sessions transparently; the session and typed API helpers in the submodules are thin
//! wrappers over it.

pub mod api;

mod send;
mod session;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	coordinator::RefreshCoordinator,
	http::ApiHttpClient,
	store::{MemoryStore, SessionStore},
	surface::{LogNotifier, MemoryNavigator, Navigator, Notifier},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// Issues API calls on behalf of one signed-in (or signing-in) user.
///
/// Clones share the transport, the session cache, the collaborators, and the refresh
/// coordinator, so concurrent calls issued from any clone join the same refresh cycle.
pub struct ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP transport used for every outbound call, including the refresh call.
	pub http_client: Arc<C>,
	/// Validated configuration (base URL, timeout, endpoints, login view).
	pub config: ClientConfig,
	/// Session cache cleared whenever the server reports the session gone.
	pub store: Arc<dyn SessionStore>,
	/// Sink for user-facing notices.
	pub notifier: Arc<dyn Notifier>,
	/// Navigator used for forced logouts.
	pub navigator: Arc<dyn Navigator>,
	coordinator: Arc<RefreshCoordinator>,
	session_guard: Arc<AsyncMutex<()>>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a client around a caller-provided transport.
	///
	/// The session cache defaults to a [`MemoryStore`], notices are only logged, and
	/// navigation is tracked in memory. Replace them with the `with_*` methods.
	pub fn with_http_client(config: ClientConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			http_client: http_client.into(),
			config,
			store: Arc::new(MemoryStore::default()),
			notifier: Arc::new(LogNotifier),
			navigator: Arc::new(MemoryNavigator::default()),
			coordinator: Default::default(),
			session_guard: Default::default(),
		}
	}

	/// Replaces the session cache.
	pub fn with_store<S>(mut self, store: Arc<S>) -> Self
	where
		S: 'static + SessionStore,
	{
		self.store = store;

		self
	}

	/// Replaces the notice sink.
	pub fn with_notifier<N>(mut self, notifier: Arc<N>) -> Self
	where
		N: 'static + Notifier,
	{
		self.notifier = notifier;

		self
	}

	/// Replaces the navigator.
	pub fn with_navigator<N>(mut self, navigator: Arc<N>) -> Self
	where
		N: 'static + Navigator,
	{
		self.navigator = navigator;

		self
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client with a cookie-aware reqwest transport built from `config`.
	pub fn new(config: ClientConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::from_config(&config)?;

		Ok(Self::with_http_client(config, http_client))
	}
}
impl<C> Clone for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			config: self.config.clone(),
			store: self.store.clone(),
			notifier: self.notifier.clone(),
			navigator: self.navigator.clone(),
			coordinator: self.coordinator.clone(),
			session_guard: self.session_guard.clone(),
		}
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("refresh_in_progress", &self.coordinator.in_progress())
			.finish()
	}
}
