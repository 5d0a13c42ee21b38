//! Session lifecycle: registration, login, logout, and the optimistic session check.
//!
//! Cache mutations are serialized through the client's session guard so a login racing a
//! logout cannot leave a stale profile behind.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	http::ApiHttpClient,
	model::{Credentials, Registration, UserProfile, user::LoginData},
	obs::{CallKind, CallSpan},
	request::ApiRequest,
	store::SessionRecord,
};

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates an account and returns the server's confirmation message.
	///
	/// Registration bypasses session recovery: an anonymous caller has nothing to refresh.
	pub async fn register(&self, registration: &Registration) -> Result<Option<String>> {
		CallSpan::new(CallKind::Session, "register")
			.run(async move {
				let request = ApiRequest::post(self.config.endpoints.register.as_str())
					.with_json(registration)?;
				let envelope = self.send_direct(&request).await?.envelope::<serde_json::Value>()?;

				Ok(envelope.message)
			})
			.await
	}

	/// Signs in and caches the returned profile.
	pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
		CallSpan::new(CallKind::Session, "login")
			.run(async move {
				let request = ApiRequest::post(self.config.endpoints.login.as_str())
					.with_json(credentials)?;
				let _session = self.session_guard.lock().await;
				let LoginData { user } = self.send(request).await?.data()?;

				self.store.save(SessionRecord::new(user.clone())).await?;
				obs_event!(info, username = %user.username, "signed in");

				Ok(user)
			})
			.await
	}

	/// Checks whether the cached session is still accepted by the server.
	///
	/// Without a cached session this answers `false` without touching the network. Otherwise
	/// the profile endpoint is queried (refreshing the session if needed) and the cached
	/// profile is updated. A session the server no longer accepts clears the cache. Any
	/// other API failure answers `false` and keeps the cache; store failures propagate.
	pub async fn is_authenticated(&self) -> Result<bool> {
		let _session = self.session_guard.lock().await;

		if self.store.load().await?.is_none() {
			return Ok(false);
		}

		match self.send(ApiRequest::get(self.config.endpoints.profile.as_str())).await {
			Ok(response) => {
				if let Some(user) = response.envelope::<UserProfile>().ok().and_then(|e| e.data) {
					self.store.save(SessionRecord::new(user)).await?;
				}

				Ok(true)
			},
			Err(e) if e.is_session_expired() => {
				self.store.clear().await?;

				Ok(false)
			},
			Err(e) => {
				obs_event!(debug, error = %e, "session check failed");

				#[cfg(not(feature = "tracing"))]
				let _ = e;

				Ok(false)
			},
		}
	}

	/// Signs out.
	///
	/// The server-side logout is best-effort; whatever it answers, the cache is cleared and
	/// the navigator is sent to the login view.
	pub async fn logout(&self) -> Result<()> {
		CallSpan::new(CallKind::Session, "logout")
			.run(async move {
				let _session = self.session_guard.lock().await;

				if let Err(e) = self.send(ApiRequest::post(self.config.endpoints.logout.as_str())).await
				{
					obs_event!(warn, error = %e, "server-side logout failed");

					#[cfg(not(feature = "tracing"))]
					let _ = e;
				}

				let cleared = self.store.clear().await;

				self.navigator.navigate(&self.config.login_view);

				cleared.map_err(Error::from)
			})
			.await
	}

	/// Returns the cached profile, if a session is believed active.
	pub async fn current_user(&self) -> Result<Option<UserProfile>> {
		Ok(self.store.load().await?.map(|record| record.user))
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, store::SessionStore, surface::Notice};

	async fn seed_session(harness: &TestHarness) {
		harness
			.store
			.save(SessionRecord::new(sample_profile()))
			.await
			.expect("Seeding the memory store should succeed.");
	}

	#[tokio::test]
	async fn session_check_without_cache_stays_offline() {
		let (client, http, _harness) = build_scripted_test_client("/");

		assert!(!client.is_authenticated().await.expect("Session check should not fail."));
		assert!(http.calls().is_empty());
	}

	#[tokio::test]
	async fn session_check_refreshes_the_cached_profile() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.authenticate();

		assert!(client.is_authenticated().await.expect("Session check should not fail."));
		assert_eq!(http.calls_to(&client.config.endpoints.profile).len(), 1);
		assert!(harness.store.snapshot().is_some());
	}

	#[tokio::test]
	async fn session_check_clears_a_rejected_session() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.script_refresh(401);

		assert!(!client.is_authenticated().await.expect("Session check should not fail."));
		assert!(harness.store.snapshot().is_none());
		assert!(
			client.current_user().await.expect("Reading the cache should succeed.").is_none()
		);
	}

	#[tokio::test]
	async fn session_check_keeps_the_cache_on_other_failures() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.authenticate();
		http.fail_with(&client.config.endpoints.profile, 500);

		assert!(!client.is_authenticated().await.expect("Session check should not fail."));
		assert_eq!(
			client.current_user().await.expect("Reading the cache should succeed."),
			Some(sample_profile()),
		);
	}

	#[tokio::test]
	async fn logout_clears_and_redirects_even_when_the_server_is_unreachable() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.unreachable(&client.config.endpoints.logout);

		client.logout().await.expect("Logout should succeed locally.");

		assert!(harness.store.snapshot().is_none());
		assert_eq!(harness.navigator.history(), vec!["/login".to_owned()]);
		assert_eq!(harness.notifier.notices(), vec![Notice::NoResponse]);
	}
}
