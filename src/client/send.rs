//! Refresh-and-retry pipeline behind [`ApiClient::send`].
//!
//! A call that comes back 401 (and is neither the refresh call nor a replay) joins the
//! client's refresh cycle. The first such call leads the cycle and POSTs the refresh
//! endpoint; later ones park until the leader settles. A successful refresh lets every
//! participant replay its own call exactly once; a refresh rejected with 401 forces one
//! logout for the whole cycle.

// self
use crate::{
	_prelude::*,
	client::ApiClient,
	coordinator::RefreshRole,
	error::{RefreshError, TransportError, server_message},
	http::ApiHttpClient,
	obs::{CallKind, CallOutcome, CallSpan},
	request::{ApiRequest, ApiResponse},
	surface::Notice,
};

impl<C> ApiClient<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Sends `request`, transparently recovering an expired session at most once.
	///
	/// Returns the response for 2xx statuses. Other statuses surface as [`Error::Http`],
	/// missing responses as [`Error::Network`], and failed session refreshes as
	/// [`Error::Refresh`].
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		CallSpan::new(CallKind::Api, "send").run(self.send_with_recovery(request)).await
	}

	/// Sends `request` once, without session recovery or user notices.
	///
	/// Used for calls that must not trigger a refresh, such as account registration.
	pub async fn send_direct(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let url = self.config.url_for(&request.path)?;
		let response = self.http_client.execute(url, request).await?;

		if response.is_success() {
			Ok(response)
		} else {
			Err(Error::Http { status: response.status, body: response.text() })
		}
	}

	async fn send_with_recovery(&self, mut request: ApiRequest) -> Result<ApiResponse> {
		// A forced logout whose participants were all cancelled is finished by the next call.
		if self.coordinator.logout_pending() {
			self.expire_session().await;
		}

		let mut response = self.dispatch(&request).await?;

		if self.needs_refresh(&request, &response) {
			self.await_refresh().await?;
			request.mark_retried();
			self.coordinator.metrics().record_replay();
			obs_event!(
				debug,
				method = %request.method,
				path = %request.path,
				"replaying call after session refresh"
			);

			let replay = CallSpan::new(CallKind::Replay, "replay");

			replay.attempt();

			let replayed = replay.instrument(self.dispatch(&request)).await;

			replay.settle(match &replayed {
				Ok(response) if response.is_success() => CallOutcome::Success,
				_ => CallOutcome::Failure,
			});

			response = replayed?;
		}

		self.settle(&request, response)
	}

	fn needs_refresh(&self, request: &ApiRequest, response: &ApiResponse) -> bool {
		response.status == 401
			&& !request.is_retried()
			&& !self.config.is_refresh_path(&request.path)
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let url = self.config.url_for(&request.path)?;

		self.http_client.execute(url, request).await.map_err(|e| {
			obs_event!(
				warn,
				method = %request.method,
				path = %request.path,
				error = %e,
				"no response received"
			);
			self.notifier.notify(Notice::NoResponse);

			Error::Network(e)
		})
	}

	fn settle(&self, request: &ApiRequest, response: ApiResponse) -> Result<ApiResponse> {
		if response.is_success() {
			return Ok(response);
		}

		let status = response.status;
		let body = response.text();

		// 401s belong to the refresh cycle; failures during a refresh are left to it.
		if status != 401
			&& !self.config.is_refresh_path(&request.path)
			&& !self.coordinator.in_progress()
		{
			self.notifier.notify(Notice::for_status(status, server_message(&body)));
		}

		Err(Error::Http { status, body })
	}

	async fn await_refresh(&self) -> Result<(), RefreshError> {
		let outcome = match self.coordinator.join() {
			RefreshRole::Leader(ticket) => {
				let outcome = self.refresh_session().await;

				ticket.settle(outcome.clone());

				outcome
			},
			RefreshRole::Waiter(waiter) => waiter.wait().await,
		};

		// Every participant helps sign out, so cancelling any one of them cannot skip it.
		if matches!(&outcome, Err(e) if e.is_session_expired()) {
			self.expire_session().await;
		}

		outcome
	}

	async fn refresh_session(&self) -> Result<(), RefreshError> {
		obs_event!(info, waiting = self.coordinator.waiting(), "refreshing session");

		let result =
			CallSpan::new(CallKind::Refresh, "refresh_session").run(self.post_refresh()).await;

		match &result {
			Ok(()) => {
				obs_event!(info, "session refreshed");
			},
			Err(e) => {
				obs_event!(warn, error = %e, "session refresh failed");

				#[cfg(not(feature = "tracing"))]
				let _ = e;
			},
		}

		result
	}

	async fn post_refresh(&self) -> Result<(), RefreshError> {
		let request = ApiRequest::post(self.config.endpoints.refresh.as_str());
		let url = self.config.url_for(&request.path).map_err(TransportError::network)?;
		let response = self.http_client.execute(url, &request).await?;

		if response.is_success() {
			Ok(())
		} else {
			Err(RefreshError::Rejected { status: response.status })
		}
	}

	// Clearing may run once per participant; the notice and redirect run once per cycle.
	async fn expire_session(&self) {
		if !self.coordinator.logout_pending() {
			return;
		}
		if let Err(e) = self.store.clear().await {
			obs_event!(error, error = %e, "failed to clear the session cache");

			#[cfg(not(feature = "tracing"))]
			let _ = e;
		}
		if !self.coordinator.claim_logout() {
			return;
		}

		let location = self.navigator.current_location();

		if self.config.is_login_view(&location) {
			return;
		}

		obs_event!(warn, from = %location, "session expired; redirecting to the login view");

		self.notifier.notify(Notice::SessionExpired);
		self.navigator.navigate(&self.config.login_view);
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use tokio::time;
	// self
	use super::*;
	use crate::{
		_preludet::*,
		request::Method,
		store::{MemoryStore, SessionRecord, SessionStore, StoreFuture},
	};

	// Parks every `clear` on a gate so tests can cancel a participant mid-logout.
	#[derive(Debug, Default)]
	struct GatedClearStore {
		inner: MemoryStore,
		gate: Arc<AsyncMutex<()>>,
		clears: AtomicUsize,
	}
	impl GatedClearStore {
		fn clears(&self) -> usize {
			self.clears.load(Ordering::SeqCst)
		}
	}
	impl SessionStore for GatedClearStore {
		fn load(&self) -> StoreFuture<'_, Option<SessionRecord>> {
			self.inner.load()
		}

		fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
			self.inner.save(record)
		}

		fn clear(&self) -> StoreFuture<'_, ()> {
			Box::pin(async move {
				self.clears.fetch_add(1, Ordering::SeqCst);

				let _open = self.gate.lock().await;

				self.inner.clear().await
			})
		}
	}

	async fn gated_store() -> Arc<GatedClearStore> {
		let store = Arc::new(GatedClearStore::default());

		store
			.save(SessionRecord::new(sample_profile()))
			.await
			.expect("Seeding the gated store should succeed.");

		store
	}

	async fn wait_until(mut condition: impl FnMut() -> bool) {
		time::timeout(StdDuration::from_secs(5), async {
			while !condition() {
				time::sleep(StdDuration::from_millis(5)).await;
			}
		})
		.await
		.expect("Condition should be reached before the test timeout.");
	}

	async fn seed_session(harness: &TestHarness) {
		harness
			.store
			.save(SessionRecord::new(sample_profile()))
			.await
			.expect("Seeding the memory store should succeed.");
	}

	#[tokio::test]
	async fn single_expired_call_is_refreshed_and_replayed_once() {
		let (client, http, harness) = build_scripted_test_client("/activities");
		let response = client
			.send(ApiRequest::get("/api/tasks"))
			.await
			.expect("Call should succeed after the session refresh.");

		assert_eq!(response.status, 200);

		let calls = http.calls();

		assert_eq!(calls.len(), 3);
		assert_eq!((calls[0].path.as_str(), calls[0].retried), ("/api/tasks", false));
		assert_eq!(calls[1].path, client.config.endpoints.refresh);
		assert_eq!((calls[2].path.as_str(), calls[2].retried), ("/api/tasks", true));
		assert_eq!(client.coordinator().metrics().attempts(), 1);
		assert_eq!(client.coordinator().metrics().replays(), 1);
		assert!(harness.notifier.notices().is_empty());
		assert!(!client.coordinator().in_progress());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn concurrent_expired_calls_share_one_refresh() {
		const CALLERS: usize = 5;

		let (client, http, harness) = build_scripted_test_client("/activities");
		let gate = http.hold_refresh();
		let handles = (0..CALLERS)
			.map(|n| {
				let client = client.clone();

				tokio::spawn(async move {
					let request = ApiRequest::post("/api/tasks")
						.with_body(serde_json::json!({ "name": format!("task-{n}") }));

					client.send(request).await
				})
			})
			.collect::<Vec<_>>();

		wait_until(|| client.coordinator().waiting() == CALLERS - 1).await;

		assert_eq!(http.refresh_calls(), 1);

		drop(gate);

		for handle in handles {
			let response = handle
				.await
				.expect("Caller task should not panic.")
				.expect("Every caller should succeed after the shared refresh.");

			assert_eq!(response.status, 200);
		}

		assert_eq!(http.refresh_calls(), 1);
		assert_eq!(client.coordinator().metrics().attempts(), 1);
		assert_eq!(client.coordinator().metrics().queued(), (CALLERS - 1) as u64);
		assert_eq!(client.coordinator().metrics().replays(), CALLERS as u64);

		for n in 0..CALLERS {
			let body = Some(serde_json::json!({ "name": format!("task-{n}") }));
			let issued = http
				.calls_to("/api/tasks")
				.into_iter()
				.filter(|call| call.body == body)
				.collect::<Vec<_>>();

			assert_eq!(issued.len(), 2, "Caller {n} should be issued once and replayed once.");
			assert!(!issued[0].retried);
			assert!(issued[1].retried);
			assert_eq!(issued[0].method, Method::Post);
			assert_eq!(issued[1].method, Method::Post);
		}

		assert!(harness.notifier.notices().is_empty());
	}

	#[tokio::test]
	async fn replayed_call_is_never_refreshed_twice() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		http.always_unauthorized("/api/users/me");

		let err = client
			.send(ApiRequest::get("/api/users/me"))
			.await
			.expect_err("A replay that is still unauthorized should fail.");

		assert!(matches!(err, Error::Http { status: 401, .. }));
		assert_eq!(http.calls_to("/api/users/me").len(), 2);
		assert_eq!(http.refresh_calls(), 1);
		assert!(harness.notifier.notices().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn rejected_refresh_logs_out_once_for_the_whole_wave() {
		const CALLERS: usize = 3;

		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.script_refresh(401);

		let gate = http.hold_refresh();
		let handles = (0..CALLERS)
			.map(|n| {
				let client = client.clone();

				tokio::spawn(async move { client.send(ApiRequest::get(format!("/api/c{n}"))).await })
			})
			.collect::<Vec<_>>();

		wait_until(|| client.coordinator().waiting() == CALLERS - 1).await;
		drop(gate);

		for handle in handles {
			let err = handle
				.await
				.expect("Caller task should not panic.")
				.expect_err("Every caller should observe the refresh failure.");

			assert!(matches!(err, Error::Refresh(RefreshError::Rejected { status: 401 })));
			assert!(err.is_session_expired());
		}

		assert_eq!(http.refresh_calls(), 1);
		assert!(harness.store.snapshot().is_none());
		assert_eq!(harness.notifier.notices(), vec![Notice::SessionExpired]);
		assert_eq!(harness.navigator.history(), vec!["/login".to_owned()]);

		for n in 0..CALLERS {
			assert_eq!(http.calls_to(&format!("/api/c{n}")).len(), 1);
		}
	}

	#[tokio::test]
	async fn other_refresh_failures_propagate_without_logout() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		seed_session(&harness).await;
		http.script_refresh(503);

		let err = client
			.send(ApiRequest::get("/api/tasks"))
			.await
			.expect_err("A failed refresh should fail the call.");

		assert!(matches!(err, Error::Refresh(RefreshError::Rejected { status: 503 })));
		assert!(!err.is_session_expired());
		assert!(harness.store.snapshot().is_some());
		assert!(harness.notifier.notices().is_empty());
		assert!(harness.navigator.history().is_empty());
		assert!(!client.coordinator().in_progress());

		// The next expired call starts a new cycle, which succeeds by default.
		client
			.send(ApiRequest::get("/api/tasks"))
			.await
			.expect("A later refresh should recover the session.");

		assert_eq!(http.refresh_calls(), 2);
		assert_eq!(client.coordinator().metrics().failures(), 1);
		assert_eq!(client.coordinator().metrics().successes(), 1);
	}

	#[tokio::test]
	async fn unreachable_refresh_is_not_a_logout() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		http.unreachable(&client.config.endpoints.refresh);

		let err = client
			.send(ApiRequest::get("/api/tasks"))
			.await
			.expect_err("An unanswered refresh should fail the call.");

		assert!(matches!(err, Error::Refresh(RefreshError::Unreachable { .. })));
		assert!(harness.navigator.history().is_empty());
		assert!(harness.notifier.notices().is_empty());
	}

	#[tokio::test]
	async fn no_redirect_when_already_on_the_login_view() {
		let (client, http, harness) = build_scripted_test_client("/login?next=/activities");

		seed_session(&harness).await;
		http.script_refresh(401);

		let err = client
			.send(ApiRequest::get("/api/users/me"))
			.await
			.expect_err("A rejected refresh should fail the call.");

		assert!(err.is_session_expired());
		assert!(harness.store.snapshot().is_none());
		assert!(harness.notifier.notices().is_empty());
		assert!(harness.navigator.history().is_empty());
	}

	#[tokio::test]
	async fn failure_statuses_map_to_notices() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		http.authenticate();
		http.fail_with("/forbidden", 403)
			.fail_with("/missing", 404)
			.fail_with("/broken", 500)
			.fail_with("/invalid", 422);

		for path in ["/forbidden", "/missing", "/broken", "/invalid"] {
			let err = client.send(ApiRequest::get(path)).await.expect_err("Call should fail.");

			assert!(matches!(err, Error::Http { .. }));
		}

		let err = client.send(ApiRequest::get("/invalid")).await.expect_err("Call should fail.");

		assert_eq!(err.status(), Some(422));
		assert_eq!(err.message().as_deref(), Some("scripted"));
		assert_eq!(
			harness.notifier.drain(),
			vec![
				Notice::Forbidden,
				Notice::NotFound,
				Notice::ServerError,
				Notice::Message("scripted".into()),
				Notice::Message("scripted".into()),
			],
		);
		assert_eq!(http.refresh_calls(), 0);
	}

	#[tokio::test]
	async fn missing_responses_notify_once() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		http.unreachable("/api/tasks");

		let err = client
			.send(ApiRequest::get("/api/tasks"))
			.await
			.expect_err("An unanswered call should fail.");

		assert!(matches!(err, Error::Network(TransportError::Timeout)));
		assert_eq!(harness.notifier.notices(), vec![Notice::NoResponse]);
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn failure_notices_are_suppressed_while_refreshing() {
		let (client, http, harness) = build_scripted_test_client("/activities");

		http.authenticate();
		http.always_unauthorized("/api/a").fail_with("/api/b", 500);

		let gate = http.hold_refresh();
		let leader = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/a")).await })
		};

		wait_until(|| http.refresh_calls() == 1).await;

		let err = client.send(ApiRequest::get("/api/b")).await.expect_err("Call should fail.");

		assert_eq!(err.status(), Some(500));

		drop(gate);

		let err = leader
			.await
			.expect("Leader task should not panic.")
			.expect_err("Stubborn path should stay unauthorized.");

		assert_eq!(err.status(), Some(401));
		assert!(harness.notifier.notices().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn dropped_leader_releases_waiters_with_abandoned() {
		let (client, http, _harness) = build_scripted_test_client("/activities");
		let gate = http.hold_refresh();
		let leader = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/a")).await })
		};

		wait_until(|| http.refresh_calls() == 1).await;

		let waiter = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/b")).await })
		};

		wait_until(|| client.coordinator().waiting() == 1).await;
		leader.abort();

		assert!(leader.await.expect_err("Leader should be cancelled.").is_cancelled());

		let err = waiter
			.await
			.expect("Waiter task should not panic.")
			.expect_err("Waiter should observe the abandoned refresh.");

		assert!(matches!(err, Error::Refresh(RefreshError::Abandoned)));
		assert!(!client.coordinator().in_progress());

		drop(gate);
	}

	#[tokio::test]
	async fn direct_calls_skip_recovery_and_notices() {
		let (client, http, harness) = build_scripted_test_client("/register");
		let err = client
			.send_direct(&ApiRequest::post("/api/auth/register"))
			.await
			.expect_err("Unauthenticated direct calls should fail.");

		assert_eq!(err.status(), Some(401));
		assert_eq!(http.refresh_calls(), 0);
		assert!(harness.notifier.notices().is_empty());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn cancelled_leader_still_signs_out_once() {
		let (client, http, harness) = build_scripted_test_client("/activities");
		let store = gated_store().await;
		let client = client.with_store(store.clone());

		http.script_refresh(401);

		let refresh_gate = http.hold_refresh();
		let clear_gate =
			store.gate.try_lock_arc().expect("Clear gate should be free before the test starts.");
		let leader = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/a")).await })
		};

		wait_until(|| http.refresh_calls() == 1).await;

		let waiter = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/b")).await })
		};

		wait_until(|| client.coordinator().waiting() == 1).await;
		drop(refresh_gate);

		// Both participants are now parked inside the cache clear.
		wait_until(|| store.clears() == 2).await;
		leader.abort();

		assert!(leader.await.expect_err("Leader should be cancelled.").is_cancelled());

		drop(clear_gate);

		let err = waiter
			.await
			.expect("Waiter task should not panic.")
			.expect_err("Waiter should observe the rejected refresh.");

		assert!(err.is_session_expired());
		assert!(store.inner.snapshot().is_none());
		assert_eq!(harness.notifier.notices(), vec![Notice::SessionExpired]);
		assert_eq!(harness.navigator.history(), vec!["/login".to_owned()]);
		assert!(!client.coordinator().logout_pending());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn next_call_finishes_an_interrupted_logout() {
		let (client, http, harness) = build_scripted_test_client("/activities");
		let store = gated_store().await;
		let client = client.with_store(store.clone());

		http.script_refresh(401);

		let clear_gate =
			store.gate.try_lock_arc().expect("Clear gate should be free before the test starts.");
		let leader = {
			let client = client.clone();

			tokio::spawn(async move { client.send(ApiRequest::get("/api/a")).await })
		};

		wait_until(|| store.clears() == 1).await;
		leader.abort();

		assert!(leader.await.expect_err("Leader should be cancelled.").is_cancelled());

		drop(clear_gate);

		assert!(client.coordinator().logout_pending());
		assert!(store.inner.snapshot().is_some());
		assert!(harness.notifier.notices().is_empty());

		http.authenticate();

		let response = client
			.send(ApiRequest::get("/api/b"))
			.await
			.expect("The next call should succeed once the logout is finished.");

		assert_eq!(response.status, 200);
		assert_eq!(store.clears(), 2);
		assert!(store.inner.snapshot().is_none());
		assert_eq!(harness.notifier.notices(), vec![Notice::SessionExpired]);
		assert_eq!(harness.navigator.history(), vec!["/login".to_owned()]);
		assert!(!client.coordinator().logout_pending());
		assert_eq!(http.refresh_calls(), 1);
	}
}
