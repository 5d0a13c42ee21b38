//! User-facing collaborators the client reports to: a notice sink and a navigator.
//!
//! The client never renders anything itself. Embedding applications implement [`Notifier`]
//! (toasts, status bars, stderr) and [`Navigator`] (router, window location) and inject them
//! into [`ApiClient`](crate::client::ApiClient).

// self
use crate::_prelude::*;

/// User-facing notice emitted by the client.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notice {
	/// The session could not be refreshed; the user must log in again.
	SessionExpired,
	/// HTTP 403.
	Forbidden,
	/// HTTP 404.
	NotFound,
	/// HTTP 5xx.
	ServerError,
	/// Any other failure status, carrying the server message when one was supplied.
	Message(String),
	/// No response was received.
	NoResponse,
}
impl Notice {
	/// Fallback text for statuses without a dedicated notice or server message.
	pub const GENERIC_MESSAGE: &'static str = "An error occurred. Please try again.";

	/// Picks the notice for a failed (non-401) HTTP status.
	pub fn for_status(status: u16, server_message: Option<String>) -> Self {
		match status {
			403 => Self::Forbidden,
			404 => Self::NotFound,
			s if s >= 500 => Self::ServerError,
			_ => Self::Message(server_message.unwrap_or_else(|| Self::GENERIC_MESSAGE.into())),
		}
	}

	/// Text shown to the user.
	pub fn text(&self) -> &str {
		match self {
			Self::SessionExpired => "Session expired. Please log in again.",
			Self::Forbidden => "You don't have permission to perform this action.",
			Self::NotFound => "The requested resource was not found.",
			Self::ServerError => "A server error occurred. Please try again later.",
			Self::Message(message) => message.as_str(),
			Self::NoResponse =>
				"No response received from the server. Please check your connection.",
		}
	}
}
impl Display for Notice {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.text())
	}
}

/// Sink for user-facing notices.
pub trait Notifier
where
	Self: Send + Sync,
{
	/// Surfaces `notice` to the user.
	fn notify(&self, notice: Notice);
}

/// Access to the embedding application's current location.
pub trait Navigator
where
	Self: Send + Sync,
{
	/// Location currently displayed (path plus optional query).
	fn current_location(&self) -> String;

	/// Moves the application to `location`.
	fn navigate(&self, location: &str);
}

/// Notifier that only emits `tracing` events (a no-op without the `tracing` feature).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;
impl Notifier for LogNotifier {
	fn notify(&self, notice: Notice) {
		obs_event!(warn, notice = %notice, "user notice");

		#[cfg(not(feature = "tracing"))]
		{
			let _ = notice;
		}
	}
}

/// Notifier that keeps every notice in memory, for headless front-ends and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier(Mutex<Vec<Notice>>);
impl MemoryNotifier {
	/// Returns the notices emitted so far.
	pub fn notices(&self) -> Vec<Notice> {
		self.0.lock().clone()
	}

	/// Removes and returns the notices emitted so far.
	pub fn drain(&self) -> Vec<Notice> {
		std::mem::take(&mut *self.0.lock())
	}

	/// Counts notices equal to `notice`.
	pub fn count(&self, notice: &Notice) -> usize {
		self.0.lock().iter().filter(|n| *n == notice).count()
	}
}
impl Notifier for MemoryNotifier {
	fn notify(&self, notice: Notice) {
		self.0.lock().push(notice);
	}
}

/// Navigator that tracks the location in memory and records every navigation.
#[derive(Debug)]
pub struct MemoryNavigator {
	location: RwLock<String>,
	history: Mutex<Vec<String>>,
}
impl MemoryNavigator {
	/// Creates a navigator positioned at `location`.
	pub fn new(location: impl Into<String>) -> Self {
		Self { location: RwLock::new(location.into()), history: Default::default() }
	}

	/// Returns every location navigated to, oldest first.
	pub fn history(&self) -> Vec<String> {
		self.history.lock().clone()
	}
}
impl Default for MemoryNavigator {
	fn default() -> Self {
		Self::new("/")
	}
}
impl Navigator for MemoryNavigator {
	fn current_location(&self) -> String {
		self.location.read().clone()
	}

	fn navigate(&self, location: &str) {
		*self.location.write() = location.to_owned();

		self.history.lock().push(location.to_owned());
	}
}
