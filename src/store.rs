//! Session cache contracts and built-in backends.
//!
//! The cache is a denormalized hint ("a session is believed active" plus the last-known
//! profile) used for optimistic decisions. The server's cookie session stays the source of
//! truth; the client clears the cache whenever the server says the session is gone.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, model::UserProfile};

/// Boxed future returned by [`SessionStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by session caches.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns the cached session, if any.
	fn load(&self) -> StoreFuture<'_, Option<SessionRecord>>;

	/// Persists or replaces the cached session.
	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()>;

	/// Drops the cached session. Clearing an empty cache succeeds.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Cached view of the signed-in session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
	/// Last-known profile of the signed-in user.
	pub user: UserProfile,
	/// When the record was written.
	pub saved_at: OffsetDateTime,
}
impl SessionRecord {
	/// Creates a record stamped with the current time.
	pub fn new(user: UserProfile) -> Self {
		Self { user, saved_at: OffsetDateTime::now_utc() }
	}

	/// Age of the record at `instant`.
	pub fn age_at(&self, instant: OffsetDateTime) -> Duration {
		instant - self.saved_at
	}
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
