//! Thread-safe in-memory [`SessionStore`] implementation.

// self
use crate::{
	_prelude::*,
	store::{SessionRecord, SessionStore, StoreFuture},
};

/// Session cache that lives as long as the process, like browser session storage.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<Option<SessionRecord>>>);
impl MemoryStore {
	/// Returns the cached record without going through the async contract.
	pub fn snapshot(&self) -> Option<SessionRecord> {
		self.0.read().clone()
	}
}
impl SessionStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<SessionRecord>> {
		let record = self.snapshot();

		Box::pin(async move { Ok(record) })
	}

	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		*self.0.write() = Some(record);

		Box::pin(async { Ok(()) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		self.0.write().take();

		Box::pin(async { Ok(()) })
	}
}
