//! File-backed [`SessionStore`] for CLIs and desktop shells that outlive a single process.

// std
use std::{
	fs::{self, File},
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{SessionRecord, SessionStore, StoreError, StoreFuture},
};

/// Persists the cached session to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<SessionRecord>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the snapshot file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Option<SessionRecord>, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(backend_error("read", path)(e)),
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(None);
		}

		serde_json::from_slice(&bytes).map(Some).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		match path.parent().filter(|p| !p.as_os_str().is_empty()) {
			Some(parent) => fs::create_dir_all(parent).map_err(backend_error("create", parent)),
			None => Ok(()),
		}
	}

	// Writes to a sibling temp file first so readers never observe a torn snapshot.
	fn persist(&self, record: &SessionRecord) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let bytes = serde_json::to_vec_pretty(record).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize session: {e}"),
		})?;
		let tmp_path = self.path.with_extension("tmp");
		let mut file = File::create(&tmp_path).map_err(backend_error("create", &tmp_path))?;

		file.write_all(&bytes).map_err(backend_error("write", &tmp_path))?;
		file.sync_all().map_err(backend_error("sync", &tmp_path))?;
		drop(file);

		fs::rename(&tmp_path, &self.path).map_err(backend_error("replace", &self.path))
	}

	fn remove(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.path) {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(backend_error("remove", &self.path)(e)),
			_ => Ok(()),
		}
	}
}
impl SessionStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<SessionRecord>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save(&self, record: SessionRecord) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist(&record)?;
			*guard = Some(record);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.remove()?;
			guard.take();

			Ok(())
		})
	}
}

fn backend_error<'a>(action: &'a str, path: &'a Path) -> impl 'a + FnOnce(io::Error) -> StoreError {
	move |e| StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}
