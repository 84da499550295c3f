//! JSON-file [`ResourceStore`] for small deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{
		self, Record, RecordKey, RecordMap, ResourceKind, ResourceStore, StoreError, StoreFuture,
		UpsertOutcome,
	},
};

/// Persists every record to a JSON array after each mutation.
///
/// Snapshots are written to a sibling `.tmp` file and renamed over the target, so a crash
/// leaves either the previous or the new snapshot on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<RecordMap>>,
}
impl FileStore {
	/// Opens (or creates) a store at `path`, loading an existing snapshot.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let records = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(records)) })
	}

	/// Location of the snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist(&self, records: &RecordMap) -> Result<(), StoreError> {
		let snapshot = records.values().collect::<Vec<_>>();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let tmp_path = self.path.with_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| backend("create", &tmp_path, e))?;

			file.write_all(&serialized).map_err(|e| backend("write", &tmp_path, e))?;
			file.sync_all().map_err(|e| backend("sync", &tmp_path, e))?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| backend("replace", &self.path, e))
	}
}
impl ResourceStore for FileStore {
	fn fetch(&self, kind: ResourceKind, intra_id: u64) -> StoreFuture<'_, Option<Record>> {
		Box::pin(async move {
			let key = RecordKey::new(kind, intra_id);

			Ok(self.inner.read().get(&key).cloned())
		})
	}

	fn upsert(&self, record: Record) -> StoreFuture<'_, UpsertOutcome> {
		Box::pin(async move {
			let key = RecordKey::from(&record);
			let mut guard = self.inner.write();
			let previous = guard.insert(key, record);
			let outcome =
				if previous.is_some() { UpsertOutcome::Updated } else { UpsertOutcome::Created };

			// Memory must keep matching the last snapshot that reached the disk.
			if let Err(e) = self.persist(&guard) {
				match previous {
					Some(previous) => guard.insert(key, previous),
					None => guard.remove(&key),
				};

				return Err(e);
			}

			Ok(outcome)
		})
	}

	fn ids(&self, kind: ResourceKind) -> StoreFuture<'_, Vec<u64>> {
		Box::pin(async move { Ok(store::ids_of(&self.inner.read(), kind)) })
	}
}

fn load_snapshot(path: &Path) -> Result<RecordMap, StoreError> {
	if !path.exists() {
		return Ok(RecordMap::new());
	}

	let bytes = fs::read(path).map_err(|e| backend("read", path, e))?;

	if bytes.iter().all(u8::is_ascii_whitespace) {
		return Ok(RecordMap::new());
	}

	let records: Vec<Record> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(records.into_iter().map(|record| (RecordKey::from(&record), record)).collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| backend("create directory", parent, e))?;
	}

	Ok(())
}

fn backend(action: &str, path: &Path, e: std::io::Error) -> StoreError {
	StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}
