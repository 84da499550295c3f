//! Thread-safe in-memory [`ResourceStore`] implementation for tests and one-off runs.

// self
use crate::{
	_prelude::*,
	store::{
		self, Record, RecordKey, RecordMap, ResourceKind, ResourceStore, StoreFuture, UpsertOutcome,
	},
};

/// Process-local store; clones share the same records.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Arc<RwLock<RecordMap>>);
impl MemoryStore {
	/// Creates a store pre-filled with `records`.
	pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
		let mut map = RecordMap::new();

		for record in records {
			store::upsert_into(&mut map, record);
		}

		Self(Arc::new(RwLock::new(map)))
	}

	/// Number of stored records across all kinds.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Whether the store holds no records.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Copies out every record of `kind`.
	pub fn records(&self, kind: ResourceKind) -> Vec<Record> {
		self.0.read().values().filter(|record| record.kind() == kind).cloned().collect()
	}
}
impl ResourceStore for MemoryStore {
	fn fetch(&self, kind: ResourceKind, intra_id: u64) -> StoreFuture<'_, Option<Record>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&RecordKey::new(kind, intra_id)).cloned()) })
	}

	fn upsert(&self, record: Record) -> StoreFuture<'_, UpsertOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::upsert_into(&mut map.write(), record)) })
	}

	fn ids(&self, kind: ResourceKind) -> StoreFuture<'_, Vec<u64>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(store::ids_of(&map.read(), kind)) })
	}
}
