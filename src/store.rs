//! Upsert-by-id storage contract for mirrored intra resources, plus the built-in backends.

pub mod file;
pub mod memory;
pub mod record;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use record::*;

// self
use crate::_prelude::*;

/// Boxed future returned by [`ResourceStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend keyed by `(kind, intra_id)`.
pub trait ResourceStore
where
	Self: Send + Sync,
{
	/// Fetches the record of `kind` with the given remote id, if present.
	fn fetch(&self, kind: ResourceKind, intra_id: u64) -> StoreFuture<'_, Option<Record>>;

	/// Inserts `record` or replaces the stored record with the same key.
	fn upsert(&self, record: Record) -> StoreFuture<'_, UpsertOutcome>;

	/// Remote ids of every stored record of `kind`, in ascending order.
	fn ids(&self, kind: ResourceKind) -> StoreFuture<'_, Vec<u64>>;
}

/// Whether an upsert inserted a new record or replaced an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
	/// No record with the key existed.
	Created,
	/// An existing record was replaced.
	Updated,
}

/// Error type produced by [`ResourceStore`] implementations.
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

/// Unique key of a stored record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
	/// Resource kind.
	pub kind: ResourceKind,
	/// Remote identifier.
	pub intra_id: u64,
}
impl RecordKey {
	/// Builds a key from its parts.
	pub fn new(kind: ResourceKind, intra_id: u64) -> Self {
		Self { kind, intra_id }
	}
}
impl From<&Record> for RecordKey {
	fn from(record: &Record) -> Self {
		Self::new(record.kind(), record.intra_id())
	}
}

/// Ordered map shared by the built-in backends.
pub(crate) type RecordMap = BTreeMap<RecordKey, Record>;

pub(crate) fn upsert_into(map: &mut RecordMap, record: Record) -> UpsertOutcome {
	match map.insert(RecordKey::from(&record), record) {
		Some(_) => UpsertOutcome::Updated,
		None => UpsertOutcome::Created,
	}
}

pub(crate) fn ids_of(map: &RecordMap, kind: ResourceKind) -> Vec<u64> {
	map.keys().filter(|key| key.kind == kind).map(|key| key.intra_id).collect()
}
