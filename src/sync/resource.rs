//! Per-kind upsert handlers mapping remote JSON objects onto local records.

// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	obs,
	store::{Cursus, Project, Record, ResourceKind, ResourceStore, Skill, UpsertOutcome, User},
};

/// Longest project name kept locally.
pub const PROJECT_NAME_MAX: usize = 50;
/// Longest skill name kept locally.
pub const SKILL_NAME_MAX: usize = 100;
/// Longest cursus name and kind kept locally.
pub const CURSUS_FIELD_MAX: usize = 50;

/// Boxed future returned by [`Upsert::upsert`].
///
/// Resolves to `None` when the handler deliberately left the store untouched.
pub type UpsertFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Option<UpsertOutcome>>> + 'a + Send>>;

/// Writes one remote object into a [`ResourceStore`].
pub trait Upsert
where
	Self: Send + Sync,
{
	/// Kind of record this handler produces.
	fn kind(&self) -> ResourceKind;

	/// Decodes `remote` and creates or updates the matching record.
	fn upsert<'a>(&'a self, store: &'a dyn ResourceStore, remote: Value) -> UpsertFuture<'a>;
}

/// Returns the built-in handler for `kind`.
pub fn handler_for(kind: ResourceKind) -> &'static dyn Upsert {
	match kind {
		ResourceKind::Project => &ProjectUpsert,
		ResourceKind::Skill => &SkillUpsert,
		ResourceKind::Cursus => &CursusUpsert,
		ResourceKind::User => &UserUpsert,
	}
}

/// Projects: the description is only taken from the remote on creation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProjectUpsert;
impl Upsert for ProjectUpsert {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Project
	}

	fn upsert<'a>(&'a self, store: &'a dyn ResourceStore, remote: Value) -> UpsertFuture<'a> {
		#[derive(Deserialize)]
		struct RemoteProject {
			id: u64,
			name: String,
			#[serde(default)]
			slug: String,
			#[serde(default)]
			description: Option<String>,
			#[serde(default)]
			exam: bool,
		}

		Box::pin(async move {
			let remote = decode::<RemoteProject>(remote)?;
			let description = match store.fetch(ResourceKind::Project, remote.id).await? {
				Some(Record::Project(existing)) => existing.description,
				_ => remote.description.unwrap_or(remote.slug),
			};
			let record = Project {
				intra_id: remote.id,
				name: truncate(&remote.name, PROJECT_NAME_MAX),
				description,
				exam: remote.exam,
			};

			write(store, Record::Project(record)).await.map(Some)
		})
	}
}

/// Skills: name only.
#[derive(Clone, Copy, Debug, Default)]
pub struct SkillUpsert;
impl Upsert for SkillUpsert {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Skill
	}

	fn upsert<'a>(&'a self, store: &'a dyn ResourceStore, remote: Value) -> UpsertFuture<'a> {
		#[derive(Deserialize)]
		struct RemoteSkill {
			id: u64,
			name: String,
		}

		Box::pin(async move {
			let remote = decode::<RemoteSkill>(remote)?;
			let record =
				Skill { intra_id: remote.id, name: truncate(&remote.name, SKILL_NAME_MAX) };

			write(store, Record::Skill(record)).await.map(Some)
		})
	}
}

/// Cursus: name and kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct CursusUpsert;
impl Upsert for CursusUpsert {
	fn kind(&self) -> ResourceKind {
		ResourceKind::Cursus
	}

	fn upsert<'a>(&'a self, store: &'a dyn ResourceStore, remote: Value) -> UpsertFuture<'a> {
		#[derive(Deserialize)]
		struct RemoteCursus {
			id: u64,
			name: String,
			#[serde(default)]
			kind: String,
		}

		Box::pin(async move {
			let remote = decode::<RemoteCursus>(remote)?;
			let record = Cursus {
				intra_id: remote.id,
				name: truncate(&remote.name, CURSUS_FIELD_MAX),
				kind: truncate(&remote.kind, CURSUS_FIELD_MAX),
			};

			write(store, Record::Cursus(record)).await.map(Some)
		})
	}
}

/// Users: refreshes profile fields of users that are already stored and skips the rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct UserUpsert;
impl Upsert for UserUpsert {
	fn kind(&self) -> ResourceKind {
		ResourceKind::User
	}

	fn upsert<'a>(&'a self, store: &'a dyn ResourceStore, remote: Value) -> UpsertFuture<'a> {
		#[derive(Deserialize)]
		struct RemoteImage {
			#[serde(default)]
			link: Option<String>,
		}
		#[derive(Deserialize)]
		struct RemoteUser {
			id: u64,
			login: String,
			#[serde(default)]
			first_name: String,
			#[serde(default)]
			last_name: String,
			#[serde(default)]
			email: String,
			#[serde(default)]
			url: String,
			#[serde(default)]
			image: Option<RemoteImage>,
		}

		Box::pin(async move {
			let remote = decode::<RemoteUser>(remote)?;

			if store.fetch(ResourceKind::User, remote.id).await?.is_none() {
				return Ok(None);
			}

			let record = User {
				intra_id: remote.id,
				login: remote.login,
				first_name: remote.first_name,
				last_name: remote.last_name,
				email: remote.email,
				url: remote.url,
				image_url: remote.image.and_then(|image| image.link),
			};

			write(store, Record::User(record)).await.map(Some)
		})
	}
}

fn decode<T>(remote: Value) -> Result<T>
where
	T: DeserializeOwned,
{
	serde_path_to_error::deserialize(remote).map_err(|source| Error::Decode { source })
}

async fn write(store: &dyn ResourceStore, record: Record) -> Result<UpsertOutcome> {
	let kind = record.kind();
	let intra_id = record.intra_id();
	let outcome = store.upsert(record).await?;

	obs::record_upserted(kind.as_str(), intra_id, outcome == UpsertOutcome::Created);

	Ok(outcome)
}

fn truncate(value: &str, max_chars: usize) -> String {
	value.chars().take(max_chars).collect()
}
