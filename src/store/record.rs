//! Local records mirrored from the intra API.

// self
use crate::_prelude::*;

/// Remote resource families the synchronizer knows how to mirror.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
	/// `/v2/projects`
	Project,
	/// `/v2/skills`
	Skill,
	/// `/v2/cursus`
	Cursus,
	/// `/v2/users`
	User,
}
impl ResourceKind {
	/// Every kind, in sync order.
	pub const ALL: [Self; 4] = [Self::Project, Self::Skill, Self::Cursus, Self::User];

	/// Returns a stable label suitable for logs and file snapshots.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Project => "project",
			Self::Skill => "skill",
			Self::Cursus => "cursus",
			Self::User => "user",
		}
	}

	/// API path listing resources of this kind.
	pub const fn endpoint(self) -> &'static str {
		match self {
			Self::Project => "/v2/projects",
			Self::Skill => "/v2/skills",
			Self::Cursus => "/v2/cursus",
			Self::User => "/v2/users",
		}
	}
}
impl Display for ResourceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for ResourceKind {
	type Err = UnknownResourceKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| UnknownResourceKind(s.to_owned()))
	}
}

/// Returned when parsing a [`ResourceKind`] from an unknown label.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown resource kind `{0}`.")]
pub struct UnknownResourceKind(pub String);

/// A 42 project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
	/// Remote identifier.
	pub intra_id: u64,
	/// Display name, at most 50 characters.
	pub name: String,
	/// Description captured when the project was first mirrored.
	pub description: String,
	/// Whether the project is an exam.
	pub exam: bool,
}

/// A skill attached to projects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
	/// Remote identifier.
	pub intra_id: u64,
	/// Display name, at most 100 characters.
	pub name: String,
}

/// A cursus (curriculum).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursus {
	/// Remote identifier.
	pub intra_id: u64,
	/// Display name, at most 50 characters.
	pub name: String,
	/// Cursus category, at most 50 characters.
	pub kind: String,
}

/// A student profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	/// Remote identifier.
	pub intra_id: u64,
	/// Intra login.
	pub login: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Contact address.
	pub email: String,
	/// API URL of the profile.
	pub url: String,
	/// Profile picture, when one is set.
	pub image_url: Option<String>,
}
impl User {
	/// Creates a placeholder user that later user syncs will fill in.
	pub fn new(intra_id: u64, login: impl Into<String>) -> Self {
		Self {
			intra_id,
			login: login.into(),
			first_name: String::new(),
			last_name: String::new(),
			email: String::new(),
			url: String::new(),
			image_url: None,
		}
	}
}

/// Any stored record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "resource", rename_all = "snake_case")]
pub enum Record {
	/// See [`Project`].
	Project(Project),
	/// See [`Skill`].
	Skill(Skill),
	/// See [`Cursus`].
	Cursus(Cursus),
	/// See [`User`].
	User(User),
}
impl Record {
	/// Kind of the wrapped record.
	pub fn kind(&self) -> ResourceKind {
		match self {
			Self::Project(_) => ResourceKind::Project,
			Self::Skill(_) => ResourceKind::Skill,
			Self::Cursus(_) => ResourceKind::Cursus,
			Self::User(_) => ResourceKind::User,
		}
	}

	/// Remote identifier of the wrapped record.
	pub fn intra_id(&self) -> u64 {
		match self {
			Self::Project(project) => project.intra_id,
			Self::Skill(skill) => skill.intra_id,
			Self::Cursus(cursus) => cursus.intra_id,
			Self::User(user) => user.intra_id,
		}
	}
}
