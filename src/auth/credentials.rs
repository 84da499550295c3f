//! Application credentials exchanged for bearer tokens.

// std
use std::env;
// self
use crate::{_prelude::*, error::ConfigError};

/// Environment variable holding the application UID.
pub const ENV_CLIENT_ID: &str = "INTRA_UID";
/// Environment variable holding the application secret.
pub const ENV_CLIENT_SECRET: &str = "INTRA_SECRET";

/// Client secret issued by the intra application page. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw secret for the token request body.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("ClientSecret(<redacted>)")
	}
}

/// Client id/secret pair used by the client-credentials grant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
	/// Application UID.
	pub client_id: String,
	/// Application secret.
	pub client_secret: ClientSecret,
}
impl Credentials {
	/// Builds credentials from an id/secret pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: ClientSecret::new(client_secret) }
	}

	/// Reads `INTRA_UID` and `INTRA_SECRET`.
	///
	/// Meant for binaries wiring up a client; nothing inside the crate calls it.
	pub fn from_env() -> Result<Self, ConfigError> {
		let read = |name: &'static str| {
			env::var(name)
				.ok()
				.filter(|value| !value.is_empty())
				.ok_or(ConfigError::MissingEnv { name })
		};

		Ok(Self::new(read(ENV_CLIENT_ID)?, read(ENV_CLIENT_SECRET)?))
	}
}
impl Debug for Credentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}
