//! Explicit client configuration passed at construction.
//!
//! Nothing in the crate reads process-wide state; callers assemble a [`ClientConfig`] (by hand,
//! from a deserialized file, or with [`Credentials::from_env`]) and hand it to the client.

// self
use crate::{_prelude::*, auth::Credentials, error::ConfigError};

/// Root of the public API.
pub const DEFAULT_BASE_URL: &str = "https://api.intra.42.fr";
/// Client-credentials token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.intra.42.fr/oauth/token";
/// Requests admitted per rolling second when nothing else is configured.
pub const DEFAULT_REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(2) {
	Some(value) => value,
	None => unreachable!(),
};

/// Settings consumed by [`crate::manager::TokenManager`] and [`crate::client::ApiClient`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Application credentials.
	pub credentials: Credentials,
	/// Prefix joined with every resource endpoint.
	#[serde(default = "default_base_url")]
	pub base_url: String,
	/// Token endpoint for the client-credentials grant.
	#[serde(default = "default_token_url")]
	pub token_url: String,
	/// Window capacity: requests admitted per rolling second.
	#[serde(default = "default_requests_per_second")]
	pub requests_per_second: NonZeroU32,
	/// Whether a saturated window suspends the caller instead of failing.
	///
	/// Unset means non-blocking for a bare [`crate::manager::TokenManager`] and blocking for an
	/// [`crate::client::ApiClient`].
	#[serde(default)]
	pub block_on_limit: Option<bool>,
}
impl ClientConfig {
	/// Creates a config with default endpoints, two requests per second, and the owner's default
	/// blocking behavior.
	pub fn new(credentials: Credentials) -> Self {
		Self {
			credentials,
			base_url: default_base_url(),
			token_url: default_token_url(),
			requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
			block_on_limit: None,
		}
	}

	/// Overrides the resource URL prefix.
	pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();

		self
	}

	/// Overrides the token endpoint.
	pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
		self.token_url = url.into();

		self
	}

	/// Overrides the window capacity.
	pub fn with_requests_per_second(mut self, capacity: NonZeroU32) -> Self {
		self.requests_per_second = capacity;

		self
	}

	/// Overrides the blocking behavior.
	pub fn with_block_on_limit(mut self, enabled: bool) -> Self {
		self.block_on_limit = Some(enabled);

		self
	}

	/// Parses and returns the token endpoint.
	pub fn token_endpoint(&self) -> Result<Url, ConfigError> {
		Url::parse(&self.token_url).map_err(|e| ConfigError::invalid_url(&self.token_url, e))
	}

	/// Parses and returns the resource URL prefix.
	pub fn base_endpoint(&self) -> Result<Url, ConfigError> {
		let trimmed = self.base_url.trim_end_matches('/');

		Url::parse(trimmed).map_err(|e| ConfigError::invalid_url(trimmed, e))
	}
}

fn default_base_url() -> String {
	DEFAULT_BASE_URL.into()
}

fn default_token_url() -> String {
	DEFAULT_TOKEN_URL.into()
}

fn default_requests_per_second() -> NonZeroU32 {
	DEFAULT_REQUESTS_PER_SECOND
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_the_public_api() {
		let config = ClientConfig::new(Credentials::new("uid", "secret"));

		assert_eq!(config.requests_per_second.get(), 2);
		assert_eq!(config.block_on_limit, None);
		assert_eq!(
			config.token_endpoint().expect("Default token URL should parse.").as_str(),
			DEFAULT_TOKEN_URL,
		);
	}

	#[test]
	fn deserializes_with_defaults() {
		let config: ClientConfig = serde_json::from_str(
			r#"{"credentials":{"client_id":"uid","client_secret":"secret"},"block_on_limit":true}"#,
		)
		.expect("Minimal config should deserialize.");

		assert_eq!(config.base_url, DEFAULT_BASE_URL);
		assert_eq!(config.requests_per_second, DEFAULT_REQUESTS_PER_SECOND);
		assert_eq!(config.block_on_limit, Some(true));
	}

	#[test]
	fn rejects_zero_capacity_and_bad_urls() {
		assert!(
			serde_json::from_str::<ClientConfig>(
				r#"{"credentials":{"client_id":"uid","client_secret":"secret"},"requests_per_second":0}"#,
			)
			.is_err()
		);

		let config =
			ClientConfig::new(Credentials::new("uid", "secret")).with_base_url("not a url");

		assert!(matches!(config.base_endpoint(), Err(ConfigError::InvalidUrl { .. })));
	}

	#[test]
	fn base_endpoint_parses_host_roots() {
		let config = ClientConfig::new(Credentials::new("uid", "secret"))
			.with_base_url("http://127.0.0.1:8080/");

		assert_eq!(
			config.base_endpoint().expect("Base URL should parse.").as_str(),
			"http://127.0.0.1:8080/",
		);
	}
}
