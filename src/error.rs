//! Crate-level error types shared by the token manager, API client, and synchronizer.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, IO) before any HTTP response was received.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Token endpoint rejected the client credentials.
	#[error("Authentication failed: {reason}.")]
	Authentication {
		/// Provider-supplied error description.
		reason: String,
	},
	/// Admission was denied because the request window is full and blocking is disabled.
	#[error("Rate limit of {capacity} requests per second exceeded.")]
	RateLimitExceeded {
		/// Configured window capacity.
		capacity: NonZeroU32,
		/// Time until the earliest slot frees up, when known.
		retry_after: Option<Duration>,
	},
	/// Resource endpoint answered with a non-200 status or an undecodable body.
	#[error("API request failed: {reason}.")]
	ApiRequest {
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Best-effort human-readable reason.
		reason: String,
		/// Retry-After hint sent with the response.
		retry_after: Option<Duration>,
	},
	/// Token endpoint answered 200 with a body that is not a token response.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// A JSON payload could not be decoded into the requested type.
	#[error("Failed to decode API payload at `{}`.", .source.path())]
	Decode {
		/// Structured decoding failure including the failing path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl Error {
	/// Builds an [`Error::ApiRequest`] from a status code and reason.
	pub fn api_request(status: Option<u16>, reason: impl Into<String>) -> Self {
		Self::ApiRequest { status, reason: reason.into(), retry_after: None }
	}

	/// Returns `true` for failures a page loop may log and abort on instead of propagating.
	pub fn is_request_failure(&self) -> bool {
		matches!(
			self,
			Self::ApiRequest { .. }
				| Self::RateLimitExceeded { .. }
				| Self::Transport(_)
				| Self::Decode { .. }
		)
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured or derived URL is invalid.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Bearer token contains bytes that cannot be placed in a header.
	#[error("Access token cannot be encoded as an Authorization header.")]
	InvalidHeader,
	/// Environment variable required by [`crate::auth::Credentials::from_env`] is missing.
	#[error("Environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: &'static str,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Id filters are limited to a single page.
	#[error("At most {max} ids can be filtered at once, got {count}.")]
	TooManyIds {
		/// Number of ids supplied.
		count: usize,
		/// Maximum accepted.
		max: usize,
	},
}
impl ConfigError {
	/// Wraps a URL parsing failure together with the offending text.
	pub fn invalid_url(url: impl Into<String>, source: url::ParseError) -> Self {
		Self::InvalidUrl { url: url.into(), source }
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
	/// Transport failed without a structured error.
	#[error("HTTP client error occurred while calling the API: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn request_failures_are_classified_for_page_loops() {
		assert!(Error::api_request(Some(404), "not found").is_request_failure());
		assert!(
			Error::RateLimitExceeded { capacity: NonZeroU32::MIN, retry_after: None }
				.is_request_failure()
		);
		assert!(!Error::Authentication { reason: "invalid_client".into() }.is_request_failure());
		assert!(!Error::from(ConfigError::MissingExpiresIn).is_request_failure());
	}

	#[test]
	fn messages_carry_provider_reasons() {
		let err = Error::Authentication { reason: "invalid_client".into() };

		assert_eq!(err.to_string(), "Authentication failed: invalid_client.");

		let err = Error::api_request(Some(404), "not found");

		assert_eq!(err.to_string(), "API request failed: not found.");
	}
}
