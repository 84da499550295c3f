//! Bearer tokens cached by the token manager.

// self
use crate::_prelude::*;

/// Redacted bearer token keeping access tokens out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the value of an `Authorization` header.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.0)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Lifecycle status for a cached token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token may be sent.
	Active,
	/// Token reached its expiry instant and must be refreshed.
	Expired,
}

/// Access token plus the instants that bound its validity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CachedToken {
	/// Bearer token.
	pub access_token: AccessToken,
	/// Instant the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
}
impl CachedToken {
	/// Builds a token issued at `issued_at` that lives for `expires_in`.
	pub fn new(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		expires_in: Duration,
	) -> Self {
		Self {
			access_token: AccessToken::new(access_token),
			issued_at,
			expires_at: issued_at + expires_in,
		}
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant < self.expires_at { TokenStatus::Active } else { TokenStatus::Expired }
	}

	/// Returns `true` while `instant < expires_at`.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Time left before expiry, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	#[test]
	fn token_is_usable_strictly_before_expiry() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let token = CachedToken::new("abc", issued, Duration::seconds(7200));

		assert!(token.is_usable_at(issued));
		assert!(token.is_usable_at(issued + Duration::seconds(7199)));
		assert!(!token.is_usable_at(issued + Duration::seconds(7200)));
		assert_eq!(token.status_at(issued + Duration::hours(3)), TokenStatus::Expired);
	}

	#[test]
	fn remaining_time_never_goes_negative() {
		let issued = datetime!(2025-01-01 00:00 UTC);
		let token = CachedToken::new("abc", issued, Duration::seconds(60));

		assert_eq!(token.remaining_at(issued + Duration::seconds(15)), Duration::seconds(45));
		assert_eq!(token.remaining_at(issued + Duration::minutes(5)), Duration::ZERO);
	}

	#[test]
	fn access_token_formatters_redact() {
		let token = AccessToken::new("live-token");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.bearer_header(), "Bearer live-token");
	}
}
