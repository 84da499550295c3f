//! Optional observability hooks.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `intra_sync.request` with the `kind` and `stage`
//!   fields, plus events for token refreshes, API responses, rate-limit waits, and upserts.
//! - Enable `metrics` to increment `intra_sync_request_total` (labeled by `kind` + `outcome`)
//!   and `intra_sync_rate_limited_total` (labeled by `mode`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Outbound operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// Client-credentials exchange against the token endpoint.
	TokenRefresh,
	/// Authenticated GET against a resource endpoint.
	Resource,
	/// One page of a synchronization run.
	SyncPage,
}
impl RequestKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::TokenRefresh => "token_refresh",
			RequestKind::Resource => "resource",
			RequestKind::SyncPage => "sync_page",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Operation started.
	Attempt,
	/// Operation completed.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}

	/// Maps a result onto [`RequestOutcome::Success`] or [`RequestOutcome::Failure`].
	pub fn of<T, E>(result: &Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// How a saturated window was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LimitMode {
	/// The caller was suspended until a slot freed up.
	Waited,
	/// The caller received [`Error::RateLimitExceeded`].
	Rejected,
}
impl LimitMode {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LimitMode::Waited => "waited",
			LimitMode::Rejected => "rejected",
		}
	}
}
