// self
use crate::obs::{LimitMode, RequestKind, RequestOutcome};

/// Records a request outcome via the global metrics recorder (when enabled).
pub fn record_request_outcome(kind: RequestKind, outcome: RequestOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"intra_sync_request_total",
			"kind" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records that admission found the window full.
pub fn record_rate_limited(mode: LimitMode) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("intra_sync_rate_limited_total", "mode" => mode.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = mode;
	}
}
