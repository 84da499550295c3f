// self
use crate::{_prelude::*, obs::RequestKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedRequest<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedRequest<F> = F;

/// A span builder used around outbound requests.
#[derive(Clone, Debug)]
pub struct RequestSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl RequestSpan {
	/// Creates a new span tagged with the provided request kind + stage.
	pub fn new(kind: RequestKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("intra_sync.request", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedRequest<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// A new token was stored. Only the expiry is logged.
pub fn token_refreshed(expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(%expires_at, "Fetched new access token.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = expires_at;
	}
}

/// A resource endpoint answered.
pub fn response_received(endpoint: &str, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(endpoint, status, "Made request to the intra API.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, status);
	}
}

/// Admission is suspending the caller.
pub fn rate_limit_wait(delay: std::time::Duration) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(?delay, "Request window is full; waiting for a free slot.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = delay;
	}
}

/// A page of remote objects was fetched.
pub fn page_fetched(endpoint: &str, page: u32, count: usize) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(endpoint, page, count, "Obtained objects from API request.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (endpoint, page, count);
	}
}

/// One remote object was written to the store.
pub fn record_upserted(kind: &str, intra_id: u64, created: bool) {
	#[cfg(feature = "tracing")]
	{
		if created {
			tracing::info!(kind, intra_id, "Created new record.");
		} else {
			tracing::info!(kind, intra_id, "Refreshed record.");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, intra_id, created);
	}
}

/// A synchronization run stopped early.
pub fn sync_aborted(kind: &str, page: u32, error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(kind, page, %error, "Error on intra API request; aborting sync.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, page, error);
	}
}
