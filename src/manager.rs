//! Token lifecycle plus request admission.
//!
//! [`TokenManager::acquire_token`] is the only way to obtain a bearer token. It runs validity
//! check, refresh, and rate admission under one async mutex, so concurrent callers trigger at
//! most one refresh and a refresh is always visible to the admission that follows it.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CachedToken},
	config::ClientConfig,
	http::HttpTransport,
	limit::{RateLimitPolicy, RateLimiter, RequestPermit},
	oauth::ClientCredentialsExchange,
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Token manager backed by the crate's reqwest transport.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient>;

/// Bearer token plus a reserved request slot.
///
/// Call [`RequestLease::report_sent`] once the request it was acquired for produced a response;
/// dropping the lease instead returns the slot to the window.
#[derive(Debug)]
pub struct RequestLease {
	access_token: AccessToken,
	permit: RequestPermit,
}
impl RequestLease {
	/// Token to place in the `Authorization` header.
	pub fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	/// Records the request as sent; its slot stays occupied for one second from now.
	pub fn report_sent(self) {
		self.permit.commit();
	}
}

/// Owns the cached token and the request window of one application.
pub struct TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	http: Arc<C>,
	exchange: ClientCredentialsExchange,
	token: AsyncMutex<Option<CachedToken>>,
	limiter: RateLimiter,
}
impl<C> TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a manager that sends token requests through `http`.
	///
	/// Admission does not block unless `config.block_on_limit` says so.
	pub fn with_http_client(config: &ClientConfig, http: impl Into<Arc<C>>) -> Result<Self> {
		Self::build(config, http.into(), false)
	}

	pub(crate) fn build(
		config: &ClientConfig,
		http: Arc<C>,
		block_by_default: bool,
	) -> Result<Self> {
		let token_url = config.token_endpoint()?;
		let exchange = ClientCredentialsExchange::new(&config.credentials, &token_url)?;
		let policy = RateLimitPolicy::new(
			config.requests_per_second,
			config.block_on_limit.unwrap_or(block_by_default),
		);

		Ok(Self {
			http,
			exchange,
			token: AsyncMutex::new(None),
			limiter: RateLimiter::new(policy),
		})
	}

	/// Returns a usable token and reserves a slot for the request it will authorize.
	///
	/// Refreshes the token first when none is cached or the cached one expired. Authentication
	/// failures are returned as-is and never retried. A full window either suspends the caller
	/// or fails with [`Error::RateLimitExceeded`], depending on [`TokenManager::block_on_limit`].
	pub async fn acquire_token(&self) -> Result<RequestLease> {
		let mut cached = self.token.lock().await;
		let access_token = match cached.as_ref() {
			Some(token) if token.is_usable_at(OffsetDateTime::now_utc()) =>
				token.access_token.clone(),
			_ => {
				let token = self.refresh().await?;
				let access_token = token.access_token.clone();

				*cached = Some(token);

				access_token
			},
		};
		// The token lock stays held so admissions are granted in arrival order.
		let permit = self.limiter.admit().await?;

		drop(cached);

		Ok(RequestLease { access_token, permit })
	}

	/// Switches between suspending and failing on a full window for future admissions.
	pub fn set_block_on_limit(&self, enabled: bool) {
		self.limiter.policy().set_block_on_limit(enabled);
	}

	/// Whether a full window suspends the caller.
	pub fn block_on_limit(&self) -> bool {
		self.limiter.policy().block_on_limit()
	}

	/// Requests admitted per rolling second.
	pub fn capacity(&self) -> NonZeroU32 {
		self.limiter.policy().capacity()
	}

	/// Snapshot of the cached token, if any.
	///
	/// Waits for an in-progress acquisition to finish.
	pub async fn cached_token(&self) -> Option<CachedToken> {
		self.token.lock().await.clone()
	}

	/// Drops the cached token so the next acquisition refreshes.
	pub async fn invalidate(&self) {
		self.token.lock().await.take();
	}

	/// Window slots currently occupied, including in-flight reservations.
	pub fn occupied_slots(&self) -> usize {
		self.limiter.occupied()
	}

	async fn refresh(&self) -> Result<CachedToken> {
		const KIND: RequestKind = RequestKind::TokenRefresh;

		let span = RequestSpan::new(KIND, "refresh");

		obs::record_request_outcome(KIND, RequestOutcome::Attempt);

		let result = span.instrument(self.exchange.request(self.http.as_ref())).await;

		obs::record_request_outcome(KIND, RequestOutcome::of(&result));

		if let Ok(token) = &result {
			obs::token_refreshed(token.expires_at);
		}

		result
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient> {
	/// Creates a manager with its own reqwest transport.
	pub fn new(config: &ClientConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
impl<C> Debug for TokenManager<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("capacity", &self.capacity())
			.field("block_on_limit", &self.block_on_limit())
			.finish()
	}
}
