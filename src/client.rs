//! Authenticated, rate-limited GET requests against the intra API.

// crates.io
use oauth2::http::{
	HeaderValue, Method, Request,
	header::{ACCEPT, AUTHORIZATION},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::ConfigError,
	http::{self, HttpTransport},
	manager::TokenManager,
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// API client backed by the crate's reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient>;

/// GET client that acquires a lease from its [`TokenManager`] before every request.
///
/// Admission blocks by default; set `block_on_limit` in the config or call
/// [`ApiClient::set_block_on_limit`] to fail fast instead. Nothing is retried.
pub struct ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	base_url: String,
	http: Arc<C>,
	tokens: TokenManager<C>,
}
impl<C> ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client whose token and resource requests share `http`.
	pub fn with_http_client(config: ClientConfig, http: impl Into<Arc<C>>) -> Result<Self> {
		let http = http.into();
		let base_url = config.base_endpoint()?.as_str().trim_end_matches('/').to_owned();
		let tokens = TokenManager::build(&config, Arc::clone(&http), true)?;

		Ok(Self { base_url, http, tokens })
	}

	/// Fetches `base_url + endpoint` with the given query parameters and returns the JSON body.
	///
	/// Any status other than `200` becomes [`Error::ApiRequest`] carrying the body's `error`
	/// field (or its text, or the status code); a `200` body that is not JSON becomes
	/// [`Error::ApiRequest`] with the reason `response not JSON`.
	pub async fn get<I, K, V>(&self, endpoint: &str, params: I) -> Result<Value>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		const KIND: RequestKind = RequestKind::Resource;

		let span = RequestSpan::new(KIND, "get");

		obs::record_request_outcome(KIND, RequestOutcome::Attempt);

		let url = self.endpoint_url(endpoint, params)?;
		let result = span.instrument(self.send(endpoint, url)).await;

		obs::record_request_outcome(KIND, RequestOutcome::of(&result));

		result
	}

	/// Like [`ApiClient::get`], then decodes the body into `T`.
	///
	/// Decoding failures report the JSON path that did not match.
	pub async fn get_as<T, I, K, V>(&self, endpoint: &str, params: I) -> Result<T>
	where
		T: DeserializeOwned,
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let value = self.get(endpoint, params).await?;

		serde_path_to_error::deserialize(value).map_err(|source| Error::Decode { source })
	}

	/// Switches between suspending and failing when the request window is full.
	pub fn set_block_on_limit(&self, enabled: bool) {
		self.tokens.set_block_on_limit(enabled);
	}

	/// Token manager guarding every request.
	pub fn token_manager(&self) -> &TokenManager<C> {
		&self.tokens
	}

	/// Resource URL prefix without a trailing slash.
	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	fn endpoint_url<I, K, V>(&self, endpoint: &str, params: I) -> Result<Url>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let raw = format!("{}{endpoint}", self.base_url);
		let mut url = Url::parse(&raw).map_err(|e| ConfigError::invalid_url(raw.as_str(), e))?;
		let mut params = params.into_iter().peekable();

		if params.peek().is_some() {
			url.query_pairs_mut().extend_pairs(params);
		}

		Ok(url)
	}

	async fn send(&self, endpoint: &str, url: Url) -> Result<Value> {
		let lease = self.tokens.acquire_token().await?;
		let mut authorization = HeaderValue::from_str(&lease.access_token().bearer_header())
			.map_err(|_| ConfigError::InvalidHeader)?;

		authorization.set_sensitive(true);

		let request = Request::builder()
			.method(Method::GET)
			.uri(url.as_str())
			.header(AUTHORIZATION, authorization)
			.header(ACCEPT, "application/json")
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		// A transport failure drops the lease here, handing its slot back.
		let (response, meta) = http::execute(self.http.as_ref(), request).await?;

		lease.report_sent();

		let status = response.status().as_u16();

		obs::response_received(endpoint, Some(status));

		if status != 200 {
			return Err(Error::ApiRequest {
				status: Some(status),
				reason: http::error_reason(status, response.body(), "error"),
				retry_after: meta.retry_after,
			});
		}

		serde_json::from_slice(response.body())
			.map_err(|_| Error::api_request(Some(status), "response not JSON"))
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient> {
	/// Creates a client with its own reqwest transport.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::with_http_client(config, ReqwestHttpClient::default())
	}
}
impl<C> Debug for ApiClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.base_url)
			.field("tokens", &self.tokens)
			.finish()
	}
}
