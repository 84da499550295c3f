//! Client-credentials exchange built on the `oauth2` crate.

pub use oauth2;

// crates.io
use oauth2::{
	AccessToken as OAuthAccessToken, AuthType, Client, ClientId, ClientSecret as OAuthClientSecret,
	EndpointNotSet, EndpointSet, HttpClientError, RefreshToken, RequestTokenError, Scope,
	StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{CachedToken, Credentials},
	error::ConfigError,
	http::{self, HttpTransport, ResponseMetadata, ResponseMetadataSlot},
};

type ConfiguredClient = Client<
	BasicErrorResponse,
	IntraTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Successful token endpoint body.
///
/// Only `access_token` and `expires_in` are read; `token_type` defaults to bearer when the
/// endpoint leaves it out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct IntraTokenResponse {
	access_token: OAuthAccessToken,
	#[serde(default = "bearer")]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
}
impl TokenResponse for IntraTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &OAuthAccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<std::time::Duration> {
		self.expires_in.map(std::time::Duration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

/// Prepared client-credentials request for one application.
///
/// The id/secret pair travels in the form body (`client_secret_post`), next to
/// `grant_type=client_credentials`.
pub(crate) struct ClientCredentialsExchange {
	oauth_client: ConfiguredClient,
}
impl ClientCredentialsExchange {
	pub(crate) fn new(credentials: &Credentials, token_url: &Url) -> Result<Self> {
		let token_url = TokenUrl::new(token_url.to_string())
			.map_err(|e| ConfigError::invalid_url(token_url.as_str(), e))?;
		let client_id = ClientId::new(credentials.client_id.clone());
		let oauth_client: ConfiguredClient = Client::new(client_id)
			.set_client_secret(OAuthClientSecret::new(
				credentials.client_secret.expose().to_owned(),
			))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client })
	}

	/// Requests a fresh token and stamps its expiry relative to the response time.
	pub(crate) async fn request<C>(&self, http: &C) -> Result<CachedToken>
	where
		C: ?Sized + HttpTransport,
	{
		let meta = ResponseMetadataSlot::default();
		let handle = http.with_metadata(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;

		map_token_response(response, OffsetDateTime::now_utc())
	}
}

fn map_token_response(
	response: IntraTokenResponse,
	issued_at: OffsetDateTime,
) -> Result<CachedToken> {
	let expires_in = response.expires_in().ok_or(ConfigError::MissingExpiresIn)?.as_secs();
	let expires_in = i64::try_from(expires_in).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

	if expires_in <= 0 {
		return Err(ConfigError::NonPositiveExpiresIn.into());
	}

	Ok(CachedToken::new(
		response.access_token().secret().to_owned(),
		issued_at,
		Duration::seconds(expires_in),
	))
}

fn map_request_error<E>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);
	let rejected = status.filter(|code| *code != 200);

	match err {
		RequestTokenError::ServerResponse(response) => Error::Authentication {
			reason: response
				.error_description()
				.cloned()
				.unwrap_or_else(|| response.error().as_ref().to_owned()),
		},
		RequestTokenError::Request(error) => http::map_client_error(error),
		// Non-200 bodies without an `error` code still carry a usable description.
		RequestTokenError::Parse(source, body) => match rejected {
			Some(code) => Error::Authentication {
				reason: http::error_reason(code, &body, "error_description"),
			},
			None => Error::TokenResponse { source, status },
		},
		RequestTokenError::Other(message) => match rejected {
			Some(code) => Error::Authentication { reason: format!("status code {code}") },
			None => Error::Authentication { reason: message },
		},
	}
}
