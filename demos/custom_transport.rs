//! Runs the API client on top of a hand-written transport instead of reqwest.
//!
//! 1. Implement [`HttpTransport`] so every handle records [`ResponseMetadata`] in the provided
//!    [`ResponseMetadataSlot`].
//! 2. Answer both the token exchange and the resource reads from that one transport.
//! 3. Pass the transport to [`ApiClient::with_http_client`]; failures come back as the crate's
//!    [`Error`] variants.

// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	pin::Pin,
};
// crates.io
use color_eyre::Result;
use time::Duration;
// self
use intra_sync::{
	auth::Credentials,
	client::ApiClient,
	config::ClientConfig,
	error::Error,
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	oauth::oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
	},
};

const TOKEN_BODY: &str =
	r#"{"access_token":"canned-token","token_type":"bearer","expires_in":900}"#;
const PROJECTS_BODY: &str = r#"[{"id":1,"name":"libft"},{"id":2,"name":"get_next_line"}]"#;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let config = ClientConfig::new(Credentials::new("demo-uid", "demo-secret"))
		.with_base_url("https://intra.invalid")
		.with_token_url("https://intra.invalid/oauth/token");
	let client = ApiClient::with_http_client(config.clone(), CannedTransport::Healthy)?;
	let projects = client.get("/v2/projects", [("page", "1")]).await?;

	println!("Projects served by the canned transport: {projects}.");

	match client.get("/v2/cursus", Vec::<(&str, &str)>::new()).await {
		Err(Error::ApiRequest { status, reason, retry_after }) => {
			println!("Resource rejected with {status:?} ({reason}), retry after {retry_after:?}.");
		},
		other => println!("Unexpected cursus result: {other:?}."),
	}

	let offline = ApiClient::with_http_client(config, CannedTransport::Offline)?;

	match offline.get("/v2/projects", Vec::<(&str, &str)>::new()).await {
		Ok(_) => println!("Offline transport unexpectedly answered."),
		Err(e) => println!("Offline transport failed as expected: {e}"),
	}

	Ok(())
}

#[derive(Debug)]
struct LinkDown;
impl Display for LinkDown {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("link down")
	}
}
impl StdError for LinkDown {}

#[derive(Clone, Copy)]
enum CannedTransport {
	Healthy,
	Offline,
}
impl HttpTransport for CannedTransport {
	type Handle = CannedHandle;
	type TransportError = LinkDown;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		CannedHandle { transport: *self, slot }
	}
}

struct CannedHandle {
	transport: CannedTransport,
	slot: ResponseMetadataSlot,
}
impl CannedHandle {
	fn respond(&self, path: &str) -> (StatusCode, &'static str, Option<Duration>) {
		match path {
			"/oauth/token" => (StatusCode::OK, TOKEN_BODY, None),
			"/v2/projects" => (StatusCode::OK, PROJECTS_BODY, None),
			_ => (
				StatusCode::TOO_MANY_REQUESTS,
				r#"{"error":"slow down"}"#,
				Some(Duration::seconds(2)),
			),
		}
	}
}
impl<'c> AsyncHttpClient<'c> for CannedHandle {
	type Error = HttpClientError<LinkDown>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			if let CannedTransport::Offline = self.transport {
				// The `Reqwest` variant carries any boxed transport error.
				return Err(HttpClientError::Reqwest(Box::new(LinkDown)));
			}

			let (status, body, retry_after) = self.respond(request.uri().path());

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after });

			let mut response = HttpResponse::new(body.as_bytes().to_vec());

			*response.status_mut() = status;
			response
				.headers_mut()
				.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

			Ok(response)
		})
	}
}
