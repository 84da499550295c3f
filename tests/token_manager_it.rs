// std
use std::{
	error::Error as StdError,
	fmt::{Display, Formatter, Result as FmtResult},
	future::Future,
	num::NonZeroU32,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use tokio::time::Instant;
// self
use intra_sync::{
	auth::Credentials,
	config::ClientConfig,
	error::Error,
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	manager::TokenManager,
	oauth::oauth2::{AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode},
};

const TOKEN_BODY: &str =
	r#"{"access_token":"fake-token","token_type":"bearer","expires_in":7200}"#;
const REJECTED_BODY: &str = r#"{"error":"invalid_client","error_description":"invalid_client"}"#;
const CLIENT_SECRET: &str = "s3cr3t-value";

#[derive(Debug)]
struct FakeTransportError;
impl Display for FakeTransportError {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("connection refused")
	}
}
impl StdError for FakeTransportError {}

#[derive(Default)]
struct FakeState {
	token_calls: AtomicUsize,
	reject_credentials: AtomicBool,
}

#[derive(Clone, Default)]
struct FakeTransport(Arc<FakeState>);
impl FakeTransport {
	fn token_calls(&self) -> usize {
		self.0.token_calls.load(Ordering::SeqCst)
	}
}
impl HttpTransport for FakeTransport {
	type Handle = FakeHandle;
	type TransportError = FakeTransportError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHandle { state: Arc::clone(&self.0), slot }
	}
}

struct FakeHandle {
	state: Arc<FakeState>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for FakeHandle {
	type Error = HttpClientError<FakeTransportError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, _request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();
			self.state.token_calls.fetch_add(1, Ordering::SeqCst);

			let (status, body) = if self.state.reject_credentials.load(Ordering::SeqCst) {
				(StatusCode::UNAUTHORIZED, REJECTED_BODY)
			} else {
				(StatusCode::OK, TOKEN_BODY)
			};

			self.slot.store(ResponseMetadata { status: Some(status.as_u16()), retry_after: None });

			let mut response = HttpResponse::new(body.as_bytes().to_vec());

			*response.status_mut() = status;
			response.headers_mut().insert(
				"content-type",
				"application/json".parse().expect("Static header value should parse."),
			);

			Ok::<_, HttpClientError<FakeTransportError>>(response)
		})
	}
}

fn config(capacity: u32, block_on_limit: bool) -> ClientConfig {
	ClientConfig::new(Credentials::new("uid", CLIENT_SECRET))
		.with_token_url("https://intra.test/oauth/token")
		.with_requests_per_second(NonZeroU32::new(capacity).expect("Capacity must be non-zero."))
		.with_block_on_limit(block_on_limit)
}

fn manager(capacity: u32, block_on_limit: bool) -> (TokenManager<FakeTransport>, FakeTransport) {
	let transport = FakeTransport::default();
	let manager =
		TokenManager::with_http_client(&config(capacity, block_on_limit), transport.clone())
			.expect("Token manager should build.");

	(manager, transport)
}

#[tokio::test(start_paused = true)]
async fn token_is_refreshed_once_within_its_lifetime() {
	let (manager, transport) = manager(100, false);

	for _ in 0..5 {
		let lease = manager.acquire_token().await.expect("Acquisition should succeed.");

		assert_eq!(lease.access_token().expose(), "fake-token");

		lease.report_sent();
	}

	assert_eq!(transport.token_calls(), 1);

	let cached = manager.cached_token().await.expect("Token should be cached.");

	assert_eq!(cached.expires_at - cached.issued_at, time::Duration::hours(2));
}

#[tokio::test(start_paused = true)]
async fn third_admission_fails_without_blocking() {
	let (manager, _) = manager(2, false);

	manager.acquire_token().await.expect("First admission should succeed.").report_sent();
	manager.acquire_token().await.expect("Second admission should succeed.").report_sent();

	match manager.acquire_token().await {
		Err(Error::RateLimitExceeded { capacity, retry_after }) => {
			assert_eq!(capacity.get(), 2);
			assert_eq!(retry_after, Some(time::Duration::seconds(1)));
		},
		other => panic!("Expected a rate limit rejection, got {other:?}."),
	}

	assert_eq!(manager.occupied_slots(), 2);
}

#[tokio::test(start_paused = true)]
async fn third_admission_waits_for_the_earliest_expiry() {
	let (manager, _) = manager(2, true);
	let start = Instant::now();

	manager.acquire_token().await.expect("First admission should succeed.").report_sent();
	tokio::time::advance(Duration::from_millis(250)).await;
	manager.acquire_token().await.expect("Second admission should succeed.").report_sent();

	let third = manager.acquire_token().await.expect("Third admission should wait, then succeed.");

	assert_eq!(start.elapsed(), Duration::from_secs(1));
	assert!(manager.occupied_slots() <= 2);

	third.report_sent();
}

#[tokio::test(start_paused = true)]
async fn blocking_can_be_toggled_at_runtime() {
	let (manager, _) = manager(1, true);

	assert!(manager.block_on_limit());

	manager.acquire_token().await.expect("First admission should succeed.").report_sent();
	manager.set_block_on_limit(false);

	assert!(matches!(manager.acquire_token().await, Err(Error::RateLimitExceeded { .. })));
}

#[tokio::test(start_paused = true)]
async fn unreported_leases_give_their_slot_back() {
	let (manager, _) = manager(1, false);
	let lease = manager.acquire_token().await.expect("First admission should succeed.");

	assert_eq!(manager.occupied_slots(), 1);

	drop(lease);

	assert_eq!(manager.occupied_slots(), 0);

	manager.acquire_token().await.expect("Released slot should be reusable.").report_sent();
}

#[tokio::test(start_paused = true)]
async fn unreported_leases_block_others_for_at_most_one_window() {
	let (manager, _) = manager(1, true);
	let start = Instant::now();
	let hung = manager.acquire_token().await.expect("First admission should succeed.");
	let next = manager.acquire_token().await.expect("Second admission should not wait forever.");

	assert_eq!(start.elapsed(), Duration::from_secs(1));
	assert!(manager.cached_token().await.is_some());

	next.report_sent();
	tokio::time::sleep(Duration::from_secs(30)).await;
	hung.report_sent();
}

#[tokio::test(start_paused = true)]
async fn mixed_window_admits_on_release_before_the_oldest_expiry() {
	let (manager, _) = manager(2, true);
	let manager = Arc::new(manager);
	let start = Instant::now();

	manager.acquire_token().await.expect("First admission should succeed.").report_sent();
	tokio::time::advance(Duration::from_millis(200)).await;

	let in_flight = manager.acquire_token().await.expect("Second admission should succeed.");
	let waiter = {
		let manager = Arc::clone(&manager);

		tokio::spawn(async move {
			let lease = manager.acquire_token().await?;

			lease.report_sent();

			Ok::<_, Error>(Instant::now())
		})
	};

	tokio::time::sleep(Duration::from_millis(300)).await;
	drop(in_flight);

	let admitted_at = waiter
		.await
		.expect("Task should not panic.")
		.expect("Blocked admission should succeed.");

	assert_eq!(admitted_at - start, Duration::from_millis(500));
	assert_eq!(manager.occupied_slots(), 2);
}

#[tokio::test(start_paused = true)]
async fn window_never_exceeds_capacity_under_concurrency() {
	let (manager, transport) = manager(3, true);
	let manager = Arc::new(manager);
	let start = Instant::now();
	let tasks = (0..9)
		.map(|_| {
			let manager = Arc::clone(&manager);

			tokio::spawn(async move {
				let lease = manager.acquire_token().await?;

				assert!(manager.occupied_slots() <= 3);

				lease.report_sent();

				Ok::<_, Error>(())
			})
		})
		.collect::<Vec<_>>();

	for task in tasks {
		task.await.expect("Task should not panic.").expect("Blocking admission should succeed.");
	}

	assert_eq!(transport.token_calls(), 1);
	// Nine requests at three per second need two full windows of waiting.
	assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn rejected_credentials_surface_the_provider_description() {
	let (manager, transport) = manager(2, false);

	transport.0.reject_credentials.store(true, Ordering::SeqCst);

	match manager.acquire_token().await {
		Err(Error::Authentication { reason }) => assert_eq!(reason, "invalid_client"),
		other => panic!("Expected an authentication failure, got {other:?}."),
	}

	assert_eq!(transport.token_calls(), 1);
	assert!(manager.cached_token().await.is_none());
	assert_eq!(manager.occupied_slots(), 0);
}

#[tokio::test(start_paused = true)]
async fn invalidation_forces_a_refresh() {
	let (manager, transport) = manager(10, false);

	manager.acquire_token().await.expect("First acquisition should succeed.").report_sent();
	manager.invalidate().await;
	manager.acquire_token().await.expect("Second acquisition should succeed.").report_sent();

	assert_eq!(transport.token_calls(), 2);
}

#[test]
fn debug_output_hides_credentials() {
	let (manager, _) = manager(2, false);
	let rendered = format!("{manager:?} {:?}", config(2, false));

	assert!(!rendered.contains(CLIENT_SECRET));
	assert!(rendered.contains("capacity"));
}
