//! Rate-limited, token-refreshing client for the 42 intra API, plus a paginated synchronizer
//! that mirrors projects, skills, cursus, and users into an upsert-by-id store.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod limit;
pub mod manager;
pub mod oauth;
pub mod obs;
pub mod store;
pub mod sync;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credentials,
		client::ApiClient,
		config::ClientConfig,
		http::ReqwestHttpClient,
		store::{MemoryStore, ResourceStore},
		sync::Syncer,
	};

	/// Client id used by the test helpers.
	pub const TEST_CLIENT_ID: &str = "test-uid";
	/// Client secret used by the test helpers.
	pub const TEST_CLIENT_SECRET: &str = "test-secret";

	/// Builds a config whose token and resource endpoints both live under `base`
	/// (typically `httpmock::MockServer::base_url`).
	pub fn test_config(base: &str) -> ClientConfig {
		let base_url = Url::parse(base).expect("Mock server base URL should parse.");
		let token_url = base_url.join("/oauth/token").expect("Mock token URL should parse.");

		ClientConfig::new(Credentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET))
			.with_base_url(base_url)
			.with_token_url(token_url)
	}

	/// Constructs an [`ApiClient`] against `base` with the given request budget.
	pub fn build_test_client(base: &str, requests_per_second: u32) -> ApiClient<ReqwestHttpClient> {
		let config = test_config(base).with_requests_per_second(
			NonZeroU32::new(requests_per_second).expect("Test request budget must be non-zero."),
		);

		ApiClient::new(config).expect("Test API client should build.")
	}

	/// Builds a [`Syncer`] backed by a fresh in-memory store.
	pub fn build_test_syncer(
		base: &str,
		requests_per_second: u32,
	) -> (Syncer<ReqwestHttpClient>, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn ResourceStore> = store_backend.clone();
		let syncer = Syncer::new(build_test_client(base, requests_per_second), store);

		(syncer, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, VecDeque},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		num::NonZeroU32,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
