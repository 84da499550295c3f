//! Paginated synchronization of intra resources into a [`ResourceStore`].
//!
//! [`Syncer::sync`] walks an endpoint page by page with a fixed page size and stops at the first
//! short page. Request failures end the run early with [`SyncOutcome::Aborted`] in the returned
//! report; authentication, configuration, and storage failures are returned as errors.

pub mod resource;

pub use resource::*;

// std
use std::collections::BTreeSet;
// self
use crate::{
	_prelude::*,
	client::ApiClient,
	error::ConfigError,
	http::HttpTransport,
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	store::{ResourceKind, ResourceStore, UpsertOutcome},
};

/// Largest id list accepted by a single `filter[id]` query.
pub const MAX_FILTER_IDS: usize = 100;
/// Page size requested when nothing else is configured.
pub const DEFAULT_PER_PAGE: NonZeroU32 = match NonZeroU32::new(100) {
	Some(value) => value,
	None => unreachable!(),
};

/// Paging parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
	/// Objects requested per page.
	pub per_page: NonZeroU32,
	/// Number of the first page requested.
	pub first_page: u32,
}
impl Default for SyncOptions {
	fn default() -> Self {
		Self { per_page: DEFAULT_PER_PAGE, first_page: 1 }
	}
}

/// How a run ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
	/// Every page was processed.
	Completed,
	/// A request failed; pages before `page` were processed.
	Aborted {
		/// Page (or user batch) whose request failed.
		page: u32,
		/// Error message of the failure.
		reason: String,
	},
}

/// Summary of one synchronization run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
	/// Kind of record the run produced.
	pub kind: ResourceKind,
	/// Endpoint that was walked.
	pub endpoint: String,
	/// Pages (or user batches) fetched successfully.
	pub pages: u32,
	/// Objects returned by the API.
	pub fetched: usize,
	/// Records inserted.
	pub created: usize,
	/// Records replaced.
	pub updated: usize,
	/// Objects the handler chose not to store.
	pub skipped: usize,
	/// Final state of the run.
	pub outcome: SyncOutcome,
}
impl SyncReport {
	fn new(kind: ResourceKind, endpoint: &str) -> Self {
		Self {
			kind,
			endpoint: endpoint.to_owned(),
			pages: 0,
			fetched: 0,
			created: 0,
			updated: 0,
			skipped: 0,
			outcome: SyncOutcome::Completed,
		}
	}

	/// Whether the run processed every page.
	pub fn is_completed(&self) -> bool {
		matches!(self.outcome, SyncOutcome::Completed)
	}

	fn count(&mut self, outcome: Option<UpsertOutcome>) {
		match outcome {
			Some(UpsertOutcome::Created) => self.created += 1,
			Some(UpsertOutcome::Updated) => self.updated += 1,
			None => self.skipped += 1,
		}
	}

	// Request failures end the run; everything else is the caller's problem.
	fn abort(mut self, page: u32, error: Error) -> Result<Self> {
		if !error.is_request_failure() {
			return Err(error);
		}

		obs::sync_aborted(self.kind.as_str(), page, &error);

		self.outcome = SyncOutcome::Aborted { page, reason: error.to_string() };

		Ok(self)
	}
}

/// Mirrors intra resources into a store through an [`ApiClient`].
pub struct Syncer<C>
where
	C: ?Sized + HttpTransport,
{
	client: ApiClient<C>,
	store: Arc<dyn ResourceStore>,
	options: SyncOptions,
}
impl<C> Syncer<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a syncer with default paging.
	pub fn new(client: ApiClient<C>, store: Arc<dyn ResourceStore>) -> Self {
		Self { client, store, options: SyncOptions::default() }
	}

	/// Overrides the paging parameters.
	pub fn with_options(mut self, options: SyncOptions) -> Self {
		self.options = options;

		self
	}

	/// Client used for every request.
	pub fn client(&self) -> &ApiClient<C> {
		&self.client
	}

	/// Store receiving the records.
	pub fn store(&self) -> &Arc<dyn ResourceStore> {
		&self.store
	}

	/// Walks `endpoint` and feeds every returned object to `handler`.
	///
	/// With a non-empty `ids` list only those objects are requested, in a single page.
	pub async fn sync(
		&self,
		endpoint: &str,
		handler: &dyn Upsert,
		ids: &[u64],
	) -> Result<SyncReport> {
		if ids.len() > MAX_FILTER_IDS {
			return Err(ConfigError::TooManyIds { count: ids.len(), max: MAX_FILTER_IDS }.into());
		}

		let per_page = self.options.per_page.get();
		let per_page_len = usize::try_from(per_page).unwrap_or(usize::MAX);
		let filter = (!ids.is_empty()).then(|| join_ids(ids));
		let mut report = SyncReport::new(handler.kind(), endpoint);
		let mut page = self.options.first_page;

		loop {
			let mut params = vec![("per_page", per_page.to_string()), ("page", page.to_string())];

			if let Some(filter) = &filter {
				params.push(("filter[id]", filter.clone()));
			}

			let objects = match self.fetch_page(endpoint, page, params).await {
				Ok(objects) => objects,
				Err(e) => return report.abort(page, e),
			};
			let returned = objects.len();

			report.pages += 1;
			report.fetched += returned;

			for object in objects {
				match handler.upsert(self.store.as_ref(), object).await {
					Ok(outcome) => report.count(outcome),
					Err(e) => return report.abort(page, e),
				}
			}

			if filter.is_some() || returned < per_page_len {
				break;
			}

			page += 1;
		}

		Ok(report)
	}

	/// Synchronizes one resource kind with its built-in handler.
	///
	/// [`ResourceKind::User`] goes through [`Syncer::sync_users`].
	pub async fn sync_resource(&self, kind: ResourceKind, ids: &[u64]) -> Result<SyncReport> {
		match kind {
			ResourceKind::User => self.sync_users(ids).await,
			kind => self.sync(kind.endpoint(), resource::handler_for(kind), ids).await,
		}
	}

	/// Refreshes users that already exist in the store.
	///
	/// Known users (restricted to `ids` when non-empty) are requested in batches of
	/// [`MAX_FILTER_IDS`] through `filter[id]`; users the store does not know are never created.
	pub async fn sync_users(&self, ids: &[u64]) -> Result<SyncReport> {
		let endpoint = ResourceKind::User.endpoint();
		let known = self.store.ids(ResourceKind::User).await?;
		let targets = if ids.is_empty() {
			known
		} else {
			let requested = ids.iter().copied().collect::<BTreeSet<_>>();

			known.into_iter().filter(|id| requested.contains(id)).collect()
		};
		let mut report = SyncReport::new(ResourceKind::User, endpoint);

		for (batch, chunk) in (1..).zip(targets.chunks(MAX_FILTER_IDS)) {
			let params = vec![
				("per_page", MAX_FILTER_IDS.to_string()),
				("filter[id]", join_ids(chunk)),
			];
			let objects = match self.fetch_page(endpoint, batch, params).await {
				Ok(objects) => objects,
				Err(e) => return report.abort(batch, e),
			};

			report.pages += 1;
			report.fetched += objects.len();

			for object in objects {
				match UserUpsert.upsert(self.store.as_ref(), object).await {
					Ok(outcome) => report.count(outcome),
					Err(e) => return report.abort(batch, e),
				}
			}
		}

		Ok(report)
	}

	async fn fetch_page(
		&self,
		endpoint: &str,
		page: u32,
		params: Vec<(&'static str, String)>,
	) -> Result<Vec<Value>> {
		const KIND: RequestKind = RequestKind::SyncPage;

		let span = RequestSpan::new(KIND, "fetch_page");

		obs::record_request_outcome(KIND, RequestOutcome::Attempt);

		let request = self.client.get_as::<Vec<Value>, _, _, _>(endpoint, params);
		let result = span.instrument(request).await;

		obs::record_request_outcome(KIND, RequestOutcome::of(&result));

		if let Ok(objects) = &result {
			obs::page_fetched(endpoint, page, objects.len());
		}

		result
	}
}
impl<C> Debug for Syncer<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Syncer")
			.field("client", &self.client)
			.field("options", &self.options)
			.finish()
	}
}

fn join_ids(ids: &[u64]) -> String {
	ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn ids_join_with_commas() {
		assert_eq!(join_ids(&[1, 22, 333]), "1,22,333");
		assert_eq!(join_ids(&[]), "");
	}

	#[test]
	fn request_failures_abort_while_others_propagate() {
		let report = SyncReport::new(ResourceKind::Skill, "/v2/skills")
			.abort(3, Error::api_request(Some(500), "boom"))
			.expect("Request failures should produce a report.");

		assert_eq!(
			report.outcome,
			SyncOutcome::Aborted { page: 3, reason: "API request failed: boom.".into() },
		);
		assert!(!report.is_completed());

		let err = SyncReport::new(ResourceKind::Skill, "/v2/skills")
			.abort(1, Error::Authentication { reason: "invalid_client".into() })
			.expect_err("Authentication failures should propagate.");

		assert!(matches!(err, Error::Authentication { .. }));
	}

	#[test]
	fn default_options_request_full_pages_from_page_one() {
		let options = SyncOptions::default();

		assert_eq!(options.per_page.get(), 100);
		assert_eq!(options.first_page, 1);
	}

	#[cfg(feature = "reqwest")]
	#[tokio::test]
	async fn oversized_filters_are_rejected_up_front() {
		let (syncer, store) = crate::_preludet::build_test_syncer("http://127.0.0.1:9", 2);
		let ids = (0..=MAX_FILTER_IDS as u64).collect::<Vec<_>>();
		let err = syncer
			.sync(ResourceKind::Skill.endpoint(), &SkillUpsert, &ids)
			.await
			.expect_err("Too many ids should be rejected.");

		assert!(matches!(
			err,
			Error::Config(ConfigError::TooManyIds { count, max: MAX_FILTER_IDS }) if count == 101
		));
		assert!(store.is_empty());
		assert_eq!(syncer.client().token_manager().occupied_slots(), 0);
	}
}
