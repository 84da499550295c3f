//! Mirrors intra projects into a JSON snapshot on disk.
//!
//! ```sh
//! INTRA_UID=u-... INTRA_SECRET=s-... cargo run --example sync_projects -- projects.json
//! ```
//!
//! Pass resource ids after the path to refresh only those projects.

// std
use std::{env, sync::Arc};
// crates.io
use color_eyre::{Result, eyre::eyre};
// self
use intra_sync::{
	auth::Credentials,
	client::ApiClient,
	config::ClientConfig,
	store::{FileStore, ResourceKind, ResourceStore},
	sync::{SyncOutcome, Syncer},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let mut args = env::args().skip(1);
	let path = args.next().ok_or_else(|| eyre!("Usage: sync_projects <snapshot.json> [ids...]"))?;
	let ids = args.map(|id| id.parse::<u64>()).collect::<Result<Vec<_>, _>>()?;
	let config = ClientConfig::new(Credentials::from_env()?);
	let store: Arc<dyn ResourceStore> = Arc::new(FileStore::open(&path)?);
	let syncer = Syncer::new(ApiClient::new(config)?, Arc::clone(&store));
	let report = syncer.sync_resource(ResourceKind::Project, &ids).await?;

	println!(
		"Fetched {} projects over {} pages: {} created, {} updated.",
		report.fetched, report.pages, report.created, report.updated
	);

	if let SyncOutcome::Aborted { page, reason } = &report.outcome {
		println!("Stopped at page {page}: {reason}");
	}

	println!("{} projects stored in {path}.", store.ids(ResourceKind::Project).await?.len());

	Ok(())
}
