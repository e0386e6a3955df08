//! Sync command - rebuild the store from content files

use airhaul_collection::CollectionContext;
use airhaul_repo::{HttpClient, HttpConfig};
use airhaul_store::{LocalStore, Shutdown, StoreConfig, Syncer};
use console::style;
use std::path::PathBuf;

use crate::error::Result;

pub async fn run(config: StoreConfig, files: &[PathBuf], shutdown: &Shutdown) -> Result<()> {
    let http = HttpClient::new(HttpConfig::default())?;
    let ctx = CollectionContext::new(http);

    let mut store = LocalStore::new(config);
    let report = Syncer::new(&mut store, ctx)
        .with_shutdown(shutdown.clone())
        .sync_files(files)
        .await?;

    println!(
        "{} Synced {} document(s), {} artifact(s) into {}",
        style("✓").green().bold(),
        report.documents,
        report.artifacts,
        store.data_dir().display()
    );
    if !report.warnings.is_empty() {
        println!(
            "  {} {} warning(s), see log output",
            style("!").yellow(),
            report.warnings.len()
        );
    }

    Ok(())
}
