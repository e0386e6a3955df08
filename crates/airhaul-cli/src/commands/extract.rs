//! Extract command - write stored content to disk

use airhaul_store::{LocalStore, Shutdown, StoreConfig, extract_from_registry};
use console::style;
use std::path::Path;

use crate::error::Result;

pub async fn run(config: StoreConfig, reference: &str, dir: &Path, shutdown: &Shutdown) -> Result<()> {
    let mut store = LocalStore::new(config);
    let extracted = extract_from_registry(&mut store, reference, dir, shutdown).await?;

    for file in &extracted.files {
        println!("  {} {}", style("✓").green(), file.display());
    }
    println!(
        "{} Extracted {} to {}",
        style("✓").green().bold(),
        extracted.reference,
        dir.display()
    );

    Ok(())
}
