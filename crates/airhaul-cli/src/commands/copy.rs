//! Copy command - push stored content to a registry

use airhaul_store::{CopyOptions, LocalStore, Shutdown, StoreConfig, copy_to_registry};
use console::style;

use crate::error::Result;

pub async fn run(
    config: StoreConfig,
    registry: &str,
    options: &CopyOptions,
    shutdown: &Shutdown,
) -> Result<()> {
    let mut store = LocalStore::new(config);
    let copied = copy_to_registry(&mut store, registry, options, shutdown).await?;

    for artifact in &copied {
        println!("  {} {}", style("✓").green(), artifact.destination);
    }
    println!(
        "{} Copied {} reference(s) to {}",
        style("✓").green().bold(),
        copied.len(),
        registry
    );

    Ok(())
}
