//! Info command - list stored references

use airhaul_store::{LocalStore, Store, StoreConfig};
use console::style;
use serde::Serialize;

use crate::error::{CliError, Result};

#[derive(Serialize)]
struct Row {
    reference: String,
    kind: String,
    source: String,
}

pub async fn run(config: StoreConfig, output_json: bool) -> Result<()> {
    let mut store = LocalStore::new(config);
    store.open().await?;
    let rows = rows(&store).await;
    store.close().await?;
    let rows = rows?;

    if output_json {
        let json = serde_json::to_string_pretty(&rows).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    if rows.is_empty() {
        println!("No content in store {}", store.data_dir().display());
        return Ok(());
    }

    println!(
        "{:<60} {:<6} {}",
        style("REFERENCE").bold(),
        style("KIND").bold(),
        style("SOURCE").bold()
    );
    for row in &rows {
        println!("{:<60} {:<6} {}", row.reference, row.kind, row.source);
    }

    Ok(())
}

async fn rows(store: &LocalStore) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for reference in store.list().await? {
        let Some(artifact) = store.get(&reference).await? else {
            continue;
        };
        rows.push(Row {
            reference: reference.to_string(),
            kind: artifact.kind().to_string(),
            source: artifact.source(),
        });
    }
    Ok(rows)
}
