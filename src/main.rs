use std::env;
use std::sync::Arc;

use anyhow::Context;
use nodescan::{MemoryNodeStore, NodescanConfig, Searcher};
use tracing_subscriber::EnvFilter;

const SAMPLE_NOTES: &[(&str, &str)] = &[
    ("groceries", "Buy oat milk, eggs and [fresh basil](https://market.example/basil)"),
    ("travel", "Renew the passport before the Lisbon trip"),
    ("work", "Finish the quarterly report for the finance team"),
    ("photos", "Passport photos at the pharmacy on Friday"),
    ("garden", "Water the tomato plants and repot the basil"),
];

/// Usage: `nodescan [--config <file.yaml>] [query...]`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).peekable();
    let config = match args.peek().map(String::as_str) {
        Some("--config") => {
            args.next();
            let path = args.next().context("--config needs a file path")?;
            NodescanConfig::from_file(&path)
                .with_context(|| format!("loading config from {path}"))?
        }
        _ => NodescanConfig::default(),
    };
    let query = args.collect::<Vec<_>>().join(" ");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let store = Arc::new(MemoryNodeStore::default());
    let searcher = Searcher::new(store.clone(), &config)?;
    for (id, text) in SAMPLE_NOTES {
        searcher.index_document(id, text).await?;
    }
    tracing::info!(notes = store.len(), "indexed sample notes");

    let query = if query.is_empty() { "basil".to_string() } else { query };
    let mut handle = searcher.search(&query);
    handle.set_near_bottom(true);
    let state = handle.settled().await?;

    println!("query {query:?} ({state:?}):");
    for record in handle.results() {
        println!("  {}  created {}", record.id, record.created_at.to_rfc3339());
    }
    Ok(())
}
