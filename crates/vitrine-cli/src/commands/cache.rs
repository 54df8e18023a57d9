//! Persisted hint cache maintenance

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use vitrine_core::{CacheStats, Config, FileStore, PersistentCache};

use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct CacheReport {
    location: String,
    key: String,
    ttl_hours: u64,
    #[serde(flatten)]
    stats: CacheStats,
}

fn open_image_cache(config: &Config) -> Result<(FileStore, PersistentCache)> {
    let store = FileStore::new(config.paths.data_dir.clone())?;
    let cache = PersistentCache::open(
        Arc::new(store.clone()),
        config.cache.storage_key("image"),
        config.cache.ttl(),
    )?;
    Ok((store, cache))
}

/// Count the image hints that survive loading (expired ones are dropped).
pub fn stats(config: &Config, format: OutputFormat) -> Result<()> {
    let (store, cache) = open_image_cache(config)?;
    let report = CacheReport {
        location: store.root_dir().display().to_string(),
        key: cache.storage_key().to_string(),
        ttl_hours: config.cache.ttl_hours,
        stats: cache.stats(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("Vitrine Hint Cache");
            println!("==================");
            println!("Location: {}", report.location);
            println!("Key: {}", report.key);
            println!("TTL: {} hours", report.ttl_hours);
            println!("Resolved entries: {}", report.stats.resolved);
        },
    }
    Ok(())
}

/// Remove every persisted image hint.
pub fn clear(config: &Config, format: OutputFormat) -> Result<()> {
    let (_, cache) = open_image_cache(config)?;
    let removed = cache.len();
    cache.clear()?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({ "cleared": removed }))?,
        OutputFormat::Text => {
            let noun = if removed == 1 { "entry" } else { "entries" };
            println!("{} Cleared {removed} cached {noun}", "✓".green());
        },
    }
    Ok(())
}
