use chrono::Utc;

use crate::cache::{CacheStore, FileBackend};
use crate::config::Config;

fn open_store(config: &Config) -> CacheStore {
    let backend = FileBackend::new(config.cache.resolved_directory());
    CacheStore::with_ttl(
        Box::new(backend),
        chrono::Duration::days(i64::from(config.cache.ttl_days)),
    )
}

pub fn cmd_cache_prune(config: &Config) -> anyhow::Result<()> {
    let removed = open_store(config).prune_expired(Utc::now())?;
    println!(
        "✓ Removed {removed} expired entries from {}",
        config.cache.resolved_directory().display()
    );
    Ok(())
}

pub fn cmd_cache_clear(config: &Config) -> anyhow::Result<()> {
    let removed = open_store(config).clear()?;
    println!(
        "✓ Removed {removed} entries from {}",
        config.cache.resolved_directory().display()
    );
    Ok(())
}
