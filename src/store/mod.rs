pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::store::PriceStore;
use disk::FjallStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::warn;

/// Opens the durable store under the configured data directory.
///
/// Falls back to a process-local store when the directory cannot be resolved
/// or opened, so pricing keeps working without persistence.
pub fn open_store(config: &AppConfig) -> Arc<dyn PriceStore> {
    let opened = config
        .data_dir()
        .and_then(|path| FjallStore::open(path.join("prices")));

    match opened {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "Falling back to in-memory price store");
            Arc::new(MemoryStore::new())
        }
    }
}
