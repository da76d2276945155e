//! Periodic sweep-and-flush loop for the cache store
//!
//! Runs as a background task: each tick evicts expired records and writes the
//! surviving map to the storage slot. A shutdown signal triggers one final
//! flush so teardown never loses fresh records.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, error, info, trace};

use super::{CacheStore, StorageSlot};
use crate::errors::CacheError;

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel(1)
}

/// Background maintenance service for one cache store.
pub struct CacheMaintenance {
    cache: Arc<RwLock<CacheStore>>,
    slot: Arc<dyn StorageSlot>,
    ttl: chrono::Duration,
    sweep_interval: Duration,
    shutdown_rx: ShutdownReceiver,
}

impl CacheMaintenance {
    pub fn new(
        cache: Arc<RwLock<CacheStore>>,
        slot: Arc<dyn StorageSlot>,
        ttl: chrono::Duration,
        sweep_interval: Duration,
        shutdown_rx: ShutdownReceiver,
    ) -> Self {
        Self {
            cache,
            slot,
            ttl,
            sweep_interval,
            shutdown_rx,
        }
    }

    /// Run until a shutdown signal arrives.
    ///
    /// The first tick fires immediately, mirroring the sweep-on-startup of
    /// the interval timer this replaces.
    pub async fn run(mut self) {
        info!(
            "Starting cache maintenance (ttl: {}s, interval: {}s)",
            self.ttl.num_seconds(),
            self.sweep_interval.as_secs()
        );
        let mut ticker = interval(self.sweep_interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    trace!("Cache maintenance tick");
                    if let Err(e) = self.sweep_and_flush().await {
                        error!("Cache sweep failed: {}", e);
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    debug!("Cache maintenance shutting down, flushing");
                    if let Err(e) = self.sweep_and_flush().await {
                        error!("Final cache flush failed: {}", e);
                    }
                    break;
                }
            }
        }
    }

    async fn sweep_and_flush(&self) -> Result<(), CacheError> {
        let blob = {
            let mut cache = self.cache.write().await;
            let evicted = cache.sweep(Utc::now(), self.ttl);
            if evicted > 0 {
                debug!("Evicted {} expired place records", evicted);
            }
            cache.serialize()?
        };
        self.slot.store(&blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemorySlot;
    use crate::models::{Coordinate, PlaceRecord};

    #[tokio::test]
    async fn maintenance_flushes_and_evicts() {
        let cache = Arc::new(RwLock::new(CacheStore::new()));
        {
            let mut store = cache.write().await;
            store.put("fresh", PlaceRecord::found(Coordinate { lat: 0.0, lng: 0.0 }, false));
            store.put_at(
                "stale",
                PlaceRecord::not_found(),
                Utc::now() - chrono::Duration::hours(7),
            );
        }
        let slot = Arc::new(MemorySlot::new());
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let service = CacheMaintenance::new(
            Arc::clone(&cache),
            Arc::clone(&slot) as Arc<dyn StorageSlot>,
            chrono::Duration::hours(6),
            Duration::from_millis(10),
            shutdown_rx,
        );
        let handle = tokio::spawn(service.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        assert!(cache.read().await.get("stale").is_none());
        let blob = slot.load().unwrap().expect("blob written");
        let restored = CacheStore::deserialize(&blob);
        assert_eq!(restored.len(), 1);
        assert!(restored.get("fresh").is_some());
    }

    #[tokio::test]
    async fn shutdown_performs_final_flush() {
        let cache = Arc::new(RwLock::new(CacheStore::new()));
        let slot = Arc::new(MemorySlot::new());
        let (shutdown_tx, shutdown_rx) = shutdown_channel();

        let service = CacheMaintenance::new(
            Arc::clone(&cache),
            Arc::clone(&slot) as Arc<dyn StorageSlot>,
            chrono::Duration::hours(6),
            // Long enough that only the startup tick and the shutdown flush run.
            Duration::from_secs(3600),
            shutdown_rx,
        );
        let handle = tokio::spawn(service.run());
        tokio::time::sleep(Duration::from_millis(20)).await;

        cache
            .write()
            .await
            .put("late", PlaceRecord::not_found());
        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();

        let blob = slot.load().unwrap().expect("blob written");
        assert!(CacheStore::deserialize(&blob).get("late").is_some());
    }
}
