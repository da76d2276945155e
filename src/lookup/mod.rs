//! Asynchronous place lookup with request coalescing
//!
//! The coordinator fronts the cache store: a fresh cached record is returned
//! without any outbound call, and a miss triggers exactly one fetch per id no
//! matter how many callers ask concurrently. All callers coalesced on a
//! flight observe the same outcome. Failed fetches are surfaced to those
//! callers and never cached, so a transient outage cannot poison the cache.

pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::cache::CacheStore;
use crate::errors::LookupError;
use crate::models::{Coordinate, PlaceRecord};

pub use http::HttpPlaceSource;

/// Outcome of one remote fetch, before it becomes a cached record.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaceLookup {
    /// The remote source has no entity for the id.
    NotFound,
    /// The remote source located the place.
    Found { location: Coordinate, closed: bool },
}

/// A remote source of place details, keyed by opaque id.
#[async_trait]
pub trait PlaceSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<PlaceLookup, LookupError>;
}

/// Handle to one in-flight fetch, shareable across coalesced callers.
type FlightHandle = Shared<BoxFuture<'static, Result<PlaceRecord, LookupError>>>;

/// Cache-fronting lookup façade.
pub struct LookupCoordinator {
    cache: Arc<RwLock<CacheStore>>,
    source: Arc<dyn PlaceSource>,
    in_flight: Arc<Mutex<HashMap<String, FlightHandle>>>,
    ttl: Duration,
}

impl LookupCoordinator {
    pub fn new(cache: Arc<RwLock<CacheStore>>, source: Arc<dyn PlaceSource>, ttl: Duration) -> Self {
        Self {
            cache,
            source,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Resolve one place id to a record.
    ///
    /// Fast path: a cached record younger than the TTL. Otherwise the call
    /// joins the in-flight fetch for this id, starting one if none exists.
    pub async fn resolve(&self, id: &str) -> Result<PlaceRecord, LookupError> {
        if let Some(record) = self.fresh_record(id).await {
            trace!("Cache hit for place id {}", id);
            return Ok(record);
        }

        let flight = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(id) {
                trace!("Joining in-flight lookup for place id {}", id);
                existing.clone()
            } else {
                // A flight may have completed between the cache check above
                // and taking the lock; its record is authoritative.
                if let Some(record) = self.fresh_record(id).await {
                    return Ok(record);
                }
                let flight = self.start_flight(id.to_string());
                in_flight.insert(id.to_string(), flight.clone());
                flight
            }
        };
        flight.await
    }

    async fn fresh_record(&self, id: &str) -> Option<PlaceRecord> {
        let record = self.cache.read().await.get(id)?;
        if record.is_expired(Utc::now(), self.ttl) {
            None
        } else {
            Some(record)
        }
    }

    /// Build the shared future for one outbound fetch.
    ///
    /// The flight removes itself from the in-flight map once it completes,
    /// whatever the outcome, so a later `resolve` of the same id is free to
    /// fetch again.
    fn start_flight(&self, id: String) -> FlightHandle {
        let source = Arc::clone(&self.source);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            debug!("Fetching place details for id {}", id);
            let outcome = source.fetch(&id).await;
            let result = match outcome {
                Ok(PlaceLookup::Found { location, closed }) => {
                    let record = PlaceRecord::found(location, closed);
                    Ok(cache.write().await.put(&id, record))
                }
                Ok(PlaceLookup::NotFound) => {
                    debug!("No place found for id {}", id);
                    Ok(cache.write().await.put(&id, PlaceRecord::not_found()))
                }
                Err(e) => {
                    debug!("Lookup failed for id {}: {}", id, e);
                    Err(e)
                }
            };
            in_flight.lock().await.remove(&id);
            result
        }
        .boxed()
        .shared()
    }
}
