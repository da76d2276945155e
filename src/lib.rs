//! placelink: place lookup cache with LZ-compressed persistence
//!
//! Three coupled pieces: a reversible text codec ([`codec`]), a time-evicting
//! cache of place records persisted through it ([`cache`]), and an async
//! lookup layer that serves cached records instantly and coalesces concurrent
//! fetches for the same id ([`lookup`]).

pub mod cache;
pub mod codec;
pub mod config;
pub mod errors;
pub mod lookup;
pub mod models;

pub use cache::{CacheMaintenance, CacheStore, FileSlot, MemorySlot, StorageSlot};
pub use config::Config;
pub use errors::{AppError, AppResult, CacheError, CodecError, LookupError};
pub use lookup::{HttpPlaceSource, LookupCoordinator, PlaceLookup, PlaceSource};
pub use models::{Coordinate, PlaceRecord};
