//! Error handling for placelink

pub mod types;

pub use types::{AppError, CacheError, CodecError, LookupError};

/// Convenience result alias for fallible library operations
pub type AppResult<T> = Result<T, AppError>;
