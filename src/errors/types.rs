//! Error type definitions for the placelink library
//!
//! This module defines all error types used throughout the library,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;

/// Top-level application error type
///
/// This enum represents all possible errors that can occur in the library.
/// It uses `thiserror` to provide automatic error trait implementations and
/// proper error chaining.
#[derive(Error, Debug)]
pub enum AppError {
    /// Codec errors (malformed compressed data)
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Cache store and persistence errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Remote lookup errors
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Errors produced while decoding a compressed symbol stream
///
/// Compression itself cannot fail; every error here comes from feeding the
/// decoder data it did not produce (corruption, truncation, or foreign data).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The symbol stream ended before the end-of-stream code was reached
    #[error("compressed stream truncated before end-of-stream marker")]
    Truncated,

    /// A dictionary code beyond the current dictionary size was read
    #[error("invalid dictionary code {code}")]
    InvalidCode { code: usize },

    /// An input character is not part of the output alphabet
    #[error("symbol {symbol:?} is not part of the output alphabet")]
    InvalidSymbol { symbol: char },

    /// The decompressed code units do not form valid UTF-16
    #[error("decompressed data is not valid UTF-16")]
    InvalidText,
}

/// Cache persistence errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage slot read/write failures
    #[error("Storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// Data serialization/deserialization failures
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Compressed blob decode failures
    #[error("Codec failed: {0}")]
    Codec(#[from] CodecError),
}

/// Remote lookup specific errors
///
/// Carried as string payloads (rather than wrapping `reqwest::Error`) so one
/// failure can be cloned out to every caller coalesced on the same fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The remote source answered with a non-success HTTP status
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    /// Network-level failure reaching the remote source
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The response body could not be parsed
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The fetch did not complete within the configured timeout
    #[error("Lookup timed out for place id {id}")]
    Timeout { id: String },
}

impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl LookupError {
    /// Create an HTTP status error
    pub fn http<M: Into<String>>(status: u16, message: M) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Classify a `reqwest` failure for a given place id
    pub fn from_request(id: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout { id: id.to_string() }
        } else if error.is_decode() {
            Self::parse(error.to_string())
        } else {
            Self::transport(error.to_string())
        }
    }
}
