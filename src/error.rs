//! Error types shared across the storefront backend.
//!
//! Not-found is never an error here: lookups return `Option` / empty
//! collections and deletes return `bool`. These enums cover the failures
//! that must reach the caller.

use thiserror::Error;

/// Failures of the local key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("local store lock poisoned")]
    LockPoisoned,
    #[error("local database error: {0}")]
    Database(String),
    #[error("serialize {key}: {message}")]
    Serialize { key: String, message: String },
}

/// Failures talking to the hosted relational/storage backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Cannot reach remote backend at {0}")]
    Connect(String),
    #[error("Connection to {0} timed out")]
    Timeout(String),
    #[error("Invalid remote backend URL: {0}")]
    InvalidUrl(String),
    #[error("Remote backend error (HTTP {status}): {message}")]
    Status { status: u16, message: String },
    #[error("Invalid JSON from remote backend: {0}")]
    Decode(String),
    #[error("Network error communicating with {url}: {message}")]
    Network { url: String, message: String },
}

/// Local, pre-network rejection of an image upload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Please choose an image file (got {0})")]
    NotAnImage(String),
    #[error("Image is too large ({size} bytes); the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    #[error("Image is empty")]
    Empty,
}

/// Generic failure surfaced by the order and product services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Persistence(e.to_string())
    }
}

impl From<RemoteError> for ServiceError {
    fn from(e: RemoteError) -> Self {
        ServiceError::Persistence(e.to_string())
    }
}

/// Admin gate failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Admin password is not configured")]
    NotConfigured,
    #[error("Incorrect password")]
    InvalidPassword,
    #[error("Too many failed attempts. Try again in {0} minute(s).")]
    LockedOut(i64),
}
