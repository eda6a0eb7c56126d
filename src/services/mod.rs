//! Storage collaborators and the delivery service built on top of them.

pub mod blob_store;
pub mod media_service;
pub mod metadata_store;
pub mod range;

use bytes::Bytes;
use futures::Stream;
use std::{io, pin::Pin};
use thiserror::Error;

/// Stream of blob bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("blob `{0}` is missing")]
    BlobMissing(String),
    #[error("invalid stored name")]
    InvalidName,
    #[error("payload exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("store unhealthy: {0}")]
    Unhealthy(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
