//! MediaService: resolves stored media and prepares byte streams for
//! delivery, plus the upload path that creates new records.
//!
//! Every delivery follows the same steps: metadata lookup, blob existence
//! check, kind check against the route, then (for streamable routes) range
//! resolution. Missing rows, missing blobs and kind mismatches all collapse
//! into `DeliveryError::NotFound`.

use super::{
    ByteStream, StoreError,
    blob_store::BlobStore,
    metadata_store::MetadataStore,
    range::{ByteRange, RangeRequest},
};
use crate::models::{
    media_file::{MediaRecord, NewMediaRecord},
    media_kind::MediaKind,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

const IMAGE_KINDS: &[MediaKind] = &[MediaKind::Image];
const STREAMABLE_KINDS: &[MediaKind] = &[MediaKind::Video, MediaKind::Audio];
const FILE_KINDS: &[MediaKind] = &[MediaKind::Other];

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("file not found")]
    NotFound,
    #[error("range not satisfiable for {size} byte resource")]
    RangeNotSatisfiable { size: u64 },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported media type")]
    UnsupportedType,
    #[error("upload exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TooLarge { limit } => UploadError::TooLarge { limit },
            other => UploadError::Storage(other),
        }
    }
}

/// A resolved delivery: the record, the interval being sent and an open
/// stream positioned at its first byte.
pub struct Delivery {
    pub record: MediaRecord,
    /// `Some` for partial content.
    pub range: Option<ByteRange>,
    /// Whether the route advertises `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    pub body: ByteStream,
}

impl Delivery {
    /// Bytes the body will yield.
    pub fn content_length(&self) -> u64 {
        self.range.map(|r| r.len()).unwrap_or_else(|| self.record.size())
    }
}

#[derive(Clone)]
pub struct MediaService {
    pub metadata: Arc<dyn MetadataStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Base used when deriving public URLs, e.g. `https://media.example.com`.
    pub public_url: String,
    pub max_upload_bytes: u64,
}

impl MediaService {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        blobs: Arc<dyn BlobStore>,
        public_url: impl Into<String>,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            metadata,
            blobs,
            public_url: public_url.into(),
            max_upload_bytes,
        }
    }

    /// Whole-content delivery for the image route.
    pub async fn deliver_static(&self, stored_name: &str) -> Result<Delivery, DeliveryError> {
        let record = self.resolve(stored_name, IMAGE_KINDS).await?;
        self.open_full(record, false).await
    }

    /// Whole-content delivery for records that are neither image, audio
    /// nor video.
    pub async fn deliver_file(&self, stored_name: &str) -> Result<Delivery, DeliveryError> {
        let record = self.resolve(stored_name, FILE_KINDS).await?;
        self.open_full(record, false).await
    }

    /// Range-aware delivery for video and audio.
    pub async fn deliver_streamable(
        &self,
        stored_name: &str,
        range_header: Option<&str>,
    ) -> Result<Delivery, DeliveryError> {
        let record = self.resolve(stored_name, STREAMABLE_KINDS).await?;
        let size = record.size();

        match RangeRequest::parse(range_header, size) {
            Ok(RangeRequest::Full) => self.open_full(record, true).await,
            Ok(RangeRequest::Partial(range)) => {
                debug!(
                    "serving {} bytes {}-{} of {}",
                    stored_name, range.start, range.end, size
                );
                let body = self
                    .blobs
                    .open_range(stored_name, range.start, Some(range.len()))
                    .await
                    .map_err(missing_as_not_found)?;
                Ok(Delivery {
                    record,
                    range: Some(range),
                    accept_ranges: true,
                    body,
                })
            }
            Err(_) => {
                debug!(
                    "unsatisfiable range {:?} for {} ({} bytes)",
                    range_header, stored_name, size
                );
                Err(DeliveryError::RangeNotSatisfiable { size })
            }
        }
    }

    /// Store an uploaded payload and create its record.
    ///
    /// The blob is written first; if the metadata insert fails the blob is
    /// removed again so no orphan payload is left behind.
    pub async fn upload(
        &self,
        content_type: Option<&str>,
        owner_id: Option<Uuid>,
        body: ByteStream,
    ) -> Result<MediaRecord, UploadError> {
        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .ok_or(UploadError::UnsupportedType)?;
        if MediaKind::classify(content_type) == MediaKind::Other {
            return Err(UploadError::UnsupportedType);
        }

        let stored_name = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            extension_for(content_type)
        );
        let size = self
            .blobs
            .put_stream(&stored_name, body, Some(self.max_upload_bytes))
            .await?;

        let new = NewMediaRecord {
            stored_name: stored_name.clone(),
            content_type: content_type.to_string(),
            size_bytes: size as i64,
            owner_id,
        };
        let record = match self.metadata.insert(new).await {
            Ok(record) => record,
            Err(err) => {
                if let Err(cleanup) = self.blobs.remove(&stored_name).await {
                    warn!("failed to remove orphan blob {}: {}", stored_name, cleanup);
                }
                return Err(UploadError::Storage(err));
            }
        };

        info!(
            "stored {} ({}, {} bytes)",
            record.stored_name, record.content_type, record.size_bytes
        );
        Ok(record)
    }

    async fn resolve(
        &self,
        stored_name: &str,
        accepted: &[MediaKind],
    ) -> Result<MediaRecord, DeliveryError> {
        let Some(record) = self.metadata.find_by_stored_name(stored_name).await? else {
            debug!("no record for {}", stored_name);
            return Err(DeliveryError::NotFound);
        };

        if !self.blobs.exists(stored_name).await? {
            warn!("record {} has no backing blob", stored_name);
            return Err(DeliveryError::NotFound);
        }

        let kind = record.kind();
        if !accepted.contains(&kind) {
            debug!(
                "{} is {} but route accepts {:?}",
                stored_name, kind, accepted
            );
            return Err(DeliveryError::NotFound);
        }

        Ok(record)
    }

    async fn open_full(
        &self,
        record: MediaRecord,
        accept_ranges: bool,
    ) -> Result<Delivery, DeliveryError> {
        let body = self
            .blobs
            .open_range(&record.stored_name, 0, None)
            .await
            .map_err(missing_as_not_found)?;
        Ok(Delivery {
            record,
            range: None,
            accept_ranges,
            body,
        })
    }
}

/// A blob can disappear between the existence check and the open.
fn missing_as_not_found(err: StoreError) -> DeliveryError {
    match err {
        StoreError::BlobMissing(_) | StoreError::InvalidName => DeliveryError::NotFound,
        other => DeliveryError::Storage(other),
    }
}

/// File extension for a content type, including the leading dot.
fn extension_for(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let Some((top, sub)) = essence.split_once('/') else {
        return String::new();
    };
    let sub = sub.split('+').next().unwrap_or_default();

    let ext = match (top, sub) {
        ("image", "jpeg") => "jpg",
        ("audio", "mpeg") => "mp3",
        ("video", "quicktime") => "mov",
        ("video", "x-matroska") => "mkv",
        ("video", "x-msvideo") => "avi",
        _ => sub,
    };
    if ext.is_empty() || !ext.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return String::new();
    }
    format!(".{}", ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{StoreResult, blob_store::LocalBlobStore};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use tempfile::TempDir;

    struct RejectingMetadata;

    #[async_trait]
    impl MetadataStore for RejectingMetadata {
        async fn find_by_stored_name(&self, _: &str) -> StoreResult<Option<MediaRecord>> {
            Ok(None)
        }

        async fn insert(&self, _: NewMediaRecord) -> StoreResult<MediaRecord> {
            Err(StoreError::Unhealthy("read-only".into()))
        }

        async fn ping(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    fn body(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::once(async move { Ok::<_, std::io::Error>(Bytes::from_static(data)) }))
    }

    #[test]
    fn extensions() {
        assert_eq!(extension_for("video/mp4"), ".mp4");
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("image/svg+xml"), ".svg");
        assert_eq!(extension_for("audio/mpeg"), ".mp3");
        assert_eq!(extension_for("Video/WebM; codecs=vp9"), ".webm");
        assert_eq!(extension_for("video"), "");
        assert_eq!(extension_for("video/../x"), "");
    }

    #[tokio::test]
    async fn failed_insert_removes_blob() {
        let temp_dir = TempDir::new().unwrap();
        let blobs = Arc::new(LocalBlobStore::new(temp_dir.path()));
        let service = MediaService::new(
            Arc::new(RejectingMetadata),
            blobs.clone(),
            "http://localhost",
            1024,
        );

        let err = service
            .upload(Some("image/png"), None, body(b"png"))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Storage(_)));
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn rejects_unclassified_uploads() {
        let temp_dir = TempDir::new().unwrap();
        let service = MediaService::new(
            Arc::new(RejectingMetadata),
            Arc::new(LocalBlobStore::new(temp_dir.path())),
            "http://localhost",
            1024,
        );

        for ct in [None, Some(""), Some("text/plain")] {
            let err = service.upload(ct, None, body(b"x")).await.unwrap_err();
            assert!(matches!(err, UploadError::UnsupportedType));
        }
    }
}
