//! Represents an uploaded media file and its public JSON shape.

use super::media_kind::MediaKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for a single stored blob.
///
/// The record describes the blob; the bytes themselves live in the blob
/// store under `stored_name`.
#[derive(Serialize, Clone, FromRow, Debug)]
pub struct MediaRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Opaque, unique name of the blob in the blob store.
    pub stored_name: String,

    /// MIME-like type recorded at upload. Empty when unknown.
    pub content_type: String,

    /// Exact byte length of the blob.
    pub size_bytes: i64,

    /// Uploading principal, if any.
    pub owner_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    pub fn kind(&self) -> MediaKind {
        MediaKind::classify(&self.content_type)
    }

    /// Size as an unsigned byte count; negative values clamp to zero.
    pub fn size(&self) -> u64 {
        self.size_bytes.max(0) as u64
    }
}

/// Values needed to create a `MediaRecord`.
#[derive(Clone, Debug)]
pub struct NewMediaRecord {
    pub stored_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub owner_id: Option<Uuid>,
}

/// Build the public URL for a blob.
///
/// Derived at serialization time and never persisted.
pub fn public_url(base_url: &str, stored_name: &str, content_type: &str) -> String {
    let prefix = MediaKind::classify(content_type).route_prefix();
    format!(
        "{}/v1/media/{}/{}",
        base_url.trim_end_matches('/'),
        prefix,
        stored_name
    )
}

/// JSON body returned after an upload.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MediaFileResponse {
    pub id: Uuid,
    pub stored_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub user: Option<Uuid>,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaFileResponse {
    pub fn from_record(record: MediaRecord, base_url: &str) -> Self {
        let url = public_url(base_url, &record.stored_name, &record.content_type);
        Self {
            id: record.id,
            stored_name: record.stored_name,
            file_type: record.content_type,
            file_size: record.size_bytes,
            user: record.owner_id,
            url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
