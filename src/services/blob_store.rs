//! Blob payload storage.
//!
//! `LocalBlobStore` keeps payloads on local disk sharded beneath
//! `base_path/{shard}/{shard}/{stored_name}`, where the shards are the first
//! two bytes of `md5(stored_name)`.

use super::{ByteStream, StoreError, StoreResult};
use async_trait::async_trait;
use futures::{StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind, SeekFrom},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const MAX_STORED_NAME_LEN: usize = 255;

/// Byte-addressable blob access keyed by stored name.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether a blob is present for `stored_name`.
    async fn exists(&self, stored_name: &str) -> StoreResult<bool>;

    /// Open a read stream starting at byte `start`.
    ///
    /// `length` bounds the stream; `None` reads to the end of the blob.
    /// The underlying handle is released when the stream is dropped.
    async fn open_range(
        &self,
        stored_name: &str,
        start: u64,
        length: Option<u64>,
    ) -> StoreResult<ByteStream>;

    /// Write a blob from a stream, replacing any previous payload.
    ///
    /// Fails with `TooLarge` once more than `max_bytes` have been received.
    /// Returns the number of bytes written.
    async fn put_stream(
        &self,
        stored_name: &str,
        stream: ByteStream,
        max_bytes: Option<u64>,
    ) -> StoreResult<u64>;

    /// Remove a blob. Missing blobs are not an error.
    async fn remove(&self, stored_name: &str) -> StoreResult<()>;

    /// Write/read/delete round trip used by readiness probes.
    async fn probe(&self) -> StoreResult<()>;
}

/// Disk-backed blob store.
#[derive(Clone, Debug)]
pub struct LocalBlobStore {
    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,
}

impl LocalBlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Stored names are flat identifiers; anything that could escape the
    /// shard directory is refused.
    fn ensure_name_safe(stored_name: &str) -> StoreResult<()> {
        if stored_name.is_empty() || stored_name.len() > MAX_STORED_NAME_LEN {
            return Err(StoreError::InvalidName);
        }
        if stored_name == "." || stored_name.contains("..") {
            return Err(StoreError::InvalidName);
        }
        if stored_name
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\')
        {
            return Err(StoreError::InvalidName);
        }
        Ok(())
    }

    fn shards(stored_name: &str) -> (String, String) {
        let digest = md5::compute(stored_name);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Full payload path. Parent directories may not exist yet.
    fn blob_path(&self, stored_name: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(stored_name);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(stored_name);
        path
    }

    /// Remove empty shard directories up to (not including) `base_path`.
    async fn prune_empty_dirs(&self, start: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(&self.base_path) && current != self.base_path {
            match fs::remove_dir(&current).await {
                Ok(_) => match current.parent() {
                    Some(parent) => current = parent.to_path_buf(),
                    None => break,
                },
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, stored_name: &str) -> StoreResult<bool> {
        if Self::ensure_name_safe(stored_name).is_err() {
            return Ok(false);
        }
        match fs::metadata(self.blob_path(stored_name)).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    async fn open_range(
        &self,
        stored_name: &str,
        start: u64,
        length: Option<u64>,
    ) -> StoreResult<ByteStream> {
        Self::ensure_name_safe(stored_name)?;
        let path = self.blob_path(stored_name);
        let mut file = File::open(&path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::BlobMissing(stored_name.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        if start > 0 {
            file.seek(SeekFrom::Start(start)).await?;
        }

        let stream: ByteStream = match length {
            Some(limit) => Box::pin(ReaderStream::new(file.take(limit))),
            None => Box::pin(ReaderStream::new(file)),
        };
        Ok(stream)
    }

    async fn put_stream(
        &self,
        stored_name: &str,
        stream: ByteStream,
        max_bytes: Option<u64>,
    ) -> StoreResult<u64> {
        Self::ensure_name_safe(stored_name)?;
        let file_path = self.blob_path(stored_name);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::new(
                ErrorKind::Other,
                "blob path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        // Declared before `file` so the handle closes before the guard runs.
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut guard = TempBlob::new(tmp_path, &self.base_path);
        let mut file = File::create(&guard.path).await?;

        let mut written: u64 = 0;
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = chunk_res?;
            written += chunk.len() as u64;
            if let Some(limit) = max_bytes {
                if written > limit {
                    return Err(StoreError::TooLarge { limit });
                }
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(err) = fs::rename(&guard.path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&guard.path, &file_path).await?;
            } else {
                return Err(StoreError::Io(err));
            }
        }
        guard.disarm();

        debug!("stored blob {} ({} bytes)", file_path.display(), written);
        Ok(written)
    }

    async fn remove(&self, stored_name: &str) -> StoreResult<()> {
        Self::ensure_name_safe(stored_name)?;
        let file_path = self.blob_path(stored_name);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed blob {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("blob {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent).await;
        }
        Ok(())
    }

    async fn probe(&self) -> StoreResult<()> {
        let tmp_path = self.base_path.join(format!(".readyz-{}", Uuid::new_v4()));
        fs::write(&tmp_path, b"readyz").await?;
        let read = fs::read(&tmp_path).await;
        let _ = fs::remove_file(&tmp_path).await;
        if read? != b"readyz" {
            return Err(StoreError::Unhealthy("file content mismatch".into()));
        }
        Ok(())
    }
}

/// Temp payload that is deleted on drop, together with any shard
/// directories left empty, unless `disarm` was called after the final
/// rename. Covers error returns and futures dropped mid-upload.
struct TempBlob {
    path: PathBuf,
    base_path: PathBuf,
    armed: bool,
}

impl TempBlob {
    fn new(path: PathBuf, base_path: &Path) -> Self {
        Self {
            path,
            base_path: base_path.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempBlob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = std::fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                debug!("failed to remove temp blob {}: {}", self.path.display(), err);
            }
        }
        let mut current = self.path.parent().map(Path::to_path_buf);
        while let Some(dir) = current {
            if !dir.starts_with(&self.base_path) || dir == self.base_path {
                break;
            }
            if std::fs::remove_dir(&dir).is_err() {
                break;
            }
            current = dir.parent().map(Path::to_path_buf);
        }
    }
}
