//! Filesystem storage for uploaded package binaries.
//!
//! Each binary lives in a single flat directory under its asset reference,
//! `<unix-millis>-<random hex>-<sanitized original name>`. The random part
//! keeps concurrent uploads of the same file apart and makes references
//! unguessable from catalog metadata. Assets are never deleted by the
//! service; removing a catalog record leaves its binary in place.

use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ServerError;

const CHUNK_SIZE: usize = 64 * 1024;
const MAX_NAME_LEN: usize = 100;
const FALLBACK_NAME: &str = "package.apk";

/// An opened asset, ready to be streamed.
#[derive(Debug)]
pub struct AssetFile {
    pub file: File,
    pub len: u64,
    /// Name suggested to the downloader.
    pub file_name: String,
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    base_path: PathBuf,
    max_size: usize,
}

impl AssetStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::AssetStorage(format!(
                "Failed to create asset directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Asset store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Start writing a new asset.
    ///
    /// Bytes go to a hidden temporary file. Nothing is resolvable until
    /// [`StagedAsset::commit`] syncs and renames it into place, and a staged
    /// asset dropped without committing removes its temporary file.
    pub async fn stage(&self, original_name: &str) -> Result<StagedAsset, ServerError> {
        let asset_ref = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_name(original_name)
        );
        let final_path = self.asset_path(&asset_ref)?;
        let tmp_path = self.base_path.join(format!(".{asset_ref}.partial"));

        let file = File::create(&tmp_path).await.map_err(|e| {
            ServerError::AssetStorage(format!("Failed to create asset {asset_ref}: {e}"))
        })?;

        Ok(StagedAsset {
            file,
            tmp_path,
            final_path,
            asset_ref,
            len: 0,
            max_size: self.max_size,
            committed: false,
        })
    }

    /// Open a stored asset for reading.
    ///
    /// A reference that resolves to no file yields [`ServerError::AssetMissing`].
    pub async fn open(&self, asset_ref: &str) -> Result<AssetFile, ServerError> {
        let path = self.asset_path(asset_ref)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::AssetMissing);
            }
            Err(e) => {
                return Err(ServerError::AssetStorage(format!(
                    "Failed to open asset {asset_ref}: {e}"
                )));
            }
        };

        let len = file
            .metadata()
            .await
            .map_err(|e| ServerError::AssetStorage(format!("Failed to stat asset {asset_ref}: {e}")))?
            .len();

        Ok(AssetFile {
            file,
            len,
            file_name: original_name(asset_ref).to_string(),
        })
    }

    /// Resolve a reference to a path inside the store, rejecting anything
    /// that could escape the directory or name a temporary file.
    fn asset_path(&self, asset_ref: &str) -> Result<PathBuf, ServerError> {
        if asset_ref.is_empty()
            || asset_ref.starts_with('.')
            || asset_ref.contains('/')
            || asset_ref.contains('\\')
            || asset_ref.contains("..")
        {
            return Err(ServerError::BadRequest(format!(
                "Invalid asset reference: {asset_ref}"
            )));
        }
        Ok(self.base_path.join(asset_ref))
    }
}

/// An asset being written. See [`AssetStore::stage`].
#[derive(Debug)]
pub struct StagedAsset {
    file: File,
    tmp_path: PathBuf,
    final_path: PathBuf,
    asset_ref: String,
    len: u64,
    max_size: usize,
    committed: bool,
}

impl StagedAsset {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a chunk, enforcing the store's size limit.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<(), ServerError> {
        if self.len + chunk.len() as u64 > self.max_size as u64 {
            return Err(ServerError::PayloadTooLarge { max: self.max_size });
        }

        self.file.write_all(chunk).await.map_err(|e| {
            ServerError::AssetStorage(format!("Failed to write asset {}: {e}", self.asset_ref))
        })?;
        self.len += chunk.len() as u64;
        Ok(())
    }

    /// Sync the bytes to disk and publish the asset under its reference.
    pub async fn commit(mut self) -> Result<String, ServerError> {
        if self.is_empty() {
            return Err(ServerError::BadRequest("Empty package file".to_string()));
        }

        self.file.flush().await.map_err(|e| {
            ServerError::AssetStorage(format!("Failed to flush asset {}: {e}", self.asset_ref))
        })?;
        self.file.sync_all().await.map_err(|e| {
            ServerError::AssetStorage(format!("Failed to sync asset {}: {e}", self.asset_ref))
        })?;

        fs::rename(&self.tmp_path, &self.final_path).await.map_err(|e| {
            ServerError::AssetStorage(format!("Failed to commit asset {}: {e}", self.asset_ref))
        })?;
        self.committed = true;

        debug!(asset_ref = %self.asset_ref, size = self.len, "Stored asset");
        Ok(self.asset_ref.clone())
    }
}

impl Drop for StagedAsset {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.tmp_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.tmp_path.display(), error = %e, "Failed to remove partial asset");
            }
        }
    }
}

/// Stream an opened file in fixed-size chunks.
pub fn read_chunks(file: File) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    futures::stream::try_unfold(file, next_chunk)
}

async fn next_chunk(mut file: File) -> std::io::Result<Option<(Bytes, File)>> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    let n = file.read(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    buf.truncate(n);
    Ok(Some((Bytes::from(buf), file)))
}

/// Recover the original file name from an asset reference.
pub fn original_name(asset_ref: &str) -> &str {
    asset_ref
        .splitn(3, '-')
        .nth(2)
        .filter(|name| !name.is_empty())
        .unwrap_or(asset_ref)
}

/// Reduce a client-supplied file name to a safe, flat file name.
fn sanitize_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut cleaned = cleaned.trim_start_matches('.').replace("..", "_");
    cleaned.truncate(MAX_NAME_LEN);

    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::TempDir;

    async fn test_store() -> (AssetStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = AssetStore::new(dir.path().to_path_buf(), 1024 * 1024)
            .await
            .unwrap();
        (store, dir)
    }

    async fn put(store: &AssetStore, data: &[u8], name: &str) -> Result<String, ServerError> {
        let mut staged = store.stage(name).await?;
        staged.write(data).await?;
        staged.commit().await
    }

    fn dir_entries(dir: &TempDir) -> Vec<String> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    async fn read_all(asset: AssetFile) -> Vec<u8> {
        let chunks: Vec<Bytes> = read_chunks(asset.file).try_collect().await.unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_put_and_open() {
        let (store, _dir) = test_store().await;
        let data = b"PK\x03\x04-android-package";

        let asset_ref = put(&store, data, "maps-pro.apk").await.unwrap();
        let asset = store.open(&asset_ref).await.unwrap();
        assert_eq!(asset.len, data.len() as u64);
        assert_eq!(asset.file_name, "maps-pro.apk");
        assert_eq!(read_all(asset).await, data);
    }

    #[tokio::test]
    async fn test_large_asset_streams_in_chunks() {
        let (store, _dir) = test_store().await;
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();

        let asset_ref = put(&store, &data, "big.apk").await.unwrap();
        let asset = store.open(&asset_ref).await.unwrap();
        assert_eq!(read_all(asset).await, data);
    }

    #[tokio::test]
    async fn test_same_name_never_collides() {
        let (store, _dir) = test_store().await;
        let a = put(&store, b"one", "app.apk").await.unwrap();
        let b = put(&store, b"two", "app.apk").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(read_all(store.open(&a).await.unwrap()).await, b"one");
        assert_eq!(read_all(store.open(&b).await.unwrap()).await, b"two");
    }

    #[tokio::test]
    async fn test_no_partial_files_left() {
        let (store, dir) = test_store().await;
        put(&store, b"data", "app.apk").await.unwrap();

        let names = dir_entries(&dir);
        assert_eq!(names.len(), 1);
        assert!(!names[0].starts_with('.'));
    }

    #[tokio::test]
    async fn test_chunked_write_then_commit() {
        let (store, _dir) = test_store().await;
        let mut staged = store.stage("chunks.apk").await.unwrap();
        for chunk in [&b"PK\x03\x04"[..], &b"-body-"[..], &b"tail"[..]] {
            staged.write(chunk).await.unwrap();
        }
        assert_eq!(staged.len(), 14);

        let asset_ref = staged.commit().await.unwrap();
        let asset = store.open(&asset_ref).await.unwrap();
        assert_eq!(read_all(asset).await, b"PK\x03\x04-body-tail");
    }

    #[tokio::test]
    async fn test_dropped_stage_leaves_nothing() {
        let (store, dir) = test_store().await;
        let mut staged = store.stage("abandoned.apk").await.unwrap();
        staged.write(b"half a package").await.unwrap();
        assert_eq!(dir_entries(&dir).len(), 1);

        drop(staged);
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_write_past_limit_rejected_and_cleaned_up() {
        let (store, dir) = test_store().await;
        let mut staged = store.stage("big.apk").await.unwrap();
        staged.write(&vec![0u8; 1024 * 1024]).await.unwrap();
        assert!(matches!(
            staged.write(b"x").await,
            Err(ServerError::PayloadTooLarge { .. })
        ));

        drop(staged);
        assert!(dir_entries(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let (store, _dir) = test_store().await;
        let err = store
            .open("1700000000000-0123456789abcdef0123456789abcdef-gone.apk")
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::AssetMissing));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_rejected() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            put(&store, b"", "a.apk").await,
            Err(ServerError::BadRequest(_))
        ));
        let big = vec![0u8; 1024 * 1024 + 1];
        assert!(matches!(
            put(&store, &big, "a.apk").await,
            Err(ServerError::PayloadTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_traversal_refs_rejected() {
        let (store, _dir) = test_store().await;
        for bad in ["../etc/passwd", "a/b", "a\\b", ".hidden.partial", ""] {
            assert!(
                matches!(store.open(bad).await, Err(ServerError::BadRequest(_))),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Maps Pro.apk"), "Maps_Pro.apk");
        assert_eq!(sanitize_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_name("C:\\Users\\me\\app.apk"), "app.apk");
        assert_eq!(sanitize_name("..."), FALLBACK_NAME);
        assert_eq!(sanitize_name(""), FALLBACK_NAME);
        assert_eq!(sanitize_name(&"x".repeat(300)).len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_original_name() {
        assert_eq!(
            original_name("1700000000000-0123456789abcdef0123456789abcdef-my-app.apk"),
            "my-app.apk"
        );
        assert_eq!(original_name("plain"), "plain");
    }
}
