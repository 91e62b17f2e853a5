//! Storage port and filesystem backend

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncSeek};

use super::error::AssetError;
use crate::gate::AssetPath;

/// Readable, seekable asset contents
pub trait AssetReader: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Unpin> AssetReader for T {}

/// An open asset and the metadata delivery needs
pub struct StoredAsset {
    pub reader: Box<dyn AssetReader>,
    pub size: u64,
    pub modified: SystemTime,
}

impl StoredAsset {
    pub fn new(reader: impl AssetReader + 'static, size: u64, modified: SystemTime) -> Self {
        Self {
            reader: Box::new(reader),
            size,
            modified,
        }
    }
}

impl std::fmt::Debug for StoredAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAsset")
            .field("size", &self.size)
            .field("modified", &self.modified)
            .finish_non_exhaustive()
    }
}

/// Where assets live
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Open the asset at `path`
    ///
    /// Fails with [`AssetError::NotFound`] when nothing servable is there.
    async fn retrieve(&self, path: &AssetPath) -> Result<StoredAsset, AssetError>;
}

/// Serves assets from a local directory
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &AssetPath) -> PathBuf {
        let mut full = self.root.clone();
        full.extend(path.segments());
        full
    }
}

fn not_found(path: &AssetPath) -> AssetError {
    AssetError::NotFound {
        path: path.to_string(),
    }
}

fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[async_trait]
impl AssetStore for FilesystemStore {
    async fn retrieve(&self, path: &AssetPath) -> Result<StoredAsset, AssetError> {
        let full = self.resolve(path);

        let file = match tokio::fs::File::open(&full).await {
            Ok(file) => file,
            Err(e) if is_missing(&e) => return Err(not_found(path)),
            Err(e) => return Err(e.into()),
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(not_found(path));
        }

        Ok(StoredAsset::new(file, metadata.len(), metadata.modified()?))
    }
}
