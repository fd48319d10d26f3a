use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Length of a local storage id.
pub const LOCAL_ID_LEN: usize = 40;

pub struct ContentStore {
    base_path: PathBuf,
}

impl ContentStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("files"),
        }
    }

    fn blob_path(&self, local_id: &str) -> PathBuf {
        self.base_path.join(&local_id[0..2]).join(local_id)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn exists(&self, local_id: &str) -> Result<bool> {
        validate_local_id(local_id)?;
        Ok(fs::try_exists(self.blob_path(local_id)).await?)
    }

    /// Starts a new blob. Nothing is visible under any id until
    /// [`BlobWriter::persist`] succeeds.
    pub async fn create_temp(&self) -> Result<BlobWriter> {
        let path = self.temp_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let file = File::create(&path).await?;
        Ok(BlobWriter {
            file: Some(file),
            path,
            written: 0,
            persisted: false,
        })
    }

    pub async fn put(&self, local_id: &str, data: &[u8]) -> Result<()> {
        validate_local_id(local_id)?;
        let mut writer = self.create_temp().await?;
        writer.write(data).await?;
        writer.persist(self, local_id).await
    }

    pub async fn open(&self, local_id: &str) -> Result<(BufReader<File>, u64)> {
        validate_local_id(local_id)?;
        let file = match File::open(self.blob_path(local_id)).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::not_found("content not found"));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let size = file.metadata().await?.len();
        Ok((BufReader::new(file), size))
    }

    pub async fn remove(&self, local_id: &str) -> Result<bool> {
        validate_local_id(local_id)?;
        match fs::remove_file(self.blob_path(local_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// An in-progress blob write backed by a temp file.
///
/// Dropping the writer without persisting it removes the temp file, so an
/// abandoned or cancelled upload leaves nothing behind.
pub struct BlobWriter {
    file: Option<File>,
    path: PathBuf,
    written: u64,
    persisted: bool,
}

impl BlobWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| Error::Internal("write after close".to_string()))?;
        file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the temp file and renames it to its final location.
    pub async fn persist(mut self, store: &ContentStore, local_id: &str) -> Result<()> {
        validate_local_id(local_id)?;

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }

        let final_path = store.blob_path(local_id);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::rename(&self.path, &final_path).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        self.file.take();
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove temp blob");
            }
        }
    }
}

fn validate_local_id(local_id: &str) -> Result<()> {
    if is_valid_local_id(local_id) {
        Ok(())
    } else {
        Err(Error::Internal(format!("invalid local storage id: {local_id}")))
    }
}

#[must_use]
pub fn is_valid_local_id(local_id: &str) -> bool {
    local_id.len() == LOCAL_ID_LEN
        && local_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}
