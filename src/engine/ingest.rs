use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::allocator::{RANDOM_NAME_LEN, random_alphanumeric};
use super::{AccessPolicy, FileDraft, FileManager, IdentifierAllocator, NamespaceRegistry, UploadKind};
use crate::content::{ContentStore, Fetcher, validate_url};
use crate::error::{Error, Result};
use crate::types::{File, User};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// Raw content with its hex SHA-256 digest.
    Bytes { data: Vec<u8>, checksum: String },
    Url(String),
}

impl UploadSource {
    #[must_use]
    pub fn kind(&self) -> UploadKind {
        match self {
            UploadSource::Bytes { .. } => UploadKind::File,
            UploadSource::Url(_) => UploadKind::Url,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadDraft {
    /// Empty means a random name is chosen.
    pub name: String,
    /// Empty means the default namespace.
    pub namespace: String,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
    pub content_type: Option<String>,
    pub source: UploadSource,
}

/// Turns an upload into stored content plus a file record, or neither.
#[derive(Clone)]
pub struct IngestionPipeline {
    registry: NamespaceRegistry,
    files: FileManager,
    allocator: IdentifierAllocator,
    policy: AccessPolicy,
    content: Arc<ContentStore>,
    fetcher: Fetcher,
}

impl IngestionPipeline {
    pub fn new(
        registry: NamespaceRegistry,
        files: FileManager,
        allocator: IdentifierAllocator,
        policy: AccessPolicy,
        content: Arc<ContentStore>,
        fetcher: Fetcher,
    ) -> Self {
        Self {
            registry,
            files,
            allocator,
            policy,
            content,
            fetcher,
        }
    }

    pub async fn ingest(&self, draft: UploadDraft, user: &User) -> Result<File> {
        self.policy.check_upload(user, draft.source.kind())?;

        match &draft.source {
            UploadSource::Bytes { data, checksum } => {
                if let Some(limit) = self.policy.upload_ceiling(user) {
                    if data.len() as u64 > limit {
                        return Err(Error::validation("content exceeds upload limit"));
                    }
                }
                verify_checksum(data, checksum)?;
            }
            UploadSource::Url(url) => validate_url(url)?,
        }

        // A missing namespace is created only once the content is stored.
        let existing = match self.registry.resolve(&draft.namespace, user) {
            Ok(ns) => {
                self.policy.check_write(&ns, user)?;
                Some(ns)
            }
            Err(Error::NotFound(_)) => None,
            Err(e) => return Err(e),
        };

        let local_name = self.allocator.allocate_local_id()?;

        // Until persisted, dropping the writer discards everything written.
        let mut writer = self.content.create_temp().await?;
        let upstream_type = match &draft.source {
            UploadSource::Bytes { data, .. } => {
                writer.write(data).await?;
                None
            }
            UploadSource::Url(url) => {
                self.fetcher
                    .fetch_into(url, self.policy.url_ceiling(user), &mut writer)
                    .await?
                    .content_type
            }
        };
        let size = writer.written();
        writer.persist(&self.content, &local_name).await?;

        let name = if draft.name.is_empty() {
            random_alphanumeric(RANDOM_NAME_LEN)
        } else {
            draft.name
        };
        let content_type = draft
            .content_type
            .filter(|t| !t.is_empty())
            .or(upstream_type)
            .or_else(|| mime_guess::from_path(&name).first_raw().map(str::to_string))
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let file_draft = FileDraft {
            name,
            local_name,
            size_bytes: size as i64,
            content_type,
            tags: draft.tags,
            groups: draft.groups,
        };

        let recorded = match existing {
            Some(ns) => Ok(ns),
            None => self.registry.resolve_or_create(&draft.namespace, user),
        }
        .and_then(|ns| self.files.insert(&file_draft, &ns, user));

        match recorded {
            Ok(file) => {
                tracing::info!(
                    file_id = file.id,
                    name = %file.name,
                    size = file.size_bytes,
                    user = %user.name,
                    "stored upload"
                );
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.content.remove(&file_draft.local_name).await {
                    tracing::error!(
                        local_name = %file_draft.local_name,
                        error = %cleanup,
                        "failed to remove orphaned content"
                    );
                }
                Err(e)
            }
        }
    }
}

fn verify_checksum(data: &[u8], expected: &str) -> Result<()> {
    let actual = hex::encode(Sha256::digest(data));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        Ok(())
    } else {
        Err(Error::Integrity(
            "checksum mismatch, content incomplete or corrupted".to_string(),
        ))
    }
}
