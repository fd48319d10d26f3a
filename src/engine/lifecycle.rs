use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::{AttributeCatalog, IdentifierAllocator};
use crate::content::ContentStore;
use crate::error::{Error, Result};
use crate::store::{FileQuery, Store};
use crate::types::{AttributeKind, File, Namespace, NewFile, User};

/// Metadata for a file whose content is already stored.
#[derive(Debug, Clone)]
pub struct FileDraft {
    pub name: String,
    pub local_name: String,
    pub size_bytes: i64,
    pub content_type: String,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
}

/// Read-side selection for [`FileManager::list_matching`].
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub name_contains: Option<String>,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishOutcome {
    pub conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_slug: Option<String>,
}

impl PublishOutcome {
    fn conflict() -> Self {
        Self {
            conflict: true,
            public_slug: None,
        }
    }
}

/// Owns every mutation of [`File`] records.
///
/// Mutating methods take `&mut File`, persist a modified copy and only then
/// replace the caller's value, so a failed write leaves it untouched. They
/// return whether anything changed.
#[derive(Clone)]
pub struct FileManager {
    store: Arc<dyn Store>,
    content: Arc<ContentStore>,
    catalog: AttributeCatalog,
    allocator: IdentifierAllocator,
}

impl FileManager {
    pub fn new(
        store: Arc<dyn Store>,
        content: Arc<ContentStore>,
        catalog: AttributeCatalog,
        allocator: IdentifierAllocator,
    ) -> Self {
        Self {
            store,
            content,
            catalog,
            allocator,
        }
    }

    pub fn insert(&self, draft: &FileDraft, namespace: &Namespace, user: &User) -> Result<File> {
        let tags = self
            .catalog
            .resolve_or_create(AttributeKind::Tag, &draft.tags, namespace, user)?;
        let groups = self
            .catalog
            .resolve_or_create(AttributeKind::Group, &draft.groups, namespace, user)?;

        let ids: Vec<i64> = tags.iter().chain(groups.iter()).map(|a| a.id).collect();
        let new_file = NewFile {
            name: draft.name.clone(),
            local_name: draft.local_name.clone(),
            owner_user_id: user.id,
            namespace_id: namespace.id,
            size_bytes: draft.size_bytes,
            content_type: draft.content_type.clone(),
        };

        self.store.create_file(&new_file, &ids).map_err(|e| {
            tracing::error!(name = %draft.name, error = %e, "failed to insert file");
            e
        })
    }

    pub fn rename(&self, file: &mut File, new_name: &str) -> Result<bool> {
        if file.name == new_name {
            return Ok(false);
        }

        let mut next = file.clone();
        next.name = new_name.to_string();
        self.save(file, next)?;
        Ok(true)
    }

    /// Making a file private releases its slug. Making it public reuses an
    /// existing slug or draws a random one.
    pub fn set_visibility(&self, file: &mut File, public: bool) -> Result<bool> {
        let mut next = file.clone();

        if public {
            if file.is_public && file.public_slug.is_some() {
                return Ok(false);
            }
            let slug = match &file.public_slug {
                Some(slug) => slug.clone(),
                None => self.allocator.allocate_public_slug(None, file.id)?,
            };
            next.is_public = true;
            next.public_slug = Some(slug);
        } else {
            if !file.is_public && file.public_slug.is_none() {
                return Ok(false);
            }
            next.is_public = false;
            next.public_slug = None;
        }

        self.save(file, next)?;
        Ok(true)
    }

    pub fn add_tags(&self, file: &mut File, names: &[String], user: &User) -> Result<bool> {
        self.add_attributes(AttributeKind::Tag, file, names, user)
    }

    pub fn remove_tags(&self, file: &mut File, names: &[String]) -> Result<bool> {
        self.remove_attributes(AttributeKind::Tag, file, names)
    }

    pub fn add_groups(&self, file: &mut File, names: &[String], user: &User) -> Result<bool> {
        self.add_attributes(AttributeKind::Group, file, names, user)
    }

    pub fn remove_groups(&self, file: &mut File, names: &[String]) -> Result<bool> {
        self.remove_attributes(AttributeKind::Group, file, names)
    }

    fn add_attributes(
        &self,
        kind: AttributeKind,
        file: &mut File,
        names: &[String],
        user: &User,
    ) -> Result<bool> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !file.has_attribute(kind, name))
            .cloned()
            .collect();
        if missing.is_empty() {
            return Ok(false);
        }

        let namespace = self
            .store
            .get_namespace(file.namespace_id)?
            .ok_or_else(|| Error::Internal(format!("file {} has no namespace", file.id)))?;
        let added = self
            .catalog
            .resolve_or_create(kind, &missing, &namespace, user)?;

        let mut attributes = file.attributes(kind).to_vec();
        attributes.extend(added);
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        let ids: Vec<i64> = attributes.iter().map(|a| a.id).collect();
        self.store.set_file_attributes(file.id, kind, &ids)?;
        *file.attributes_mut(kind) = attributes;
        Ok(true)
    }

    fn remove_attributes(&self, kind: AttributeKind, file: &mut File, names: &[String]) -> Result<bool> {
        let kept: Vec<_> = file
            .attributes(kind)
            .iter()
            .filter(|a| !names.contains(&a.name))
            .cloned()
            .collect();
        if kept.len() == file.attributes(kind).len() {
            return Ok(false);
        }

        let ids: Vec<i64> = kept.iter().map(|a| a.id).collect();
        self.store.set_file_attributes(file.id, kind, &ids)?;
        *file.attributes_mut(kind) = kept;
        Ok(true)
    }

    /// Moves the file and re-creates its tags and groups in `target`. The
    /// namespace and association changes are written in one transaction.
    pub fn migrate_namespace(&self, file: &mut File, target: &Namespace, user: &User) -> Result<bool> {
        if file.namespace_id == target.id {
            return Ok(false);
        }

        let tags = self.catalog.resolve_or_create(
            AttributeKind::Tag,
            &file.attribute_names(AttributeKind::Tag),
            target,
            user,
        )?;
        let groups = self.catalog.resolve_or_create(
            AttributeKind::Group,
            &file.attribute_names(AttributeKind::Group),
            target,
            user,
        )?;

        let ids: Vec<i64> = tags.iter().chain(groups.iter()).map(|a| a.id).collect();
        self.store.move_file(file.id, target.id, &ids)?;

        tracing::info!(file_id = file.id, namespace = %target.name, "moved file");
        file.namespace_id = target.id;
        file.tags = tags;
        file.groups = groups;
        file.updated_at = Utc::now();
        Ok(true)
    }

    /// Soft-deletes the file and releases its slug, then removes the blob.
    /// A failed blob removal is logged; the metadata delete stands.
    pub async fn delete(&self, file: &File) -> Result<()> {
        if self.store.soft_delete_file(file.id)? {
            tracing::info!(file_id = file.id, name = %file.name, "deleted file");
        } else {
            tracing::debug!(file_id = file.id, "file already deleted");
        }

        if let Err(e) = self.content.remove(&file.local_name).await {
            tracing::warn!(file_id = file.id, error = %e, "failed to remove file content");
        }
        Ok(())
    }

    /// A slug held by another file yields `conflict: true` and leaves both
    /// the stored row and `file` as they were.
    pub fn publish(&self, file: &mut File, requested: Option<&str>) -> Result<PublishOutcome> {
        let requested = requested.filter(|s| !s.is_empty());

        // Republishing without a requested slug keeps the current one.
        let slug = match (requested, &file.public_slug) {
            (None, Some(current)) => current.clone(),
            _ => match self.allocator.allocate_public_slug(requested, file.id) {
                Ok(slug) => slug,
                Err(Error::Conflict(_)) => return Ok(PublishOutcome::conflict()),
                Err(e) => return Err(e),
            },
        };

        let mut next = file.clone();
        next.is_public = true;
        next.public_slug = Some(slug.clone());

        match self.save(file, next) {
            Ok(()) => {
                tracing::info!(file_id = file.id, slug = %slug, "published file");
                Ok(PublishOutcome {
                    conflict: false,
                    public_slug: Some(slug),
                })
            }
            Err(Error::Conflict(_)) => Ok(PublishOutcome::conflict()),
            Err(e) => Err(e),
        }
    }

    pub fn find_by_name(&self, query: &FileQuery<'_>) -> Result<Vec<File>> {
        self.store.find_files(query)
    }

    pub fn count_matches(&self, query: &FileQuery<'_>) -> Result<i64> {
        self.store.count_files(query)
    }

    /// A file matches when it has any of the requested tags (if any) and
    /// any of the requested groups (if any). Names that resolve to nothing
    /// are NotFound rather than "no filter".
    pub fn list_matching(
        &self,
        namespace: &Namespace,
        owner_user_id: Option<i64>,
        filter: &ListFilter,
    ) -> Result<Vec<File>> {
        let tag_ids = self.resolve_filter(AttributeKind::Tag, &filter.tags, namespace)?;
        let group_ids = self.resolve_filter(AttributeKind::Group, &filter.groups, namespace)?;

        let files = self.store.list_files(
            namespace.id,
            owner_user_id,
            filter.name_contains.as_deref().filter(|n| !n.is_empty()),
        )?;

        Ok(files
            .into_iter()
            .filter(|f| tag_ids.is_empty() || f.has_any_attribute(AttributeKind::Tag, &tag_ids))
            .filter(|f| {
                group_ids.is_empty() || f.has_any_attribute(AttributeKind::Group, &group_ids)
            })
            .collect())
    }

    fn resolve_filter(
        &self,
        kind: AttributeKind,
        names: &[String],
        namespace: &Namespace,
    ) -> Result<Vec<i64>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let found = self.catalog.filter_by_names(kind, names, namespace)?;
        if found.is_empty() {
            return Err(Error::not_found(format!("No matching {kind} found")));
        }
        Ok(found.iter().map(|a| a.id).collect())
    }

    fn save(&self, file: &mut File, mut next: File) -> Result<()> {
        next.updated_at = Utc::now();
        self.store.update_file(&next)?;
        *file = next;
        Ok(())
    }
}
