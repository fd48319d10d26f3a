use super::{AccessPolicy, FileManager, NamespaceRegistry};
use crate::error::{Error, Result};
use crate::store::FileQuery;
use crate::types::{File, User};

/// Addresses one live file of the requesting user.
#[derive(Debug, Clone, Default)]
pub struct FileTarget {
    pub name: String,
    pub namespace: String,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateAction {
    Update,
    Delete,
}

/// Sub-actions of an update. Absent fields are skipped.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub new_name: Option<String>,
    pub public: Option<bool>,
    pub namespace: Option<String>,
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub add_groups: Vec<String>,
    pub remove_groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(Box<File>),
    NothingToDo,
    Deleted,
}

#[derive(Clone)]
pub struct UpdateOrchestrator {
    registry: NamespaceRegistry,
    files: FileManager,
    policy: AccessPolicy,
}

impl UpdateOrchestrator {
    pub fn new(registry: NamespaceRegistry, files: FileManager, policy: AccessPolicy) -> Self {
        Self {
            registry,
            files,
            policy,
        }
    }

    /// Finds the single file `target` names. Several matches without an
    /// id is a Conflict.
    pub fn resolve_target(&self, target: &FileTarget, user: &User) -> Result<File> {
        let namespace = self.registry.resolve(&target.namespace, user)?;
        self.policy.check_write(&namespace, user)?;

        let query = FileQuery {
            name: &target.name,
            namespace_id: namespace.id,
            owner_user_id: user.id,
            id: target.id,
        };

        let count = self.files.count_matches(&query)?;
        if count > 1 && target.id.is_none() {
            return Err(Error::conflict("multiple files with same name"));
        }

        self.files
            .find_by_name(&query)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("file not found"))
    }

    pub async fn apply(
        &self,
        target: &FileTarget,
        action: UpdateAction,
        request: &UpdateRequest,
        user: &User,
    ) -> Result<UpdateOutcome> {
        let mut file = self.resolve_target(target, user)?;

        match action {
            UpdateAction::Delete => {
                self.files.delete(&file).await?;
                Ok(UpdateOutcome::Deleted)
            }
            UpdateAction::Update => {
                if self.apply_update(&mut file, request, user)? {
                    Ok(UpdateOutcome::Updated(Box::new(file)))
                } else {
                    Ok(UpdateOutcome::NothingToDo)
                }
            }
        }
    }

    /// Applies sub-actions in a fixed order and stops at the first error.
    /// Sub-actions that already ran stay applied.
    fn apply_update(&self, file: &mut File, request: &UpdateRequest, user: &User) -> Result<bool> {
        let mut did_update = false;

        if let Some(name) = request.new_name.as_deref().filter(|n| !n.is_empty()) {
            did_update |= self.files.rename(file, name)?;
        }

        if let Some(public) = request.public {
            did_update |= self.files.set_visibility(file, public)?;
        }

        if let Some(namespace) = request.namespace.as_deref().filter(|n| !n.is_empty()) {
            let target = self.registry.resolve_or_create(namespace, user)?;
            self.policy.check_write(&target, user)?;
            did_update |= self.files.migrate_namespace(file, &target, user)?;
        }

        if !request.add_tags.is_empty() {
            did_update |= self.files.add_tags(file, &request.add_tags, user)?;
        }
        if !request.remove_tags.is_empty() {
            did_update |= self.files.remove_tags(file, &request.remove_tags)?;
        }
        if !request.add_groups.is_empty() {
            did_update |= self.files.add_groups(file, &request.add_groups, user)?;
        }
        if !request.remove_groups.is_empty() {
            did_update |= self.files.remove_groups(file, &request.remove_groups)?;
        }

        if did_update {
            tracing::info!(file_id = file.id, user = %user.name, "updated file");
        }
        Ok(did_update)
    }
}
