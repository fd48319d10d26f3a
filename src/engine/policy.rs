use crate::error::{Error, Result};
use crate::types::{Capability, Namespace, User};

/// How content reaches an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    File,
    Url,
}

/// Per-role capability checks and size ceilings.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn check_upload(&self, user: &User, kind: UploadKind) -> Result<()> {
        let (required, what) = match kind {
            UploadKind::File => (Capability::UPLOAD_FILES, "file"),
            UploadKind::Url => (Capability::UPLOAD_URLS, "url"),
        };

        if user.role.capabilities.has(required) {
            Ok(())
        } else {
            Err(Error::permission_denied(format!(
                "role '{}' cannot upload by {what}",
                user.role.name
            )))
        }
    }

    pub fn check_read(&self, namespace: &Namespace, user: &User) -> Result<()> {
        self.check_foreign(namespace, user, Capability::READ_FOREIGN_NAMESPACES)
    }

    pub fn check_write(&self, namespace: &Namespace, user: &User) -> Result<()> {
        self.check_foreign(namespace, user, Capability::WRITE_FOREIGN_NAMESPACES)
    }

    fn check_foreign(&self, namespace: &Namespace, user: &User, required: Capability) -> Result<()> {
        if namespace.is_owned_by(user) || user.role.capabilities.expand_implied().has(required) {
            return Ok(());
        }
        Err(Error::permission_denied(format!(
            "no access to namespace '{}'",
            namespace.name
        )))
    }

    /// Largest direct upload the user may make, if limited.
    #[must_use]
    pub fn upload_ceiling(&self, user: &User) -> Option<u64> {
        user.role.max_upload_bytes.map(|n| n.max(0) as u64)
    }

    /// Largest remote fetch the user may trigger, if limited.
    #[must_use]
    pub fn url_ceiling(&self, user: &User) -> Option<u64> {
        user.role.max_url_content_bytes.map(|n| n.max(0) as u64)
    }
}
