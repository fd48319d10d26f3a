use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{
    validate_attribute_names, validate_file_name, validate_optional_namespace, validate_slug,
};
use crate::engine::{FileTarget, ListFilter, ListQuery, UpdateRequest, UploadDraft, UploadSource};
use crate::error::{Error, Result};
use crate::types::{AttributeKind, File};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadType {
    File,
    Url,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "type")]
    pub upload_type: UploadType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    /// Base64 file content, for `type: file`.
    #[serde(default)]
    pub data: Option<String>,
    /// Hex SHA-256 of the decoded content, for `type: file`.
    #[serde(default)]
    pub sum: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl UploadRequest {
    pub fn validate(&self) -> Result<()> {
        if !self.name.is_empty() {
            validate_file_name(&self.name)?;
        }
        validate_optional_namespace(&self.namespace)?;
        validate_attribute_names(&self.tags, "tag")?;
        validate_attribute_names(&self.groups, "group")?;

        match self.upload_type {
            UploadType::File => {
                if self.data.is_none() {
                    return Err(Error::validation("missing field: data"));
                }
                if self.sum.as_deref().is_none_or(str::is_empty) {
                    return Err(Error::validation("missing field: sum"));
                }
            }
            UploadType::Url => {
                if self.url.as_deref().is_none_or(str::is_empty) {
                    return Err(Error::validation("missing field: url"));
                }
            }
        }
        Ok(())
    }

    pub fn into_draft(self) -> Result<UploadDraft> {
        self.validate()?;

        let source = match self.upload_type {
            UploadType::File => {
                let data = STANDARD
                    .decode(self.data.unwrap_or_default())
                    .map_err(|e| Error::validation(format!("invalid base64 data: {e}")))?;
                UploadSource::Bytes {
                    data,
                    checksum: self.sum.unwrap_or_default(),
                }
            }
            UploadType::Url => UploadSource::Url(self.url.unwrap_or_default()),
        };

        Ok(UploadDraft {
            name: self.name,
            namespace: self.namespace,
            tags: self.tags,
            groups: self.groups,
            content_type: self.content_type,
            source,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRequest {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub verbose: u8,
}

impl ListRequest {
    pub fn validate(&self) -> Result<()> {
        validate_optional_namespace(&self.namespace)?;
        validate_attribute_names(&self.tags, "tag")?;
        validate_attribute_names(&self.groups, "group")
    }

    pub fn into_query(self) -> Result<ListQuery> {
        self.validate()?;
        Ok(ListQuery {
            namespace: self.namespace,
            filter: ListFilter {
                name_contains: self.name,
                tags: self.tags,
                groups: self.groups,
            },
            verbose: self.verbose,
        })
    }
}

/// Body of `POST /api/v1/file/{action}`.
#[derive(Debug, Default, Deserialize)]
pub struct FileActionRequest {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub id: Option<i64>,

    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub new_namespace: Option<String>,
    #[serde(default)]
    pub add_tags: Vec<String>,
    #[serde(default)]
    pub remove_tags: Vec<String>,
    #[serde(default)]
    pub add_groups: Vec<String>,
    #[serde(default)]
    pub remove_groups: Vec<String>,

    /// Requested public name, for publish.
    #[serde(default)]
    pub slug: Option<String>,
}

impl FileActionRequest {
    pub fn validate(&self) -> Result<()> {
        validate_file_name(&self.name)?;
        validate_optional_namespace(&self.namespace)?;

        if let Some(new_name) = &self.new_name {
            validate_file_name(new_name)?;
        }
        if let Some(ns) = &self.new_namespace {
            validate_optional_namespace(ns)?;
        }
        if let Some(slug) = &self.slug {
            validate_slug(slug)?;
        }
        validate_attribute_names(&self.add_tags, "tag")?;
        validate_attribute_names(&self.remove_tags, "tag")?;
        validate_attribute_names(&self.add_groups, "group")?;
        validate_attribute_names(&self.remove_groups, "group")
    }

    #[must_use]
    pub fn target(&self) -> FileTarget {
        FileTarget {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            id: self.id,
        }
    }

    #[must_use]
    pub fn update_request(&self) -> UpdateRequest {
        UpdateRequest {
            new_name: self.new_name.clone(),
            public: self.public,
            namespace: self.new_namespace.clone(),
            add_tags: self.add_tags.clone(),
            remove_tags: self.remove_tags.clone(),
            add_groups: self.add_groups.clone(),
            remove_groups: self.remove_groups.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateNamespaceRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NamespaceQuery {
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    pub namespace_id: i64,
    pub size_bytes: i64,
    pub content_type: String,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_slug: Option<String>,
    pub tags: Vec<String>,
    pub groups: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&File> for FileResponse {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            namespace_id: file.namespace_id,
            size_bytes: file.size_bytes,
            content_type: file.content_type.clone(),
            is_public: file.is_public,
            public_slug: file.public_slug.clone(),
            tags: file.attribute_names(AttributeKind::Tag),
            groups: file.attribute_names(AttributeKind::Group),
            created_at: file.created_at,
            updated_at: file.updated_at,
        }
    }
}
