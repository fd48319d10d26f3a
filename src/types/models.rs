use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Capability;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: i64,
    pub name: String,
    /// `None` only for the shared default namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Namespace {
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.owner_user_id.is_none()
    }

    /// The default namespace counts as owned by every user.
    #[must_use]
    pub fn is_owned_by(&self, user: &User) -> bool {
        match self.owner_user_id {
            Some(owner) => owner == user.id,
            None => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub capabilities: Capability,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_url_content_bytes: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    #[serde(skip)]
    pub token_hash: String,
    #[serde(skip)]
    pub token_lookup: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Tag,
    Group,
}

impl AttributeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            AttributeKind::Tag => "tag",
            AttributeKind::Group => "group",
        }
    }

    /// Accepts both the singular and the plural form used in routes.
    pub fn parse(s: &str) -> Option<AttributeKind> {
        match s {
            "tag" | "tags" => Some(AttributeKind::Tag),
            "group" | "groups" => Some(AttributeKind::Group),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tag or group label, scoped to a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: i64,
    pub kind: AttributeKind,
    pub name: String,
    pub namespace_id: i64,
    pub owner_user_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub id: i64,
    pub name: String,
    #[serde(skip)]
    pub local_name: String,
    pub owner_user_id: i64,
    pub namespace_id: i64,
    pub size_bytes: i64,
    pub content_type: String,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_slug: Option<String>,
    pub tags: Vec<Attribute>,
    pub groups: Vec<Attribute>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl File {
    #[must_use]
    pub fn attributes(&self, kind: AttributeKind) -> &[Attribute] {
        match kind {
            AttributeKind::Tag => &self.tags,
            AttributeKind::Group => &self.groups,
        }
    }

    pub fn attributes_mut(&mut self, kind: AttributeKind) -> &mut Vec<Attribute> {
        match kind {
            AttributeKind::Tag => &mut self.tags,
            AttributeKind::Group => &mut self.groups,
        }
    }

    #[must_use]
    pub fn has_attribute(&self, kind: AttributeKind, name: &str) -> bool {
        self.attributes(kind).iter().any(|a| a.name == name)
    }

    /// True if the file carries at least one of the given attribute ids.
    #[must_use]
    pub fn has_any_attribute(&self, kind: AttributeKind, ids: &[i64]) -> bool {
        self.attributes(kind).iter().any(|a| ids.contains(&a.id))
    }

    #[must_use]
    pub fn attribute_names(&self, kind: AttributeKind) -> Vec<String> {
        self.attributes(kind).iter().map(|a| a.name.clone()).collect()
    }

    #[must_use]
    pub fn attribute_ids(&self, kind: AttributeKind) -> Vec<i64> {
        self.attributes(kind).iter().map(|a| a.id).collect()
    }
}

/// Row data for a file that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub name: String,
    pub local_name: String,
    pub owner_user_id: i64,
    pub namespace_id: i64,
    pub size_bytes: i64,
    pub content_type: String,
}
