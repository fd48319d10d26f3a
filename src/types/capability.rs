use serde::{Deserialize, Serialize};

/// Capability represents a bitmask of actions a role may perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(u32);

impl Capability {
    pub const UPLOAD_FILES: Capability = Capability(1 << 0); // 1
    pub const UPLOAD_URLS: Capability = Capability(1 << 1); // 2
    pub const READ_FOREIGN_NAMESPACES: Capability = Capability(1 << 2); // 4
    pub const WRITE_FOREIGN_NAMESPACES: Capability = Capability(1 << 3); // 8

    pub const ALL: Capability = Capability(0b1111);

    /// Returns true if this bitmask contains the required capability.
    #[must_use]
    pub const fn has(self, required: Capability) -> bool {
        self.0 & required.0 == required.0
    }

    #[must_use]
    pub const fn union(self, other: Capability) -> Capability {
        Capability(self.0 | other.0)
    }

    /// Writing to foreign namespaces implies reading them.
    #[must_use]
    pub fn expand_implied(self) -> Capability {
        if self.has(Self::WRITE_FOREIGN_NAMESPACES) {
            return self.union(Self::READ_FOREIGN_NAMESPACES);
        }
        self
    }
}

impl From<i64> for Capability {
    fn from(bits: i64) -> Self {
        Self(bits as u32)
    }
}

impl From<Capability> for i64 {
    fn from(c: Capability) -> Self {
        c.0 as i64
    }
}
