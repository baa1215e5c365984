//! Domain types for privilege records and the relationships they live in.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PrivilegeError;

/// Ordinal privilege severity. Lower numbers are stronger privileges.
///
/// Stored values outside the named constants are kept as-is; reconciliation
/// only ever compares levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeLevel(pub i32);

impl PrivilegeLevel {
    pub const OWNER: Self = Self(1);
    pub const CHANGE: Self = Self(2);
    pub const VIEW: Self = Self(3);
    pub const NONE: Self = Self(4);

    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::OWNER => Some("owner"),
            Self::CHANGE => Some("change"),
            Self::VIEW => Some("view"),
            Self::NONE => Some("none"),
            _ => None,
        }
    }

    /// True if `self` grants strictly more than `other`.
    pub fn is_stronger_than(self, other: Self) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "level-{}", self.0),
        }
    }
}

/// Which grantee/target pairing a privilege table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relationship {
    /// A user holding a privilege over a resource.
    UserResource,
    /// A user holding a privilege over a group.
    UserGroup,
    /// A group holding a privilege over a resource.
    GroupResource,
}

impl Relationship {
    /// All relationships, in the order a full run visits them.
    pub const ALL: [Relationship; 3] = [
        Relationship::UserResource,
        Relationship::UserGroup,
        Relationship::GroupResource,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserResource => "user-resource",
            Self::UserGroup => "user-group",
            Self::GroupResource => "group-resource",
        }
    }

    pub fn grantee_kind(self) -> &'static str {
        match self {
            Self::UserResource | Self::UserGroup => "user",
            Self::GroupResource => "group",
        }
    }

    pub fn target_kind(self) -> &'static str {
        match self {
            Self::UserResource | Self::GroupResource => "resource",
            Self::UserGroup => "group",
        }
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relationship {
    type Err = PrivilegeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "user-resource" => Ok(Self::UserResource),
            "user-group" => Ok(Self::UserGroup),
            "group-resource" => Ok(Self::GroupResource),
            other => Err(PrivilegeError::InvalidInput(format!(
                "unknown relationship '{other}' (expected user-resource, user-group or group-resource)"
            ))),
        }
    }
}

/// A (grantee, target) pair within one relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub grantee: i64,
    pub target: i64,
}

impl PairKey {
    pub fn new(grantee: i64, target: i64) -> Self {
        Self { grantee, target }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.grantee, self.target)
    }
}

/// One grant row. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivilegeRecord {
    pub id: i64,
    pub grantee: i64,
    pub target: i64,
    pub privilege_level: PrivilegeLevel,
    pub granted_at: DateTime<Utc>,
    /// `None` when the grantor account no longer exists.
    pub grantor: Option<i64>,
}

impl PrivilegeRecord {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.grantee, self.target)
    }
}

impl fmt::Display for PrivilegeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} by {}",
            self.id,
            self.privilege_level,
            self.granted_at.to_rfc3339(),
            self.grantor
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".into())
        )
    }
}
