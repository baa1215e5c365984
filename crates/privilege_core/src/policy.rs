//! Run configuration for a reconciliation pass.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrivilegeError;
use crate::types::Relationship;

/// How to pick one survivor when several records share both the strongest
/// level and the latest grant time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TieBreak {
    /// Keep the winner with the smallest record id. Stable across stores.
    #[default]
    LowestId,
    /// Keep the first winner in the store's enumeration order.
    EnumerationOrder,
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LowestId => "lowest-id",
            Self::EnumerationOrder => "enumeration-order",
        })
    }
}

impl FromStr for TieBreak {
    type Err = PrivilegeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "lowest-id" => Ok(Self::LowestId),
            "enumeration-order" => Ok(Self::EnumerationOrder),
            other => Err(PrivilegeError::InvalidInput(format!(
                "unknown tie-break '{other}' (expected lowest-id or enumeration-order)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    pub tie_break: TieBreak,
    /// Plan and report, but delete nothing.
    pub dry_run: bool,
    /// Relationships to visit, in order.
    pub relationships: Vec<Relationship>,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            dry_run: false,
            relationships: Relationship::ALL.to_vec(),
        }
    }
}

impl ReconcilePolicy {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }

    /// Fails if no relationship is selected or one is listed twice.
    pub fn validate(&self) -> Result<(), PrivilegeError> {
        if self.relationships.is_empty() {
            return Err(PrivilegeError::InvalidInput(
                "no relationships selected".into(),
            ));
        }
        for (i, rel) in self.relationships.iter().enumerate() {
            if self.relationships[..i].contains(rel) {
                return Err(PrivilegeError::InvalidInput(format!(
                    "relationship {rel} listed more than once"
                )));
            }
        }
        Ok(())
    }
}
