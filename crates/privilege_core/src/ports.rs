//! Storage port for privilege tables.
//! Implemented by privilege_postgres; `MemoryPrivilegeStore` covers tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::PrivilegeError;
use crate::types::{PairKey, PrivilegeLevel, PrivilegeRecord, Relationship};

pub type Result<T> = std::result::Result<T, PrivilegeError>;

/// Read/delete access to the three privilege tables.
///
/// Every call names the `Relationship` it targets, so one store serves all
/// pairings and the reconciliation routine stays generic over them.
#[async_trait]
pub trait PrivilegeStore: Send + Sync {
    /// Every grantee that could hold a record in `rel`.
    async fn list_grantees(&self, rel: Relationship) -> Result<Vec<i64>>;

    /// Every target that could be the object of a record in `rel`.
    async fn list_targets(&self, rel: Relationship) -> Result<Vec<i64>>;

    /// All records for one pair, in the store's default enumeration order.
    async fn records_for_pair(&self, rel: Relationship, pair: PairKey)
        -> Result<Vec<PrivilegeRecord>>;

    /// Lowest (strongest) level among the pair's records.
    async fn min_level(&self, rel: Relationship, pair: PairKey) -> Result<Option<PrivilegeLevel>> {
        let records = self.records_for_pair(rel, pair).await?;
        Ok(records.iter().map(|r| r.privilege_level).min())
    }

    /// Latest grant time among the pair's records at exactly `level`.
    async fn max_granted_at(
        &self,
        rel: Relationship,
        pair: PairKey,
        level: PrivilegeLevel,
    ) -> Result<Option<DateTime<Utc>>> {
        let records = self.records_for_pair(rel, pair).await?;
        Ok(records
            .iter()
            .filter(|r| r.privilege_level == level)
            .map(|r| r.granted_at)
            .max())
    }

    /// Delete the given record ids from `rel`. Returns the number removed.
    async fn delete_records(&self, rel: Relationship, ids: &[i64]) -> Result<u64>;
}
