//! In-memory `PrivilegeStore` for tests and dry experiments.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ports::{PrivilegeStore, Result};
use crate::types::{PairKey, PrivilegeLevel, PrivilegeRecord, Relationship};

#[derive(Default)]
struct Tables {
    rows: BTreeMap<Relationship, Vec<PrivilegeRecord>>,
    next_id: i64,
}

/// In-memory privilege tables.
///
/// Rows are kept in insertion order per relationship; that order is the
/// enumeration order `records_for_pair` reports.
pub struct MemoryPrivilegeStore {
    inner: RwLock<Tables>,
}

impl MemoryPrivilegeStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Tables {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Append a grant and return its assigned id.
    pub fn grant(
        &self,
        rel: Relationship,
        pair: PairKey,
        level: PrivilegeLevel,
        granted_at: DateTime<Utc>,
        grantor: Option<i64>,
    ) -> Result<i64> {
        let mut tables = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let id = tables.next_id;
        tables.next_id += 1;
        tables.rows.entry(rel).or_default().push(PrivilegeRecord {
            id,
            grantee: pair.grantee,
            target: pair.target,
            privilege_level: level,
            granted_at,
            grantor,
        });
        Ok(id)
    }

    /// Append a record with a caller-chosen id.
    pub fn insert(&self, rel: Relationship, record: PrivilegeRecord) -> Result<()> {
        let mut tables = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        if tables
            .rows
            .get(&rel)
            .is_some_and(|rows| rows.iter().any(|r| r.id == record.id))
        {
            return Err(anyhow!("duplicate id {} in {}", record.id, rel).into());
        }
        tables.next_id = tables.next_id.max(record.id + 1);
        tables.rows.entry(rel).or_default().push(record);
        Ok(())
    }

    /// Snapshot of every row in `rel`, in insertion order.
    pub fn rows(&self, rel: Relationship) -> Result<Vec<PrivilegeRecord>> {
        let tables = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(tables.rows.get(&rel).cloned().unwrap_or_default())
    }
}

impl Default for MemoryPrivilegeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrivilegeStore for MemoryPrivilegeStore {
    async fn list_grantees(&self, rel: Relationship) -> Result<Vec<i64>> {
        let tables = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        let ids: BTreeSet<i64> = tables
            .rows
            .get(&rel)
            .map(|rows| rows.iter().map(|r| r.grantee).collect())
            .unwrap_or_default();
        Ok(ids.into_iter().collect())
    }

    async fn list_targets(&self, rel: Relationship) -> Result<Vec<i64>> {
        let tables = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        let ids: BTreeSet<i64> = tables
            .rows
            .get(&rel)
            .map(|rows| rows.iter().map(|r| r.target).collect())
            .unwrap_or_default();
        Ok(ids.into_iter().collect())
    }

    async fn records_for_pair(
        &self,
        rel: Relationship,
        pair: PairKey,
    ) -> Result<Vec<PrivilegeRecord>> {
        let tables = self.inner.read().map_err(|e| anyhow!("Lock: {}", e))?;
        Ok(tables
            .rows
            .get(&rel)
            .map(|rows| rows.iter().filter(|r| r.pair() == pair).cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_records(&self, rel: Relationship, ids: &[i64]) -> Result<u64> {
        let mut tables = self.inner.write().map_err(|e| anyhow!("Lock: {}", e))?;
        let Some(rows) = tables.rows.get_mut(&rel) else {
            return Ok(0);
        };
        let doomed: BTreeSet<i64> = ids.iter().copied().collect();
        let before = rows.len();
        rows.retain(|r| !doomed.contains(&r.id));
        Ok((before - rows.len()) as u64)
    }
}
