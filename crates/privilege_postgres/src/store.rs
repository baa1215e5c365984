//! Postgres implementation of the `PrivilegeStore` port.
//!
//! All SQL is runtime-checked (sqlx::query, not sqlx::query!) so the crate
//! builds without a database. Each pair's deletion is a single statement,
//! which makes every pair atomic; an interrupted run is finished by running
//! it again.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use privilege_core::ports::{PrivilegeStore, Result};
use privilege_core::{PairKey, PrivilegeLevel, PrivilegeRecord, Relationship};

use crate::tables::{PgPrivilegeRow, TableSpec};

/// Postgres-backed privilege store covering all three relationship tables.
pub struct PgPrivilegeStore {
    pool: PgPool,
}

impl PgPrivilegeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| anyhow!("failed to connect to database: {e}"))?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn distinct_ids(&self, sql: &str) -> Result<Vec<i64>> {
        let rows = sqlx::query_as::<_, (i64,)>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl PrivilegeStore for PgPrivilegeStore {
    async fn list_grantees(&self, rel: Relationship) -> Result<Vec<i64>> {
        let spec = TableSpec::for_relationship(rel);
        self.distinct_ids(&spec.distinct_grantees_sql()).await
    }

    async fn list_targets(&self, rel: Relationship) -> Result<Vec<i64>> {
        let spec = TableSpec::for_relationship(rel);
        self.distinct_ids(&spec.distinct_targets_sql()).await
    }

    async fn records_for_pair(
        &self,
        rel: Relationship,
        pair: PairKey,
    ) -> Result<Vec<PrivilegeRecord>> {
        let spec = TableSpec::for_relationship(rel);
        let rows = sqlx::query_as::<_, PgPrivilegeRow>(&spec.pair_records_sql())
            .bind(pair.grantee)
            .bind(pair.target)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(rows.into_iter().map(PrivilegeRecord::from).collect())
    }

    async fn min_level(&self, rel: Relationship, pair: PairKey) -> Result<Option<PrivilegeLevel>> {
        let spec = TableSpec::for_relationship(rel);
        let (min,) = sqlx::query_as::<_, (Option<i32>,)>(&spec.min_level_sql())
            .bind(pair.grantee)
            .bind(pair.target)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(min.map(PrivilegeLevel))
    }

    async fn max_granted_at(
        &self,
        rel: Relationship,
        pair: PairKey,
        level: PrivilegeLevel,
    ) -> Result<Option<DateTime<Utc>>> {
        let spec = TableSpec::for_relationship(rel);
        let (max,) = sqlx::query_as::<_, (Option<DateTime<Utc>>,)>(&spec.max_start_sql())
            .bind(pair.grantee)
            .bind(pair.target)
            .bind(level.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;
        Ok(max)
    }

    async fn delete_records(&self, rel: Relationship, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let spec = TableSpec::for_relationship(rel);
        let result = sqlx::query(&spec.delete_sql())
            .bind(ids)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!(e))?;

        tracing::debug!(
            target: "privilege.postgres",
            table = spec.table,
            requested = ids.len(),
            deleted = result.rows_affected(),
            "deleted privilege rows"
        );

        Ok(result.rows_affected())
    }
}
