//! Table and column names for each relationship, plus the row shape.

use chrono::{DateTime, Utc};
use privilege_core::{PrivilegeLevel, PrivilegeRecord, Relationship};

/// Where one relationship's records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    pub table: &'static str,
    pub grantee_column: &'static str,
    pub target_column: &'static str,
}

impl TableSpec {
    pub fn for_relationship(rel: Relationship) -> Self {
        match rel {
            Relationship::UserResource => Self {
                table: "hs_access_control_userresourceprivilege",
                grantee_column: "user_id",
                target_column: "resource_id",
            },
            Relationship::UserGroup => Self {
                table: "hs_access_control_usergroupprivilege",
                grantee_column: "user_id",
                target_column: "group_id",
            },
            Relationship::GroupResource => Self {
                table: "hs_access_control_groupresourceprivilege",
                grantee_column: "group_id",
                target_column: "resource_id",
            },
        }
    }

    pub(crate) fn distinct_grantees_sql(&self) -> String {
        format!(
            "SELECT DISTINCT {g}::bigint FROM {t} ORDER BY 1",
            g = self.grantee_column,
            t = self.table
        )
    }

    pub(crate) fn distinct_targets_sql(&self) -> String {
        format!(
            "SELECT DISTINCT {c}::bigint FROM {t} ORDER BY 1",
            c = self.target_column,
            t = self.table
        )
    }

    /// Records for one pair, primary-key order.
    pub(crate) fn pair_records_sql(&self) -> String {
        format!(
            r#"
            SELECT id::bigint AS id,
                   {g}::bigint AS grantee,
                   {c}::bigint AS target,
                   privilege::int4 AS privilege,
                   start,
                   grantor_id::bigint AS grantor
            FROM {t}
            WHERE {g} = $1 AND {c} = $2
            ORDER BY id
            "#,
            g = self.grantee_column,
            c = self.target_column,
            t = self.table
        )
    }

    pub(crate) fn min_level_sql(&self) -> String {
        format!(
            "SELECT MIN(privilege)::int4 FROM {t} WHERE {g} = $1 AND {c} = $2",
            g = self.grantee_column,
            c = self.target_column,
            t = self.table
        )
    }

    pub(crate) fn max_start_sql(&self) -> String {
        format!(
            "SELECT MAX(start) FROM {t} WHERE {g} = $1 AND {c} = $2 AND privilege = $3",
            g = self.grantee_column,
            c = self.target_column,
            t = self.table
        )
    }

    pub(crate) fn delete_sql(&self) -> String {
        format!("DELETE FROM {t} WHERE id = ANY($1)", t = self.table)
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PgPrivilegeRow {
    pub id: i64,
    pub grantee: i64,
    pub target: i64,
    pub privilege: i32,
    pub start: DateTime<Utc>,
    pub grantor: Option<i64>,
}

impl From<PgPrivilegeRow> for PrivilegeRecord {
    fn from(row: PgPrivilegeRow) -> Self {
        Self {
            id: row.id,
            grantee: row.grantee,
            target: row.target,
            privilege_level: PrivilegeLevel(row.privilege),
            granted_at: row.start,
            grantor: row.grantor,
        }
    }
}
