//! privilege_postgres — sqlx adapter for the legacy access-control tables.

pub mod store;
pub mod tables;

pub use store::PgPrivilegeStore;
pub use tables::TableSpec;

/// Schema used by the integration tests and by fresh development databases.
pub const SCHEMA_SQL: &str = include_str!("../migrations/001_privilege_tables.sql");
