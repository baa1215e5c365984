//! Reconciliation against a real Postgres database.
//!
//! Each test creates a temporary database, applies the privilege table
//! schema, seeds rows and drops the database afterwards.
//!
//! Run with: DATABASE_URL="postgresql:///postgres" cargo test -p privilege_postgres --test reconcile_integration -- --ignored --nocapture

use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use privilege_core::{
    run_reconciliation, PairKey, PrivilegeLevel, PrivilegeStore, ReconcilePolicy, Relationship,
};
use privilege_postgres::{PgPrivilegeStore, TableSpec, SCHEMA_SQL};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

struct IsolatedDb {
    pool: PgPool,
    dbname: String,
    admin: PgPool,
}

async fn isolated_db() -> IsolatedDb {
    let admin_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let dbname = format!("privilege_test_{}", uuid::Uuid::new_v4().simple());

    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect_with(PgConnectOptions::from_str(&admin_url).expect("admin url parse failed"))
        .await
        .expect("admin connect failed");

    sqlx::query(&format!(r#"CREATE DATABASE "{}""#, dbname))
        .execute(&admin)
        .await
        .expect("CREATE DATABASE failed");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_with(
            PgConnectOptions::from_str(&admin_url)
                .expect("admin url parse failed")
                .database(&dbname),
        )
        .await
        .expect("test db connect failed");

    sqlx::raw_sql(SCHEMA_SQL)
        .execute(&pool)
        .await
        .expect("schema failed");

    IsolatedDb {
        pool,
        dbname,
        admin,
    }
}

async fn drop_db(iso: IsolatedDb) {
    iso.pool.close().await;
    let drop_sql = format!(r#"DROP DATABASE IF EXISTS "{}" WITH (FORCE)"#, iso.dbname);
    let _ = sqlx::query(&drop_sql).execute(&iso.admin).await;
    iso.admin.close().await;
}

fn at(month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, month, day, 12, 0, 0).unwrap()
}

async fn grant(
    pool: &PgPool,
    rel: Relationship,
    pair: PairKey,
    level: PrivilegeLevel,
    start: DateTime<Utc>,
    grantor: i64,
) {
    let spec = TableSpec::for_relationship(rel);
    let sql = format!(
        "INSERT INTO {} ({}, {}, privilege, start, grantor_id) VALUES ($1, $2, $3, $4, $5)",
        spec.table, spec.grantee_column, spec.target_column
    );
    sqlx::query(&sql)
        .bind(pair.grantee as i32)
        .bind(pair.target as i32)
        .bind(level.0 as i16)
        .bind(start)
        .bind(grantor as i32)
        .execute(pool)
        .await
        .expect("insert failed");
}

async fn count(pool: &PgPool, rel: Relationship) -> i64 {
    let spec = TableSpec::for_relationship(rel);
    let (n,) = sqlx::query_as::<_, (i64,)>(&format!("SELECT count(*) FROM {}", spec.table))
        .fetch_one(pool)
        .await
        .expect("count failed");
    n
}

#[tokio::test]
#[ignore]
async fn downgrade_scenario_keeps_change_in_every_table() {
    let iso = isolated_db().await;
    let store = PgPrivilegeStore::new(iso.pool.clone());

    for rel in Relationship::ALL {
        let pair = PairKey::new(1, 100);
        grant(&iso.pool, rel, pair, PrivilegeLevel::VIEW, at(1, 1), 11).await;
        grant(&iso.pool, rel, pair, PrivilegeLevel::CHANGE, at(1, 2), 12).await;
        grant(&iso.pool, rel, pair, PrivilegeLevel::VIEW, at(2, 1), 13).await;
        grant(&iso.pool, rel, PairKey::new(2, 100), PrivilegeLevel::OWNER, at(1, 1), 1).await;
    }

    let report = run_reconciliation(&store, &ReconcilePolicy::default())
        .await
        .expect("reconcile failed");
    assert_eq!(report.records_deleted(), 6);

    for rel in Relationship::ALL {
        assert_eq!(count(&iso.pool, rel).await, 2);
        let left = store
            .records_for_pair(rel, PairKey::new(1, 100))
            .await
            .expect("records");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].privilege_level, PrivilegeLevel::CHANGE);
        assert_eq!(left[0].granted_at, at(1, 2));
        assert_eq!(left[0].grantor, Some(12));
    }

    let again = run_reconciliation(&store, &ReconcilePolicy::default())
        .await
        .expect("second run failed");
    assert_eq!(again.records_deleted(), 0);

    drop_db(iso).await;
}

#[tokio::test]
#[ignore]
async fn sql_aggregates_and_dry_run() {
    let iso = isolated_db().await;
    let store = PgPrivilegeStore::new(iso.pool.clone());
    let rel = Relationship::UserGroup;
    let pair = PairKey::new(5, 50);

    grant(&iso.pool, rel, pair, PrivilegeLevel::OWNER, at(3, 3), 1).await;
    grant(&iso.pool, rel, pair, PrivilegeLevel::OWNER, at(3, 3), 2).await;
    grant(&iso.pool, rel, pair, PrivilegeLevel::VIEW, at(4, 4), 3).await;

    assert_eq!(
        store.min_level(rel, pair).await.expect("min"),
        Some(PrivilegeLevel::OWNER)
    );
    assert_eq!(
        store
            .max_granted_at(rel, pair, PrivilegeLevel::OWNER)
            .await
            .expect("max"),
        Some(at(3, 3))
    );

    let dry = run_reconciliation(&store, &ReconcilePolicy::dry_run())
        .await
        .expect("dry run failed");
    assert_eq!(dry.records_planned(), 2);
    assert_eq!(count(&iso.pool, rel).await, 3);

    let report = run_reconciliation(&store, &ReconcilePolicy::default())
        .await
        .expect("reconcile failed");
    assert_eq!(report.records_deleted(), 2);
    let left = store.records_for_pair(rel, pair).await.expect("records");
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].grantor, Some(1));

    drop_db(iso).await;
}
