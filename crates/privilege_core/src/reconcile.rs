//! Collapse redundant privilege records to one effective record per pair.
//!
//! Early versions of the web interface wrote a new privilege row on every
//! edit instead of updating in place. The rule here keeps, for each
//! (grantee, target) pair, the strongest privilege ever granted; among rows
//! at that level the latest grant wins. A later, weaker grant is a downgrade
//! and is never honored.
//!
//! Example, for one user over one resource:
//!
//! ```text
//!   VIEW   2016-01-01  by michael
//!   CHANGE 2016-01-02  by robert     <- kept
//!   VIEW   2016-02-01  by alva
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PrivilegeError;
use crate::policy::{ReconcilePolicy, TieBreak};
use crate::ports::{PrivilegeStore, Result};
use crate::types::{PairKey, PrivilegeLevel, PrivilegeRecord, Relationship};

/// Keep/delete decision for one pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairPlan {
    pub pair: PairKey,
    pub keep: PrivilegeRecord,
    pub delete: Vec<PrivilegeRecord>,
    /// More than one record matched both the strongest level and the latest
    /// time, so the tie-break picked the survivor.
    pub tie_broken: bool,
}

impl PairPlan {
    pub fn delete_ids(&self) -> Vec<i64> {
        self.delete.iter().map(|r| r.id).collect()
    }
}

/// Decide which record of a pair survives.
///
/// `min_level` and `max_time` are the store's aggregates over `records`:
/// the strongest level, and the latest grant time at that level. Returns
/// `None` when there is nothing to collapse.
pub fn select_survivor(
    records: &[PrivilegeRecord],
    min_level: PrivilegeLevel,
    max_time: DateTime<Utc>,
    tie_break: TieBreak,
) -> Result<Option<PairPlan>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    if records.len() == 1 {
        return Ok(None);
    }
    let pair = first.pair();
    if let Some(stray) = records.iter().find(|r| r.pair() != pair) {
        return Err(PrivilegeError::Inconsistent(format!(
            "record #{} belongs to {} but was listed under {}",
            stray.id,
            stray.pair(),
            pair
        )));
    }

    let winners: Vec<&PrivilegeRecord> = records
        .iter()
        .filter(|r| r.privilege_level == min_level && r.granted_at == max_time)
        .collect();

    let keep = match tie_break {
        TieBreak::LowestId => winners.iter().min_by_key(|r| r.id),
        TieBreak::EnumerationOrder => winners.first(),
    }
    .copied()
    .ok_or_else(|| {
        PrivilegeError::Inconsistent(format!(
            "no record of {pair} at level {min_level} granted {}",
            max_time.to_rfc3339()
        ))
    })?;

    Ok(Some(PairPlan {
        pair,
        keep: keep.clone(),
        delete: records.iter().filter(|r| r.id != keep.id).cloned().collect(),
        tie_broken: winners.len() > 1,
    }))
}

/// Outcome of reconciling one pair that needed work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub plan: PairPlan,
    /// Rows actually removed; zero on a dry run.
    pub deleted: u64,
}

/// Reconcile a single pair in place.
///
/// Returns `None` when the pair holds at most one record.
pub async fn reconcile_pair(
    store: &dyn PrivilegeStore,
    rel: Relationship,
    pair: PairKey,
    policy: &ReconcilePolicy,
) -> Result<Option<PairOutcome>> {
    let records = store.records_for_pair(rel, pair).await?;
    if records.len() <= 1 {
        return Ok(None);
    }

    let min_level = store.min_level(rel, pair).await?.ok_or_else(|| {
        PrivilegeError::Inconsistent(format!("{rel} {pair}: records present but no minimum level"))
    })?;
    let max_time = store
        .max_granted_at(rel, pair, min_level)
        .await?
        .ok_or_else(|| {
            PrivilegeError::Inconsistent(format!(
                "{rel} {pair}: no grant time at level {min_level}"
            ))
        })?;

    let Some(plan) = select_survivor(&records, min_level, max_time, policy.tie_break)? else {
        return Ok(None);
    };

    tracing::debug!(
        target: "privilege.reconcile",
        relationship = %rel,
        pair = %pair,
        records = records.len(),
        keep = %plan.keep,
        tie_broken = plan.tie_broken,
        "collapsing privilege records"
    );
    for discarded in &plan.delete {
        let downgrade = plan.keep.privilege_level.is_stronger_than(discarded.privilege_level)
            && discarded.granted_at > plan.keep.granted_at;
        tracing::debug!(
            target: "privilege.reconcile",
            relationship = %rel,
            pair = %pair,
            record = %discarded,
            downgrade,
            "discarding redundant privilege record"
        );
    }

    let deleted = if policy.dry_run {
        0
    } else {
        store.delete_records(rel, &plan.delete_ids()).await?
    };

    Ok(Some(PairOutcome { plan, deleted }))
}

/// Totals for one relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipReport {
    pub relationship: Relationship,
    /// Pairs visited (the full grantee × target cross product).
    pub pairs_scanned: u64,
    /// Pairs that held more than one record.
    pub pairs_reconciled: u64,
    /// Records the plans marked for deletion.
    pub records_planned: u64,
    /// Records actually removed.
    pub records_deleted: u64,
    pub ties_broken: u64,
    pub dry_run: bool,
}

impl RelationshipReport {
    pub fn new(relationship: Relationship, dry_run: bool) -> Self {
        Self {
            relationship,
            pairs_scanned: 0,
            pairs_reconciled: 0,
            records_planned: 0,
            records_deleted: 0,
            ties_broken: 0,
            dry_run,
        }
    }
}

/// Reconcile every pair of one relationship, sequentially.
pub async fn reconcile_relationship(
    store: &dyn PrivilegeStore,
    rel: Relationship,
    policy: &ReconcilePolicy,
) -> Result<RelationshipReport> {
    let grantees = store.list_grantees(rel).await?;
    let targets = store.list_targets(rel).await?;

    let mut report = RelationshipReport::new(rel, policy.dry_run);

    for &grantee in &grantees {
        for &target in &targets {
            report.pairs_scanned += 1;
            let Some(outcome) =
                reconcile_pair(store, rel, PairKey::new(grantee, target), policy).await?
            else {
                continue;
            };
            report.pairs_reconciled += 1;
            report.records_planned += outcome.plan.delete.len() as u64;
            report.records_deleted += outcome.deleted;
            if outcome.plan.tie_broken {
                report.ties_broken += 1;
            }
        }
    }

    tracing::info!(
        target: "privilege.reconcile",
        relationship = %rel,
        grantees = grantees.len(),
        targets = targets.len(),
        pairs_reconciled = report.pairs_reconciled,
        records_planned = report.records_planned,
        records_deleted = report.records_deleted,
        ties_broken = report.ties_broken,
        dry_run = report.dry_run,
        "relationship reconciled"
    );

    Ok(report)
}

/// Result of a full run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub relationships: Vec<RelationshipReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReconcileReport {
    pub fn records_deleted(&self) -> u64 {
        self.relationships.iter().map(|r| r.records_deleted).sum()
    }

    pub fn records_planned(&self) -> u64 {
        self.relationships.iter().map(|r| r.records_planned).sum()
    }

    pub fn pairs_reconciled(&self) -> u64 {
        self.relationships.iter().map(|r| r.pairs_reconciled).sum()
    }
}

/// Run the reconciliation over every relationship the policy selects.
///
/// Relationships are processed independently and in order; the first store
/// error aborts the run. Re-running after an abort is safe.
pub async fn run_reconciliation(
    store: &dyn PrivilegeStore,
    policy: &ReconcilePolicy,
) -> Result<ReconcileReport> {
    policy.validate()?;
    let started_at = Utc::now();

    let mut relationships = Vec::with_capacity(policy.relationships.len());
    for &rel in &policy.relationships {
        relationships.push(reconcile_relationship(store, rel, policy).await?);
    }

    let report = ReconcileReport {
        relationships,
        started_at,
        finished_at: Utc::now(),
    };

    tracing::info!(
        target: "privilege.reconcile",
        pairs_reconciled = report.pairs_reconciled(),
        records_planned = report.records_planned(),
        records_deleted = report.records_deleted(),
        tie_break = %policy.tie_break,
        dry_run = policy.dry_run,
        "reconciliation completed"
    );

    Ok(report)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::memory::MemoryPrivilegeStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    // -- Strategy helpers --

    fn arb_level() -> impl Strategy<Value = PrivilegeLevel> {
        prop_oneof![
            Just(PrivilegeLevel::OWNER),
            Just(PrivilegeLevel::CHANGE),
            Just(PrivilegeLevel::VIEW),
            Just(PrivilegeLevel::NONE),
        ]
    }

    /// A handful of distinct instants so equal timestamps show up often.
    fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..4).prop_map(|day| {
            Utc.timestamp_opt(1_451_606_400 + day * 86_400, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        })
    }

    fn arb_grants() -> impl Strategy<Value = Vec<(PrivilegeLevel, DateTime<Utc>)>> {
        prop::collection::vec((arb_level(), arb_time()), 1..8)
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(fut)
    }

    fn seeded(grants: &[(PrivilegeLevel, DateTime<Utc>)]) -> MemoryPrivilegeStore {
        let store = MemoryPrivilegeStore::new();
        for (level, time) in grants {
            store
                .grant(Relationship::UserResource, PairKey::new(1, 1), *level, *time, None)
                .expect("grant");
        }
        store
    }

    proptest! {
        /// Exactly one record survives, at the strongest level, with the
        /// latest time among records at that level.
        #[test]
        fn survivor_is_strongest_then_latest(grants in arb_grants()) {
            let store = seeded(&grants);
            block_on(run_reconciliation(&store, &ReconcilePolicy::default())).expect("run");

            let left = store.rows(Relationship::UserResource).expect("rows");
            prop_assert_eq!(left.len(), 1);

            let min_level = grants.iter().map(|(l, _)| *l).min().expect("non-empty");
            let max_time = grants
                .iter()
                .filter(|(l, _)| *l == min_level)
                .map(|(_, t)| *t)
                .max()
                .expect("non-empty");
            prop_assert_eq!(left[0].privilege_level, min_level);
            prop_assert_eq!(left[0].granted_at, max_time);
        }

        /// A second pass over reconciled data changes nothing.
        #[test]
        fn reconciliation_is_idempotent(grants in arb_grants(), by_order in any::<bool>()) {
            let policy = ReconcilePolicy {
                tie_break: if by_order { TieBreak::EnumerationOrder } else { TieBreak::LowestId },
                ..ReconcilePolicy::default()
            };
            let store = seeded(&grants);
            block_on(run_reconciliation(&store, &policy)).expect("first run");
            let once = store.rows(Relationship::UserResource).expect("rows");

            let report = block_on(run_reconciliation(&store, &policy)).expect("second run");
            prop_assert_eq!(report.records_deleted(), 0);
            prop_assert_eq!(store.rows(Relationship::UserResource).expect("rows"), once);
        }

        /// Dry-run plans agree with what a real run deletes.
        #[test]
        fn dry_run_plans_match_real_run(grants in arb_grants()) {
            let store = seeded(&grants);
            let planned = block_on(run_reconciliation(&store, &ReconcilePolicy::dry_run()))
                .expect("dry run");
            prop_assert_eq!(
                store.rows(Relationship::UserResource).expect("rows").len(),
                grants.len()
            );

            let applied = block_on(run_reconciliation(&store, &ReconcilePolicy::default()))
                .expect("run");
            prop_assert_eq!(planned.records_planned(), applied.records_deleted());
            prop_assert_eq!(applied.records_deleted(), grants.len() as u64 - 1);
        }
    }
}
