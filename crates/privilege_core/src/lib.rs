//! privilege_core — reconciliation of redundant access-control records.
//!
//! Pure domain types, the `PrivilegeStore` port trait and the selection rule.
//! Storage adapters live in other crates; this one never touches SQL.

pub mod error;
pub mod memory;
pub mod policy;
pub mod ports;
pub mod reconcile;
pub mod types;

pub use error::PrivilegeError;
pub use memory::MemoryPrivilegeStore;
pub use policy::{ReconcilePolicy, TieBreak};
pub use ports::PrivilegeStore;
pub use reconcile::{
    reconcile_pair, reconcile_relationship, run_reconciliation, select_survivor, PairOutcome,
    PairPlan, ReconcileReport, RelationshipReport,
};
pub use types::{PairKey, PrivilegeLevel, PrivilegeRecord, Relationship};
