use std::fmt::Write;

use privilege_core::ReconcileReport;

/// Plain-text summary, one line per relationship plus a total.
pub fn render_summary(report: &ReconcileReport) -> String {
    let mut out = String::new();
    let dry_run = report.relationships.iter().any(|r| r.dry_run);
    if dry_run {
        out.push_str("DRY RUN: no records were deleted\n");
    }
    let _ = writeln!(
        out,
        "{:<16} {:>10} {:>10} {:>10} {:>10} {:>6}",
        "relationship", "scanned", "collapsed", "planned", "deleted", "ties"
    );
    for r in &report.relationships {
        let _ = writeln!(
            out,
            "{:<16} {:>10} {:>10} {:>10} {:>10} {:>6}",
            r.relationship.as_str(),
            r.pairs_scanned,
            r.pairs_reconciled,
            r.records_planned,
            r.records_deleted,
            r.ties_broken
        );
    }
    let elapsed = report.finished_at - report.started_at;
    let _ = writeln!(
        out,
        "total: {} pair(s) collapsed, {} record(s) deleted in {}ms",
        report.pairs_reconciled(),
        report.records_deleted(),
        elapsed.num_milliseconds()
    );
    out
}
