//! Balance run report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{SpecGroupStats, SpecMoveOutcome};

/// Aggregate counters and diagnostics for one group/move run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReportBalance {
    /// Rows read from the input table.
    pub cnt_rows: u64,
    /// Units found by the grouper.
    pub cnt_groups: u64,
    /// Walking rows folded into a following unit.
    pub cnt_walking_merged: u64,
    /// Units whose station changed.
    pub cnt_units_moved: u64,
    /// Rows whose station changed.
    pub cnt_rows_moved: u64,
    /// Non-fatal warnings (skipped moves, no-ops).
    pub warnings: Vec<String>,
}

impl ReportBalance {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_rows".to_string(), self.cnt_rows);
        dict_counts.insert("cnt_groups".to_string(), self.cnt_groups);
        dict_counts.insert("cnt_walking_merged".to_string(), self.cnt_walking_merged);
        dict_counts.insert("cnt_units_moved".to_string(), self.cnt_units_moved);
        dict_counts.insert("cnt_rows_moved".to_string(), self.cnt_rows_moved);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} rows={} groups={} walking_merged={} units_moved={} rows_moved={} warnings={}",
            self.cnt_rows,
            self.cnt_groups,
            self.cnt_walking_merged,
            self.cnt_units_moved,
            self.cnt_rows_moved,
            self.warning_count()
        )
    }
}

impl fmt::Display for ReportBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BALANCE]"))
    }
}

/// Mutable accumulator for balance statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportBalanceBuilder {
    report: ReportBalance,
}

impl ReportBalanceBuilder {
    /// Record the input row count.
    pub fn add_rows(&mut self, cnt_rows: usize) {
        self.report.cnt_rows += cnt_rows as u64;
    }

    /// Record grouping statistics.
    pub fn add_group_stats(&mut self, stats: SpecGroupStats) {
        self.report.cnt_groups += stats.cnt_groups;
        self.report.cnt_walking_merged += stats.cnt_walking_merged;
    }

    /// Record move counters and warnings.
    pub fn add_move_outcome(&mut self, outcome: &SpecMoveOutcome) {
        self.report.cnt_units_moved += outcome.cnt_units_moved;
        self.report.cnt_rows_moved += outcome.cnt_rows_moved;
        self.report
            .warnings
            .extend(outcome.warnings.iter().cloned());
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportBalance {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_balance_to_dict_and_format() {
        let mut builder = ReportBalanceBuilder::default();
        builder.add_rows(6);
        builder.add_group_stats(SpecGroupStats {
            cnt_groups: 4,
            cnt_walking_merged: 2,
        });
        builder.add_move_outcome(&SpecMoveOutcome {
            rows: vec![],
            cnt_units_moved: 1,
            cnt_rows_moved: 3,
            warnings: vec!["ID:9 does not exist; skipped.".to_string()],
        });
        let report = builder.build();

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_rows"], 6);
        assert_eq!(dict_counts["cnt_groups"], 4);
        assert_eq!(dict_counts["cnt_walking_merged"], 2);
        assert_eq!(dict_counts["cnt_units_moved"], 1);
        assert_eq!(dict_counts["cnt_rows_moved"], 3);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[BALANCE]");
        assert_eq!(
            txt,
            "[BALANCE] rows=6 groups=4 walking_merged=2 units_moved=1 rows_moved=3 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }
}
