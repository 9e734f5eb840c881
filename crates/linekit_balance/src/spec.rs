//! Element-row models, balance options and top-level error types.

use std::fmt;

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::conf::{
    C_COL_CATEGORY, C_COL_ID, C_COL_LABEL, C_COL_LOCATION, C_COL_PROCESS, C_COL_TASK,
    C_COL_TIME, C_LABEL_MISSING_LOCATION, C_LABEL_TIME_SUFFIX, C_WALKING_MARKER,
};

////////////////////////////////////////////////////////////////////////////////
// #region ProcessKey

/// Process/station value carried by one element row.
///
/// Equality is total and reflexive: two `Missing` values are equal, `Missing`
/// never equals a present value, and `Integer(3)` differs from `Text("3")`.
/// Sort order (used for station listings) is integers, then text, then missing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumProcessKey {
    /// Numeric station identifier.
    Integer(i64),
    /// Named station.
    Text(String),
    /// Absent/blank cell.
    Missing,
}

impl EnumProcessKey {
    /// Whether the cell was absent.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl fmt::Display for EnumProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<i64> for EnumProcessKey {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for EnumProcessKey {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ElementRow

/// One work element, in input order.
///
/// Payload columns are not copied here; they stay in the source table and are
/// addressed through `row_idx`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecElementRow {
    /// Zero-based position in the source table.
    pub row_idx: usize,
    /// Station the element is assigned to.
    pub process: EnumProcessKey,
    /// Work location, if recorded.
    pub location: Option<String>,
    /// Element task name.
    pub task: Option<String>,
    /// Duration in seconds.
    pub time: Option<f64>,
    /// Duration as the source column shows it (`3` for integer columns,
    /// `3.0` for float columns). Labels fall back to `time` when absent.
    pub time_text: Option<String>,
}

impl SpecElementRow {
    /// Build a row with only the grouping fields populated.
    pub fn new(row_idx: usize, process: impl Into<EnumProcessKey>, task: &str) -> Self {
        Self {
            row_idx,
            process: process.into(),
            location: None,
            task: Some(task.to_string()),
            time: None,
            time_text: None,
        }
    }

    /// Set location.
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    /// Set duration.
    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    /// Set duration together with its source text.
    pub fn with_time_text(mut self, time: f64, time_text: &str) -> Self {
        self.time = Some(time);
        self.time_text = Some(time_text.to_string());
        self
    }

    /// Whether this row's task equals `walking_marker`. A missing task never does.
    pub fn is_walking(&self, walking_marker: &str) -> bool {
        self.task.as_deref() == Some(walking_marker)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Options

/// Column names used to read and write the element table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecColumnNames {
    /// Process/station column (required).
    pub process: String,
    /// Work location column (optional on input).
    pub location: String,
    /// Element task column (required).
    pub task: String,
    /// Duration column (optional on input).
    pub time: String,
    /// Output unit ID column.
    pub id: String,
    /// Output segment label column.
    pub label: String,
    /// Output colour-category column.
    pub category: String,
}

impl Default for SpecColumnNames {
    fn default() -> Self {
        Self {
            process: C_COL_PROCESS.to_string(),
            location: C_COL_LOCATION.to_string(),
            task: C_COL_TASK.to_string(),
            time: C_COL_TIME.to_string(),
            id: C_COL_ID.to_string(),
            label: C_COL_LABEL.to_string(),
            category: C_COL_CATEGORY.to_string(),
        }
    }
}

impl SpecColumnNames {
    /// English column preset (`process`, `location`, `task`, `time`, ...).
    pub fn english() -> Self {
        Self {
            process: "process".to_string(),
            location: "location".to_string(),
            task: "task".to_string(),
            time: "time".to_string(),
            id: "id".to_string(),
            label: "label".to_string(),
            category: "category".to_string(),
        }
    }
}

/// Handling of rows whose process or task cell is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumMissingKeyPolicy {
    /// Fail before grouping, naming the first offending row.
    #[default]
    Reject,
    /// Treat absence as a concrete value (see [`EnumProcessKey`]).
    Keep,
}

/// Unit ID numbering direction. Both are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumGroupNumbering {
    /// Unit containing the last row gets ID 1, earlier units count up.
    #[default]
    FromEnd,
    /// Unit containing the first row gets ID 1.
    FromStart,
}

/// Options for one balance run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecBalanceOptions {
    /// Table column names.
    pub columns: SpecColumnNames,
    /// Task text that marks operator walking.
    pub walking_marker: String,
    /// Missing process/task handling.
    pub rule_missing_key: EnumMissingKeyPolicy,
    /// Unit ID numbering direction.
    pub rule_numbering: EnumGroupNumbering,
    /// Label text shown for rows without a location.
    pub label_missing_location: String,
    /// Unit suffix appended to durations in labels.
    pub label_time_suffix: String,
    /// Accept move targets that are not an existing station.
    pub if_allow_new_process: bool,
}

impl Default for SpecBalanceOptions {
    fn default() -> Self {
        Self {
            columns: SpecColumnNames::default(),
            walking_marker: C_WALKING_MARKER.to_string(),
            rule_missing_key: EnumMissingKeyPolicy::Reject,
            rule_numbering: EnumGroupNumbering::FromEnd,
            label_missing_location: C_LABEL_MISSING_LOCATION.to_string(),
            label_time_suffix: C_LABEL_TIME_SUFFIX.to_string(),
            if_allow_new_process: false,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MoveRules

/// Row filter for bulk moves. Every populated field must match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecMoveCriteria {
    /// Current station of the row.
    pub from_process: Option<EnumProcessKey>,
    /// Exact work location.
    pub location: Option<String>,
    /// Exact element task.
    pub task: Option<String>,
}

impl SpecMoveCriteria {
    /// True when no field is populated.
    pub fn is_empty(&self) -> bool {
        self.from_process.is_none() && self.location.is_none() && self.task.is_none()
    }

    /// Whether `row` satisfies every populated field.
    pub fn is_matching(&self, row: &SpecElementRow) -> bool {
        self.from_process
            .as_ref()
            .is_none_or(|process| *process == row.process)
            && self
                .location
                .as_deref()
                .is_none_or(|location| row.location.as_deref() == Some(location))
            && self
                .task
                .as_deref()
                .is_none_or(|task| row.task.as_deref() == Some(task))
    }
}

/// One reassignment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecMoveRule {
    /// Move every row of unit `id` to `to`.
    ById {
        /// Unit ID.
        id: u32,
        /// Target station.
        to: EnumProcessKey,
    },
    /// Move every unit that has at least one row matching `criteria`.
    ByCriteria {
        /// Row filter.
        criteria: SpecMoveCriteria,
        /// Target station.
        to: EnumProcessKey,
    },
}

impl fmt::Display for SpecMoveRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecMoveRule::ById { id, to } => write!(f, "ID {id} -> {to}"),
            SpecMoveRule::ByCriteria { criteria, to } => {
                let mut l_parts = Vec::new();
                if let Some(process) = &criteria.from_process {
                    l_parts.push(format!("from={process}"));
                }
                if let Some(location) = &criteria.location {
                    l_parts.push(format!("location={location}"));
                }
                if let Some(task) = &criteria.task {
                    l_parts.push(format!("task={task}"));
                }
                write!(f, "[{}] -> {to}", l_parts.join(","))
            }
        }
    }
}

/// Result of applying a list of move rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecMoveOutcome {
    /// Rows after the moves, in input order.
    pub rows: Vec<SpecElementRow>,
    /// Units whose station changed.
    pub cnt_units_moved: u64,
    /// Rows whose station changed.
    pub cnt_rows_moved: u64,
    /// Skipped rules and no-ops.
    pub warnings: Vec<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SummaryModels

/// Grouping statistics for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecGroupStats {
    /// Distinct unit IDs.
    pub cnt_groups: u64,
    /// Walking rows folded into the following unit.
    pub cnt_walking_merged: u64,
}

/// One stacked segment of a station bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecStationSegment {
    /// Unit ID of the row.
    pub id: u32,
    /// Source row position.
    pub row_idx: usize,
    /// Colour category (location, else task).
    pub category: String,
    /// Segment height; missing durations count as zero.
    pub time: f64,
    /// Display label.
    pub label: String,
}

/// Workload of one station.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecStationLoad {
    /// Station key.
    pub process: EnumProcessKey,
    /// Sum of segment times.
    pub time_total: f64,
    /// Distinct units assigned to this station.
    pub cnt_units: usize,
    /// Segments in input order.
    pub segments: Vec<SpecStationSegment>,
}

/// Per-station workloads plus line-level balance figures.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecLineSummary {
    /// Stations in sorted key order.
    pub stations: Vec<SpecStationLoad>,
    /// Sum over all stations.
    pub time_total: f64,
    /// Station with the largest load (first one on ties).
    pub process_bottleneck: Option<EnumProcessKey>,
    /// Largest station load.
    pub time_bottleneck: f64,
    /// `time_total / (stations * time_bottleneck)`, 0 when undefined.
    pub ratio_balance_efficiency: f64,
}

/// One bar segment of a stacked station chart; one per element row.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecStackSegment {
    /// Segment height.
    pub time: f64,
    /// Data label shown on the segment.
    pub label: String,
    /// Index into [`SpecStationStack::categories`]; selects the fill colour.
    pub idx_category: usize,
}

/// Per-row segments of every station, feeding a stacked chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecStationStack {
    /// Station display names, chart x axis.
    pub processes: Vec<String>,
    /// Colour categories in first-seen order.
    pub categories: Vec<String>,
    /// `segments[idx_process]`, bottom of the bar first.
    pub segments: Vec<Vec<SpecStackSegment>>,
}

impl SpecStationStack {
    /// Height of the tallest stack, i.e. the number of chart series.
    pub fn n_layers(&self) -> usize {
        self.segments.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Segment at stack position `idx_layer` for every station; `None` where
    /// the station has fewer segments.
    pub fn derive_layer(&self, idx_layer: usize) -> Vec<Option<&SpecStackSegment>> {
        self.segments
            .iter()
            .map(|l_segments| l_segments.get(idx_layer))
            .collect()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Failures of balance operations (validation, table access, move requests).
#[derive(Debug, Error)]
pub enum BalanceError {
    /// A required cell is absent under [`EnumMissingKeyPolicy::Reject`].
    #[error("Row {row_idx}: missing required value in column {field:?}.")]
    MissingField {
        /// Offending row position.
        row_idx: usize,
        /// Column name.
        field: String,
    },
    /// A required column is not in the table.
    #[error("Column not found: {0:?}")]
    ColumnNotFound(String),
    /// Duration cell could not be read as a number.
    #[error("Row {row_idx}: time value {value:?} is not numeric.")]
    InvalidTime {
        /// Offending row position.
        row_idx: usize,
        /// Cell text.
        value: String,
    },
    /// ID list text is not comma-separated integers.
    #[error("IDs must be comma-separated positive integers, got {0:?}.")]
    InvalidIdList(String),
    /// Malformed move rule text or an empty criteria rule.
    #[error("Invalid move rule: {0}")]
    InvalidMoveRule(String),
    /// Move target is not an existing station.
    #[error("Unknown target process: {0:?}")]
    UnknownProcess(String),
    /// Parallel sequences disagree in length.
    #[error("Length mismatch: expected {expected} values, got {actual}.")]
    LengthMismatch {
        /// Row count.
        expected: usize,
        /// Supplied count.
        actual: usize,
    },
    /// Underlying DataFrame failure.
    #[error("DataFrame operation failed: {0}")]
    Polars(#[from] PolarsError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
