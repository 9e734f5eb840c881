//! `linekit_balance` v1:
//! Assembly-line balancing kernel.
//!
//! Module layout:
//! - `conf`     : constants and default presets
//! - `spec`     : row models, options, errors
//! - `group`    : walking-aware row grouper (unit IDs)
//! - `reassign` : unit moves between stations
//! - `label`    : segment labels and colour categories
//! - `summary`  : per-station workload aggregation
//! - `frame`    : DataFrame bridge and pipelines
//! - `report`   : run-time report model
pub mod conf;
pub mod frame;
pub mod group;
pub mod label;
pub mod reassign;
pub mod report;
pub mod spec;
pub mod summary;

pub use conf::{
    C_FILE_UPDATED_DEFAULT, C_WALKING_MARKER, derive_default_balance_options,
    derive_english_balance_options,
};
pub use frame::{
    SpecGroupedFrame, apply_moves_to_frame, attach_group_ids, attach_labels,
    build_grouped_frame, derive_export_dataframe, derive_rows_from_dataframe,
    replace_process_column,
};
pub use group::{
    assign_group_ids, assign_group_ids_by, derive_group_members, derive_group_stats,
    validate_rows,
};
pub use label::{derive_color_category, derive_label, format_time_value};
pub use reassign::{
    apply_moves, list_move_targets, parse_criteria_move, parse_id_list, parse_id_move,
    resolve_process_key,
};
pub use report::{ReportBalance, ReportBalanceBuilder};
pub use spec::{
    BalanceError, EnumGroupNumbering, EnumMissingKeyPolicy, EnumProcessKey, SpecBalanceOptions,
    SpecColumnNames, SpecElementRow, SpecGroupStats, SpecLineSummary, SpecStackSegment,
    SpecMoveCriteria, SpecMoveOutcome, SpecMoveRule, SpecStationLoad, SpecStationSegment,
    SpecStationStack,
};
pub use summary::{derive_station_stack, format_line_summary, summarize_station_loads};
