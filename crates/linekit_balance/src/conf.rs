//! Balance constants and default preset factories.

use crate::spec::{SpecBalanceOptions, SpecColumnNames};

/// Default process/station column.
pub const C_COL_PROCESS: &str = "工程";
/// Default work location column.
pub const C_COL_LOCATION: &str = "作業位置";
/// Default element task column.
pub const C_COL_TASK: &str = "要素作業";
/// Default duration column.
pub const C_COL_TIME: &str = "時間";
/// Default unit ID column.
pub const C_COL_ID: &str = "ID";
/// Default label column.
pub const C_COL_LABEL: &str = "ラベル";
/// Default colour-category column.
pub const C_COL_CATEGORY: &str = "色分けカテゴリ";

/// Default walking task marker.
pub const C_WALKING_MARKER: &str = "歩行";
/// Label text for rows without a location.
pub const C_LABEL_MISSING_LOCATION: &str = "なし";
/// Duration suffix in labels.
pub const C_LABEL_TIME_SUFFIX: &str = "秒";
/// Separator between label fields.
pub const C_LABEL_SEPARATOR: &str = " | ";

/// Default workbook name for exported move results.
pub const C_FILE_UPDATED_DEFAULT: &str = "updated_process_plan.xlsx";

/// Build default (Japanese vocabulary) balance options.
pub fn derive_default_balance_options() -> SpecBalanceOptions {
    SpecBalanceOptions::default()
}

/// Build balance options for English column names and vocabulary.
pub fn derive_english_balance_options() -> SpecBalanceOptions {
    SpecBalanceOptions {
        columns: SpecColumnNames::english(),
        walking_marker: "walking".to_string(),
        label_missing_location: "none".to_string(),
        label_time_suffix: "s".to_string(),
        ..SpecBalanceOptions::default()
    }
}
