//! Stateless helper utilities used by the XLSX writer.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::AnyValue;

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumCellValue, SpecXlsxValuePolicy, XlsxWriteError};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Map one DataFrame cell onto a writable value.
pub fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        other => {
            if other.dtype().is_numeric()
                && let Some(x) = other.extract::<f64>()
            {
                EnumCellValue::Number(x)
            } else {
                EnumCellValue::String(other.to_string())
            }
        }
    }
}

/// Replace missing and non-finite values per policy.
///
/// With `if_keep_missing_values` off they become blanks; otherwise the policy
/// text (`NA`, `NaN`, `Inf`, `-Inf`) is written.
pub fn convert_cell_value(
    value: EnumCellValue,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None if if_keep_missing_values => {
            EnumCellValue::String(value_policy.missing_value_str.clone())
        }
        EnumCellValue::Number(x) if !x.is_finite() => {
            if !if_keep_missing_values {
                EnumCellValue::None
            } else if x.is_nan() {
                EnumCellValue::String(value_policy.nan_str.clone())
            } else if x.is_sign_positive() {
                EnumCellValue::String(value_policy.posinf_str.clone())
            } else {
                EnumCellValue::String(value_policy.neginf_str.clone())
            }
        }
        other => other,
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(value: &EnumCellValue, if_is_integer_col: bool) -> usize {
    match value {
        EnumCellValue::None => 0,
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if if_is_integer_col {
                (*n as i64).to_string().len()
            } else {
                format!("{n:.3}").len()
            }
        }
    }
}

/// Count non-ASCII characters (CJK labels) as 1.6 width units.
pub fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableValidation

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), XlsxWriteError> {
    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {:?}", l_pos.len(), l_pos))
        .collect::<Vec<_>>()
        .join("; ");
    if c_msg.is_empty() {
        return Ok(());
    }
    Err(XlsxWriteError::InvalidInput(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Reject tables that do not fit one worksheet below a single header row.
pub fn validate_table_shape(height_df: usize, width_df: usize) -> Result<(), XlsxWriteError> {
    if height_df + 1 > N_NROWS_EXCEL_MAX {
        return Err(XlsxWriteError::InvalidInput(format!(
            "Too many rows for one sheet: {height_df} (max {}).",
            N_NROWS_EXCEL_MAX - 1
        )));
    }
    if width_df > N_NCOLS_EXCEL_MAX {
        return Err(XlsxWriteError::InvalidInput(format!(
            "Too many columns for one sheet: {width_df} (max {N_NCOLS_EXCEL_MAX})."
        )));
    }
    Ok(())
}

/// Checked row index conversion.
pub fn cast_row_num(value: usize) -> Result<u32, XlsxWriteError> {
    u32::try_from(value)
        .map_err(|_| XlsxWriteError::InvalidInput(format!("row index overflow: {value}")))
}

/// Checked column index conversion.
pub fn cast_col_num(value: usize) -> Result<u16, XlsxWriteError> {
    u16::try_from(value)
        .map_err(|_| XlsxWriteError::InvalidInput(format!("column index overflow: {value}")))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name = c_name.trim().trim_matches('\'');
    if c_name.is_empty() {
        return "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Return `name`, or `name__2`, `name__3`, ... when already taken. Records the
/// returned name in `existing`. Comparison is case-insensitive, as in Excel.
pub fn derive_unique_sheet_name(name: &str, existing: &mut BTreeSet<String>) -> String {
    if existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let base_name: String = name
        .chars()
        .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 4))
        .collect();
    let mut n_idx = 2usize;
    loop {
        let candidate: String = format!("{base_name}__{n_idx}")
            .chars()
            .take(N_LEN_EXCEL_SHEET_NAME_MAX)
            .collect();
        if existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
