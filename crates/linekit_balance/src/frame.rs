//! DataFrame bridge: read element rows out of a table and write derived
//! columns (unit ID, label, colour category, moved process) into new tables.
//!
//! Input frames are never modified; every writer returns a fresh frame.

use polars::prelude::{AnyValue, Column, DataFrame};
use tracing::debug;

use crate::group::{assign_group_ids, derive_group_stats};
use crate::label::{derive_color_category, derive_label, format_time_value};
use crate::reassign::apply_moves;
use crate::spec::{
    BalanceError, EnumProcessKey, SpecBalanceOptions, SpecColumnNames, SpecElementRow,
    SpecGroupStats, SpecMoveOutcome, SpecMoveRule,
};

/// Table with unit IDs attached, plus the typed rows it was built from.
#[derive(Debug, Clone)]
pub struct SpecGroupedFrame {
    /// Input columns + ID, label and colour-category columns.
    pub df: DataFrame,
    /// Typed rows, parallel to `df`.
    pub rows: Vec<SpecElementRow>,
    /// Unit ID per row.
    pub ids: Vec<u32>,
    /// Grouping statistics.
    pub stats: SpecGroupStats,
}

////////////////////////////////////////////////////////////////////////////////
// #region CellConversion

fn derive_process_key_from_text(s: &str) -> EnumProcessKey {
    let c_text = s.trim();
    if c_text.is_empty() {
        EnumProcessKey::Missing
    } else {
        EnumProcessKey::Text(c_text.to_string())
    }
}

fn derive_process_key_from_float(x: f64) -> EnumProcessKey {
    if x.is_nan() {
        return EnumProcessKey::Missing;
    }
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        return EnumProcessKey::Integer(x as i64);
    }
    EnumProcessKey::Text(format_time_value(x))
}

/// Convert one process cell. Integral floats become integers; blank text and
/// NaN become [`EnumProcessKey::Missing`].
pub fn derive_process_key(value: AnyValue<'_>) -> EnumProcessKey {
    match value {
        AnyValue::Null => EnumProcessKey::Missing,
        AnyValue::String(val) => derive_process_key_from_text(val),
        AnyValue::StringOwned(val) => derive_process_key_from_text(val.as_str()),
        other => {
            let dtype = other.dtype();
            if dtype.is_integer()
                && let Some(n) = other.extract::<i64>()
            {
                return EnumProcessKey::Integer(n);
            }
            if dtype.is_float()
                && let Some(x) = other.extract::<f64>()
            {
                return derive_process_key_from_float(x);
            }
            derive_process_key_from_text(&other.to_string())
        }
    }
}

/// Convert one text cell; blank and null become `None`.
pub fn derive_text(value: AnyValue<'_>) -> Option<String> {
    let c_text = match value {
        AnyValue::Null => return None,
        AnyValue::String(val) => val.trim().to_string(),
        AnyValue::StringOwned(val) => val.trim().to_string(),
        other => {
            if other.dtype().is_float()
                && let Some(x) = other.extract::<f64>()
            {
                if x.is_nan() {
                    return None;
                }
                format_time_value(x)
            } else {
                other.to_string().trim().to_string()
            }
        }
    };
    if c_text.is_empty() { None } else { Some(c_text) }
}

/// Convert one duration cell. Numeric text is parsed; other text is an error.
pub fn derive_time(value: AnyValue<'_>, row_idx: usize) -> Result<Option<f64>, BalanceError> {
    let parse_text = |s: &str| -> Result<Option<f64>, BalanceError> {
        let c_text = s.trim();
        if c_text.is_empty() {
            return Ok(None);
        }
        match c_text.parse::<f64>() {
            Ok(x) if x.is_nan() => Ok(None),
            Ok(x) => Ok(Some(x)),
            Err(_) => Err(BalanceError::InvalidTime {
                row_idx,
                value: c_text.to_string(),
            }),
        }
    };

    match value {
        AnyValue::Null => Ok(None),
        AnyValue::String(val) => parse_text(val),
        AnyValue::StringOwned(val) => parse_text(val.as_str()),
        other => {
            if other.dtype().is_numeric()
                && let Some(x) = other.extract::<f64>()
            {
                return Ok(if x.is_nan() { None } else { Some(x) });
            }
            Err(BalanceError::InvalidTime {
                row_idx,
                value: other.to_string(),
            })
        }
    }
}

/// Text form of a present duration cell: integers without a fraction, floats
/// always with one (`3.0`), text as written.
pub fn derive_time_text(value: &AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(val) => Some(val.trim().to_string()),
        AnyValue::StringOwned(val) => Some(val.trim().to_string()),
        other => {
            let dtype = other.dtype();
            if dtype.is_integer() {
                other.extract::<i64>().map(|n| n.to_string())
            } else if dtype.is_float() {
                other.extract::<f64>().map(|x| format!("{x:?}"))
            } else {
                None
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region FrameToRows

fn select_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, BalanceError> {
    df.column(name)
        .map_err(|_| BalanceError::ColumnNotFound(name.to_string()))
}

fn validate_length(n_expected: usize, n_actual: usize) -> Result<(), BalanceError> {
    if n_expected != n_actual {
        return Err(BalanceError::LengthMismatch {
            expected: n_expected,
            actual: n_actual,
        });
    }
    Ok(())
}

/// Read typed element rows from `df`.
///
/// Process and task columns are required; location and time columns are
/// optional and read as absent when the table lacks them.
pub fn derive_rows_from_dataframe(
    df: &DataFrame,
    columns: &SpecColumnNames,
) -> Result<Vec<SpecElementRow>, BalanceError> {
    let col_process = select_column(df, &columns.process)?;
    let col_task = select_column(df, &columns.task)?;
    let col_location = df.column(&columns.location).ok();
    let col_time = df.column(&columns.time).ok();

    let mut l_rows = Vec::with_capacity(df.height());
    for n_idx_row in 0..df.height() {
        let location = match col_location {
            Some(col) => derive_text(col.get(n_idx_row)?),
            None => None,
        };
        let (time, time_text) = match col_time {
            Some(col) => {
                let value = col.get(n_idx_row)?;
                let time_text = derive_time_text(&value);
                match derive_time(value, n_idx_row)? {
                    Some(x) => (Some(x), time_text),
                    None => (None, None),
                }
            }
            None => (None, None),
        };
        l_rows.push(SpecElementRow {
            row_idx: n_idx_row,
            process: derive_process_key(col_process.get(n_idx_row)?),
            location,
            task: derive_text(col_task.get(n_idx_row)?),
            time,
            time_text,
        });
    }
    Ok(l_rows)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowsToFrame

/// Return `df` with the unit ID column (Int64) set.
pub fn attach_group_ids(
    df: &DataFrame,
    ids: &[u32],
    columns: &SpecColumnNames,
) -> Result<DataFrame, BalanceError> {
    validate_length(df.height(), ids.len())?;
    let l_ids: Vec<i64> = ids.iter().map(|id| i64::from(*id)).collect();

    let mut df_out = df.clone();
    df_out.with_column(Column::new(columns.id.as_str().into(), l_ids))?;
    Ok(df_out)
}

/// Return `df` with label and colour-category columns set.
pub fn attach_labels(
    df: &DataFrame,
    rows: &[SpecElementRow],
    ids: &[u32],
    options: &SpecBalanceOptions,
) -> Result<DataFrame, BalanceError> {
    validate_length(df.height(), rows.len())?;
    validate_length(rows.len(), ids.len())?;

    let l_labels: Vec<String> = rows
        .iter()
        .zip(ids)
        .map(|(row, id)| derive_label(row, *id, options))
        .collect();
    let l_categories: Vec<String> = rows
        .iter()
        .map(|row| derive_color_category(row, options))
        .collect();

    let mut df_out = df.clone();
    df_out.with_column(Column::new(options.columns.label.as_str().into(), l_labels))?;
    df_out.with_column(Column::new(
        options.columns.category.as_str().into(),
        l_categories,
    ))?;
    Ok(df_out)
}

/// Return `df` with the process column rebuilt from `rows`.
///
/// The column is Int64 when every present value is an integer, else String.
pub fn replace_process_column(
    df: &DataFrame,
    rows: &[SpecElementRow],
    columns: &SpecColumnNames,
) -> Result<DataFrame, BalanceError> {
    validate_length(df.height(), rows.len())?;

    let if_all_integer = rows.iter().all(|row| {
        matches!(
            row.process,
            EnumProcessKey::Integer(_) | EnumProcessKey::Missing
        )
    });
    let column = if if_all_integer {
        let l_values: Vec<Option<i64>> = rows
            .iter()
            .map(|row| match row.process {
                EnumProcessKey::Integer(n) => Some(n),
                _ => None,
            })
            .collect();
        Column::new(columns.process.as_str().into(), l_values)
    } else {
        let l_values: Vec<Option<String>> = rows
            .iter()
            .map(|row| match &row.process {
                EnumProcessKey::Missing => None,
                other => Some(other.to_string()),
            })
            .collect();
        Column::new(columns.process.as_str().into(), l_values)
    };

    let mut df_out = df.clone();
    df_out.with_column(column)?;
    Ok(df_out)
}

/// Drop the colour-category helper column before export.
pub fn derive_export_dataframe(
    df: &DataFrame,
    columns: &SpecColumnNames,
) -> Result<DataFrame, BalanceError> {
    let if_has_category = df
        .get_column_names_str()
        .into_iter()
        .any(|c_name| c_name == columns.category);
    if !if_has_category {
        return Ok(df.clone());
    }
    Ok(df.drop(&columns.category)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Pipelines

/// Read rows, assign unit IDs, and attach ID/label/category columns.
pub fn build_grouped_frame(
    df: &DataFrame,
    options: &SpecBalanceOptions,
) -> Result<SpecGroupedFrame, BalanceError> {
    let rows = derive_rows_from_dataframe(df, &options.columns)?;
    let ids = assign_group_ids(&rows, options)?;
    let stats = derive_group_stats(&ids);

    let df_out = attach_group_ids(df, &ids, &options.columns)?;
    let df_out = attach_labels(&df_out, &rows, &ids, options)?;
    debug!(
        cnt_rows = rows.len(),
        cnt_groups = stats.cnt_groups,
        "built grouped frame"
    );

    Ok(SpecGroupedFrame {
        df: df_out,
        rows,
        ids,
        stats,
    })
}

/// Apply moves to a grouped frame; labels and categories are rebuilt, IDs kept.
pub fn apply_moves_to_frame(
    grouped: &SpecGroupedFrame,
    rules: &[SpecMoveRule],
    options: &SpecBalanceOptions,
) -> Result<(SpecGroupedFrame, SpecMoveOutcome), BalanceError> {
    let outcome = apply_moves(&grouped.rows, &grouped.ids, rules, options)?;

    let df_out = replace_process_column(&grouped.df, &outcome.rows, &options.columns)?;
    let df_out = attach_labels(&df_out, &outcome.rows, &grouped.ids, options)?;

    let grouped_moved = SpecGroupedFrame {
        df: df_out,
        rows: outcome.rows.clone(),
        ids: grouped.ids.clone(),
        stats: grouped.stats,
    };
    Ok((grouped_moved, outcome))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
