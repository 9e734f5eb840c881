//! First-worksheet reader: workbook cells to a polars DataFrame.

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};
use polars::prelude::{Column, DataFrame};
use tracing::debug;

use crate::spec::XlsxReadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnDtype {
    Empty,
    Integer,
    Decimal,
    Boolean,
    Text,
}

/// Read the first worksheet of `path`; row 0 is the header.
///
/// Numeric columns whose values are all integral become `Int64`, other numeric
/// columns `Float64`, all-boolean columns `Boolean`, anything mixed `String`.
/// Blank and error cells are null. Fully blank rows are skipped.
pub fn read_first_sheet_to_dataframe(path: &Path) -> Result<DataFrame, XlsxReadError> {
    let mut workbook = open_workbook_auto(path)?;
    let c_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| XlsxReadError::NoSheet(path.display().to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| XlsxReadError::NoSheet(path.display().to_string()))??;

    let df = derive_dataframe_from_range(&range)?;
    debug!(
        input = %path.display(),
        sheet = %c_sheet,
        n_rows = df.height(),
        n_cols = df.width(),
        "worksheet loaded"
    );
    Ok(df)
}

/// Convert a cell range (header row first) into a DataFrame.
pub fn derive_dataframe_from_range(range: &Range<Data>) -> Result<DataFrame, XlsxReadError> {
    let mut it_rows = range.rows();
    let Some(l_header) = it_rows.next() else {
        return Ok(DataFrame::empty());
    };
    let n_width = range.width();
    let l_names = derive_column_names(l_header, n_width);

    let l_body: Vec<&[Data]> = it_rows
        .filter(|l_row| l_row.iter().any(|cell| !is_blank(cell)))
        .collect();

    let l_columns = l_names
        .into_iter()
        .enumerate()
        .map(|(n_idx_col, c_name)| {
            let l_cells: Vec<&Data> = l_body
                .iter()
                .map(|l_row| l_row.get(n_idx_col).unwrap_or(&Data::Empty))
                .collect();
            derive_column(&c_name, &l_cells)
        })
        .collect::<Vec<_>>();

    Ok(DataFrame::new(l_columns)?)
}

/// Header texts; blanks become `Unnamed: {idx}` and repeats get `.1`, `.2`.
fn derive_column_names(l_header: &[Data], n_width: usize) -> Vec<String> {
    let mut dict_seen: BTreeMap<String, usize> = BTreeMap::new();
    (0..n_width)
        .map(|n_idx_col| {
            let c_base = match l_header.get(n_idx_col).and_then(derive_cell_text) {
                Some(c_text) if !c_text.trim().is_empty() => c_text.trim().to_string(),
                _ => format!("Unnamed: {n_idx_col}"),
            };
            let n_seen = dict_seen.entry(c_base.clone()).or_insert(0);
            let c_name = if *n_seen == 0 {
                c_base
            } else {
                format!("{c_base}.{n_seen}")
            };
            *n_seen += 1;
            c_name
        })
        .collect()
}

fn derive_column(c_name: &str, l_cells: &[&Data]) -> Column {
    match derive_column_dtype(l_cells) {
        EnumColumnDtype::Integer => {
            let l_values: Vec<Option<i64>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(x) => Some(*x),
                    Data::Float(x) => Some(*x as i64),
                    _ => None,
                })
                .collect();
            Column::new(c_name.into(), l_values)
        }
        EnumColumnDtype::Decimal => {
            let l_values: Vec<Option<f64>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Int(x) => Some(*x as f64),
                    Data::Float(x) => Some(*x),
                    _ => None,
                })
                .collect();
            Column::new(c_name.into(), l_values)
        }
        EnumColumnDtype::Boolean => {
            let l_values: Vec<Option<bool>> = l_cells
                .iter()
                .map(|cell| match cell {
                    Data::Bool(x) => Some(*x),
                    _ => None,
                })
                .collect();
            Column::new(c_name.into(), l_values)
        }
        EnumColumnDtype::Text | EnumColumnDtype::Empty => {
            let l_values: Vec<Option<String>> =
                l_cells.iter().map(|cell| derive_cell_text(cell)).collect();
            Column::new(c_name.into(), l_values)
        }
    }
}

fn derive_column_dtype(l_cells: &[&Data]) -> EnumColumnDtype {
    l_cells
        .iter()
        .fold(EnumColumnDtype::Empty, |dtype, cell| {
            let dtype_cell = match cell {
                Data::Empty | Data::Error(_) => return dtype,
                Data::Int(_) => EnumColumnDtype::Integer,
                Data::Float(x) if x.is_finite() && x.fract() == 0.0 => EnumColumnDtype::Integer,
                Data::Float(_) => EnumColumnDtype::Decimal,
                Data::Bool(_) => EnumColumnDtype::Boolean,
                _ => EnumColumnDtype::Text,
            };
            match (dtype, dtype_cell) {
                (EnumColumnDtype::Empty, other) => other,
                (a, b) if a == b => a,
                (EnumColumnDtype::Integer, EnumColumnDtype::Decimal)
                | (EnumColumnDtype::Decimal, EnumColumnDtype::Integer) => EnumColumnDtype::Decimal,
                _ => EnumColumnDtype::Text,
            }
        })
}

/// Text form of one cell; `None` for blanks and error cells.
fn derive_cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(val) => Some(val.clone()),
        Data::Float(x) => Some(x.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(val) => val.trim().is_empty(),
        _ => false,
    }
}
