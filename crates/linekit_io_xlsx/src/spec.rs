//! Shared XLSX format, option and report models.

use polars::prelude::PolarsError;
use rust_xlsxwriter::XlsxError;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormat

/// Cell format; `None` fields inherit on merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,
    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides (0 none, 1 thin, 2 medium, 5 thick).
    pub border: Option<i64>,
    /// Number format code.
    pub num_format: Option<String>,
    /// Background fill color, `#RRGGBB`.
    pub bg_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            num_format: other.num_format.clone().or_else(|| self.num_format.clone()),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
        }
    }
}

/// Named format presets used by [`crate::writer::XlsxWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxFormats {
    /// Text body cells.
    pub text: SpecCellFormat,
    /// Integer body cells.
    pub integer: SpecCellFormat,
    /// Decimal body cells.
    pub decimal: SpecCellFormat,
    /// Header row cells.
    pub header: SpecCellFormat,
}

/// Normalized cell value during conversion/write pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/blank value.
    None,
    /// Text value.
    String(String),
    /// Numeric value.
    Number(f64),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Replacement texts for missing and non-finite values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxValuePolicy {
    /// Replacement text for missing value when keep-missing is enabled.
    pub missing_value_str: String,
    /// Replacement text for NaN.
    pub nan_str: String,
    /// Replacement text for positive infinity.
    pub posinf_str: String,
    /// Replacement text for negative infinity.
    pub neginf_str: String,
}

impl Default for SpecXlsxValuePolicy {
    fn default() -> Self {
        Self {
            missing_value_str: "NA".to_string(),
            nan_str: "NaN".to_string(),
            posinf_str: "Inf".to_string(),
            neginf_str: "-Inf".to_string(),
        }
    }
}

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only.
    Header,
    /// Infer width from both header and body cells (default).
    #[default]
    All,
}

/// Autofit policy for per-sheet write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Max body rows inspected when body-based inference is active.
    pub height_body_inferred_max: Option<usize>,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::All,
            height_body_inferred_max: Some(20_000),
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Writer-wide value conversion options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxWriteOptions {
    /// Value conversion policy.
    pub value_policy: SpecXlsxValuePolicy,
    /// Keep missing/NaN/Inf as text instead of blank.
    pub keep_missing_values: bool,
}

/// Per-sheet options for [`crate::writer::XlsxWriter::write_sheet_from_dataframe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecXlsxSheetWriteOptions {
    /// Number of frozen columns.
    pub col_freeze: usize,
    /// Freeze the header row.
    pub if_freeze_header: bool,
    /// Override writer-level keep-missing behavior.
    pub if_keep_missing_values: Option<bool>,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

impl Default for SpecXlsxSheetWriteOptions {
    fn default() -> Self {
        Self {
            col_freeze: 0,
            if_freeze_header: true,
            if_keep_missing_values: None,
            policy_autofit: SpecAutofitCellsPolicy::default(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ChartOptions

/// Stacked station-load chart options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecChartOptions {
    /// Chart title.
    pub title: String,
    /// Category (station) axis title; also the data table's first header.
    pub x_axis_title: String,
    /// Value (time) axis title.
    pub y_axis_title: String,
    /// Chart width in pixels.
    pub width: u32,
    /// Chart height in pixels.
    pub height: u32,
    /// Show the series legend.
    pub if_show_legend: bool,
    /// Show segment labels (`ID:.. | .. 秒`) on the chart.
    pub if_show_values: bool,
    /// Segment border color, `#RRGGBB`.
    pub border_color: String,
    /// Fill colours cycled over colour categories; empty uses the built-in palette.
    pub palette: Vec<String>,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reports

/// One worksheet produced by a write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetReport {
    /// Actual unique sheet name in workbook.
    pub sheet_name: String,
    /// Data rows written (header excluded).
    pub n_rows: usize,
    /// Columns written.
    pub n_cols: usize,
}

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecXlsxReport {
    /// Sheets produced by the write call.
    pub sheets: Vec<SpecSheetReport>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecXlsxReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Workbook write failures.
#[derive(Debug, Error)]
pub enum XlsxWriteError {
    /// Write or save attempted after [`crate::writer::XlsxWriter::close`].
    #[error("Cannot write after close().")]
    Closed,
    /// Input table or options rejected before writing.
    #[error("{0}")]
    InvalidInput(String),
    /// rust_xlsxwriter failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] XlsxError),
    /// DataFrame access failure.
    #[error("Failed to access cell value: {0}")]
    Polars(#[from] PolarsError),
}

/// Workbook read failures.
#[derive(Debug, Error)]
pub enum XlsxReadError {
    /// The workbook has no worksheet.
    #[error("{0}: workbook has no worksheet.")]
    NoSheet(String),
    /// calamine failure (open, parse, unsupported format).
    #[error("xlsx read error: {0}")]
    Calamine(#[from] calamine::Error),
    /// DataFrame assembly failure.
    #[error("Failed to build table: {0}")]
    Polars(#[from] PolarsError),
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
