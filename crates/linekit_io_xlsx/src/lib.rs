//! `linekit_io_xlsx` v1:
//! Workbook import and export for balanced line plans.
//!
//! Module layout:
//! - `conf`   : constants and default presets
//! - `spec`   : formats, options, reports, errors
//! - `reader` : first worksheet to DataFrame
//! - `util`   : pure helper functions
//! - `writer` : data sheets and stacked station charts
pub mod conf;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_CHART_LABEL_HEADER, C_CHART_TITLE, C_CHART_TITLE_UPDATED, C_SHEET_CHART, C_SHEET_DATA,
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_CHART_PALETTE,
    TUP_EXCEL_ILLEGAL,
    derive_default_chart_options, derive_default_xlsx_formats, derive_updated_chart_options,
};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecChartOptions, SpecSheetReport, SpecXlsxFormats, SpecXlsxReport,
    SpecXlsxSheetWriteOptions, SpecXlsxValuePolicy, SpecXlsxWriteOptions, XlsxReadError,
    XlsxWriteError,
};
pub use reader::{derive_dataframe_from_range, read_first_sheet_to_dataframe};
pub use util::{derive_unique_sheet_name, sanitize_sheet_name};
pub use writer::XlsxWriter;
