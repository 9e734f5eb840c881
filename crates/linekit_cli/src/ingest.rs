//! Element table readers.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use linekit_io_xlsx::read_first_sheet_to_dataframe;
use polars::prelude::{CsvReadOptions, DataFrame, IpcReader, SerReader};
use tracing::debug;

/// Read a CSV (header row), workbook (first sheet, header row) or Arrow IPC
/// file, chosen by extension.
pub fn read_input_frame(path: &Path) -> Result<DataFrame> {
    let c_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let df = match c_ext.as_str() {
        "csv" => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .with_context(|| format!("read csv {}", path.display()))?,
        "ipc" | "arrow" | "feather" => {
            let file =
                File::open(path).with_context(|| format!("open {}", path.display()))?;
            IpcReader::new(file)
                .finish()
                .with_context(|| format!("read ipc {}", path.display()))?
        }
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_first_sheet_to_dataframe(path)
            .with_context(|| format!("read workbook {}", path.display()))?,
        _ => bail!(
            "{}: unsupported input type (expected .csv, .xlsx, .ipc, .arrow or .feather)",
            path.display()
        ),
    };

    debug!(
        input = %path.display(),
        n_rows = df.height(),
        n_cols = df.width(),
        "input loaded"
    );
    Ok(df)
}
