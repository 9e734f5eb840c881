//! XLSX writer kernel: DataFrame sheets and stacked station-load charts.

use std::collections::BTreeSet;
use std::path::PathBuf;

use linekit_balance::{SpecStackSegment, SpecStationStack};
use polars::prelude::DataFrame;
use rust_xlsxwriter::{
    Chart, ChartDataLabel, ChartFormat, ChartLine, ChartPoint, ChartSolidFill, ChartType, Format,
    FormatAlign, FormatBorder, Workbook, Worksheet,
};
use tracing::debug;

use crate::conf::{C_CHART_LABEL_HEADER, N_NCOLS_EXCEL_MAX, TUP_CHART_PALETTE};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecCellFormat, SpecChartOptions, SpecSheetReport,
    SpecXlsxFormats, SpecXlsxReport, SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions,
    XlsxWriteError,
};
use crate::util::{
    cast_col_num, cast_row_num, convert_cell_value, derive_cell_value_from_any_value,
    derive_unique_sheet_name, estimate_unicode_string_width, estimate_width_len,
    sanitize_sheet_name, validate_table_shape, validate_unique_columns,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnumColumnKind {
    Text,
    Integer,
    Decimal,
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecXlsxFormats,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(
        path_file_out: PathBuf,
        formats: SpecXlsxFormats,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out,
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Return output file path as string.
    pub fn file_out(&self) -> String {
        self.path_file_out.to_string_lossy().to_string()
    }

    /// Return immutable snapshot of per-call write reports.
    pub fn report(&self) -> Vec<SpecXlsxReport> {
        self.l_reports.clone()
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<(), XlsxWriteError> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook.save(&self.path_file_out)?;
        self.if_closed = true;
        debug!(file_out = %self.file_out(), "workbook saved");
        Ok(())
    }

    /// Serialize the workbook without touching the output path.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        Ok(self.workbook.save_to_buffer()?)
    }

    ////////////////////////////////////////////////////////////////////////////
    // #region DataSheet

    /// Write one sheet from an in-memory dataframe, header in row 0.
    ///
    /// Integer dtypes use the integer format, other numeric dtypes the decimal
    /// format, everything else is written as text.
    pub fn write_sheet_from_dataframe(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<String, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }

        let if_keep_missing_values = options
            .if_keep_missing_values
            .unwrap_or(self.write_options.keep_missing_values);
        let value_policy = self.write_options.value_policy.clone();

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;
        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();
        validate_table_shape(n_height_df, n_width_df)?;

        let l_kind_by_col: Vec<EnumColumnKind> = df_data
            .get_columns()
            .iter()
            .map(|col| {
                let dtype = col.dtype();
                if dtype.is_integer() {
                    EnumColumnKind::Integer
                } else if dtype.is_numeric() {
                    EnumColumnKind::Decimal
                } else {
                    EnumColumnKind::Text
                }
            })
            .collect();

        let fmt_text = derive_rust_xlsx_format(&self.formats.text);
        let fmt_integer = derive_rust_xlsx_format(&self.formats.integer);
        let fmt_decimal = derive_rust_xlsx_format(&self.formats.decimal);
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);

        let sheet_name_unique = derive_unique_sheet_name(
            &sanitize_sheet_name(sheet_name, "_"),
            &mut self.set_sheet_names_existing,
        );
        let mut report = SpecXlsxReport::default();
        if sheet_name_unique != sheet_name {
            report.warn(format!(
                "Sheet name {sheet_name:?} written as {sheet_name_unique:?}."
            ));
        }

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        let mut l_width_by_col = vec![0usize; n_width_df];
        for (n_idx_col, c_name) in l_colnames_df.iter().enumerate() {
            worksheet.write_string_with_format(
                0,
                cast_col_num(n_idx_col)?,
                c_name,
                &fmt_header,
            )?;
            if options.policy_autofit.rule_columns != EnumAutofitColumnsRule::None {
                l_width_by_col[n_idx_col] = estimate_unicode_string_width(c_name);
            }
        }
        if options.if_freeze_header {
            worksheet.set_freeze_panes(1, cast_col_num(options.col_freeze)?)?;
        }

        let n_rows_inferred = match options.policy_autofit.rule_columns {
            EnumAutofitColumnsRule::All => options
                .policy_autofit
                .height_body_inferred_max
                .map_or(n_height_df, |n_max| usize::min(n_max, n_height_df)),
            _ => 0,
        };

        for (n_idx_col, col) in df_data.get_columns().iter().enumerate() {
            let kind = l_kind_by_col[n_idx_col];
            let fmt_cell = match kind {
                EnumColumnKind::Text => &fmt_text,
                EnumColumnKind::Integer => &fmt_integer,
                EnumColumnKind::Decimal => &fmt_decimal,
            };
            for n_idx_row in 0..n_height_df {
                let value = convert_cell_value(
                    derive_cell_value_from_any_value(col.get(n_idx_row)?),
                    if_keep_missing_values,
                    &value_policy,
                );
                if n_idx_row < n_rows_inferred {
                    l_width_by_col[n_idx_col] = usize::max(
                        l_width_by_col[n_idx_col],
                        estimate_width_len(&value, kind == EnumColumnKind::Integer),
                    );
                }
                write_cell_with_format(worksheet, n_idx_row + 1, n_idx_col, &value, fmt_cell)?;
            }
        }

        if options.policy_autofit.rule_columns != EnumAutofitColumnsRule::None {
            let n_min = usize::max(1, options.policy_autofit.width_cell_min);
            let n_max = usize::min(255, usize::max(n_min, options.policy_autofit.width_cell_max));
            let n_pad = options.policy_autofit.width_cell_padding;
            for (n_idx_col, n_width_recorded) in l_width_by_col.iter().enumerate() {
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
            }
        }

        debug!(
            sheet = %sheet_name_unique,
            n_rows = n_height_df,
            n_cols = n_width_df,
            "data sheet written"
        );
        report.sheets.push(SpecSheetReport {
            sheet_name: sheet_name_unique.clone(),
            n_rows: n_height_df,
            n_cols: n_width_df,
        });
        self.l_reports.push(report);
        Ok(sheet_name_unique)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
    // #region ChartSheet

    /// Write the per-row segment table and a stacked column chart over it.
    ///
    /// Column A holds the stations. Layer `k` (bottom of the bar is layer 1)
    /// gets one time column and one label column. Each layer is one chart
    /// series; its points take the fill colour of their own category and carry
    /// the row label, so two units of one category on a station stay two
    /// separately labelled segments.
    pub fn write_station_chart(
        &mut self,
        stack: &SpecStationStack,
        sheet_name: &str,
        options: &SpecChartOptions,
    ) -> Result<String, XlsxWriteError> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        let n_stations = stack.processes.len();
        if stack.segments.len() != n_stations {
            return Err(XlsxWriteError::InvalidInput(format!(
                "Stack shape mismatch: {n_stations} stations but {} segment lists.",
                stack.segments.len()
            )));
        }
        if let Some(seg) = stack
            .segments
            .iter()
            .flatten()
            .find(|seg| seg.idx_category >= stack.categories.len())
        {
            return Err(XlsxWriteError::InvalidInput(format!(
                "Segment {:?} points at category {} of {}.",
                seg.label,
                seg.idx_category,
                stack.categories.len()
            )));
        }
        let n_layers = stack.n_layers();
        let n_cols_table = 1 + 2 * n_layers;
        validate_table_shape(n_stations, n_cols_table)?;
        if n_cols_table + 1 >= N_NCOLS_EXCEL_MAX {
            return Err(XlsxWriteError::InvalidInput(format!(
                "Too many segments per station for one chart sheet: {n_layers}."
            )));
        }

        let fmt_text = derive_rust_xlsx_format(&self.formats.text);
        let fmt_decimal = derive_rust_xlsx_format(&self.formats.decimal);
        let fmt_header = derive_rust_xlsx_format(&self.formats.header);

        let sheet_name_unique = derive_unique_sheet_name(
            &sanitize_sheet_name(sheet_name, "_"),
            &mut self.set_sheet_names_existing,
        );
        let mut report = SpecXlsxReport::default();

        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet_name_unique)?;

        worksheet.write_string_with_format(0, 0, &options.x_axis_title, &fmt_header)?;
        for n_idx_layer in 0..n_layers {
            let (n_col_time, n_col_label) = derive_layer_columns(n_idx_layer, n_layers)?;
            worksheet.write_string_with_format(
                0,
                n_col_time,
                &format!("{} {}", options.y_axis_title, n_idx_layer + 1),
                &fmt_header,
            )?;
            worksheet.write_string_with_format(
                0,
                n_col_label,
                &format!("{} {}", C_CHART_LABEL_HEADER, n_idx_layer + 1),
                &fmt_header,
            )?;
        }
        for (n_idx_station, c_station) in stack.processes.iter().enumerate() {
            let n_row = cast_row_num(n_idx_station + 1)?;
            worksheet.write_string_with_format(n_row, 0, c_station, &fmt_text)?;
            for (n_idx_layer, seg) in stack.segments[n_idx_station].iter().enumerate() {
                let (n_col_time, n_col_label) = derive_layer_columns(n_idx_layer, n_layers)?;
                worksheet.write_number_with_format(n_row, n_col_time, seg.time, &fmt_decimal)?;
                worksheet.write_string_with_format(n_row, n_col_label, &seg.label, &fmt_text)?;
            }
        }

        if n_stations == 0 || n_layers == 0 {
            report.warn(format!(
                "Sheet {sheet_name_unique:?}: no station data, chart skipped."
            ));
        } else {
            let n_row_last = cast_row_num(n_stations)?;
            let mut chart = Chart::new(ChartType::ColumnStacked);
            for n_idx_layer in 0..n_layers {
                let (n_col_time, _) = derive_layer_columns(n_idx_layer, n_layers)?;
                let l_layer = stack.derive_layer(n_idx_layer);
                let series = chart
                    .add_series()
                    .set_name((sheet_name_unique.as_str(), 0, n_col_time))
                    .set_categories((sheet_name_unique.as_str(), 1, 0, n_row_last, 0))
                    .set_values((
                        sheet_name_unique.as_str(),
                        1,
                        n_col_time,
                        n_row_last,
                        n_col_time,
                    ))
                    .set_points(&derive_layer_points(&l_layer, options));
                if options.if_show_values {
                    series.set_custom_data_labels(&derive_layer_data_labels(&l_layer));
                }
            }
            chart.title().set_name(options.title.as_str());
            chart.x_axis().set_name(options.x_axis_title.as_str());
            chart.y_axis().set_name(options.y_axis_title.as_str());
            if !options.if_show_legend {
                chart.legend().set_hidden();
            }
            chart.set_width(options.width);
            chart.set_height(options.height);
            worksheet.insert_chart(0, cast_col_num(n_cols_table + 1)?, &chart)?;
        }

        worksheet.set_column_width(0, 12.0)?;
        debug!(
            sheet = %sheet_name_unique,
            n_stations,
            n_layers,
            n_categories = stack.categories.len(),
            "station chart written"
        );
        report.sheets.push(SpecSheetReport {
            sheet_name: sheet_name_unique.clone(),
            n_rows: n_stations,
            n_cols: n_cols_table,
        });
        self.l_reports.push(report);
        Ok(sheet_name_unique)
    }

    // #endregion
    ////////////////////////////////////////////////////////////////////////////
}

/// Time and label column of stack layer `idx_layer`.
fn derive_layer_columns(
    idx_layer: usize,
    n_layers: usize,
) -> Result<(u16, u16), XlsxWriteError> {
    Ok((
        cast_col_num(1 + idx_layer)?,
        cast_col_num(1 + n_layers + idx_layer)?,
    ))
}

/// One point per station: category fill plus border, or a default point where
/// the station has no segment at this layer.
fn derive_layer_points(
    layer: &[Option<&SpecStackSegment>],
    options: &SpecChartOptions,
) -> Vec<ChartPoint> {
    layer
        .iter()
        .map(|seg| match seg {
            Some(seg) => ChartPoint::new().set_format(
                ChartFormat::new()
                    .set_solid_fill(
                        ChartSolidFill::new()
                            .set_color(derive_category_color(seg.idx_category, options)),
                    )
                    .set_border(
                        ChartLine::new()
                            .set_color(options.border_color.as_str())
                            .set_width(1.0),
                    ),
            ),
            None => ChartPoint::new(),
        })
        .collect()
}

/// Segment labels; hidden where the station has no segment at this layer.
fn derive_layer_data_labels(layer: &[Option<&SpecStackSegment>]) -> Vec<ChartDataLabel> {
    layer
        .iter()
        .map(|seg| {
            let mut label = ChartDataLabel::new();
            match seg {
                Some(seg) => label.set_value(seg.label.as_str()),
                None => label.set_hidden(),
            };
            label
        })
        .collect()
}

fn derive_category_color(idx_category: usize, options: &SpecChartOptions) -> &str {
    if options.palette.is_empty() {
        return TUP_CHART_PALETTE[idx_category % TUP_CHART_PALETTE.len()];
    }
    options.palette[idx_category % options.palette.len()].as_str()
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<(), XlsxWriteError> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }
    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::{derive_default_chart_options, derive_default_xlsx_formats};
    use polars::prelude::Column;

    fn derive_writer(path: PathBuf) -> XlsxWriter {
        XlsxWriter::new(
            path,
            derive_default_xlsx_formats(),
            SpecXlsxWriteOptions::default(),
        )
    }

    fn derive_segment(time: f64, label: &str, idx_category: usize) -> SpecStackSegment {
        SpecStackSegment {
            time,
            label: label.to_string(),
            idx_category,
        }
    }

    fn derive_stack() -> SpecStationStack {
        SpecStationStack {
            processes: vec!["1".to_string(), "2".to_string()],
            categories: vec!["棚A".to_string(), "検査".to_string()],
            segments: vec![
                vec![derive_segment(3.0, "ID:3 | 棚A | 締付 | 3秒", 0)],
                vec![
                    derive_segment(2.5, "ID:2 | 棚A | 取付 | 2.5秒", 0),
                    derive_segment(4.0, "ID:1 | なし | 検査 | 4秒", 1),
                ],
            ],
        }
    }

    #[test]
    fn test_write_sheet_and_chart_to_buffer() {
        let df = DataFrame::new(vec![
            Column::new("工程".into(), &[1i64, 1, 2]),
            Column::new("要素作業".into(), &["締付", "歩行", "検査"]),
            Column::new("時間".into(), &[Some(3.0f64), None, Some(4.0)]),
        ])
        .unwrap();
        let mut writer = derive_writer(PathBuf::from("unused.xlsx"));

        let c_data = writer
            .write_sheet_from_dataframe(&df, "data", &SpecXlsxSheetWriteOptions::default())
            .unwrap();
        let c_chart = writer
            .write_station_chart(&derive_stack(), "chart", &derive_default_chart_options())
            .unwrap();
        assert_eq!(c_data, "data");
        assert_eq!(c_chart, "chart");

        let l_reports = writer.report();
        assert_eq!(l_reports.len(), 2);
        assert_eq!(l_reports[0].sheets[0].n_rows, 3);
        assert_eq!(l_reports[0].sheets[0].n_cols, 3);
        // Station column plus time and label columns for two layers.
        assert_eq!(l_reports[1].sheets[0].n_cols, 5);

        let v_bytes = writer.save_to_buffer().unwrap();
        assert!(v_bytes.starts_with(b"PK"));
    }

    #[test]
    fn test_duplicate_sheet_name_gets_suffix_and_warning() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1i64])]).unwrap();
        let mut writer = derive_writer(PathBuf::from("unused.xlsx"));
        let options = SpecXlsxSheetWriteOptions::default();

        writer.write_sheet_from_dataframe(&df, "data", &options).unwrap();
        let c_second = writer.write_sheet_from_dataframe(&df, "data", &options).unwrap();

        assert_eq!(c_second, "data__2");
        assert_eq!(writer.report()[1].warnings.len(), 1);
    }

    #[test]
    fn test_same_category_units_stay_separate_segments() {
        let stack = SpecStationStack {
            processes: vec!["S1".to_string()],
            categories: vec!["A棚".to_string()],
            segments: vec![vec![
                derive_segment(2.0, "ID:3 | A棚 | 取付 | 2秒", 0),
                derive_segment(3.0, "ID:2 | A棚 | 締付 | 3秒", 0),
            ]],
        };
        let mut writer = derive_writer(PathBuf::from("unused.xlsx"));
        writer
            .write_station_chart(&stack, "chart", &derive_default_chart_options())
            .unwrap();
        let report = &writer.report()[0];
        assert!(report.warnings.is_empty());
        assert_eq!(report.sheets[0].n_cols, 5);

        let mut expected = ChartDataLabel::new();
        expected.set_value("ID:2 | A棚 | 締付 | 3秒");
        // ChartDataLabel has no Debug impl.
        assert!(derive_layer_data_labels(&stack.derive_layer(1)) == vec![expected]);
        assert!(writer.save_to_buffer().unwrap().starts_with(b"PK"));
    }

    #[test]
    fn test_layer_labels_hide_missing_segments() {
        let stack = derive_stack();
        let l_labels = derive_layer_data_labels(&stack.derive_layer(1));

        let mut hidden = ChartDataLabel::new();
        hidden.set_hidden();
        let mut shown = ChartDataLabel::new();
        shown.set_value("ID:1 | なし | 検査 | 4秒");
        assert!(l_labels == vec![hidden, shown]);
        let l_points =
            derive_layer_points(&stack.derive_layer(1), &derive_default_chart_options());
        assert_eq!(l_points.len(), 2);
    }

    #[test]
    fn test_category_colour_cycles_palette() {
        let mut options = derive_default_chart_options();
        assert_eq!(derive_category_color(0, &options), "#636EFA");
        assert_eq!(derive_category_color(11, &options), "#EF553B");
        options.palette = vec!["#111111".to_string()];
        assert_eq!(derive_category_color(4, &options), "#111111");
        options.palette.clear();
        assert_eq!(derive_category_color(2, &options), "#00CC96");
    }

    #[test]
    fn test_empty_stack_skips_chart_with_warning() {
        let mut writer = derive_writer(PathBuf::from("unused.xlsx"));
        writer
            .write_station_chart(
                &SpecStationStack::default(),
                "chart",
                &derive_default_chart_options(),
            )
            .unwrap();
        assert!(writer.report()[0].warnings[0].contains("chart skipped"));
    }

    #[test]
    fn test_stack_shape_mismatch_is_rejected() {
        let mut stack = derive_stack();
        stack.segments.pop();
        let mut writer = derive_writer(PathBuf::from("unused.xlsx"));
        let err = writer
            .write_station_chart(&stack, "chart", &derive_default_chart_options())
            .unwrap_err();
        assert!(matches!(err, XlsxWriteError::InvalidInput(_)));

        let mut stack = derive_stack();
        stack.segments[0][0].idx_category = 5;
        let err = writer
            .write_station_chart(&stack, "chart", &derive_default_chart_options())
            .unwrap_err();
        assert!(err.to_string().contains("category 5 of 2"));
    }

    #[test]
    fn test_close_writes_file_and_blocks_further_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.xlsx");
        let mut writer = derive_writer(path.clone());
        writer
            .write_station_chart(&derive_stack(), "chart", &derive_default_chart_options())
            .unwrap();

        writer.close().unwrap();
        writer.close().unwrap();

        assert!(path.exists());
        let err = writer
            .write_station_chart(&derive_stack(), "chart", &derive_default_chart_options())
            .unwrap_err();
        assert!(matches!(err, XlsxWriteError::Closed));
    }
}
