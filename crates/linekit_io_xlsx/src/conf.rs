//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecChartOptions, SpecXlsxFormats};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Default data sheet name.
pub const C_SHEET_DATA: &str = "data";
/// Default chart sheet name.
pub const C_SHEET_CHART: &str = "chart";

/// Build default format presets.
pub fn derive_default_xlsx_formats() -> SpecXlsxFormats {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Meiryo".to_string()),
        font_size: Some(10),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    SpecXlsxFormats {
        text: cfg_base_fmt_spec.clone(),
        integer: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        decimal: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0.0##".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        header: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            bg_color: Some("#D9E1F2".to_string()),
            ..Default::default()
        }),
    }
}

/// Chart title for the station-time plan.
pub const C_CHART_TITLE: &str = "工程別作業時間（作業位置または要素作業ごとに積み上げ）";
/// Chart title after units were moved.
pub const C_CHART_TITLE_UPDATED: &str =
    "更新後の工程別作業時間（作業位置または要素作業ごとに積み上げ）";

/// Header stem of the per-layer label columns on chart sheets.
pub const C_CHART_LABEL_HEADER: &str = "ラベル";
/// Segment fill colours, indexed by colour category.
pub const TUP_CHART_PALETTE: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Build default chart options: station-time stacked columns, 600 px tall,
/// black segment borders, no legend.
pub fn derive_default_chart_options() -> SpecChartOptions {
    SpecChartOptions {
        title: C_CHART_TITLE.to_string(),
        x_axis_title: "工程".to_string(),
        y_axis_title: "時間".to_string(),
        width: 960,
        height: 600,
        if_show_legend: false,
        if_show_values: true,
        border_color: "#000000".to_string(),
        palette: TUP_CHART_PALETTE.iter().map(ToString::to_string).collect(),
    }
}

/// Default chart options titled for the moved plan.
pub fn derive_updated_chart_options() -> SpecChartOptions {
    SpecChartOptions {
        title: C_CHART_TITLE_UPDATED.to_string(),
        ..derive_default_chart_options()
    }
}
