//! Subcommand runners. Results go to stdout, diagnostics to the tracing log.

use std::path::Path;

use anyhow::{Context, Result, bail};
use linekit_balance::{
    ReportBalanceBuilder, SpecBalanceOptions, SpecGroupedFrame, SpecLineSummary, SpecMoveRule,
    apply_moves_to_frame, build_grouped_frame, derive_export_dataframe, derive_group_members,
    derive_station_stack, format_line_summary, list_move_targets, parse_criteria_move,
    parse_id_list, parse_id_move, resolve_process_key, summarize_station_loads,
};
use linekit_io_xlsx::{
    C_SHEET_CHART, C_SHEET_DATA, SpecChartOptions, SpecXlsxSheetWriteOptions,
    SpecXlsxWriteOptions, XlsxWriter, derive_default_chart_options, derive_default_xlsx_formats,
    derive_updated_chart_options,
};
use polars::prelude::DataFrame;
use tracing::{info, warn};

use crate::cli::{ArgsGroup, ArgsMove, ArgsSummary};
use crate::ingest::read_input_frame;

const C_SHEET_CHART_BEFORE: &str = "chart_before";
const C_SHEET_CHART_AFTER: &str = "chart_after";

////////////////////////////////////////////////////////////////////////////////
// #region Commands

pub fn run_group(args: &ArgsGroup, options: &SpecBalanceOptions) -> Result<()> {
    let df = read_input_frame(&args.input)?;
    let grouped = build_grouped_frame(&df, options).context("group element rows")?;
    let summary = summarize_station_loads(&grouped.rows, &grouped.ids, options)?;

    let mut builder = ReportBalanceBuilder::default();
    builder.add_rows(grouped.rows.len());
    builder.add_group_stats(grouped.stats);

    println!("{}", format_line_summary(&summary));
    if let Some(path) = &args.output {
        let df_export = derive_export_dataframe(&grouped.df, &options.columns)?;
        let l_charts = [(
            C_SHEET_CHART,
            &summary,
            derive_default_chart_options(),
        )];
        write_plan_workbook(path, &df_export, &l_charts, &mut builder)?;
        println!("wrote {}", path.display());
    }
    println!("{}", builder.build());
    Ok(())
}

pub fn run_move(args: &ArgsMove, options: &SpecBalanceOptions) -> Result<()> {
    let options = SpecBalanceOptions {
        if_allow_new_process: options.if_allow_new_process || args.if_allow_new_process,
        ..options.clone()
    };
    let df = read_input_frame(&args.input)?;
    let grouped = build_grouped_frame(&df, &options).context("group element rows")?;

    if args.if_list_targets {
        print_move_targets(&grouped);
        return Ok(());
    }

    let l_rules = derive_move_rules(args, &grouped, &options)?;
    if l_rules.is_empty() {
        bail!("no moves given (use --move, --ids/--to or --rule)");
    }

    let summary_before = summarize_station_loads(&grouped.rows, &grouped.ids, &options)?;
    let (grouped_moved, outcome) =
        apply_moves_to_frame(&grouped, &l_rules, &options).context("apply moves")?;
    let summary_after = summarize_station_loads(&grouped_moved.rows, &grouped_moved.ids, &options)?;

    let mut builder = ReportBalanceBuilder::default();
    builder.add_rows(grouped.rows.len());
    builder.add_group_stats(grouped.stats);
    builder.add_move_outcome(&outcome);

    for rule in &l_rules {
        println!("move {rule}");
    }
    for c_warning in &outcome.warnings {
        println!("warning: {c_warning}");
    }
    println!("{}", format_line_summary(&summary_after));

    let df_export = derive_export_dataframe(&grouped_moved.df, &options.columns)?;
    let l_charts = [
        (
            C_SHEET_CHART_BEFORE,
            &summary_before,
            derive_default_chart_options(),
        ),
        (
            C_SHEET_CHART_AFTER,
            &summary_after,
            derive_updated_chart_options(),
        ),
    ];
    write_plan_workbook(&args.output, &df_export, &l_charts, &mut builder)?;
    println!("wrote {}", args.output.display());
    println!("{}", builder.build());
    Ok(())
}

pub fn run_summary(args: &ArgsSummary, options: &SpecBalanceOptions) -> Result<()> {
    let df = read_input_frame(&args.input)?;
    let grouped = build_grouped_frame(&df, options).context("group element rows")?;
    let summary = summarize_station_loads(&grouped.rows, &grouped.ids, options)?;

    if args.if_show_segments {
        for station in &summary.stations {
            println!("[{}]", station.process);
            for segment in &station.segments {
                println!("  {}", segment.label);
            }
        }
    }
    println!("{}", format_line_summary(&summary));
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Helpers

/// Rules in command-line order: `--move`, then `--ids/--to`, then `--rule`.
fn derive_move_rules(
    args: &ArgsMove,
    grouped: &SpecGroupedFrame,
    options: &SpecBalanceOptions,
) -> Result<Vec<SpecMoveRule>> {
    let mut l_rules = Vec::new();
    for c_move in &args.moves {
        l_rules.push(parse_id_move(c_move, &grouped.rows, options)?);
    }
    if let (Some(c_ids), Some(c_to)) = (&args.ids, &args.to) {
        let to = resolve_process_key(c_to, &grouped.rows, options)?;
        for id in parse_id_list(c_ids)? {
            l_rules.push(SpecMoveRule::ById { id, to: to.clone() });
        }
    }
    for c_rule in &args.rules {
        l_rules.push(parse_criteria_move(c_rule, &grouped.rows, options)?);
    }
    Ok(l_rules)
}

fn print_move_targets(grouped: &SpecGroupedFrame) {
    for (id, l_row_idx) in derive_group_members(&grouped.ids) {
        let Some(&n_row_first) = l_row_idx.first() else {
            continue;
        };
        let current = &grouped.rows[n_row_first].process;
        let c_targets = list_move_targets(&grouped.rows, current)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!("ID {id} ({current}): {c_targets}");
    }
}

fn write_plan_workbook(
    path: &Path,
    df_export: &DataFrame,
    charts: &[(&str, &SpecLineSummary, SpecChartOptions)],
    builder: &mut ReportBalanceBuilder,
) -> Result<()> {
    let mut writer = XlsxWriter::new(
        path.to_path_buf(),
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );
    writer
        .write_sheet_from_dataframe(df_export, C_SHEET_DATA, &SpecXlsxSheetWriteOptions::default())
        .context("write data sheet")?;
    for (sheet_name, summary, chart_options) in charts {
        writer
            .write_station_chart(&derive_station_stack(summary), sheet_name, chart_options)
            .with_context(|| format!("write chart sheet {sheet_name}"))?;
    }
    for report in writer.report() {
        for c_warning in report.warnings {
            warn!(warning = %c_warning, "workbook");
            builder.add_warning(c_warning);
        }
    }
    writer
        .close()
        .with_context(|| format!("save workbook {}", path.display()))?;
    info!(file_out = %writer.file_out(), "workbook written");
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
