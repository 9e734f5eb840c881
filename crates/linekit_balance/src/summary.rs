//! Per-station workload aggregation for stacked charts.

use std::collections::{BTreeMap, BTreeSet};

use crate::label::{derive_color_category, derive_label, format_time_value};
use crate::spec::{
    BalanceError, EnumProcessKey, SpecBalanceOptions, SpecElementRow, SpecLineSummary,
    SpecStackSegment, SpecStationLoad, SpecStationSegment, SpecStationStack,
};

/// Aggregate rows into per-station loads.
///
/// Stations come out in [`EnumProcessKey`] order, segments in row order.
/// Missing durations contribute zero height.
pub fn summarize_station_loads(
    rows: &[SpecElementRow],
    ids: &[u32],
    options: &SpecBalanceOptions,
) -> Result<SpecLineSummary, BalanceError> {
    if rows.len() != ids.len() {
        return Err(BalanceError::LengthMismatch {
            expected: rows.len(),
            actual: ids.len(),
        });
    }

    let mut dict_stations: BTreeMap<EnumProcessKey, (Vec<SpecStationSegment>, BTreeSet<u32>)> =
        BTreeMap::new();
    for (row, id) in rows.iter().zip(ids) {
        let (l_segments, set_ids) = dict_stations.entry(row.process.clone()).or_default();
        l_segments.push(SpecStationSegment {
            id: *id,
            row_idx: row.row_idx,
            category: derive_color_category(row, options),
            time: row.time.filter(|x| x.is_finite()).unwrap_or(0.0),
            label: derive_label(row, *id, options),
        });
        set_ids.insert(*id);
    }

    let stations: Vec<SpecStationLoad> = dict_stations
        .into_iter()
        .map(|(process, (segments, set_ids))| SpecStationLoad {
            process,
            time_total: segments.iter().map(|seg| seg.time).sum(),
            cnt_units: set_ids.len(),
            segments,
        })
        .collect();

    let time_total: f64 = stations.iter().map(|station| station.time_total).sum();
    let mut process_bottleneck = None;
    let mut time_bottleneck = 0.0;
    for station in &stations {
        if process_bottleneck.is_none() || station.time_total > time_bottleneck {
            process_bottleneck = Some(station.process.clone());
            time_bottleneck = station.time_total;
        }
    }

    let ratio_balance_efficiency = if stations.is_empty() || time_bottleneck <= 0.0 {
        0.0
    } else {
        time_total / (stations.len() as f64 * time_bottleneck)
    };

    Ok(SpecLineSummary {
        stations,
        time_total,
        process_bottleneck,
        time_bottleneck,
        ratio_balance_efficiency,
    })
}

/// One chart segment per element row, stacked in row order per station.
///
/// Rows sharing a colour category stay separate segments so every unit keeps
/// its own label.
pub fn derive_station_stack(summary: &SpecLineSummary) -> SpecStationStack {
    let mut categories: Vec<String> = Vec::new();
    let mut processes = Vec::with_capacity(summary.stations.len());
    let mut segments = Vec::with_capacity(summary.stations.len());

    for station in &summary.stations {
        let mut l_segments = Vec::with_capacity(station.segments.len());
        for seg in &station.segments {
            let idx_category = match categories.iter().position(|c| *c == seg.category) {
                Some(n_idx) => n_idx,
                None => {
                    categories.push(seg.category.clone());
                    categories.len() - 1
                }
            };
            l_segments.push(SpecStackSegment {
                time: seg.time,
                label: seg.label.clone(),
                idx_category,
            });
        }
        processes.push(station.process.to_string());
        segments.push(l_segments);
    }

    SpecStationStack {
        processes,
        categories,
        segments,
    }
}

/// One line per station, e.g. `S1: 12 (2 units)`, followed by line totals.
pub fn format_line_summary(summary: &SpecLineSummary) -> String {
    let mut l_lines: Vec<String> = summary
        .stations
        .iter()
        .map(|station| {
            format!(
                "{}: {} ({} units)",
                station.process,
                format_time_value(station.time_total),
                station.cnt_units
            )
        })
        .collect();

    let c_bottleneck = summary
        .process_bottleneck
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "-".to_string());
    l_lines.push(format!(
        "total={} bottleneck={} ({}) efficiency={:.1}%",
        format_time_value(summary.time_total),
        c_bottleneck,
        format_time_value(summary.time_bottleneck),
        summary.ratio_balance_efficiency * 100.0
    ));
    l_lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_rows() -> Vec<SpecElementRow> {
        vec![
            SpecElementRow::new(0, "S2", "取出").with_location("A棚").with_time(5.0),
            SpecElementRow::new(1, "S2", "歩行").with_time(2.0),
            SpecElementRow::new(2, "S1", "締付").with_location("B台").with_time(4.0),
            SpecElementRow::new(3, "S1", "締付").with_location("A棚").with_time(3.0),
        ]
    }

    #[test]
    fn test_summarize_station_loads_sorted_with_totals() {
        let rows = build_rows();
        let ids = vec![4, 3, 2, 1];
        let summary =
            summarize_station_loads(&rows, &ids, &SpecBalanceOptions::default()).expect("summary");

        assert_eq!(summary.stations.len(), 2);
        assert_eq!(summary.stations[0].process, EnumProcessKey::from("S1"));
        assert_eq!(summary.stations[0].time_total, 7.0);
        assert_eq!(summary.stations[0].cnt_units, 2);
        assert_eq!(summary.stations[1].time_total, 7.0);
        assert_eq!(summary.stations[1].segments[1].label, "ID:3 | なし | 歩行 | 2秒");

        assert_eq!(summary.time_total, 14.0);
        // Ties keep the first station.
        assert_eq!(summary.process_bottleneck, Some(EnumProcessKey::from("S1")));
        assert_eq!(summary.ratio_balance_efficiency, 1.0);
    }

    #[test]
    fn test_balance_efficiency_for_uneven_line() {
        let rows = vec![
            SpecElementRow::new(0, "S1", "a").with_time(10.0),
            SpecElementRow::new(1, "S2", "b").with_time(5.0),
        ];
        let summary = summarize_station_loads(&rows, &[2, 1], &SpecBalanceOptions::default())
            .expect("summary");
        assert_eq!(summary.process_bottleneck, Some(EnumProcessKey::from("S1")));
        assert_eq!(summary.ratio_balance_efficiency, 0.75);
        assert!(format_line_summary(&summary).ends_with("efficiency=75.0%"));
    }

    #[test]
    fn test_summarize_empty_and_mismatch() {
        let options = SpecBalanceOptions::default();
        let summary = summarize_station_loads(&[], &[], &options).expect("summary");
        assert!(summary.stations.is_empty());
        assert_eq!(summary.process_bottleneck, None);
        assert_eq!(summary.ratio_balance_efficiency, 0.0);

        let err = summarize_station_loads(&build_rows(), &[1], &options).unwrap_err();
        assert!(matches!(
            err,
            BalanceError::LengthMismatch {
                expected: 4,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_derive_station_stack() {
        let rows = build_rows();
        let summary =
            summarize_station_loads(&rows, &[4, 3, 2, 1], &SpecBalanceOptions::default())
                .expect("summary");
        let stack = derive_station_stack(&summary);

        assert_eq!(stack.processes, vec!["S1", "S2"]);
        assert_eq!(stack.categories, vec!["B台", "A棚", "歩行"]);
        assert_eq!(stack.n_layers(), 2);
        assert_eq!(stack.segments[0][1].idx_category, 1);
        assert_eq!(stack.segments[1][0].idx_category, 1);
        assert_eq!(stack.segments[1][1].label, "ID:3 | なし | 歩行 | 2秒");
    }

    #[test]
    fn test_station_stack_keeps_same_category_units_apart() {
        let rows = vec![
            SpecElementRow::new(0, "S1", "取出").with_location("A棚").with_time(3.0),
            SpecElementRow::new(1, "S1", "締付").with_location("A棚").with_time(4.0),
            SpecElementRow::new(2, "S2", "検査").with_location("C台").with_time(5.0),
        ];
        let summary =
            summarize_station_loads(&rows, &[3, 2, 1], &SpecBalanceOptions::default())
                .expect("summary");
        let stack = derive_station_stack(&summary);

        assert_eq!(stack.categories, vec!["A棚", "C台"]);
        assert_eq!(stack.segments[0].len(), 2);
        assert_eq!(stack.segments[0][0].label, "ID:3 | A棚 | 取出 | 3秒");
        assert_eq!(stack.segments[0][1].label, "ID:2 | A棚 | 締付 | 4秒");
        assert_eq!(stack.segments[0][0].idx_category, stack.segments[0][1].idx_category);

        let l_layer = stack.derive_layer(1);
        assert_eq!(l_layer[0].map(|seg| seg.time), Some(4.0));
        assert!(l_layer[1].is_none());
    }
}
