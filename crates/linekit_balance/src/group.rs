//! Row grouper: assigns unit IDs to element rows.
//!
//! A walking row joins the unit of the row right after it when both rows share
//! a process. Joins chain through consecutive walking rows. The last row always
//! opens its own unit.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::spec::{
    BalanceError, EnumGroupNumbering, EnumMissingKeyPolicy, SpecBalanceOptions, SpecElementRow,
    SpecGroupStats,
};

/// Marks a row whose ID is taken from its successor.
const N_ID_DEFERRED: u32 = 0;

////////////////////////////////////////////////////////////////////////////////
// #region GroupingKernel

/// Assign unit IDs with caller-supplied walking/process predicates.
///
/// Two passes:
/// 1. Backward: rows that open a unit take the next counter value (starting
///    at 1); walking rows whose successor shares their process are deferred.
/// 2. Fill: deferred rows copy their successor's ID.
///
/// The unit containing the last row gets ID 1.
pub fn assign_group_ids_by<T, W, S>(items: &[T], is_walking: W, is_same_process: S) -> Vec<u32>
where
    W: Fn(&T) -> bool,
    S: Fn(&T, &T) -> bool,
{
    let n_rows = items.len();
    let mut l_ids = vec![N_ID_DEFERRED; n_rows];

    let mut n_id_next: u32 = 1;
    for n_idx in (0..n_rows).rev() {
        let if_defer = n_idx + 1 < n_rows
            && is_walking(&items[n_idx])
            && is_same_process(&items[n_idx], &items[n_idx + 1]);
        if !if_defer {
            l_ids[n_idx] = n_id_next;
            n_id_next += 1;
        }
    }

    // Descending order so a chain of deferred rows always reads a resolved successor.
    for n_idx in (0..n_rows).rev() {
        if l_ids[n_idx] == N_ID_DEFERRED {
            l_ids[n_idx] = l_ids[n_idx + 1];
        }
    }

    l_ids
}

/// Renumber IDs produced by [`assign_group_ids_by`] so the first unit gets 1.
pub fn renumber_from_start(ids: &[u32]) -> Vec<u32> {
    let Some(n_id_max) = ids.iter().copied().max() else {
        return vec![];
    };
    ids.iter().map(|id| n_id_max + 1 - id).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ElementRowGrouping

/// Check that every row carries the fields grouping compares.
///
/// Under [`EnumMissingKeyPolicy::Reject`] the first row with a missing process
/// or task fails the call; under `Keep` every row passes.
pub fn validate_rows(
    rows: &[SpecElementRow],
    options: &SpecBalanceOptions,
) -> Result<(), BalanceError> {
    if options.rule_missing_key == EnumMissingKeyPolicy::Keep {
        return Ok(());
    }

    for row in rows {
        if row.process.is_missing() {
            return Err(BalanceError::MissingField {
                row_idx: row.row_idx,
                field: options.columns.process.clone(),
            });
        }
        if row.task.is_none() {
            return Err(BalanceError::MissingField {
                row_idx: row.row_idx,
                field: options.columns.task.clone(),
            });
        }
    }
    Ok(())
}

/// Validate `rows` and assign one unit ID per row.
///
/// The input is not modified; the returned vector is parallel to `rows`.
pub fn assign_group_ids(
    rows: &[SpecElementRow],
    options: &SpecBalanceOptions,
) -> Result<Vec<u32>, BalanceError> {
    validate_rows(rows, options)?;

    let c_walking_marker = options.walking_marker.trim();
    let l_ids = assign_group_ids_by(
        rows,
        |row| row.is_walking(c_walking_marker),
        |row, row_next| row.process == row_next.process,
    );

    let l_ids = match options.rule_numbering {
        EnumGroupNumbering::FromEnd => l_ids,
        EnumGroupNumbering::FromStart => renumber_from_start(&l_ids),
    };

    debug!(
        cnt_rows = rows.len(),
        cnt_groups = count_groups(&l_ids),
        walking_marker = c_walking_marker,
        "assigned unit ids"
    );
    Ok(l_ids)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region GroupInspection

fn count_groups(ids: &[u32]) -> usize {
    ids.iter().collect::<BTreeSet<_>>().len()
}

/// Row positions per unit ID, positions ascending.
pub fn derive_group_members(ids: &[u32]) -> BTreeMap<u32, Vec<usize>> {
    let mut dict_members: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for (n_idx_row, id) in ids.iter().enumerate() {
        dict_members.entry(*id).or_default().push(n_idx_row);
    }
    dict_members
}

/// Unit count and number of walking rows folded into a following unit.
pub fn derive_group_stats(ids: &[u32]) -> SpecGroupStats {
    let n_groups = count_groups(ids);
    SpecGroupStats {
        cnt_groups: n_groups as u64,
        // Every fold removes exactly one would-be unit.
        cnt_walking_merged: (ids.len() - n_groups) as u64,
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::spec::{EnumProcessKey, SpecElementRow};

    const WALK: &str = "歩行";

    fn build_rows(items: &[(&str, &str)]) -> Vec<SpecElementRow> {
        items
            .iter()
            .enumerate()
            .map(|(n_idx, (process, task))| SpecElementRow::new(n_idx, *process, task))
            .collect()
    }

    /// Sizes of maximal runs of equal IDs, in row order.
    fn derive_run_sizes(ids: &[u32]) -> Vec<usize> {
        let mut l_sizes: Vec<usize> = Vec::new();
        for (n_idx, id) in ids.iter().enumerate() {
            if n_idx > 0 && ids[n_idx - 1] == *id {
                if let Some(last) = l_sizes.last_mut() {
                    *last += 1;
                }
            } else {
                l_sizes.push(1);
            }
        }
        l_sizes
    }

    #[rstest]
    #[case::empty(vec![], vec![])]
    #[case::single_walking(vec![("S1", WALK)], vec![1])]
    #[case::single_work(vec![("S1", "組付")], vec![1])]
    #[case::walk_then_other_process(
        vec![("S1", "組付"), ("S1", WALK), ("S1", WALK), ("S2", "組付")],
        vec![1, 2, 1]
    )]
    #[case::walking_chain_into_anchor(
        vec![("S1", WALK), ("S1", WALK), ("S1", "締付")],
        vec![3]
    )]
    #[case::trailing_walk(vec![("S1", "締付"), ("S1", WALK)], vec![1, 1])]
    #[case::work_rows_never_merge(vec![("S1", "締付"), ("S1", "締付")], vec![1, 1])]
    #[case::mixed(
        vec![
            ("S1", WALK),
            ("S1", "取出"),
            ("S2", WALK),
            ("S2", WALK),
            ("S2", "締付"),
            ("S2", WALK),
            ("S3", "検査"),
        ],
        vec![2, 3, 1, 1]
    )]
    fn test_assign_group_ids_run_sizes(
        #[case] items: Vec<(&str, &str)>,
        #[case] sizes_expected: Vec<usize>,
    ) {
        let rows = build_rows(&items);
        let ids = assign_group_ids(&rows, &SpecBalanceOptions::default()).expect("group");
        assert_eq!(ids.len(), rows.len());
        assert!(ids.iter().all(|id| *id >= 1));
        assert_eq!(derive_run_sizes(&ids), sizes_expected);
        assert_eq!(count_groups(&ids), sizes_expected.len());
    }

    #[test]
    fn test_walk_rows_merge_with_next_same_process_row_only() {
        let rows = build_rows(&[
            ("S1", "組付"),
            ("S1", WALK),
            ("S1", WALK),
            ("S2", "組付"),
        ]);
        let ids = assign_group_ids(&rows, &SpecBalanceOptions::default()).expect("group");

        assert_ne!(ids[0], ids[1]);
        assert_eq!(ids[1], ids[2]);
        assert_ne!(ids[2], ids[3]);
        assert_eq!(ids, vec![3, 2, 2, 1]);
    }

    #[test]
    fn test_process_change_at_boundary_splits_group() {
        let rows_same = build_rows(&[("S1", WALK), ("S1", "組付")]);
        let rows_changed = build_rows(&[("S1", WALK), ("S2", "組付")]);
        let options = SpecBalanceOptions::default();

        let ids_same = assign_group_ids(&rows_same, &options).expect("group");
        let ids_changed = assign_group_ids(&rows_changed, &options).expect("group");
        assert_eq!(ids_same[0], ids_same[1]);
        assert_ne!(ids_changed[0], ids_changed[1]);
    }

    #[test]
    fn test_assign_group_ids_is_idempotent() {
        let rows = build_rows(&[
            ("A", WALK),
            ("A", "x"),
            ("B", WALK),
            ("A", WALK),
            ("A", WALK),
        ]);
        let options = SpecBalanceOptions::default();
        let ids_first = assign_group_ids(&rows, &options).expect("group");
        let ids_second = assign_group_ids(&rows, &options).expect("group");
        assert_eq!(ids_first, ids_second);
    }

    #[test]
    fn test_pseudo_random_sequences_satisfy_merge_rule() {
        let l_processes = ["A", "B", "C"];
        let l_tasks = [WALK, "組付", "検査"];
        let mut n_state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            n_state ^= n_state << 13;
            n_state ^= n_state >> 7;
            n_state ^= n_state << 17;
            n_state
        };

        let options = SpecBalanceOptions::default();
        for _ in 0..200 {
            let n_len = (next() % 12) as usize;
            let items: Vec<(&str, &str)> = (0..n_len)
                .map(|_| {
                    (
                        l_processes[(next() % 3) as usize],
                        l_tasks[(next() % 3) as usize],
                    )
                })
                .collect();
            let rows = build_rows(&items);
            let ids = assign_group_ids(&rows, &options).expect("group");

            assert_eq!(ids.len(), rows.len());
            for n_idx in 0..rows.len().saturating_sub(1) {
                let if_merge = rows[n_idx].is_walking(WALK)
                    && rows[n_idx].process == rows[n_idx + 1].process;
                assert_eq!(ids[n_idx] == ids[n_idx + 1], if_merge, "rows={items:?}");
            }
            // Units are contiguous runs.
            assert_eq!(derive_run_sizes(&ids).len(), count_groups(&ids));
        }
    }

    #[test]
    fn test_walking_marker_is_configurable() {
        let rows = build_rows(&[("S1", "walking"), ("S1", "fasten")]);
        let options_default = SpecBalanceOptions::default();
        let options_english = crate::conf::derive_english_balance_options();

        let ids_default = assign_group_ids(&rows, &options_default).expect("group");
        let ids_english = assign_group_ids(&rows, &options_english).expect("group");
        assert_ne!(ids_default[0], ids_default[1]);
        assert_eq!(ids_english[0], ids_english[1]);
    }

    #[test]
    fn test_padded_walking_marker_still_matches() {
        let rows = build_rows(&[("S1", WALK), ("S1", "締付")]);
        let options = SpecBalanceOptions {
            walking_marker: format!(" {WALK}\t"),
            ..SpecBalanceOptions::default()
        };
        let ids = assign_group_ids(&rows, &options).expect("group");
        assert_eq!(ids[0], ids[1]);
    }

    #[test]
    fn test_numbering_from_start() {
        let rows = build_rows(&[("S1", "組付"), ("S1", WALK), ("S1", WALK), ("S2", "組付")]);
        let options = SpecBalanceOptions {
            rule_numbering: EnumGroupNumbering::FromStart,
            ..SpecBalanceOptions::default()
        };
        let ids = assign_group_ids(&rows, &options).expect("group");
        assert_eq!(ids, vec![1, 2, 2, 3]);
        assert!(renumber_from_start(&[]).is_empty());
    }

    #[test]
    fn test_missing_process_is_rejected_with_row_index() {
        let mut rows = build_rows(&[("S1", "組付"), ("S1", WALK), ("S2", "組付")]);
        rows[1].process = EnumProcessKey::Missing;

        let err = assign_group_ids(&rows, &SpecBalanceOptions::default()).unwrap_err();
        match err {
            BalanceError::MissingField { row_idx, field } => {
                assert_eq!(row_idx, 1);
                assert_eq!(field, "工程");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_task_is_rejected_with_row_index() {
        let mut rows = build_rows(&[("S1", "組付"), ("S1", WALK)]);
        rows[1].task = None;

        let err = assign_group_ids(&rows, &SpecBalanceOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Row 1"));
        assert!(err.to_string().contains("要素作業"));
    }

    #[test]
    fn test_keep_policy_treats_missing_process_as_value() {
        let mut rows = build_rows(&[
            ("S1", WALK),
            ("S1", "組付"),
            ("S1", WALK),
            ("S1", "組付"),
        ]);
        rows[0].process = EnumProcessKey::Missing;
        rows[1].process = EnumProcessKey::Missing;
        rows[2].process = EnumProcessKey::Missing;
        let options = SpecBalanceOptions {
            rule_missing_key: EnumMissingKeyPolicy::Keep,
            ..SpecBalanceOptions::default()
        };

        let ids = assign_group_ids(&rows, &options).expect("group");
        // missing == missing merges; missing != "S1" does not.
        assert_eq!(ids[0], ids[1]);
        assert_ne!(ids[2], ids[3]);
    }

    #[test]
    fn test_integer_and_text_process_are_distinct() {
        let rows = vec![
            SpecElementRow::new(0, EnumProcessKey::Integer(3), WALK),
            SpecElementRow::new(1, "3", "組付"),
        ];
        let ids = assign_group_ids(&rows, &SpecBalanceOptions::default()).expect("group");
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn test_group_members_and_stats() {
        let ids = vec![3, 2, 2, 1];
        let dict_members = derive_group_members(&ids);
        assert_eq!(dict_members[&2], vec![1, 2]);
        assert_eq!(dict_members.len(), 3);

        let stats = derive_group_stats(&ids);
        assert_eq!(stats.cnt_groups, 3);
        assert_eq!(stats.cnt_walking_merged, 1);
        assert_eq!(derive_group_stats(&[]), SpecGroupStats::default());
    }
}
