//! Unit reassignment: move whole units between stations.
//!
//! Units are addressed by the IDs from [`crate::group`]. IDs are not recomputed
//! after a move; they stay the join key for labels and later moves.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::group::derive_group_members;
use crate::spec::{
    BalanceError, EnumProcessKey, SpecBalanceOptions, SpecElementRow, SpecMoveCriteria,
    SpecMoveOutcome, SpecMoveRule,
};

////////////////////////////////////////////////////////////////////////////////
// #region Parsing

/// Parse `"1, 2,5"` into IDs. Blank items are skipped.
pub fn parse_id_list(text: &str) -> Result<Vec<u32>, BalanceError> {
    let mut l_ids = Vec::new();
    for c_item in text.split(',') {
        let c_item = c_item.trim();
        if c_item.is_empty() {
            continue;
        }
        let n_id = c_item
            .parse::<u32>()
            .map_err(|_| BalanceError::InvalidIdList(text.to_string()))?;
        if n_id == 0 {
            return Err(BalanceError::InvalidIdList(text.to_string()));
        }
        l_ids.push(n_id);
    }
    Ok(l_ids)
}

/// Resolve station text against the stations present in `rows`.
///
/// Matches on the displayed value, so `"3"` finds an integer station 3. With
/// `if_allow_new_process`, unknown text becomes a new integer (when it parses)
/// or text station.
pub fn resolve_process_key(
    text: &str,
    rows: &[SpecElementRow],
    options: &SpecBalanceOptions,
) -> Result<EnumProcessKey, BalanceError> {
    let c_text = text.trim();
    if let Some(row) = rows
        .iter()
        .find(|row| !row.process.is_missing() && row.process.to_string() == c_text)
    {
        return Ok(row.process.clone());
    }

    if !options.if_allow_new_process || c_text.is_empty() {
        return Err(BalanceError::UnknownProcess(c_text.to_string()));
    }
    Ok(match c_text.parse::<i64>() {
        Ok(n) => EnumProcessKey::Integer(n),
        Err(_) => EnumProcessKey::Text(c_text.to_string()),
    })
}

/// Parse `ID=PROCESS`.
pub fn parse_id_move(
    text: &str,
    rows: &[SpecElementRow],
    options: &SpecBalanceOptions,
) -> Result<SpecMoveRule, BalanceError> {
    let Some((c_id, c_to)) = text.split_once('=') else {
        return Err(BalanceError::InvalidMoveRule(format!(
            "expected ID=PROCESS, got {text:?}"
        )));
    };
    let id = c_id
        .trim()
        .parse::<u32>()
        .map_err(|_| BalanceError::InvalidMoveRule(format!("ID is not an integer: {c_id:?}")))?;
    Ok(SpecMoveRule::ById {
        id,
        to: resolve_process_key(c_to, rows, options)?,
    })
}

/// Parse `from=P,location=L,task=T,to=Q`. `to` and at least one criterion are required.
pub fn parse_criteria_move(
    text: &str,
    rows: &[SpecElementRow],
    options: &SpecBalanceOptions,
) -> Result<SpecMoveRule, BalanceError> {
    let mut criteria = SpecMoveCriteria::default();
    let mut to = None;

    for c_pair in text.split(',') {
        let c_pair = c_pair.trim();
        if c_pair.is_empty() {
            continue;
        }
        let Some((c_key, c_value)) = c_pair.split_once('=') else {
            return Err(BalanceError::InvalidMoveRule(format!(
                "expected key=value, got {c_pair:?}"
            )));
        };
        let c_value = c_value.trim();
        match c_key.trim() {
            "from" => {
                let key_options = SpecBalanceOptions {
                    if_allow_new_process: false,
                    ..options.clone()
                };
                criteria.from_process = Some(resolve_process_key(c_value, rows, &key_options)?);
            }
            "location" => criteria.location = Some(c_value.to_string()),
            "task" => criteria.task = Some(c_value.to_string()),
            "to" => to = Some(resolve_process_key(c_value, rows, options)?),
            c_other => {
                return Err(BalanceError::InvalidMoveRule(format!(
                    "unknown key {c_other:?} (expected from, location, task, to)"
                )));
            }
        }
    }

    let Some(to) = to else {
        return Err(BalanceError::InvalidMoveRule(format!(
            "missing `to=` in {text:?}"
        )));
    };
    if criteria.is_empty() {
        return Err(BalanceError::InvalidMoveRule(format!(
            "no criteria in {text:?}"
        )));
    }
    Ok(SpecMoveRule::ByCriteria { criteria, to })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Moves

/// Sorted existing stations, excluding `current`.
pub fn list_move_targets(
    rows: &[SpecElementRow],
    current: &EnumProcessKey,
) -> Vec<EnumProcessKey> {
    rows.iter()
        .map(|row| &row.process)
        .filter(|process| *process != current && !process.is_missing())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Apply `rules` in order and return the moved rows.
///
/// - Unknown IDs and criteria that match nothing are skipped with a warning.
/// - Moving a unit to the station it is already in is a warned no-op.
/// - A target that is not an existing station fails the whole call unless
///   `if_allow_new_process` is set.
/// - Criteria rules move every unit that has at least one matching row, so a
///   unit is never split. Criteria see the effect of earlier rules.
pub fn apply_moves(
    rows: &[SpecElementRow],
    ids: &[u32],
    rules: &[SpecMoveRule],
    options: &SpecBalanceOptions,
) -> Result<SpecMoveOutcome, BalanceError> {
    if rows.len() != ids.len() {
        return Err(BalanceError::LengthMismatch {
            expected: rows.len(),
            actual: ids.len(),
        });
    }

    let set_processes_existing: BTreeSet<&EnumProcessKey> =
        rows.iter().map(|row| &row.process).collect();
    for rule in rules {
        let (SpecMoveRule::ById { to, .. } | SpecMoveRule::ByCriteria { to, .. }) = rule;
        if !options.if_allow_new_process && !set_processes_existing.contains(to) {
            return Err(BalanceError::UnknownProcess(to.to_string()));
        }
    }

    let dict_members = derive_group_members(ids);
    let mut outcome = SpecMoveOutcome {
        rows: rows.to_vec(),
        ..SpecMoveOutcome::default()
    };

    for rule in rules {
        let (set_ids_target, to) = match rule {
            SpecMoveRule::ById { id, to } => {
                if !dict_members.contains_key(id) {
                    let msg = format!("ID:{id} does not exist; skipped.");
                    warn!("{msg}");
                    outcome.warnings.push(msg);
                    continue;
                }
                (BTreeSet::from([*id]), to)
            }
            SpecMoveRule::ByCriteria { criteria, to } => {
                let set_ids: BTreeSet<u32> = outcome
                    .rows
                    .iter()
                    .zip(ids)
                    .filter(|(row, _)| criteria.is_matching(row))
                    .map(|(_, id)| *id)
                    .collect();
                if set_ids.is_empty() {
                    let msg = format!("No rows match {rule}; skipped.");
                    warn!("{msg}");
                    outcome.warnings.push(msg);
                    continue;
                }
                (set_ids, to)
            }
        };

        for id in set_ids_target {
            let Some(l_members) = dict_members.get(&id) else {
                continue;
            };
            let Some(n_idx_first) = l_members.first() else {
                continue;
            };
            if outcome.rows[*n_idx_first].process == *to {
                let msg = format!("ID:{id} is already in process {to}; nothing moved.");
                warn!("{msg}");
                outcome.warnings.push(msg);
                continue;
            }

            for n_idx_row in l_members {
                outcome.rows[*n_idx_row].process = to.clone();
            }
            outcome.cnt_units_moved += 1;
            outcome.cnt_rows_moved += l_members.len() as u64;
            debug!(id, to = %to, cnt_rows = l_members.len(), "moved unit");
        }
    }

    Ok(outcome)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
