//! Periodic expansion of task groups into dated, costed occurrences
//!
//! A periodic group with start date `S`, cadence `P` months and a window of
//! `Y` years yields `n = floor(Y * 12 / P)` occurrences. Occurrence `k` is due
//! at `S + k*P` months and, for indexed groups, costs `base * (1 + r)^k`.
//! Indexation compounds once per occurrence, not per calendar year.
//!
//! Every date is computed from `S` directly rather than from the previous
//! occurrence, so a clamped day (Jan 31 → Feb 29) does not drift into the
//! following occurrences.

use crate::error::ConsistencyError;
use crate::plan::dates::add_months;
use crate::plan::model::{Periodicity, Task, TaskGroup};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// One scheduled occurrence before it is attached to an element
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Occurrence {
    /// 0-based position in the sequence
    pub index: u32,
    pub due_date: NaiveDate,
    pub cost: f64,
}

/// Cost of occurrence `index` after indexation
///
/// A rate of `None` or `0.0` leaves the base cost untouched.
pub fn indexed_cost(base_cost: f64, indexation_rate: Option<f64>, index: u32) -> f64 {
    match indexation_rate {
        Some(rate) if rate != 0.0 => base_cost * (1.0 + rate).powi(index as i32),
        _ => base_cost,
    }
}

/// Due dates of all occurrences of a schedule
///
/// Returns `None` when a date falls outside the representable calendar range.
pub fn occurrence_dates(start: NaiveDate, periodicity: Option<Periodicity>) -> Option<Vec<NaiveDate>> {
    match periodicity {
        None => Some(vec![start]),
        Some(p) => (0..p.occurrence_count())
            .map(|k| add_months(start, k * p.months))
            .collect(),
    }
}

/// Expand a task group into per-element occurrence sequences
///
/// Non-periodic groups produce exactly one occurrence per element, dated at
/// the group date. With individual pricing each element gets its own base
/// cost and its own independently indexed sequence.
pub fn expand_group(group: &TaskGroup) -> Result<BTreeMap<String, Vec<Occurrence>>, ConsistencyError> {
    let dates = occurrence_dates(group.group_date, group.periodicity).ok_or_else(|| {
        ConsistencyError::DateOutOfRange {
            group_id: group.id.clone(),
            index: group
                .periodicity
                .map(|p| p.occurrence_count())
                .unwrap_or(0),
        }
    })?;

    let mut expanded = BTreeMap::new();
    for element_id in &group.selected_element_ids {
        let base_cost =
            group
                .pricing
                .cost_for(element_id)
                .ok_or_else(|| ConsistencyError::MissingCost {
                    group_id: group.id.clone(),
                    element_id: element_id.clone(),
                })?;

        let occurrences = dates
            .iter()
            .enumerate()
            .map(|(k, due_date)| {
                let index = k as u32;
                Occurrence {
                    index,
                    due_date: *due_date,
                    cost: indexed_cost(base_cost, group.indexation_rate, index),
                }
            })
            .collect();
        expanded.insert(element_id.clone(), occurrences);
    }

    Ok(expanded)
}

/// Turn a group's expansion into tasks, minting one id per `(element, k)`
///
/// `next_id` is called once for every emitted task, in element order and
/// then occurrence order.
pub fn emit_tasks(
    group: &TaskGroup,
    mut next_id: impl FnMut() -> String,
) -> Result<Vec<Task>, ConsistencyError> {
    let expanded = expand_group(group)?;

    let mut tasks = Vec::new();
    for (element_id, occurrences) in expanded {
        for occurrence in occurrences {
            tasks.push(Task {
                id: next_id(),
                element_id: element_id.clone(),
                due_date: occurrence.due_date,
                cost: occurrence.cost,
                group_id: Some(group.id.clone()),
                completed_on: None,
                invoice_ref: None,
            });
        }
    }
    Ok(tasks)
}
