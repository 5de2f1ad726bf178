//! Timeline read model: years × task groups × totals

use crate::plan::state::PlanState;
use chrono::Datelike;
use std::collections::BTreeMap;

/// Contribution of one task group to one year
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineGroupEntry {
    pub group_id: String,
    pub name: String,
    pub occurrences: usize,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineYear {
    pub year: i32,
    /// Sum of every task due this year, grouped or not
    pub total_cost: f64,
    pub groups: Vec<TimelineGroupEntry>,
    /// Cost of tasks without a task group
    pub ad_hoc_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub years: Vec<TimelineYear>,
}

impl Timeline {
    pub fn total_cost(&self) -> f64 {
        self.years.iter().map(|y| y.total_cost).sum()
    }
}

impl PlanState {
    /// Years shown in the timeline
    ///
    /// The configured horizon when set, otherwise the span between the first
    /// and last due date of any task.
    pub fn plan_years(&self) -> Vec<i32> {
        if let (Some(start), Some(years)) = (self.mjop.start_year, self.mjop.horizon_years) {
            return (0..years as i32)
                .map_while(|offset| start.checked_add(offset))
                .collect();
        }

        let first = self.all_tasks().map(|t| t.due_date.year()).min();
        let last = self.all_tasks().map(|t| t.due_date.year()).max();
        match (first, last) {
            (Some(first), Some(last)) => (first..=last).collect(),
            _ => Vec::new(),
        }
    }

    /// Build the timeline over [`PlanState::plan_years`]
    pub fn timeline(&self) -> Timeline {
        let totals = self.total_cost_per_year();

        // year → group id → (occurrences, cost)
        let mut by_year: BTreeMap<i32, BTreeMap<&str, (usize, f64)>> = BTreeMap::new();
        let mut ad_hoc: BTreeMap<i32, f64> = BTreeMap::new();
        for task in self.all_tasks() {
            let year = task.due_date.year();
            match task.group_id.as_deref() {
                Some(group_id) => {
                    let entry = by_year
                        .entry(year)
                        .or_default()
                        .entry(group_id)
                        .or_insert((0, 0.0));
                    entry.0 += 1;
                    entry.1 += task.cost;
                }
                None => *ad_hoc.entry(year).or_insert(0.0) += task.cost,
            }
        }

        let years = self
            .plan_years()
            .into_iter()
            .map(|year| {
                // Keep the order in which groups were created
                let groups = match by_year.get(&year) {
                    Some(entries) => self
                        .mjop
                        .task_groups
                        .iter()
                        .filter_map(|g| {
                            entries.get(g.id.as_str()).map(|(occurrences, cost)| TimelineGroupEntry {
                                group_id: g.id.clone(),
                                name: g.name.clone(),
                                occurrences: *occurrences,
                                cost: *cost,
                            })
                        })
                        .collect(),
                    None => Vec::new(),
                };
                TimelineYear {
                    year,
                    total_cost: totals.get(&year).copied().unwrap_or(0.0),
                    groups,
                    ad_hoc_cost: ad_hoc.get(&year).copied().unwrap_or(0.0),
                }
            })
            .collect();

        Timeline { years }
    }
}
