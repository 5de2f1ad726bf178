//! Task group handlers: open, add, edit, show and delete

use crate::MjopServerHandler;
use crate::formatting::{format_draft, format_money, format_task_group};
use crate::plan::builder::{self, SubmitMode, TaskGroupDraft};
use crate::validation::{parse_date_param, parse_individual_costs, to_mcp_error};
use log::info;
use mcp_attr::Result as McpResult;
use std::fmt::Write;

impl MjopServerHandler {
    /// Preview the draft a new task group would start from
    pub async fn handle_open_add_task_group(
        &self,
        category: String,
        element_ids: Vec<String>,
    ) -> McpResult<String> {
        let state = self.lock_state();
        let draft = builder::open_add(&state, category.trim(), &element_ids).map_err(to_mcp_error)?;
        Ok(format!(
            "New task group draft:\n{}\nNext: call add_task_group with a name, group_date and base_cost or individual_costs.",
            format_draft(&draft)
        ))
    }

    pub async fn handle_show_task_group(&self, id: String) -> McpResult<String> {
        let state = self.lock_state();
        let draft = builder::open_edit(&state, &id).map_err(to_mcp_error)?;
        let Some(group) = state.find_task_group(&id) else {
            return Err(to_mcp_error(crate::PlanError::not_found("task group", &id)));
        };

        let mut result = format!("{}\n\n{}", format_task_group(&state, group), format_draft(&draft));
        let mut tasks: Vec<_> = state.tasks_of_group(&id).collect();
        tasks.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then_with(|| a.element_id.cmp(&b.element_id))
        });
        let _ = writeln!(result, "Occurrences ({}):", tasks.len());
        for task in tasks {
            let done = if task.is_completed() { " [done]" } else { "" };
            let _ = writeln!(
                result,
                "- [{}] {} {}: {}{}",
                task.id,
                task.due_date,
                task.element_id,
                format_money(task.cost),
                done
            );
        }
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn handle_add_task_group(
        &self,
        name: String,
        category: String,
        element_ids: Vec<String>,
        group_date: String,
        base_cost: Option<f64>,
        individual_costs: Option<Vec<String>>,
        periodicity_months: Option<u32>,
        total_years: Option<u32>,
        indexation_rate: Option<f64>,
    ) -> McpResult<String> {
        let group_date = parse_date_param("group_date", &group_date)?;
        let individual_costs = individual_costs
            .as_deref()
            .map(parse_individual_costs)
            .transpose()?;

        let (group_id, summary) = self
            .update(|state| {
                let mut draft = builder::open_add(state, category.trim(), &element_ids)?;
                draft.name = name.clone();
                draft.group_date = Some(group_date);
                draft.base_cost = base_cost;
                if let Some(costs) = &individual_costs {
                    draft.assign_prices_individually = true;
                    draft.individual_costs = costs.clone();
                }
                draft.periodic = periodicity_months.is_some() || total_years.is_some();
                draft.periodicity_months = periodicity_months;
                draft.total_years = total_years;
                draft.indexation = indexation_rate.is_some();
                draft.indexation_rate = indexation_rate;

                let next = builder::submit(state, &draft, SubmitMode::Add)?;
                let (group_id, summary) = next
                    .mjop
                    .task_groups
                    .last()
                    .map(|g| (g.id.clone(), format_task_group(&next, g)))
                    .unwrap_or_default();
                Ok((next, (group_id, summary)))
            })
            .map_err(to_mcp_error)?;

        info!("event=task_group_added group_id={}", group_id);
        Ok(format!("Task group created with ID: {}\n{}", group_id, summary))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn handle_edit_task_group(
        &self,
        id: String,
        name: Option<String>,
        element_ids: Option<Vec<String>>,
        group_date: Option<String>,
        base_cost: Option<f64>,
        individual_costs: Option<Vec<String>>,
        periodic: Option<bool>,
        periodicity_months: Option<u32>,
        total_years: Option<u32>,
        indexation: Option<bool>,
        indexation_rate: Option<f64>,
    ) -> McpResult<String> {
        let group_date = group_date
            .as_deref()
            .map(|d| parse_date_param("group_date", d))
            .transpose()?;
        let individual_costs = individual_costs
            .as_deref()
            .map(parse_individual_costs)
            .transpose()?;

        let summary = self
            .update(|state| {
                let mut draft = builder::open_edit(state, &id)?;
                apply_overrides(
                    &mut draft,
                    Overrides {
                        name: name.clone(),
                        group_date,
                        base_cost,
                        individual_costs: individual_costs.clone(),
                        periodic,
                        periodicity_months,
                        total_years,
                        indexation,
                        indexation_rate,
                    },
                );
                if let Some(ids) = &element_ids {
                    let reselected = builder::open_add(state, &draft.category, ids)?;
                    draft.selected_element_ids = reselected.selected_element_ids;
                    draft.element_labels = reselected.element_labels;
                }

                let next = builder::submit(state, &draft, SubmitMode::Edit(id.clone()))?;
                let summary = next
                    .find_task_group(&id)
                    .map(|g| format_task_group(&next, g))
                    .unwrap_or_default();
                Ok((next, summary))
            })
            .map_err(to_mcp_error)?;

        info!("event=task_group_edited group_id={}", id);
        Ok(format!("Task group '{}' updated\n{}", id, summary))
    }

    pub async fn handle_delete_task_group(&self, id: String) -> McpResult<String> {
        let removed = self
            .update(|state| {
                let removed = state.tasks_of_group(&id).count();
                Ok((builder::remove(state, &id)?, removed))
            })
            .map_err(to_mcp_error)?;
        info!("event=task_group_deleted group_id={} tasks={}", id, removed);
        Ok(format!(
            "Task group '{}' deleted ({} task(s) removed)",
            id, removed
        ))
    }
}

/// Optional changes requested by `edit_task_group`
struct Overrides {
    name: Option<String>,
    group_date: Option<chrono::NaiveDate>,
    base_cost: Option<f64>,
    individual_costs: Option<std::collections::BTreeMap<String, f64>>,
    periodic: Option<bool>,
    periodicity_months: Option<u32>,
    total_years: Option<u32>,
    indexation: Option<bool>,
    indexation_rate: Option<f64>,
}

fn apply_overrides(draft: &mut TaskGroupDraft, overrides: Overrides) {
    if let Some(name) = overrides.name {
        draft.name = name;
    }
    if let Some(date) = overrides.group_date {
        draft.group_date = Some(date);
    }

    // Shared and individual pricing are exclusive; the last one given wins
    if let Some(cost) = overrides.base_cost {
        draft.assign_prices_individually = false;
        draft.base_cost = Some(cost);
    }
    if let Some(costs) = overrides.individual_costs {
        draft.assign_prices_individually = true;
        draft.individual_costs = costs;
    }

    if overrides.periodicity_months.is_some() || overrides.total_years.is_some() {
        draft.periodic = true;
    }
    if let Some(months) = overrides.periodicity_months {
        draft.periodicity_months = Some(months);
    }
    if let Some(years) = overrides.total_years {
        draft.total_years = Some(years);
    }
    if let Some(periodic) = overrides.periodic {
        draft.periodic = periodic;
    }

    if let Some(rate) = overrides.indexation_rate {
        draft.indexation = true;
        draft.indexation_rate = Some(rate);
    }
    if let Some(indexation) = overrides.indexation {
        draft.indexation = indexation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn periodic_draft() -> TaskGroupDraft {
        TaskGroupDraft {
            name: "Paint".to_string(),
            category: "painting".to_string(),
            group_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            base_cost: Some(1000.0),
            periodic: true,
            periodicity_months: Some(12),
            total_years: Some(3),
            indexation: true,
            indexation_rate: Some(0.05),
            selected_element_ids: vec!["e1".to_string()],
            ..Default::default()
        }
    }

    fn no_overrides() -> Overrides {
        Overrides {
            name: None,
            group_date: None,
            base_cost: None,
            individual_costs: None,
            periodic: None,
            periodicity_months: None,
            total_years: None,
            indexation: None,
            indexation_rate: None,
        }
    }

    #[test]
    fn test_no_overrides_keep_draft() {
        let mut draft = periodic_draft();
        apply_overrides(&mut draft, no_overrides());
        assert_eq!(draft, periodic_draft());
    }

    #[test]
    fn test_disable_periodic_and_indexation() {
        let mut draft = periodic_draft();
        apply_overrides(
            &mut draft,
            Overrides {
                periodic: Some(false),
                indexation: Some(false),
                ..no_overrides()
            },
        );
        assert!(!draft.periodic);
        assert!(!draft.indexation);
        let group = draft.validate().unwrap();
        assert_eq!(group.periodicity(), None);
    }

    #[test]
    fn test_individual_costs_switch_pricing() {
        let mut draft = periodic_draft();
        let costs = [("e1".to_string(), 250.0)].into_iter().collect();
        apply_overrides(
            &mut draft,
            Overrides {
                individual_costs: Some(costs),
                ..no_overrides()
            },
        );
        assert!(draft.assign_prices_individually);
        assert_eq!(draft.individual_costs["e1"], 250.0);
    }
}
