//! Task group builder: drafts, validation and submission
//!
//! Both "add" and "edit" go through the same [`TaskGroupDraft`] shape so one
//! submit path serves both modes. A draft only reaches the state reducer
//! after [`TaskGroupDraft::validate`] has turned it into a
//! [`ValidatedTaskGroup`]; a failing draft yields a field-keyed
//! [`ValidationError`] and leaves the plan untouched.

use crate::error::{PlanError, PlanResult, ValidationError};
use crate::plan::dates::add_months;
use crate::plan::intent::PlanIntent;
use crate::plan::model::{Periodicity, Pricing, TaskGroup};
use crate::plan::state::PlanState;
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Upper bound for the planning window of a single group
pub const MAX_TOTAL_YEARS: u32 = 100;

/// Display label of a selected element (name plus the space it lives in)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementLabel {
    pub element_id: String,
    pub name: String,
    pub space_name: Option<String>,
}

/// Editable, unvalidated task group fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskGroupDraft {
    pub name: String,
    pub category: String,
    pub group_date: Option<NaiveDate>,
    pub base_cost: Option<f64>,
    pub assign_prices_individually: bool,
    pub individual_costs: BTreeMap<String, f64>,
    pub periodic: bool,
    pub periodicity_months: Option<u32>,
    pub total_years: Option<u32>,
    pub indexation: bool,
    pub indexation_rate: Option<f64>,
    pub selected_element_ids: Vec<String>,
    /// Filled by `open_add`/`open_edit` for display only
    pub element_labels: Vec<ElementLabel>,
}

/// Which submission the draft is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitMode {
    Add,
    /// Replace the task group with this id
    Edit(String),
}

/// Task group fields that passed validation
///
/// Can only be created through [`TaskGroupDraft::validate`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTaskGroup {
    name: String,
    category: String,
    group_date: NaiveDate,
    pricing: Pricing,
    periodicity: Option<Periodicity>,
    indexation_rate: Option<f64>,
    selected_element_ids: BTreeSet<String>,
}

impl ValidatedTaskGroup {
    pub fn selected_element_ids(&self) -> &BTreeSet<String> {
        &self.selected_element_ids
    }

    pub fn periodicity(&self) -> Option<Periodicity> {
        self.periodicity
    }

    /// Attach an identifier and produce the stored entity
    pub fn into_group(self, id: String) -> TaskGroup {
        TaskGroup {
            id,
            name: self.name,
            category: self.category,
            group_date: self.group_date,
            indexation_rate: self.indexation_rate,
            selected_element_ids: self.selected_element_ids,
            periodicity: self.periodicity,
            pricing: self.pricing,
        }
    }
}

fn is_positive_amount(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl TaskGroupDraft {
    /// Check every invariant and collect all failures at once
    pub fn validate(&self) -> Result<ValidatedTaskGroup, ValidationError> {
        let mut errors = ValidationError::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "must not be empty");
        }

        let selected: BTreeSet<String> = self
            .selected_element_ids
            .iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if selected.is_empty() {
            errors.add("selected_element_ids", "select at least one element");
        }

        if self.group_date.is_none() {
            errors.add("group_date", "required");
        }

        let pricing = if self.assign_prices_individually {
            let mut costs = BTreeMap::new();
            for element_id in &selected {
                match self.individual_costs.get(element_id) {
                    None => errors.add(
                        "individual_costs",
                        format!("missing cost for element '{}'", element_id),
                    ),
                    Some(cost) if !is_positive_amount(*cost) => errors.add(
                        "individual_costs",
                        format!("cost for element '{}' must be a positive amount", element_id),
                    ),
                    Some(cost) => {
                        costs.insert(element_id.clone(), *cost);
                    }
                }
            }
            Pricing::Individual { costs }
        } else {
            match self.base_cost {
                None => {
                    errors.add("base_cost", "required");
                    Pricing::Shared { cost: 0.0 }
                }
                Some(cost) if !is_positive_amount(cost) => {
                    errors.add("base_cost", "must be a positive amount");
                    Pricing::Shared { cost }
                }
                Some(cost) => Pricing::Shared { cost },
            }
        };

        let periodicity = if self.periodic {
            match self.periodicity_months {
                None => errors.add("periodicity_months", "required for periodic groups"),
                Some(0) => errors.add("periodicity_months", "must be at least 1"),
                Some(_) => {}
            }
            match self.total_years {
                None => errors.add("total_years", "required for periodic groups"),
                Some(0) => errors.add("total_years", "must be at least 1"),
                Some(y) if y > MAX_TOTAL_YEARS => errors.add(
                    "total_years",
                    format!("must not exceed {} years", MAX_TOTAL_YEARS),
                ),
                Some(_) => {}
            }
            match (self.periodicity_months, self.total_years) {
                (Some(months), Some(total_years)) if months > 0 && total_years > 0 => {
                    let p = Periodicity {
                        months,
                        total_years,
                    };
                    if p.occurrence_count() < 1 {
                        errors.add(
                            "periodicity_months",
                            "interval is longer than the planning window",
                        );
                    }
                    Some(p)
                }
                _ => None,
            }
        } else {
            None
        };

        let indexation_rate = if self.indexation {
            match self.indexation_rate {
                None => {
                    errors.add("indexation_rate", "required when indexation is enabled");
                    None
                }
                Some(rate) if !rate.is_finite() || rate <= -1.0 => {
                    errors.add("indexation_rate", "must be a rate greater than -1");
                    None
                }
                Some(rate) => Some(rate),
            }
        } else {
            None
        };

        if let (Some(start), Some(p)) = (self.group_date, periodicity) {
            let last_offset = p.occurrence_count().saturating_sub(1).checked_mul(p.months);
            if last_offset.and_then(|months| add_months(start, months)).is_none() {
                errors.add("group_date", "last occurrence falls outside the supported date range");
            }
        }

        errors.into_result()?;

        Ok(ValidatedTaskGroup {
            name: name.to_string(),
            category: self.category.trim().to_string(),
            // Presence checked above
            group_date: self.group_date.unwrap_or_default(),
            pricing,
            periodicity,
            indexation_rate,
            selected_element_ids: selected,
        })
    }
}

fn element_labels(state: &PlanState, ids: &[String]) -> PlanResult<Vec<ElementLabel>> {
    ids.iter()
        .map(|id| {
            let element = state
                .find_element(id)
                .ok_or_else(|| PlanError::not_found("element", id))?;
            let space_name = element
                .space_id
                .as_deref()
                .and_then(|space_id| state.find_space(space_id))
                .map(|space| space.name.clone());
            Ok(ElementLabel {
                element_id: element.id.clone(),
                name: element.name.clone(),
                space_name,
            })
        })
        .collect()
}

/// Stage a new draft for a category and a selection of elements
pub fn open_add(
    state: &PlanState,
    category: &str,
    selected_element_ids: &[String],
) -> PlanResult<TaskGroupDraft> {
    if selected_element_ids.is_empty() {
        return Err(ValidationError::single("selected_element_ids", "select at least one element").into());
    }

    let element_labels = element_labels(state, selected_element_ids)?;
    Ok(TaskGroupDraft {
        category: category.to_string(),
        selected_element_ids: selected_element_ids.to_vec(),
        element_labels,
        ..Default::default()
    })
}

/// Load an existing task group into the draft shape used by `open_add`
pub fn open_edit(state: &PlanState, group_id: &str) -> PlanResult<TaskGroupDraft> {
    let group = state
        .find_task_group(group_id)
        .ok_or_else(|| PlanError::not_found("task group", group_id))?;

    let selected: Vec<String> = group.selected_element_ids.iter().cloned().collect();
    let element_labels = element_labels(state, &selected)?;

    let (base_cost, individual_costs) = match &group.pricing {
        Pricing::Shared { cost } => (Some(*cost), BTreeMap::new()),
        Pricing::Individual { costs } => (None, costs.clone()),
    };

    Ok(TaskGroupDraft {
        name: group.name.clone(),
        category: group.category.clone(),
        group_date: Some(group.group_date),
        base_cost,
        assign_prices_individually: group.pricing.is_individual(),
        individual_costs,
        periodic: group.is_periodic(),
        periodicity_months: group.periodicity.map(|p| p.months),
        total_years: group.periodicity.map(|p| p.total_years),
        indexation: group.is_indexed(),
        indexation_rate: group.indexation_rate,
        selected_element_ids: selected,
        element_labels,
    })
}

/// Validate a draft and apply it to the plan
///
/// Returns the new snapshot; on any error `state` is left as it was.
pub fn submit(state: &PlanState, draft: &TaskGroupDraft, mode: SubmitMode) -> PlanResult<PlanState> {
    let group = draft.validate()?;
    debug!(
        "event=task_group_submit mode={:?} elements={}",
        mode,
        group.selected_element_ids().len()
    );

    let intent = match mode {
        SubmitMode::Add => PlanIntent::AddTaskGroup(group),
        SubmitMode::Edit(id) => PlanIntent::EditTaskGroup { id, group },
    };
    state.apply(intent)
}

/// Delete a task group together with every occurrence it generated
pub fn remove(state: &PlanState, group_id: &str) -> PlanResult<PlanState> {
    state.apply(PlanIntent::DeleteTaskGroup {
        id: group_id.to_string(),
    })
}
