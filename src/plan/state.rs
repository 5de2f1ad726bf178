use crate::error::{ConsistencyError, PlanError, PlanResult, ValidationError};
use crate::plan::builder::{MAX_TOTAL_YEARS, ValidatedTaskGroup};
use crate::plan::dates::year_end;
use crate::plan::expansion;
use crate::plan::intent::PlanIntent;
use crate::plan::model::{
    CashInfo, Document, Element, GeneralInfo, Mjop, OfferGroup, Space, Task, TaskGroup,
};
use chrono::NaiveDate;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Current on-disk format of the plan file
pub const FORMAT_VERSION: u32 = 1;

/// Immutable snapshot of the whole maintenance plan
///
/// State changes go through [`PlanState::apply`], which works on a copy and
/// returns the next snapshot. Callers keep the snapshot they hold when an
/// intent is rejected.
///
/// Elements, spaces and task groups are kept in `Vec`s so the TOML file keeps
/// insertion order and produces stable diffs. Plans hold at most a few
/// hundred elements, so lookups are linear scans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanState {
    pub format_version: u32,

    /// Counter for generating task group ids
    pub task_group_counter: u32,

    /// Counter for generating task ids
    pub task_counter: u32,

    pub general_info: GeneralInfo,
    pub cash_info: CashInfo,
    pub mjop: Mjop,
    pub global_spaces: Vec<Space>,
    pub global_elements: Vec<Element>,
    pub global_documents: Vec<Document>,
    pub offer_groups: Vec<OfferGroup>,
}

impl Default for PlanState {
    fn default() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            task_group_counter: 0,
            task_counter: 0,
            general_info: GeneralInfo::default(),
            cash_info: CashInfo::default(),
            mjop: Mjop::default(),
            global_spaces: Vec::new(),
            global_elements: Vec::new(),
            global_documents: Vec::new(),
            offer_groups: Vec::new(),
        }
    }
}

impl PlanState {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new unique task group ID
    fn generate_task_group_id(&mut self) -> String {
        self.task_group_counter += 1;
        format!("tg-{}", self.task_group_counter)
    }

    /// Generate a new unique task ID
    fn generate_task_id(&mut self) -> String {
        self.task_counter += 1;
        format!("t-{}", self.task_counter)
    }

    pub fn find_space(&self, id: &str) -> Option<&Space> {
        self.global_spaces.iter().find(|s| s.id == id)
    }

    pub fn find_element(&self, id: &str) -> Option<&Element> {
        self.global_elements.iter().find(|e| e.id == id)
    }

    fn find_element_mut(&mut self, id: &str) -> Option<&mut Element> {
        self.global_elements.iter_mut().find(|e| e.id == id)
    }

    pub fn find_task_group(&self, id: &str) -> Option<&TaskGroup> {
        self.mjop.task_groups.iter().find(|g| g.id == id)
    }

    /// Find a task occurrence across all elements
    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.all_tasks().find(|t| t.id == id)
    }

    /// Elements tagged with the given category
    pub fn elements_in_category(&self, category: &str) -> Vec<&Element> {
        self.global_elements
            .iter()
            .filter(|e| e.has_category(category))
            .collect()
    }

    /// All task occurrences, flattened from every element
    pub fn all_tasks(&self) -> impl Iterator<Item = &Task> {
        self.global_elements.iter().flat_map(|e| e.tasks.iter())
    }

    /// Occurrences generated by a task group
    pub fn tasks_of_group<'a>(&'a self, group_id: &'a str) -> impl Iterator<Item = &'a Task> {
        self.all_tasks().filter(move |t| t.belongs_to(group_id))
    }

    /// Apply an intent and return the resulting snapshot
    ///
    /// The receiver is never modified; on error nothing changes.
    pub fn apply(&self, intent: PlanIntent) -> PlanResult<PlanState> {
        let name = intent.name();
        let mut next = self.clone();

        let result = match intent {
            PlanIntent::UpsertSpace(space) => next.upsert_space(space),
            PlanIntent::UpsertElement(element) => next.upsert_element(element),
            PlanIntent::RemoveElement { id } => next.remove_element(&id),
            PlanIntent::AddTaskGroup(group) => next.add_task_group(group),
            PlanIntent::EditTaskGroup { id, group } => next.edit_task_group(&id, group),
            PlanIntent::DeleteTaskGroup { id } => next.delete_task_group(&id),
            PlanIntent::AddTask {
                element_id,
                due_date,
                cost,
            } => next.add_task(&element_id, due_date, cost),
            PlanIntent::CompleteTask {
                task_id,
                completed_on,
                invoice_ref,
            } => next.complete_task(&task_id, completed_on, invoice_ref),
            PlanIntent::SetCashInfo(cash_info) => next.set_cash_info(cash_info),
            PlanIntent::SetGeneralInfo(general_info) => {
                next.general_info = general_info;
                Ok(())
            }
            PlanIntent::SetHorizon { start_year, years } => next.set_horizon(start_year, years),
        };

        match result {
            Ok(()) => Ok(next),
            Err(e) => {
                match &e {
                    PlanError::Consistency(inner) => error!(
                        "event=intent_rejected intent={} kind=consistency error={}",
                        name, inner
                    ),
                    other => warn!("event=intent_rejected intent={} error={}", name, other),
                }
                Err(e)
            }
        }
    }

    fn upsert_space(&mut self, space: Space) -> PlanResult<()> {
        if space.id.trim().is_empty() {
            return Err(ValidationError::single("id", "must not be empty").into());
        }
        match self.global_spaces.iter_mut().find(|s| s.id == space.id) {
            Some(existing) => existing.name = space.name,
            None => self.global_spaces.push(space),
        }
        Ok(())
    }

    fn upsert_element(&mut self, element: Element) -> PlanResult<()> {
        let mut errors = ValidationError::new();
        if element.id.trim().is_empty() {
            errors.add("id", "must not be empty");
        }
        if let Some(space_id) = &element.space_id
            && self.find_space(space_id).is_none()
        {
            errors.add("space_id", format!("space '{}' does not exist", space_id));
        }
        errors.into_result()?;

        match self.find_element_mut(&element.id) {
            Some(existing) => {
                existing.name = element.name;
                existing.space_id = element.space_id;
                existing.categories = element.categories;
            }
            None => self.global_elements.push(Element {
                tasks: Vec::new(),
                ..element
            }),
        }
        Ok(())
    }

    fn remove_element(&mut self, id: &str) -> PlanResult<()> {
        if let Some(group) = self
            .mjop
            .task_groups
            .iter()
            .find(|g| g.selected_element_ids.contains(id))
        {
            return Err(ValidationError::single(
                "id",
                format!("element is used by task group '{}'", group.id),
            )
            .into());
        }

        let pos = self
            .global_elements
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| PlanError::not_found("element", id))?;
        self.global_elements.remove(pos);
        Ok(())
    }

    fn ensure_elements_exist(&self, group: &TaskGroup) -> Result<(), ConsistencyError> {
        match group
            .selected_element_ids
            .iter()
            .find(|id| self.find_element(id).is_none())
        {
            Some(missing) => Err(ConsistencyError::MissingElement {
                group_id: group.id.clone(),
                element_id: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Expand a group and append its occurrences onto the selected elements
    fn attach_occurrences(&mut self, group: &TaskGroup) -> Result<usize, ConsistencyError> {
        self.ensure_elements_exist(group)?;

        let tasks = expansion::emit_tasks(group, || self.generate_task_id())?;

        let count = tasks.len();
        for task in tasks {
            let element_id = task.element_id.clone();
            let element = self.find_element_mut(&element_id).ok_or_else(|| {
                ConsistencyError::MissingElement {
                    group_id: group.id.clone(),
                    element_id,
                }
            })?;
            element.tasks.push(task);
        }
        Ok(count)
    }

    /// Remove every occurrence of a group from every element
    ///
    /// Fails when a referenced element is gone or fewer occurrences are found
    /// than the group generates.
    fn detach_occurrences(&mut self, group: &TaskGroup) -> Result<usize, ConsistencyError> {
        self.ensure_elements_exist(group)?;

        let per_element = group
            .periodicity
            .map(|p| p.occurrence_count() as usize)
            .unwrap_or(1);
        let expected = per_element * group.selected_element_ids.len();

        let mut found = 0;
        for element in self.global_elements.iter_mut() {
            let before = element.tasks.len();
            element.tasks.retain(|t| !t.belongs_to(&group.id));
            found += before - element.tasks.len();
        }

        if found < expected {
            return Err(ConsistencyError::MissingOccurrences {
                group_id: group.id.clone(),
                expected,
                found,
            });
        }
        Ok(found)
    }

    fn add_task_group(&mut self, group: ValidatedTaskGroup) -> PlanResult<()> {
        let id = self.generate_task_group_id();
        let group = group.into_group(id);

        let count = self.attach_occurrences(&group)?;
        info!(
            "event=task_group_added id={} elements={} occurrences={}",
            group.id,
            group.selected_element_ids.len(),
            count
        );
        self.mjop.task_groups.push(group);
        Ok(())
    }

    /// Delete-then-recreate: all old occurrences are dropped and the edited
    /// group is expanded again. Per-occurrence changes such as completion
    /// marks do not survive an edit.
    fn edit_task_group(&mut self, id: &str, group: ValidatedTaskGroup) -> PlanResult<()> {
        let pos = self
            .mjop
            .task_groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| PlanError::not_found("task group", id))?;

        let old = self.mjop.task_groups[pos].clone();
        let removed = self.detach_occurrences(&old)?;

        let group = group.into_group(old.id);
        let added = self.attach_occurrences(&group)?;
        info!(
            "event=task_group_edited id={} removed={} occurrences={}",
            group.id, removed, added
        );
        self.mjop.task_groups[pos] = group;
        Ok(())
    }

    fn delete_task_group(&mut self, id: &str) -> PlanResult<()> {
        let pos = self
            .mjop
            .task_groups
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| PlanError::not_found("task group", id))?;

        let group = self.mjop.task_groups.remove(pos);
        let removed = self.detach_occurrences(&group)?;
        info!("event=task_group_deleted id={} removed={}", group.id, removed);
        Ok(())
    }

    fn add_task(&mut self, element_id: &str, due_date: NaiveDate, cost: f64) -> PlanResult<()> {
        if !cost.is_finite() || cost <= 0.0 {
            return Err(ValidationError::single("cost", "must be a positive amount").into());
        }
        if self.find_element(element_id).is_none() {
            return Err(PlanError::not_found("element", element_id));
        }

        let id = self.generate_task_id();
        let element = self
            .find_element_mut(element_id)
            .ok_or_else(|| PlanError::not_found("element", element_id))?;
        element.tasks.push(Task {
            id,
            element_id: element_id.to_string(),
            due_date,
            cost,
            group_id: None,
            completed_on: None,
            invoice_ref: None,
        });
        Ok(())
    }

    fn complete_task(
        &mut self,
        task_id: &str,
        completed_on: NaiveDate,
        invoice_ref: Option<String>,
    ) -> PlanResult<()> {
        let task = self
            .global_elements
            .iter_mut()
            .flat_map(|e| e.tasks.iter_mut())
            .find(|t| t.id == task_id)
            .ok_or_else(|| PlanError::not_found("task", task_id))?;
        task.completed_on = Some(completed_on);
        task.invoice_ref = invoice_ref;
        Ok(())
    }

    fn set_cash_info(&mut self, cash_info: CashInfo) -> PlanResult<()> {
        let mut errors = ValidationError::new();
        let amounts = [
            ("current_cash", cash_info.current_cash),
            ("monthly_contribution", cash_info.monthly_contribution),
            ("total_worth", cash_info.total_worth),
        ];
        for (field, value) in amounts {
            if value.is_some_and(|v| !v.is_finite()) {
                errors.add(field, "must be a finite amount");
            }
        }
        if cash_info.monthly_contribution.is_some_and(|v| v < 0.0) {
            errors.add("monthly_contribution", "must not be negative");
        }
        errors.into_result()?;

        self.cash_info = cash_info;
        Ok(())
    }

    fn set_horizon(&mut self, start_year: i32, years: u32) -> PlanResult<()> {
        if years == 0 {
            return Err(ValidationError::single("years", "must be at least 1").into());
        }
        if years > MAX_TOTAL_YEARS {
            return Err(ValidationError::single(
                "years",
                format!("must not exceed {} years", MAX_TOTAL_YEARS),
            )
            .into());
        }
        // The cash-flow table reads the year before the horizon and its last year end
        let in_range = start_year
            .checked_sub(1)
            .and_then(year_end)
            .zip(start_year.checked_add(years as i32).and_then(year_end))
            .is_some();
        if !in_range {
            return Err(ValidationError::single(
                "start_year",
                "year is out of the supported date range",
            )
            .into());
        }
        self.mjop.start_year = Some(start_year);
        self.mjop.horizon_years = Some(years);
        Ok(())
    }

    /// Check references inside the plan
    ///
    /// An empty list means every task group points at existing elements,
    /// every grouped task points at an existing group and ids are unique.
    pub fn consistency_report(&self) -> Vec<ConsistencyError> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for element in &self.global_elements {
            if !seen.insert(element.id.as_str()) {
                issues.push(ConsistencyError::DuplicateId {
                    kind: "element",
                    id: element.id.clone(),
                });
            }
        }

        let mut seen = HashSet::new();
        for group in &self.mjop.task_groups {
            if !seen.insert(group.id.as_str()) {
                issues.push(ConsistencyError::DuplicateId {
                    kind: "task group",
                    id: group.id.clone(),
                });
            }
            if let Err(e) = self.ensure_elements_exist(group) {
                issues.push(e);
            }
        }

        let mut seen = HashSet::new();
        for element in &self.global_elements {
            for task in &element.tasks {
                if !seen.insert(task.id.as_str()) {
                    issues.push(ConsistencyError::DuplicateId {
                        kind: "task",
                        id: task.id.clone(),
                    });
                }
                if task.element_id != element.id {
                    issues.push(ConsistencyError::MisplacedTask {
                        task_id: task.id.clone(),
                        stored_on: element.id.clone(),
                        element_id: task.element_id.clone(),
                    });
                }
                if let Some(group_id) = &task.group_id
                    && self.find_task_group(group_id).is_none()
                {
                    issues.push(ConsistencyError::MissingGroup {
                        task_id: task.id.clone(),
                        group_id: group_id.clone(),
                    });
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::builder::TaskGroupDraft;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn element(id: &str) -> Element {
        Element {
            id: id.to_string(),
            name: format!("Element {}", id),
            space_id: None,
            categories: vec!["painting".to_string()],
            tasks: Vec::new(),
        }
    }

    fn state_with_elements(ids: &[&str]) -> PlanState {
        let mut state = PlanState::new();
        for id in ids {
            state = state.apply(PlanIntent::UpsertElement(element(id))).unwrap();
        }
        state
    }

    fn group(ids: &[&str]) -> ValidatedTaskGroup {
        TaskGroupDraft {
            name: "Paint".to_string(),
            category: "painting".to_string(),
            group_date: Some(date(2024, 1, 15)),
            base_cost: Some(100.0),
            periodic: true,
            periodicity_months: Some(12),
            total_years: Some(2),
            selected_element_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_generate_ids() {
        let mut state = PlanState::new();
        assert_eq!(state.generate_task_group_id(), "tg-1");
        assert_eq!(state.generate_task_group_id(), "tg-2");
        assert_eq!(state.generate_task_id(), "t-1");
    }

    #[test]
    fn test_apply_does_not_touch_receiver() {
        let state = state_with_elements(&["e1"]);
        let next = state.apply(PlanIntent::AddTaskGroup(group(&["e1"]))).unwrap();

        assert_eq!(state.all_tasks().count(), 0);
        assert!(state.mjop.task_groups.is_empty());
        assert_eq!(next.all_tasks().count(), 2);
        assert_eq!(next.mjop.task_groups.len(), 1);
    }

    #[test]
    fn test_add_group_with_missing_element_is_consistency_error() {
        let state = state_with_elements(&["e1"]);
        let err = state
            .apply(PlanIntent::AddTaskGroup(group(&["e1", "ghost"])))
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::Consistency(ConsistencyError::MissingElement { .. })
        ));
    }

    #[test]
    fn test_upsert_element_keeps_tasks() {
        let state = state_with_elements(&["e1"]);
        let state = state.apply(PlanIntent::AddTaskGroup(group(&["e1"]))).unwrap();

        let renamed = Element {
            name: "Renamed".to_string(),
            ..element("e1")
        };
        let state = state.apply(PlanIntent::UpsertElement(renamed)).unwrap();
        let e1 = state.find_element("e1").unwrap();
        assert_eq!(e1.name, "Renamed");
        assert_eq!(e1.tasks.len(), 2);
    }

    #[test]
    fn test_upsert_element_rejects_unknown_space() {
        let state = PlanState::new();
        let err = state
            .apply(PlanIntent::UpsertElement(Element {
                space_id: Some("nowhere".to_string()),
                ..element("e1")
            }))
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn test_remove_element_in_use_is_rejected() {
        let state = state_with_elements(&["e1", "e2"]);
        let state = state.apply(PlanIntent::AddTaskGroup(group(&["e1"]))).unwrap();

        assert!(state.apply(PlanIntent::RemoveElement { id: "e1".to_string() }).is_err());
        let next = state
            .apply(PlanIntent::RemoveElement { id: "e2".to_string() })
            .unwrap();
        assert!(next.find_element("e2").is_none());
    }

    #[test]
    fn test_delete_detects_missing_occurrences() {
        let state = state_with_elements(&["e1"]);
        let mut state = state.apply(PlanIntent::AddTaskGroup(group(&["e1"]))).unwrap();

        // Simulate a corrupted file: one occurrence vanished
        state.global_elements[0].tasks.pop();

        let err = state
            .apply(PlanIntent::DeleteTaskGroup { id: "tg-1".to_string() })
            .unwrap_err();
        assert!(matches!(
            err,
            PlanError::Consistency(ConsistencyError::MissingOccurrences {
                expected: 2,
                found: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_ad_hoc_task_and_completion() {
        let state = state_with_elements(&["e1"]);
        let state = state
            .apply(PlanIntent::AddTask {
                element_id: "e1".to_string(),
                due_date: date(2025, 5, 1),
                cost: 80.0,
            })
            .unwrap();
        let task_id = state.all_tasks().next().unwrap().id.clone();
        assert!(state.find_task(&task_id).unwrap().group_id.is_none());

        let state = state
            .apply(PlanIntent::CompleteTask {
                task_id: task_id.clone(),
                completed_on: date(2025, 5, 3),
                invoice_ref: Some("INV-2025-031".to_string()),
            })
            .unwrap();
        let task = state.find_task(&task_id).unwrap();
        assert!(task.is_completed());
        assert_eq!(task.invoice_ref.as_deref(), Some("INV-2025-031"));
    }

    #[test]
    fn test_set_cash_info_validates_amounts() {
        let state = PlanState::new();
        let err = state
            .apply(PlanIntent::SetCashInfo(CashInfo {
                current_cash: Some(f64::INFINITY),
                monthly_contribution: Some(-1.0),
                ..Default::default()
            }))
            .unwrap_err();
        match err {
            PlanError::Validation(v) => {
                assert!(v.message_for("current_cash").is_some());
                assert!(v.message_for("monthly_contribution").is_some());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_consistency_report() {
        let state = state_with_elements(&["e1"]);
        let mut state = state.apply(PlanIntent::AddTaskGroup(group(&["e1"]))).unwrap();
        assert!(state.consistency_report().is_empty());

        state.mjop.task_groups.clear();
        let issues = state.consistency_report();
        assert_eq!(issues.len(), 2);
        assert!(issues
            .iter()
            .all(|i| matches!(i, ConsistencyError::MissingGroup { .. })));
    }

    #[test]
    fn test_set_horizon_rejects_years_outside_date_range() {
        let state = PlanState::new();
        for (start_year, years) in [(i32::MAX, 2), (i32::MIN, 1), (262_140, 10)] {
            let err = state
                .apply(PlanIntent::SetHorizon { start_year, years })
                .unwrap_err();
            match err {
                PlanError::Validation(v) => assert!(v.message_for("start_year").is_some()),
                other => panic!("unexpected error {:?}", other),
            }
        }

        let next = state
            .apply(PlanIntent::SetHorizon {
                start_year: 2024,
                years: 10,
            })
            .unwrap();
        assert_eq!(next.mjop.start_year, Some(2024));
        assert_eq!(next.mjop.horizon_years, Some(10));
    }

    #[test]
    fn test_out_of_range_horizon_from_file_does_not_panic() {
        let mut state = PlanState::new()
            .apply(PlanIntent::SetCashInfo(CashInfo {
                current_cash: Some(1000.0),
                monthly_contribution: Some(10.0),
                reserve_date: Some(date(2024, 1, 1)),
                total_worth: Some(100_000.0),
            }))
            .unwrap();
        state.mjop.start_year = Some(i32::MAX);
        state.mjop.horizon_years = Some(2);
        assert_eq!(state.plan_years(), vec![i32::MAX]);
        assert_eq!(state.timeline().years.len(), 1);
        assert!(state.cash_flow_table(&Default::default()).is_empty());

        state.mjop.start_year = Some(i32::MIN);
        state.mjop.horizon_years = Some(1);
        assert!(state.cash_flow_table(&Default::default()).is_empty());
    }
}
