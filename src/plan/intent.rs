//! Mutation intents accepted by [`PlanState::apply`](crate::plan::PlanState::apply)

use crate::plan::builder::ValidatedTaskGroup;
use crate::plan::model::{CashInfo, Element, GeneralInfo, Space};
use chrono::NaiveDate;

/// Every state change the plan supports
#[derive(Debug, Clone, PartialEq)]
pub enum PlanIntent {
    /// Insert or rename a space
    UpsertSpace(Space),
    /// Insert an element or update its name, space and categories; tasks are never replaced
    UpsertElement(Element),
    /// Remove an element that no task group references
    RemoveElement { id: String },
    AddTaskGroup(ValidatedTaskGroup),
    /// Replace a task group and regenerate its occurrences from scratch
    EditTaskGroup { id: String, group: ValidatedTaskGroup },
    DeleteTaskGroup { id: String },
    /// Schedule a one-off task that does not belong to any group
    AddTask {
        element_id: String,
        due_date: NaiveDate,
        cost: f64,
    },
    /// Record execution of an occurrence
    CompleteTask {
        task_id: String,
        completed_on: NaiveDate,
        invoice_ref: Option<String>,
    },
    SetCashInfo(CashInfo),
    SetGeneralInfo(GeneralInfo),
    SetHorizon { start_year: i32, years: u32 },
}

impl PlanIntent {
    /// Short name used in log events and commit messages
    pub fn name(&self) -> &'static str {
        match self {
            PlanIntent::UpsertSpace(_) => "upsert_space",
            PlanIntent::UpsertElement(_) => "upsert_element",
            PlanIntent::RemoveElement { .. } => "remove_element",
            PlanIntent::AddTaskGroup(_) => "add_task_group",
            PlanIntent::EditTaskGroup { .. } => "edit_task_group",
            PlanIntent::DeleteTaskGroup { .. } => "delete_task_group",
            PlanIntent::AddTask { .. } => "add_task",
            PlanIntent::CompleteTask { .. } => "complete_task",
            PlanIntent::SetCashInfo(_) => "set_cash_info",
            PlanIntent::SetGeneralInfo(_) => "set_general_info",
            PlanIntent::SetHorizon { .. } => "set_horizon",
        }
    }
}
