use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A physical area of the property (e.g. "Roof", "Stairwell B")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    pub name: String,
}

/// A single scheduled unit of work on one element
///
/// The cost is always resolved to an amount at creation time; indexation is
/// applied by the expansion step, never stored as a formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Owning element (by reference)
    pub element_id: String,
    pub due_date: NaiveDate,
    pub cost: f64,
    /// Originating task group; `None` for ad-hoc tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Date the work was carried out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<NaiveDate>,
    /// Invoice number or reference for the executed work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_ref: Option<String>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.completed_on.is_some()
    }

    /// Check whether this occurrence was generated by the given task group
    pub fn belongs_to(&self, group_id: &str) -> bool {
        self.group_id.as_deref() == Some(group_id)
    }
}

/// A physical building component (window frames, boiler, gutter, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    pub name: String,
    /// Weak reference to the containing space
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Element {
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Recurrence parameters of a periodic task group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Periodicity {
    /// Months between two occurrences
    pub months: u32,
    /// Length of the planning window in years
    pub total_years: u32,
}

impl Periodicity {
    /// Number of occurrences within the window, rounded down
    pub fn occurrence_count(&self) -> u32 {
        if self.months == 0 {
            return 0;
        }
        self.total_years.saturating_mul(12) / self.months
    }
}

/// How a task group prices its occurrences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pricing {
    /// One amount shared by every selected element
    Shared { cost: f64 },
    /// Element id → cost, one entry per selected element
    Individual { costs: BTreeMap<String, f64> },
}

impl Pricing {
    /// Base cost for one element before indexation
    pub fn cost_for(&self, element_id: &str) -> Option<f64> {
        match self {
            Pricing::Shared { cost } => Some(*cost),
            Pricing::Individual { costs } => costs.get(element_id).copied(),
        }
    }

    pub fn is_individual(&self) -> bool {
        matches!(self, Pricing::Individual { .. })
    }
}

/// A user-defined unit of maintenance work applied to one or more elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: String,
    pub name: String,
    /// Element category the group was created for
    pub category: String,
    /// Start date of the first occurrence
    pub group_date: NaiveDate,
    /// Fractional cost increase per occurrence (0.02 = 2%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indexation_rate: Option<f64>,
    pub selected_element_ids: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<Periodicity>,
    pub pricing: Pricing,
}

impl TaskGroup {
    pub fn is_periodic(&self) -> bool {
        self.periodicity.is_some()
    }

    pub fn is_indexed(&self) -> bool {
        self.indexation_rate.is_some()
    }
}

/// Reserve-fund parameters
///
/// Every field is optional because the plan may be saved before the fund is
/// fully described; the cash projection falls back to a neutral result then.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CashInfo {
    /// Balance as of `reserve_date`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_cash: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_contribution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserve_date: Option<NaiveDate>,
    /// Reference value used to classify the saldo, not a cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_worth: Option<f64>,
}

/// General property description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralInfo {
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Path of the property image attachment, relative to the plan file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_file: Option<String>,
}

/// Planning horizon and the task groups of the multi-year plan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mjop {
    /// First calendar year shown in the timeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_year: Option<i32>,
    /// Number of years shown in the timeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_years: Option<u32>,
    pub task_groups: Vec<TaskGroup>,
}

/// An attached document or photo, stored by the surrounding application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub file_name: String,
    #[serde(default)]
    pub element_ids: Vec<String>,
}

/// A contractor offer covering one or more elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferGroup {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contractor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default)]
    pub element_ids: Vec<String>,
}
