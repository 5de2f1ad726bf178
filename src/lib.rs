//! MJOP MCP Server Library
//!
//! This library provides a Model Context Protocol (MCP) server for multi-year
//! property maintenance plans (MJOP, "meerjarenonderhoudsplan"). It keeps an
//! inventory of building elements and spaces, groups elements into recurring
//! or one-off maintenance task groups, expands them into dated and indexed
//! occurrences, and projects their cost against a reserve fund.
//!
//! # Architecture
//!
//! The library follows a 3-layer architecture:
//! - **MCP Layer**: `MjopServerHandler` - Parses tool parameters and renders text responses
//! - **Domain Layer**: `plan` module - Plan snapshot, task group builder, periodic
//!   expansion, cash-flow projection and timeline
//! - **Persistence Layer**: `storage` module - File-based TOML storage with optional Git history
//!
//! # Example
//!
//! ```no_run
//! use mjop_mcp::{MjopServerHandler, ServerOptions};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let handler = MjopServerHandler::new("mjop.toml", ServerOptions::default())?;
//!     // Use handler with MCP server...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod formatting;
mod git_ops;
pub mod handlers;
pub mod logging;
pub mod plan;
mod storage;
pub mod validation;

use anyhow::Result;
use log::info;
use mcp_attr::Result as McpResult;
use mcp_attr::server::{McpServer, mcp_server};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used types
pub use config::ServerOptions;
pub use error::{ConsistencyError, PersistenceError, PlanError, PlanResult, ValidationError};
pub use plan::{PlanIntent, PlanState, SaldoColor, SaldoPolicy};
pub use storage::Storage;

/// MCP Server handler for maintenance plan management
///
/// Holds the current plan snapshot in memory. Mutations replace the snapshot
/// synchronously; the plan is only written to disk by an explicit save.
pub struct MjopServerHandler {
    pub(crate) state: Mutex<PlanState>,
    pub(crate) storage: Storage,
    pub(crate) options: ServerOptions,
    saving: AtomicBool,
}

/// Clears the saving flag when a save finishes, whatever the outcome
struct SaveGuard<'a>(&'a AtomicBool);

impl<'a> SaveGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SaveGuard(flag))
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MjopServerHandler {
    /// Create a new server handler
    ///
    /// # Arguments
    /// * `storage_path` - Path to the plan file (TOML format)
    /// * `options` - Git sync and saldo policy
    ///
    /// # Example
    /// ```no_run
    /// # use mjop_mcp::{MjopServerHandler, ServerOptions};
    /// # use anyhow::Result;
    /// # fn main() -> Result<()> {
    /// let handler = MjopServerHandler::new("mjop.toml", ServerOptions::default())?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(storage_path: &str, options: ServerOptions) -> Result<Self> {
        let storage = Storage::new(storage_path, options.sync_git);
        let state = Mutex::new(storage.load()?);
        Ok(Self {
            state,
            storage,
            options,
            saving: AtomicBool::new(false),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, PlanState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current plan snapshot
    pub fn snapshot(&self) -> PlanState {
        self.lock_state().clone()
    }

    /// Run a state transition against the current snapshot and keep the result
    ///
    /// The snapshot is only replaced when `transition` succeeds.
    pub(crate) fn update<T>(
        &self,
        transition: impl FnOnce(&PlanState) -> PlanResult<(PlanState, T)>,
    ) -> PlanResult<T> {
        let mut state = self.lock_state();
        let (next, output) = transition(&state)?;
        *state = next;
        Ok(output)
    }

    /// Apply a single intent to the current snapshot
    pub fn dispatch(&self, intent: PlanIntent) -> PlanResult<()> {
        self.update(|state| Ok((state.apply(intent)?, ())))
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::Acquire)
    }

    /// Persist the current snapshot
    ///
    /// Only one save runs at a time; a second request while one is in flight
    /// fails with [`PersistenceError::SaveInProgress`]. Edits made during the
    /// save are kept in memory and go out with the next save.
    pub async fn save_data(&self) -> Result<(), PersistenceError> {
        let _guard = SaveGuard::acquire(&self.saving).ok_or(PersistenceError::SaveInProgress)?;

        let snapshot = self.snapshot();
        let message = format!(
            "Save plan: {} element(s), {} task group(s)",
            snapshot.global_elements.len(),
            snapshot.mjop.task_groups.len()
        );
        let storage = self.storage.clone();

        tokio::task::spawn_blocking(move || storage.save(&snapshot, &message))
            .await
            .map_err(|e| PersistenceError::Write(e.to_string()))?
            .map_err(|e| PersistenceError::Write(format!("{:#}", e)))?;

        info!("event=save_complete path={}", self.storage.file_path().display());
        Ok(())
    }
}

/// Multi-year maintenance plan (MJOP) server.
///
/// Plans recurring maintenance of building elements and projects the cost
/// against the reserve fund of the property.
///
/// Key concepts:
/// - **element**: a building component (window frame, boiler, gutter), tagged with categories and placed in a space
/// - **task group**: maintenance applied to selected elements, one-off or recurring every N months for Y years, optionally indexed
/// - **task**: one dated, costed occurrence on one element
/// - **saldo**: the projected reserve-fund balance, classified healthy/watch/critical
///
/// **Workflow**: add_space/add_element → open_add_task_group → add_task_group → timeline/cash_status → save_plan.
/// Changes stay in memory until save_plan is called.
#[mcp_server]
impl McpServer for MjopServerHandler {
    /// **Project**: Set the project name, address and owner of the property.
    #[tool]
    async fn set_general_info(
        &self,
        /// Project name
        project_name: String,
        /// Street address (optional)
        address: Option<String>,
        /// Owner or association (optional)
        owner: Option<String>,
    ) -> McpResult<String> {
        self.handle_set_general_info(project_name, address, owner)
            .await
    }

    /// **Inventory**: Create or rename a space (room, facade, roof area).
    #[tool]
    async fn add_space(
        &self,
        /// Space ID: any string (e.g., "roof", "stairwell-b")
        id: String,
        /// Display name
        name: String,
    ) -> McpResult<String> {
        self.handle_add_space(id, name).await
    }

    /// **Inventory**: Create an element or update its name, space and categories. Existing tasks are kept.
    #[tool]
    async fn add_element(
        &self,
        /// Element ID: any string (e.g., "frame-north-1")
        id: String,
        /// Display name
        name: String,
        /// Space the element belongs to (optional)
        space_id: Option<String>,
        /// Category tags (e.g., ["painting", "woodwork"])
        categories: Option<Vec<String>>,
    ) -> McpResult<String> {
        self.handle_add_element(id, name, space_id, categories).await
    }

    /// **Inventory**: Remove an element that no task group uses.
    #[tool]
    async fn remove_element(
        &self,
        /// Element ID
        id: String,
    ) -> McpResult<String> {
        self.handle_remove_element(id).await
    }

    /// **Inventory**: List elements, optionally only those tagged with a category.
    #[tool]
    async fn list_elements(
        &self,
        /// Category filter (optional)
        category: Option<String>,
    ) -> McpResult<String> {
        self.handle_list_elements(category).await
    }

    /// **Plan step 1**: Preview a new task group for a category and a selection of elements.
    #[tool]
    async fn open_add_task_group(
        &self,
        /// Category the group is for
        category: String,
        /// Selected element IDs (at least one)
        element_ids: Vec<String>,
    ) -> McpResult<String> {
        self.handle_open_add_task_group(category, element_ids).await
    }

    /// **Plan**: Show a task group with its per-element prices and occurrences.
    #[tool]
    async fn show_task_group(
        &self,
        /// Task group ID (e.g., "tg-1")
        id: String,
    ) -> McpResult<String> {
        self.handle_show_task_group(id).await
    }

    /// **Plan step 2**: Create a task group and schedule its tasks on every selected element.
    /// Give periodicity_months AND total_years for recurring work; indexation_rate (0.02 = 2%) compounds per occurrence.
    /// Use individual_costs ("element-id=amount") instead of base_cost to price elements separately.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn add_task_group(
        &self,
        /// Name of the work (e.g., "Repaint window frames")
        name: String,
        /// Element category
        category: String,
        /// Selected element IDs
        element_ids: Vec<String>,
        /// First occurrence YYYY-MM-DD
        group_date: String,
        /// Cost per element (omit when using individual_costs)
        base_cost: Option<f64>,
        /// Per-element costs as "element-id=amount" (optional)
        individual_costs: Option<Vec<String>>,
        /// Months between occurrences (recurring groups)
        periodicity_months: Option<u32>,
        /// Years covered by the recurrence (recurring groups)
        total_years: Option<u32>,
        /// Cost increase per occurrence, e.g. 0.02 (optional)
        indexation_rate: Option<f64>,
    ) -> McpResult<String> {
        self.handle_add_task_group(
            name,
            category,
            element_ids,
            group_date,
            base_cost,
            individual_costs,
            periodicity_months,
            total_years,
            indexation_rate,
        )
        .await
    }

    /// **Plan**: Edit a task group. All of its tasks are regenerated from the new settings;
    /// completion marks on its tasks are discarded. Omitted fields keep their value.
    #[allow(clippy::too_many_arguments)]
    #[tool]
    async fn edit_task_group(
        &self,
        /// Task group ID
        id: String,
        /// New name (optional)
        name: Option<String>,
        /// New element selection (optional)
        element_ids: Option<Vec<String>>,
        /// New first occurrence YYYY-MM-DD (optional)
        group_date: Option<String>,
        /// New shared cost; switches to shared pricing (optional)
        base_cost: Option<f64>,
        /// New per-element costs "element-id=amount"; switches to individual pricing (optional)
        individual_costs: Option<Vec<String>>,
        /// false makes the group one-off (optional)
        periodic: Option<bool>,
        /// Months between occurrences (optional)
        periodicity_months: Option<u32>,
        /// Years covered by the recurrence (optional)
        total_years: Option<u32>,
        /// false disables indexation (optional)
        indexation: Option<bool>,
        /// Cost increase per occurrence (optional)
        indexation_rate: Option<f64>,
    ) -> McpResult<String> {
        self.handle_edit_task_group(
            id,
            name,
            element_ids,
            group_date,
            base_cost,
            individual_costs,
            periodic,
            periodicity_months,
            total_years,
            indexation,
            indexation_rate,
        )
        .await
    }

    /// **Plan**: Delete a task group and every task it scheduled.
    #[tool]
    async fn delete_task_group(
        &self,
        /// Task group ID
        id: String,
    ) -> McpResult<String> {
        self.handle_delete_task_group(id).await
    }

    /// **Plan**: Schedule a one-off task on an element outside any task group.
    #[tool]
    async fn add_task(
        &self,
        /// Element ID
        element_id: String,
        /// Due date YYYY-MM-DD
        due_date: String,
        /// Cost
        cost: f64,
    ) -> McpResult<String> {
        self.handle_add_task(element_id, due_date, cost).await
    }

    /// **Execution**: Mark a task as carried out, with an optional invoice reference.
    #[tool]
    async fn complete_task(
        &self,
        /// Task ID (e.g., "t-12")
        task_id: String,
        /// Completion date YYYY-MM-DD, default today (optional)
        completed_on: Option<String>,
        /// Invoice number (optional)
        invoice_ref: Option<String>,
    ) -> McpResult<String> {
        self.handle_complete_task(task_id, completed_on, invoice_ref)
            .await
    }

    /// **Reserve fund**: Replace the reserve-fund parameters. Omitted values are cleared.
    #[tool]
    async fn set_cash_info(
        &self,
        /// Balance as of reserve_date
        current_cash: Option<f64>,
        /// Monthly contribution to the fund
        monthly_contribution: Option<f64>,
        /// Date current_cash is valid as of, YYYY-MM-DD
        reserve_date: Option<String>,
        /// Total worth of the property, reference for the saldo classification
        total_worth: Option<f64>,
    ) -> McpResult<String> {
        self.handle_set_cash_info(current_cash, monthly_contribution, reserve_date, total_worth)
            .await
    }

    /// **Plan**: Set the years shown in the timeline and cash flow.
    #[tool]
    async fn set_plan_horizon(
        &self,
        /// First year
        start_year: i32,
        /// Number of years
        years: u32,
    ) -> McpResult<String> {
        self.handle_set_plan_horizon(start_year, years).await
    }

    /// **Review**: Costs per year, broken down by task group.
    #[tool]
    async fn timeline(&self) -> McpResult<String> {
        self.handle_timeline().await
    }

    /// **Review**: Projected reserve-fund balance and saldo classification at a date (default today).
    #[tool]
    async fn cash_status(
        &self,
        /// Projection date YYYY-MM-DD (optional)
        date: Option<String>,
    ) -> McpResult<String> {
        self.handle_cash_status(date).await
    }

    /// **Review**: Opening balance, contributions, costs and closing balance per plan year.
    #[tool]
    async fn cash_flow(&self) -> McpResult<String> {
        self.handle_cash_flow().await
    }

    /// **Save**: Write the plan to disk (and git when enabled). Safe to retry.
    #[tool]
    async fn save_plan(&self) -> McpResult<String> {
        self.handle_save_plan().await
    }
}
