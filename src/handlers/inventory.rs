//! Inventory handlers: spaces, elements and individual tasks

use crate::MjopServerHandler;
use crate::formatting::{format_elements, format_money};
use crate::plan::{Element, GeneralInfo, PlanIntent, Space, local_date_today};
use crate::validation::{parse_date_param, parse_optional_date_param, to_mcp_error};
use log::info;
use mcp_attr::Result as McpResult;

impl MjopServerHandler {
    pub async fn handle_set_general_info(
        &self,
        project_name: String,
        address: Option<String>,
        owner: Option<String>,
    ) -> McpResult<String> {
        let image_file = self.lock_state().general_info.image_file.clone();
        let info = GeneralInfo {
            project_name: project_name.trim().to_string(),
            address: address.filter(|s| !s.trim().is_empty()),
            owner: owner.filter(|s| !s.trim().is_empty()),
            image_file,
        };
        let name = info.project_name.clone();
        self.dispatch(PlanIntent::SetGeneralInfo(info))
            .map_err(to_mcp_error)?;
        Ok(format!("Project '{}' updated", name))
    }

    pub async fn handle_add_space(&self, id: String, name: String) -> McpResult<String> {
        let space = Space {
            id: id.trim().to_string(),
            name,
        };
        let space_id = space.id.clone();
        self.dispatch(PlanIntent::UpsertSpace(space))
            .map_err(to_mcp_error)?;
        Ok(format!("Space '{}' saved", space_id))
    }

    pub async fn handle_add_element(
        &self,
        id: String,
        name: String,
        space_id: Option<String>,
        categories: Option<Vec<String>>,
    ) -> McpResult<String> {
        let element = Element {
            id: id.trim().to_string(),
            name,
            space_id: space_id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            categories: categories
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect(),
            tasks: Vec::new(),
        };
        let element_id = element.id.clone();
        self.dispatch(PlanIntent::UpsertElement(element))
            .map_err(to_mcp_error)?;
        Ok(format!("Element '{}' saved", element_id))
    }

    pub async fn handle_remove_element(&self, id: String) -> McpResult<String> {
        self.dispatch(PlanIntent::RemoveElement { id: id.clone() })
            .map_err(to_mcp_error)?;
        Ok(format!("Element '{}' removed", id))
    }

    pub async fn handle_list_elements(&self, category: Option<String>) -> McpResult<String> {
        let state = self.lock_state();
        let elements = match category.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => state.elements_in_category(c),
            _ => state.global_elements.iter().collect(),
        };
        Ok(format_elements(&state, &elements))
    }

    pub async fn handle_add_task(
        &self,
        element_id: String,
        due_date: String,
        cost: f64,
    ) -> McpResult<String> {
        let due_date = parse_date_param("due_date", &due_date)?;
        let task_id = self
            .update(|state| {
                let next = state.apply(PlanIntent::AddTask {
                    element_id: element_id.clone(),
                    due_date,
                    cost,
                })?;
                let task_id = format!("t-{}", next.task_counter);
                Ok((next, task_id))
            })
            .map_err(to_mcp_error)?;
        info!("event=task_added task_id={} element_id={}", task_id, element_id);
        Ok(format!(
            "Task created with ID: {} ({} on {}, cost {})",
            task_id,
            element_id,
            due_date,
            format_money(cost)
        ))
    }

    pub async fn handle_complete_task(
        &self,
        task_id: String,
        completed_on: Option<String>,
        invoice_ref: Option<String>,
    ) -> McpResult<String> {
        let completed_on = parse_optional_date_param("completed_on", completed_on.as_deref())?
            .unwrap_or_else(local_date_today);
        let invoice_ref = invoice_ref
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        self.dispatch(PlanIntent::CompleteTask {
            task_id: task_id.clone(),
            completed_on,
            invoice_ref,
        })
        .map_err(to_mcp_error)?;
        Ok(format!("Task '{}' completed on {}", task_id, completed_on))
    }
}
