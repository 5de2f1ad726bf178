//! Parameter parsing and error mapping for MCP tools
//!
//! Tools receive loosely typed strings; this module turns them into typed
//! values and converts core errors into MCP errors.

use crate::error::PlanError;
use crate::plan::dates;
use chrono::NaiveDate;
use log::error;
use mcp_attr::{Error as McpError, ErrorCode, Result as McpResult};
use std::collections::BTreeMap;

fn invalid_params(message: String) -> McpError {
    McpError::new(ErrorCode::INVALID_PARAMS).with_message(message, true)
}

/// Parse a required `YYYY-MM-DD` parameter
pub fn parse_date_param(field: &str, value: &str) -> McpResult<NaiveDate> {
    dates::parse_date(value).ok_or_else(|| {
        invalid_params(format!(
            "Invalid {} '{}'. Use YYYY-MM-DD (e.g., '2025-03-15')",
            field, value
        ))
    })
}

/// Parse an optional date parameter; an empty string counts as absent
pub fn parse_optional_date_param(field: &str, value: Option<&str>) -> McpResult<Option<NaiveDate>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => parse_date_param(field, v).map(Some),
    }
}

/// Parse per-element prices given as `element-id=amount` entries
///
/// # Examples
/// ```
/// # use mjop_mcp::validation::parse_individual_costs;
/// let costs = parse_individual_costs(&["window-1=450".to_string(), "window-2=520.5".to_string()]).unwrap();
/// assert_eq!(costs["window-2"], 520.5);
/// ```
pub fn parse_individual_costs(entries: &[String]) -> McpResult<BTreeMap<String, f64>> {
    let mut costs = BTreeMap::new();
    for entry in entries {
        let parsed = entry
            .split_once('=')
            .map(|(id, amount)| (id.trim(), amount.trim()))
            .filter(|(id, _)| !id.is_empty())
            .and_then(|(id, amount)| amount.parse::<f64>().ok().map(|a| (id, a)));
        match parsed {
            Some((id, amount)) => {
                costs.insert(id.to_string(), amount);
            }
            None => {
                return Err(invalid_params(format!(
                    "Invalid individual cost '{}'. Use element-id=amount (e.g., 'window-1=450')",
                    entry
                )));
            }
        }
    }
    Ok(costs)
}

/// Convert a core error into an MCP error
///
/// Validation errors list every failing field so the caller can fix them in
/// one go. Consistency errors are logged as defects.
pub fn to_mcp_error(err: PlanError) -> McpError {
    match err {
        PlanError::Validation(v) => {
            let lines: Vec<String> = v
                .fields()
                .iter()
                .map(|(field, message)| format!("- {}: {}", field, message))
                .collect();
            invalid_params(format!("Validation failed:\n{}", lines.join("\n")))
        }
        PlanError::NotFound { .. } => invalid_params(err.to_string()),
        PlanError::Consistency(inner) => {
            error!("event=consistency_defect error={}", inner);
            McpError::new(ErrorCode::INTERNAL_ERROR).with_message(
                format!(
                    "Plan consistency error: {}. The plan data is inconsistent; this is a defect, please report it.",
                    inner
                ),
                true,
            )
        }
        PlanError::Persistence(inner) => McpError::new(ErrorCode::INTERNAL_ERROR)
            .with_message(format!("{}. Local changes are kept; retry save_plan.", inner), true),
    }
}
