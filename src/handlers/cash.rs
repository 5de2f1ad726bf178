//! Reserve-fund handlers

use crate::MjopServerHandler;
use crate::formatting::{format_cash_flow, format_cash_status};
use crate::plan::{CashInfo, PlanIntent, local_date_today};
use crate::validation::{parse_optional_date_param, to_mcp_error};
use mcp_attr::Result as McpResult;

impl MjopServerHandler {
    pub async fn handle_set_cash_info(
        &self,
        current_cash: Option<f64>,
        monthly_contribution: Option<f64>,
        reserve_date: Option<String>,
        total_worth: Option<f64>,
    ) -> McpResult<String> {
        let reserve_date = parse_optional_date_param("reserve_date", reserve_date.as_deref())?;
        let cash_info = CashInfo {
            current_cash,
            monthly_contribution,
            reserve_date,
            total_worth,
        };
        self.dispatch(PlanIntent::SetCashInfo(cash_info))
            .map_err(to_mcp_error)?;

        let today = local_date_today();
        let status = self
            .lock_state()
            .cash_status(&self.options.saldo_policy, today);
        Ok(format!("Cash info updated\n{}", format_cash_status(&status)))
    }

    pub async fn handle_set_plan_horizon(&self, start_year: i32, years: u32) -> McpResult<String> {
        self.dispatch(PlanIntent::SetHorizon { start_year, years })
            .map_err(to_mcp_error)?;
        Ok(format!(
            "Plan horizon set to {}..={}",
            start_year,
            start_year.saturating_add(years as i32 - 1)
        ))
    }

    pub async fn handle_cash_status(&self, date: Option<String>) -> McpResult<String> {
        let at = parse_optional_date_param("date", date.as_deref())?.unwrap_or_else(local_date_today);
        let status = self.lock_state().cash_status(&self.options.saldo_policy, at);
        Ok(format_cash_status(&status))
    }

    pub async fn handle_cash_flow(&self) -> McpResult<String> {
        let rows = self.lock_state().cash_flow_table(&self.options.saldo_policy);
        Ok(format_cash_flow(&rows))
    }
}
