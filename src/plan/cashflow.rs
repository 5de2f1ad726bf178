//! Cost aggregation and reserve-fund projection
//!
//! Everything here is a pure function of the current [`PlanState`]. Nothing is
//! cached, so results are always in step with the latest task group change.

use crate::plan::dates::{whole_months_between, year_end};
use crate::plan::model::{CashInfo, Task};
use crate::plan::state::PlanState;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Health classification of the projected reserve-fund balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaldoColor {
    /// Balance comfortably above the watch threshold
    Healthy,
    /// Balance positive but below the watch threshold
    Watch,
    /// Balance below zero
    Critical,
    /// Not enough cash info to classify
    Neutral,
}

impl SaldoColor {
    /// Color name used by the view layer
    pub fn color_name(&self) -> &'static str {
        match self {
            SaldoColor::Healthy => "green",
            SaldoColor::Watch => "orange",
            SaldoColor::Critical => "red",
            SaldoColor::Neutral => "grey",
        }
    }
}

impl fmt::Display for SaldoColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SaldoColor::Healthy => "healthy",
            SaldoColor::Watch => "watch",
            SaldoColor::Critical => "critical",
            SaldoColor::Neutral => "neutral",
        };
        write!(f, "{}", label)
    }
}

/// Thresholds for the saldo classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaldoPolicy {
    /// Fraction of the total worth below which a positive balance is flagged
    pub watch_ratio: f64,
}

impl Default for SaldoPolicy {
    fn default() -> Self {
        Self { watch_ratio: 0.01 }
    }
}

impl SaldoPolicy {
    /// Classify a projected balance against the property's total worth
    pub fn classify(&self, balance: Option<f64>, total_worth: Option<f64>) -> SaldoColor {
        let (Some(balance), Some(total_worth)) = (balance, total_worth) else {
            return SaldoColor::Neutral;
        };
        if !total_worth.is_finite() || total_worth <= 0.0 {
            return SaldoColor::Neutral;
        }

        if balance < 0.0 {
            SaldoColor::Critical
        } else if balance < self.watch_ratio * total_worth {
            SaldoColor::Watch
        } else {
            SaldoColor::Healthy
        }
    }
}

/// Sum task costs per calendar year of their due date
pub fn total_cost_per_year<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> BTreeMap<i32, f64> {
    let mut totals = BTreeMap::new();
    for task in tasks {
        *totals.entry(task.due_date.year()).or_insert(0.0) += task.cost;
    }
    totals
}

/// Project the reserve-fund balance to `at`
///
/// Starts from `current_cash` at `reserve_date`, adds the monthly
/// contribution for every whole month elapsed and subtracts every cost due
/// after `reserve_date` and on or before `at`. Costs due on the reserve date
/// itself are taken as already reflected in `current_cash`.
///
/// Returns `None` when the balance or reserve date is missing. A date before
/// the reserve date yields `current_cash` unchanged.
pub fn current_cash_value<'a>(
    cash: &CashInfo,
    tasks: impl IntoIterator<Item = &'a Task>,
    at: NaiveDate,
) -> Option<f64> {
    let current_cash = cash.current_cash?;
    let reserve_date = cash.reserve_date?;

    let months = whole_months_between(reserve_date, at);
    let contributions = cash.monthly_contribution.unwrap_or(0.0) * months as f64;
    let costs: f64 = tasks
        .into_iter()
        .filter(|t| t.due_date > reserve_date && t.due_date <= at)
        .map(|t| t.cost)
        .sum();

    Some(current_cash + contributions - costs)
}

/// Projected balance and its classification at one date
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashStatus {
    pub at: NaiveDate,
    /// Projected balance, 0 when cash info is incomplete
    pub value: f64,
    /// Whether `value` comes from complete cash info
    pub known: bool,
    pub color: SaldoColor,
}

/// One row of the yearly cash-flow table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearCashFlow {
    pub year: i32,
    pub opening_balance: f64,
    pub contributions: f64,
    /// Costs charged to the fund in this year (due after the reserve date)
    pub costs: f64,
    pub closing_balance: f64,
    pub color: SaldoColor,
}

impl PlanState {
    /// Per-year totals over every task of every element
    pub fn total_cost_per_year(&self) -> BTreeMap<i32, f64> {
        total_cost_per_year(self.all_tasks())
    }

    /// Projected reserve-fund balance at `at`, or 0 when cash info is incomplete
    pub fn calculate_current_cash_value(&self, at: NaiveDate) -> f64 {
        current_cash_value(&self.cash_info, self.all_tasks(), at).unwrap_or(0.0)
    }

    /// Saldo classification of the projected balance at `at`
    pub fn saldo_color(&self, policy: &SaldoPolicy, at: NaiveDate) -> SaldoColor {
        self.cash_status(policy, at).color
    }

    pub fn cash_status(&self, policy: &SaldoPolicy, at: NaiveDate) -> CashStatus {
        let projected = current_cash_value(&self.cash_info, self.all_tasks(), at);
        CashStatus {
            at,
            value: projected.unwrap_or(0.0),
            known: projected.is_some(),
            color: policy.classify(projected, self.cash_info.total_worth),
        }
    }

    /// Yearly opening/closing balances over the plan years
    ///
    /// Empty when cash info is incomplete. The closing balance of a year is
    /// the projected balance on December 31 of that year.
    pub fn cash_flow_table(&self, policy: &SaldoPolicy) -> Vec<YearCashFlow> {
        let (Some(current_cash), Some(reserve_date)) =
            (self.cash_info.current_cash, self.cash_info.reserve_date)
        else {
            return Vec::new();
        };
        let monthly = self.cash_info.monthly_contribution.unwrap_or(0.0);

        let mut rows = Vec::new();
        for year in self.plan_years() {
            let (Some(prev_end), Some(end)) = (year.checked_sub(1).and_then(year_end), year_end(year)) else {
                continue;
            };

            let opening_balance =
                current_cash_value(&self.cash_info, self.all_tasks(), prev_end).unwrap_or(current_cash);
            let months = whole_months_between(reserve_date, end) - whole_months_between(reserve_date, prev_end);
            let contributions = monthly * months as f64;
            let costs: f64 = self
                .all_tasks()
                .filter(|t| t.due_date.year() == year && t.due_date > reserve_date)
                .map(|t| t.cost)
                .sum();
            let closing_balance = opening_balance + contributions - costs;

            rows.push(YearCashFlow {
                year,
                opening_balance,
                contributions,
                costs,
                closing_balance,
                color: policy.classify(Some(closing_balance), self.cash_info.total_worth),
            });
        }
        rows
    }
}
