//! Text rendering of plan data for MCP tool responses

use crate::plan::{
    CashStatus, Element, PlanState, Pricing, TaskGroup, TaskGroupDraft, Timeline, YearCashFlow,
};
use std::fmt::Write;

/// Format an amount with two decimals
pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Format a rate such as 0.025 as "2.50%"
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// One line per element with its space and categories
pub fn format_elements(state: &PlanState, elements: &[&Element]) -> String {
    if elements.is_empty() {
        return "No elements found".to_string();
    }

    let mut result = format!("Found {} element(s):\n\n", elements.len());
    for element in elements {
        let _ = writeln!(result, "- [{}] {}", element.id, element.name);
        if let Some(space) = element
            .space_id
            .as_deref()
            .and_then(|id| state.find_space(id))
        {
            let _ = writeln!(result, "  Space: {}", space.name);
        }
        if !element.categories.is_empty() {
            let _ = writeln!(result, "  Categories: {}", element.categories.join(", "));
        }
        if !element.tasks.is_empty() {
            let total: f64 = element.tasks.iter().map(|t| t.cost).sum();
            let _ = writeln!(
                result,
                "  Tasks: {} (total {})",
                element.tasks.len(),
                format_money(total)
            );
        }
    }
    result
}

/// Render a draft the way the task group form shows it
pub fn format_draft(draft: &TaskGroupDraft) -> String {
    let mut result = String::new();
    if !draft.name.is_empty() {
        let _ = writeln!(result, "Name: {}", draft.name);
    }
    let _ = writeln!(result, "Category: {}", draft.category);
    if let Some(date) = draft.group_date {
        let _ = writeln!(result, "Start date: {}", date);
    }

    if draft.assign_prices_individually {
        let _ = writeln!(result, "Pricing: individual");
    } else if let Some(cost) = draft.base_cost {
        let _ = writeln!(result, "Pricing: {} per element", format_money(cost));
    }
    if draft.periodic {
        let months = draft
            .periodicity_months
            .map(|m| m.to_string())
            .unwrap_or_else(|| "?".to_string());
        let years = draft
            .total_years
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        let _ = writeln!(result, "Recurs: every {} month(s) for {} year(s)", months, years);
    }
    if draft.indexation
        && let Some(rate) = draft.indexation_rate
    {
        let _ = writeln!(result, "Indexation: {} per occurrence", format_rate(rate));
    }

    let _ = writeln!(result, "Elements ({}):", draft.element_labels.len());
    for label in &draft.element_labels {
        let space = label
            .space_name
            .as_deref()
            .map(|s| format!(" ({})", s))
            .unwrap_or_default();
        let price = draft
            .individual_costs
            .get(&label.element_id)
            .filter(|_| draft.assign_prices_individually)
            .map(|c| format!(" - {}", format_money(*c)))
            .unwrap_or_default();
        let _ = writeln!(result, "- [{}] {}{}{}", label.element_id, label.name, space, price);
    }
    result
}

/// Summary line of a stored task group
pub fn format_task_group(state: &PlanState, group: &TaskGroup) -> String {
    let occurrences = state.tasks_of_group(&group.id).count();
    let total: f64 = state.tasks_of_group(&group.id).map(|t| t.cost).sum();
    let pricing = match &group.pricing {
        Pricing::Shared { cost } => format!("{} per element", format_money(*cost)),
        Pricing::Individual { costs } => format!("individual ({} prices)", costs.len()),
    };
    format!(
        "Task group {} '{}': {} occurrence(s), total {}, pricing {}",
        group.id,
        group.name,
        occurrences,
        format_money(total),
        pricing
    )
}

/// Years × task groups × totals
pub fn format_timeline(timeline: &Timeline) -> String {
    if timeline.years.is_empty() {
        return "Timeline is empty. Add task groups or set the plan horizon.".to_string();
    }

    let mut result = String::new();
    for year in &timeline.years {
        let _ = writeln!(result, "{}: {}", year.year, format_money(year.total_cost));
        for group in &year.groups {
            let _ = writeln!(
                result,
                "  - [{}] {} x{}: {}",
                group.group_id,
                group.name,
                group.occurrences,
                format_money(group.cost)
            );
        }
        if year.ad_hoc_cost != 0.0 {
            let _ = writeln!(result, "  - other tasks: {}", format_money(year.ad_hoc_cost));
        }
    }
    let _ = writeln!(result, "Total: {}", format_money(timeline.total_cost()));
    result
}

pub fn format_cash_status(status: &CashStatus) -> String {
    if !status.known {
        return format!(
            "Cash value at {}: {} (cash info incomplete; set current_cash and reserve_date)\nSaldo: {} ({})",
            status.at,
            format_money(status.value),
            status.color,
            status.color.color_name()
        );
    }
    format!(
        "Cash value at {}: {}\nSaldo: {} ({})",
        status.at,
        format_money(status.value),
        status.color,
        status.color.color_name()
    )
}

pub fn format_cash_flow(rows: &[YearCashFlow]) -> String {
    if rows.is_empty() {
        return "No cash flow available. Set cash info and add task groups or a plan horizon."
            .to_string();
    }

    let mut result = String::from("year | opening | contributions | costs | closing | saldo\n");
    for row in rows {
        let _ = writeln!(
            result,
            "{} | {} | {} | {} | {} | {}",
            row.year,
            format_money(row.opening_balance),
            format_money(row.contributions),
            format_money(row.costs),
            format_money(row.closing_balance),
            row.color
        );
    }
    result
}
