//! Output formatting module for pacioli
//!
//! The read-only commands print their reports either as tables for people
//! or as JSON for scripts:
//! - Table format with coloured percentage changes
//! - JSON format mirroring the report rows
//!
//! # Examples
//!
//! ```
//! use pacioli::output::get_formatter;
//! use pacioli_core::types::CostChangeResult;
//! use chrono::NaiveDate;
//!
//! let rows = vec![CostChangeResult {
//!     id: "000000000001".to_string(),
//!     name: "production".to_string(),
//!     date: NaiveDate::from_ymd_opt(2022, 11, 14).unwrap(),
//!     current_cost: 120.5,
//!     previous_cost: 100.0,
//!     percentage_change: 20.5,
//! }];
//!
//! let formatter = get_formatter(true);
//! assert!(formatter.format_changes("accounts", &rows).contains("\"accounts\""));
//! ```

use colored::Colorize;
use pacioli_core::period::PeriodBoundaries;
use pacioli_core::types::{CostChangeResult, ItemizedEntityCost, NO_TAG_ID};
use prettytable::{Table, format, row};
use serde_json::json;

/// Trait for output formatters
///
/// Each method renders one report kind into a printable string.
pub trait OutputFormatter {
    /// Format per-entity month-to-date change rows under `label`
    fn format_changes(&self, label: &str, rows: &[CostChangeResult]) -> String;

    /// Format the per-project service breakdown, listing at most `top_n` services each
    fn format_itemized(&self, items: &[ItemizedEntityCost], top_n: usize) -> String;

    /// Format the tax accrued over the current month
    fn format_tax(&self, tax: f64, boundaries: &PeriodBoundaries) -> String;

    /// Format `(name, id)` project pairs
    fn format_projects_list(&self, projects: &[(String, String)]) -> String;
}

/// Table formatter for human-readable output
pub struct TableFormatter;

impl TableFormatter {
    fn format_currency(amount: f64) -> String {
        format!("${amount:.2}")
    }

    /// Green for savings, red for increases
    fn format_change(percentage: f64) -> String {
        let text = format!("{percentage:+.1}%");
        if percentage > 0.0 {
            text.red().to_string()
        } else if percentage < 0.0 {
            text.green().to_string()
        } else {
            text
        }
    }

    fn display_id(id: &str) -> &str {
        if id == NO_TAG_ID { "(untagged)" } else { id }
    }

    fn new_table() -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table
    }
}

impl OutputFormatter for TableFormatter {
    fn format_changes(&self, label: &str, rows: &[CostChangeResult]) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![
            b -> label,
            b -> "Name",
            b -> "Current",
            b -> "Previous",
            b -> "Change"
        ]);

        for change in rows {
            table.add_row(row![
                Self::display_id(&change.id),
                change.name,
                r -> Self::format_currency(change.current_cost),
                r -> Self::format_currency(change.previous_cost),
                r -> Self::format_change(change.percentage_change)
            ]);
        }

        let current: f64 = rows.iter().map(|r| r.current_cost).sum();
        let previous: f64 = rows.iter().map(|r| r.previous_cost).sum();
        table.add_row(row![
            b -> "TOTAL",
            "",
            br -> Self::format_currency(current),
            br -> Self::format_currency(previous),
            ""
        ]);

        let mut output = String::new();
        if let Some(first) = rows.first() {
            output.push_str(&format!("As of {}\n", first.date));
        }
        output.push_str(&table.to_string());
        output
    }

    fn format_itemized(&self, items: &[ItemizedEntityCost], top_n: usize) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![b -> "Project", b -> "Service", b -> "Cost"]);

        for item in items {
            let heading = format!("{} ({})", Self::display_id(&item.id), item.name);
            table.add_row(row![b -> heading, "", br -> Self::format_currency(item.total_cost)]);

            for service in item.services.iter().take(top_n) {
                table.add_row(row![
                    "",
                    service.name,
                    r -> Self::format_currency(service.cost)
                ]);
            }
            let rest = item.services.len().saturating_sub(top_n);
            if rest > 0 {
                let rest_cost: f64 = item.services[top_n..].iter().map(|s| s.cost).sum();
                table.add_row(row![
                    "",
                    format!("({rest} more services)"),
                    r -> Self::format_currency(rest_cost)
                ]);
            }
        }

        table.to_string()
    }

    fn format_tax(&self, tax: f64, boundaries: &PeriodBoundaries) -> String {
        format!(
            "Tax {}..{}: {}",
            boundaries.current_month_start,
            boundaries.most_recent_full_date,
            Self::format_currency(tax)
        )
    }

    fn format_projects_list(&self, projects: &[(String, String)]) -> String {
        let mut table = Self::new_table();
        table.set_titles(row![b -> "Name", b -> "ProjectId"]);
        for (name, id) in projects {
            table.add_row(row![name, id]);
        }
        table.to_string()
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    fn pretty(value: serde_json::Value) -> String {
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_changes(&self, label: &str, rows: &[CostChangeResult]) -> String {
        let current: f64 = rows.iter().map(|r| r.current_cost).sum();
        let previous: f64 = rows.iter().map(|r| r.previous_cost).sum();
        Self::pretty(json!({
            label: rows,
            "totals": {
                "current_cost": current,
                "previous_cost": previous,
            }
        }))
    }

    fn format_itemized(&self, items: &[ItemizedEntityCost], top_n: usize) -> String {
        let projects: Vec<_> = items
            .iter()
            .map(|item| {
                json!({
                    "id": item.id,
                    "name": item.name,
                    "date": item.date,
                    "total_cost": item.total_cost,
                    "services": item.services.iter().take(top_n).collect::<Vec<_>>(),
                    "other_services": item.services.len().saturating_sub(top_n),
                })
            })
            .collect();
        Self::pretty(json!({ "projects": projects }))
    }

    fn format_tax(&self, tax: f64, boundaries: &PeriodBoundaries) -> String {
        Self::pretty(json!({
            "start": boundaries.current_month_start,
            "end": boundaries.most_recent_full_date,
            "tax": tax,
        }))
    }

    fn format_projects_list(&self, projects: &[(String, String)]) -> String {
        let projects: Vec<_> = projects
            .iter()
            .map(|(name, id)| json!({"name": name, "id": id}))
            .collect();
        Self::pretty(json!({ "projects": projects }))
    }
}

/// Get the appropriate formatter based on output format preference
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TableFormatter)
    }
}
