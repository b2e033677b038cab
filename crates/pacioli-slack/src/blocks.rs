//! Block Kit message builders
//!
//! Each builder returns the fallback text (used for notifications) together
//! with the blocks of one report section.

use pacioli_core::types::{CostChangeResult, ItemizedEntityCost, NO_TAG_ID};
use serde_json::{Value, json};

/// Label shown for costs of resources without a project tag
pub const UNTAGGED_LABEL: &str = "ProjectIdタグなしのリソース費用";

const DOLLAR_EMOJI: &str = ":heavy_dollar_sign:";

pub fn divider() -> Value {
    json!({"type": "divider"})
}

pub fn section(text: &str) -> Value {
    json!({"type": "section", "text": {"type": "mrkdwn", "text": text}})
}

fn section_with_fields(text: &str, fields: &[String]) -> Value {
    json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": text},
        "fields": fields
            .iter()
            .map(|field| json!({"type": "mrkdwn", "text": field}))
            .collect::<Vec<_>>(),
    })
}

fn context(text: &str) -> Value {
    json!({"type": "context", "elements": [{"type": "mrkdwn", "text": text}]})
}

/// Fixed-width dollar amount
pub fn format_amount(amount: f64) -> String {
    format!("${amount:15.2}")
}

/// Signed percentage with one decimal, e.g. `+12.5%`
pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:+.1}%")
}

fn project_label(id: &str) -> &str {
    if id == NO_TAG_ID { UNTAGGED_LABEL } else { id }
}

/// Dollar-emoji bar sized by the share of the overall total
///
/// One emoji plus one per fifth of the total; amounts under one dollar get
/// a dash.
///
/// # Examples
/// ```
/// use pacioli_slack::blocks::cost_bar;
///
/// assert_eq!(cost_bar(50.0, 100.0), ":heavy_dollar_sign:".repeat(3));
/// assert_eq!(cost_bar(0.5, 100.0), "-");
/// ```
pub fn cost_bar(amount: f64, total: f64) -> String {
    if amount.trunc() <= 0.0 {
        return "-".to_string();
    }
    let share = if total > 0.0 { amount / total } else { 0.0 };
    let multiplier = (5.0 * share).trunc() as usize;
    DOLLAR_EMOJI.repeat(multiplier + 1)
}

/// Header block naming the reference date and generation time
pub fn report_header(date: chrono::NaiveDate, generated_at: &str) -> (String, Vec<Value>) {
    let title = format!("AWS コストレポート {}", date.format("%Y-%m-%d"));
    let blocks = vec![
        json!({"type": "header", "text": {"type": "plain_text", "text": title}}),
        context(&format!("generated at {generated_at}")),
    ];
    (title, blocks)
}

/// Month-to-date cost and change per account
pub fn accounts_blocks(rows: &[CostChangeResult]) -> (String, Vec<Value>) {
    let title = "アカウントごと（月合計）".to_string();
    let mut blocks = vec![section(&title), divider()];

    for row in rows {
        let text = format!("*{}* ({})", row.name, row.id);
        let fields = [
            format_amount(row.current_cost),
            format!(
                "{} (前月同日 ${:.2})",
                format_percentage(row.percentage_change),
                row.previous_cost
            ),
        ];
        blocks.push(section_with_fields(&text, &fields));
    }
    if !rows.is_empty() {
        let total: f64 = rows.iter().map(|r| r.current_cost).sum();
        blocks.push(divider());
        blocks.push(section(&format!("*合計* ${total:.2}")));
    }
    (title, blocks)
}

/// Month-to-date cost per project with a relative cost bar
pub fn project_totals_blocks(rows: &[CostChangeResult]) -> (String, Vec<Value>) {
    let title = "プロジェクトごと（月合計）".to_string();
    let mut blocks = vec![section(&title), divider()];

    let mut sorted: Vec<&CostChangeResult> = rows.iter().collect();
    sorted.sort_by(|a, b| b.current_cost.total_cmp(&a.current_cost));
    let total: f64 = sorted.iter().map(|r| r.current_cost).sum();

    for row in sorted {
        let fields = [
            cost_bar(row.current_cost, total),
            format_amount(row.current_cost),
        ];
        blocks.push(section_with_fields(project_label(&row.id), &fields));
        blocks.push(divider());
    }
    (title, blocks)
}

/// Per-project service breakdown limited to the `top_n` costliest services
///
/// Services beyond `top_n` are folded into one summary line.
pub fn itemized_blocks(items: &[ItemizedEntityCost], top_n: usize) -> (String, Vec<Value>) {
    let title = "プロジェクト別サービス内訳（月合計）".to_string();
    let mut blocks = vec![section(&title), divider()];

    for item in items {
        let heading = if item.id == NO_TAG_ID {
            UNTAGGED_LABEL.to_string()
        } else {
            format!("*{}* ({})", item.name, item.id)
        };
        blocks.push(section(&format!("{heading}  ${:.2}", item.total_cost)));

        let mut lines: Vec<String> = item
            .services
            .iter()
            .take(top_n)
            .map(|service| format!("`{}` {}", format_amount(service.cost), service.name))
            .collect();
        let rest = &item.services[item.services.len().min(top_n)..];
        if !rest.is_empty() {
            let rest_total: f64 = rest.iter().map(|s| s.cost).sum();
            lines.push(format!(
                "`{}` 他 {} サービス",
                format_amount(rest_total),
                rest.len()
            ));
        }
        if !lines.is_empty() {
            blocks.push(section(&lines.join("\n")));
        }
        blocks.push(divider());
    }
    (title, blocks)
}

/// Tax accrued in the current month
pub fn tax_blocks(tax: f64) -> (String, Vec<Value>) {
    let title = format!("税金（月合計）: ${tax:.2}");
    (title.clone(), vec![section(&title)])
}
