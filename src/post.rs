//! Slack report assembly and posting
//!
//! A report run posts one message per section: the header with the account
//! summary, the project summary, the itemized breakdown and the tax line.
//! With the chart enabled, the daily chart image is uploaded first.

use crate::chart::{CHART_SIZE, chart_legend, chart_title, render_daily_chart};
use crate::error::Result;
use pacioli_core::fetcher::CostFetcher;
use pacioli_core::report::ReportManager;
use pacioli_slack::SlackClient;
use pacioli_slack::blocks;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

/// One Slack message: notification text plus its blocks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMessage {
    pub text: String,
    pub blocks: Vec<Value>,
}

impl From<(String, Vec<Value>)> for ReportMessage {
    fn from((text, blocks): (String, Vec<Value>)) -> Self {
        Self { text, blocks }
    }
}

/// Rendered daily chart with its upload title and comment
#[derive(Debug, Clone, PartialEq)]
pub struct ChartUpload {
    pub filename: String,
    pub title: String,
    pub comment: String,
    pub png: Vec<u8>,
}

/// Render the daily account chart for upload
pub async fn build_chart_upload<F: CostFetcher>(reports: &ReportManager<F>) -> Result<ChartUpload> {
    info!("Creating daily chart...");
    let series = reports.generate_daily_chart_series().await?;
    let png = render_daily_chart(&series, CHART_SIZE)?;
    Ok(ChartUpload {
        filename: format!("daily_chart_{}.png", series.latest),
        title: chart_title(&series),
        comment: chart_legend(&series),
        png,
    })
}

/// What goes into a posted report
#[derive(Debug, Clone)]
pub struct PostOptions {
    pub top_services: usize,
    pub expand_catch_all: bool,
    pub generated_at: String,
}

/// Build every report section as its own message
pub async fn build_report_messages<F: CostFetcher>(
    reports: &ReportManager<F>,
    options: &PostOptions,
) -> Result<Vec<ReportMessage>> {
    let date = reports.boundaries().most_recent_full_date;

    info!("Get account changes...");
    let accounts = reports.generate_accounts_report().await?;
    let (text, mut header) = blocks::report_header(date, &options.generated_at);
    let (_, account_blocks) = blocks::accounts_blocks(&accounts);
    header.extend(account_blocks);
    let mut messages = vec![ReportMessage {
        text,
        blocks: header,
    }];

    info!("Get project totals...");
    let projects = reports.generate_project_report().await?;
    messages.push(blocks::project_totals_blocks(&projects).into());

    info!("Get project service breakdown...");
    let itemized = reports
        .generate_project_itemized_report(options.expand_catch_all)
        .await?;
    messages.push(blocks::itemized_blocks(&itemized, options.top_services).into());

    info!("Get tax...");
    let tax = reports.get_period_total_tax().await?;
    messages.push(blocks::tax_blocks(tax).into());

    Ok(messages)
}

/// Post the chart, if any, then the messages to `channel` in order
///
/// The channel name is resolved once for the whole run.
pub async fn post_report_messages(
    client: &SlackClient,
    channel: &str,
    chart: Option<ChartUpload>,
    messages: &[ReportMessage],
) -> Result<()> {
    let channel_id = client.channel_id(channel).await?;

    if let Some(chart) = chart {
        client
            .upload_file(
                &channel_id,
                &chart.filename,
                &chart.title,
                &chart.comment,
                chart.png,
            )
            .await?;
        info!("posted: daily chart");
    }

    for message in messages {
        debug!("{} blocks for '{}'", message.blocks.len(), message.text);
        client
            .post_message(&channel_id, &message.text, &message.blocks)
            .await?;
    }
    info!("posted {} messages!", messages.len());
    Ok(())
}
