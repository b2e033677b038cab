//! pacioli - AWS cost change reports per account and project, posted to Slack

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pacioli::{
    cli::{Cli, Command},
    config::{Settings, log_filter_directive},
    error::Result,
    output::get_formatter,
    chart::{CHART_SIZE, chart_title, render_daily_chart},
    post::{PostOptions, build_chart_upload, build_report_messages, post_report_messages},
};
use pacioli_aws::{CostExplorerSource, S3MappingLoader, load_sdk_config};
use pacioli_core::{CostManager, ReportManager, fetcher::Paginated};
use pacioli_slack::SlackClient;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type AwsReports = ReportManager<Paginated<CostExplorerSource>>;

/// Spinner shown on a terminal while the billing API is queried
fn spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed_precise}]") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

async fn create_reports(settings: &Settings) -> Result<AwsReports> {
    let sdk = load_sdk_config(&settings.region).await;

    let s3 = settings
        .needs_s3()
        .then(|| S3MappingLoader::from_config(&sdk, settings.s3_endpoint.as_deref()));
    let account_names = settings.account_mapping.load_or_empty(s3.as_ref()).await;
    let project_names = match &settings.project_mapping {
        Some(source) => source.load_or_empty(s3.as_ref()).await,
        None => Default::default(),
    };
    info!(
        "Loaded {} account names and {} project names",
        account_names.len(),
        project_names.len()
    );

    let costs = CostManager::new(
        CostExplorerSource::from_config(&sdk).into_fetcher(),
        settings.tag_name.clone(),
    );
    Ok(ReportManager::new(
        costs,
        settings.boundaries(),
        account_names,
        project_names,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to check for quiet flag
    let cli = Cli::parse();

    // The --quiet flag overrides RUST_LOG, which overrides --log-level
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter_directive(&cli.log_level)))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::from_cli(&cli)?;
    info!(
        "Using tag '{}', timezone {}",
        settings.tag_name,
        settings.timezone.display_name()
    );

    let command = cli.command();
    let show_progress = !settings.json && is_terminal::is_terminal(std::io::stdout());
    let reports = create_reports(&settings).await?;
    let formatter = get_formatter(settings.json);

    match command {
        Command::Post {
            dry_run,
            expand_other,
            chart,
        } => {
            let options = PostOptions {
                top_services: settings.top_services,
                expand_catch_all: expand_other,
                generated_at: settings.generated_at(),
            };
            let pb = spinner(show_progress && !dry_run, "Building cost report");
            let messages = build_report_messages(&reports, &options).await?;
            let chart = if chart {
                Some(build_chart_upload(&reports).await?)
            } else {
                None
            };
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            if dry_run {
                if let Some(chart) = &chart {
                    info!("Chart '{}' ({} bytes) not uploaded", chart.title, chart.png.len());
                }
                println!("{}", serde_json::to_string_pretty(&messages)?);
            } else {
                let client = SlackClient::new(settings.slack.token()?).with_identity(
                    settings.slack.bot_name.clone(),
                    Some(settings.slack.icon_url.clone()).filter(|url| !url.is_empty()),
                );
                post_report_messages(&client, &settings.slack.channel, chart, &messages).await?;
            }
        }
        Command::Chart { output } => {
            info!("Rendering daily chart");
            let pb = spinner(show_progress, "Collecting account costs");
            let series = reports.generate_daily_chart_series().await?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            let png = render_daily_chart(&series, CHART_SIZE)?;
            tokio::fs::write(&output, png).await?;
            println!("{} -> {}", chart_title(&series), output.display());
        }
        Command::Accounts => {
            info!("Running account change report");
            let pb = spinner(show_progress, "Collecting account costs");
            let rows = reports.generate_accounts_report().await?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            println!("{}", formatter.format_changes("accounts", &rows));
        }
        Command::Projects => {
            info!("Running project change report");
            let pb = spinner(show_progress, "Collecting project costs");
            let rows = reports.generate_project_report().await?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            println!("{}", formatter.format_changes("projects", &rows));
        }
        Command::Itemized { expand_other } => {
            info!("Running itemized project report");
            let pb = spinner(show_progress, "Collecting service costs");
            let items = reports.generate_project_itemized_report(expand_other).await?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }
            println!("{}", formatter.format_itemized(&items, settings.top_services));
        }
        Command::Tax => {
            let tax = reports.get_period_total_tax().await?;
            println!("{}", formatter.format_tax(tax, reports.boundaries()));
        }
        Command::ListProjects => {
            let projects = reports.list_projects().await?;
            println!("{}", formatter.format_projects_list(&projects));
        }
    }

    Ok(())
}
