//! CLI interface for pacioli
//!
//! Every setting is a global flag with an environment variable fallback, so
//! the same binary runs from a shell or from a scheduled job that only sets
//! environment variables.
//!
//! # Example
//!
//! ```bash
//! # Build all reports and post them to Slack (the default command)
//! pacioli
//!
//! # Print the Block Kit payload instead of posting
//! pacioli post --dry-run
//!
//! # Post with the daily chart, or only render it
//! pacioli post --chart
//! pacioli chart -o daily_chart.png
//!
//! # Month-to-date project costs as of 2022-11-15, as JSON
//! pacioli --now 2022-11-15 --json projects
//! ```

use crate::error::{PacioliError, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default Slack bot icon
pub const DEFAULT_ICON_URL: &str =
    "https://upload.wikimedia.org/wikipedia/commons/thumb/2/2a/Pacioli.jpg/174px-Pacioli.jpg";

/// Report AWS cost changes per account and project tag
#[derive(Parser, Debug, Clone)]
#[command(name = "pacioli")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cost allocation tag that identifies projects
    #[arg(long, env = "GROUPBY_TAG_NAME", default_value = "ProjectId", global = true)]
    pub tag_name: String,

    /// Project display-name mapping (s3://bucket/key or a local JSON file)
    #[arg(long, env = "GROUPBY_TAG_DISPLAY_MAPPING_S3_URI", global = true)]
    pub mapping_uri: Option<String>,

    /// Account display-name mapping (s3://bucket/key or a local JSON file)
    #[arg(
        long,
        env = "ACCOUNTID_MAPPING_FILEPATH",
        default_value = "accountid_mapping.json",
        global = true
    )]
    pub account_mapping: String,

    /// Slack channel the reports are posted to
    #[arg(long, env = "SLACK_CHANNEL_NAME", default_value = "cost_management", global = true)]
    pub slack_channel: String,

    /// Slack bot token (required when posting)
    #[arg(long, env = "SLACK_API_TOKEN", hide_env_values = true, global = true)]
    pub slack_token: Option<String>,

    /// Username shown on posted messages
    #[arg(long, env = "SLACK_BOT_NAME", default_value = "pacioli", global = true)]
    pub slack_bot_name: String,

    /// Icon shown on posted messages
    #[arg(long, env = "SLACK_BOT_ICONURL", default_value = DEFAULT_ICON_URL, global = true)]
    pub slack_icon_url: String,

    /// AWS region used for Cost Explorer and S3
    #[arg(long, env = "AWS_DEFAULT_REGION", default_value = "us-west-2", global = true)]
    pub region: String,

    /// Custom S3 endpoint (e.g. a local S3-compatible server)
    #[arg(long, env = "S3_SERVICE_ENDPOINT", global = true)]
    pub s3_endpoint: Option<String>,

    /// Number of services listed per project in itemized reports
    #[arg(long, env = "PROJECTSERVICES_TOPN", default_value = "10", global = true)]
    pub top_services: usize,

    /// Timezone for the "generated at" stamp (e.g. "Asia/Tokyo", "UTC")
    /// If not specified, uses the system's local timezone
    #[arg(long, short = 'z', env = "DISPLAY_TIMEZONE", global = true)]
    pub timezone: Option<String>,

    /// Use UTC for the "generated at" stamp (overrides --timezone)
    #[arg(long, global = true)]
    pub utc: bool,

    /// Run as if today were this date (YYYY-MM-DD, UTC)
    #[arg(long, global = true)]
    pub now: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log level for pacioli crates when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Only show warnings and errors (overrides RUST_LOG and --log-level)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Build every report and post it to Slack (default)
    Post {
        /// Print the message payloads instead of posting
        #[arg(long)]
        dry_run: bool,

        /// Break "EC2 - Other" down by usage type in the itemized section
        #[arg(long)]
        expand_other: bool,

        /// Upload the daily cost chart before the report messages
        #[arg(long, env = "PACIOLI_POST_CHART")]
        chart: bool,
    },

    /// Render the daily cost chart per account to a PNG file
    Chart {
        /// Where to write the image
        #[arg(long, short = 'o', default_value = "daily_chart.png")]
        output: PathBuf,
    },

    /// Month-to-date cost change per linked account
    Accounts,

    /// Month-to-date cost change per project tag value
    Projects,

    /// Current month cost per project and service
    Itemized {
        /// Break "EC2 - Other" down by usage type
        #[arg(long)]
        expand_other: bool,
    },

    /// Tax accrued in the current month
    Tax,

    /// Projects seen in the current month with their display names
    ListProjects,
}

impl Default for Command {
    fn default() -> Self {
        Command::Post {
            dry_run: false,
            expand_other: false,
            chart: false,
        }
    }
}

impl Cli {
    /// The command to run, `post` when none was given
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or_default()
    }
}

/// Parse a `--now` override
///
/// # Examples
///
/// ```
/// use pacioli::cli::parse_now_date;
/// use chrono::Datelike;
///
/// let date = parse_now_date("2022-11-15").unwrap();
/// assert_eq!(date.month(), 11);
/// assert!(parse_now_date("2022-11").is_err());
/// ```
pub fn parse_now_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|_| {
        PacioliError::InvalidDate(format!("'{date_str}', expected YYYY-MM-DD"))
    })
}
