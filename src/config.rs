//! Run settings resolved from the command line
//!
//! [`Settings`] validates the raw [`Cli`] values once, so the command
//! handlers only deal with typed values.

use crate::cli::{Cli, parse_now_date};
use crate::error::{PacioliError, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pacioli_aws::S3MappingLoader;
use pacioli_core::mapping::DisplayNameMapping;
use pacioli_core::period::PeriodBoundaries;
use pacioli_core::timezone::TimezoneConfig;
use std::path::PathBuf;
use tracing::warn;

/// Crates whose log level `--log-level` controls
const LOG_TARGETS: &[&str] = &["pacioli", "pacioli_core", "pacioli_aws", "pacioli_slack"];

/// Where a display-name mapping is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    S3(String),
    File(PathBuf),
}

impl MappingSource {
    /// `s3://` locations go to S3, anything else is a local path
    pub fn parse(location: &str) -> Self {
        if location.starts_with("s3://") {
            MappingSource::S3(location.to_string())
        } else {
            MappingSource::File(PathBuf::from(location))
        }
    }

    pub fn is_s3(&self) -> bool {
        matches!(self, MappingSource::S3(_))
    }

    /// Load the mapping, falling back to an empty one on any failure
    pub async fn load_or_empty(&self, s3: Option<&S3MappingLoader>) -> DisplayNameMapping {
        match (self, s3) {
            (MappingSource::S3(uri), Some(loader)) => loader.load_or_empty(uri).await,
            (MappingSource::S3(uri), None) => {
                warn!("No S3 client available for {}, using empty mapping", uri);
                DisplayNameMapping::default()
            }
            (MappingSource::File(path), _) => DisplayNameMapping::load_file_or_empty(path).await,
        }
    }
}

/// Slack posting identity and target
#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub channel: String,
    pub token: Option<String>,
    pub bot_name: String,
    pub icon_url: String,
}

impl SlackSettings {
    /// The bot token, required only when actually posting
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                PacioliError::Config(
                    "Slack token missing: set SLACK_API_TOKEN or pass --slack-token".to_string(),
                )
            })
    }
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub tag_name: String,
    pub project_mapping: Option<MappingSource>,
    pub account_mapping: MappingSource,
    pub slack: SlackSettings,
    pub region: String,
    pub s3_endpoint: Option<String>,
    pub top_services: usize,
    pub timezone: TimezoneConfig,
    pub now: DateTime<Utc>,
    pub json: bool,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.tag_name.trim().is_empty() {
            return Err(PacioliError::Config("tag name must not be empty".to_string()));
        }
        if cli.top_services == 0 {
            return Err(PacioliError::Config(
                "--top-services must be at least 1".to_string(),
            ));
        }

        let now = match cli.now.as_deref() {
            Some(date) => start_of_day(parse_now_date(date)?),
            None => Utc::now(),
        };

        Ok(Self {
            tag_name: cli.tag_name.trim().to_string(),
            project_mapping: cli
                .mapping_uri
                .as_deref()
                .filter(|uri| !uri.trim().is_empty())
                .map(MappingSource::parse),
            account_mapping: MappingSource::parse(&cli.account_mapping),
            slack: SlackSettings {
                channel: cli.slack_channel.clone(),
                token: cli.slack_token.clone(),
                bot_name: cli.slack_bot_name.clone(),
                icon_url: cli.slack_icon_url.clone(),
            },
            region: cli.region.clone(),
            s3_endpoint: cli.s3_endpoint.clone(),
            top_services: cli.top_services,
            timezone: TimezoneConfig::from_cli(cli.timezone.as_deref(), cli.utc)?,
            now,
            json: cli.json,
        })
    }

    /// Period boundaries for the configured instant
    pub fn boundaries(&self) -> PeriodBoundaries {
        PeriodBoundaries::from_date(self.now.date_naive())
    }

    /// Whether any mapping has to be fetched from S3
    pub fn needs_s3(&self) -> bool {
        self.account_mapping.is_s3() || self.project_mapping.as_ref().is_some_and(MappingSource::is_s3)
    }

    /// "Generated at" stamp in the display timezone
    pub fn generated_at(&self) -> String {
        self.timezone.format_timestamp(self.now)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// `EnvFilter` directive applying `level` to the pacioli crates
///
/// # Examples
/// ```
/// use pacioli::config::log_filter_directive;
///
/// assert!(log_filter_directive("debug").starts_with("pacioli=debug,"));
/// ```
pub fn log_filter_directive(level: &str) -> String {
    let level = level.trim().to_ascii_lowercase();
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
