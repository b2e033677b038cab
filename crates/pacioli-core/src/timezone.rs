//! Display timezone handling
//!
//! Billing dates are UTC calendar days. Only the "generated at" stamp shown
//! with a report is rendered in the configured display timezone.

use crate::error::{PacioliError, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;
use tracing::debug;

/// Timezone used for human facing timestamps
#[derive(Debug, Clone)]
pub struct TimezoneConfig {
    pub tz: Tz,
    pub is_utc: bool,
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        let tz = get_local_timezone();
        Self {
            is_utc: tz == Tz::UTC,
            tz,
        }
    }
}

impl TimezoneConfig {
    /// Build from the `--timezone` / `--utc` arguments
    pub fn from_cli(timezone_str: Option<&str>, use_utc: bool) -> Result<Self> {
        if use_utc {
            return Ok(Self {
                tz: Tz::UTC,
                is_utc: true,
            });
        }

        match timezone_str {
            Some(tz_str) => {
                let tz = Tz::from_str(tz_str).map_err(|_| {
                    PacioliError::InvalidTimezone(format!(
                        "'{tz_str}'. Use format like 'Asia/Tokyo', 'America/New_York', or 'UTC'"
                    ))
                })?;
                Ok(Self {
                    tz,
                    is_utc: tz == Tz::UTC,
                })
            }
            None => Ok(Self::default()),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.is_utc { "UTC" } else { self.tz.name() }
    }

    /// Render `instant` as `YYYY-MM-DD HH:MM <zone>` in this timezone
    pub fn format_timestamp(&self, instant: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            instant.with_timezone(&self.tz).format("%Y-%m-%d %H:%M"),
            self.display_name()
        )
    }
}

/// Detect the system's local timezone, falling back to UTC
pub fn get_local_timezone() -> Tz {
    if let Ok(tz_str) = std::env::var("TZ")
        && let Ok(tz) = Tz::from_str(&tz_str)
    {
        debug!("Using timezone from TZ environment variable: {}", tz_str);
        return tz;
    }

    match iana_time_zone::get_timezone() {
        Ok(tz_str) => Tz::from_str(&tz_str).unwrap_or_else(|_| {
            debug!("Could not parse system timezone '{}', using UTC", tz_str);
            Tz::UTC
        }),
        Err(e) => {
            debug!("Could not detect local timezone: {:?}, using UTC", e);
            Tz::UTC
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ENV_MUTEX, EnvVarGuard};
    use chrono::TimeZone;

    #[test]
    fn test_utc_flag_wins() {
        let config = TimezoneConfig::from_cli(Some("Asia/Tokyo"), true).unwrap();
        assert!(config.is_utc);
        assert_eq!(config.display_name(), "UTC");
    }

    #[test]
    fn test_explicit_timezone() {
        let config = TimezoneConfig::from_cli(Some("Asia/Tokyo"), false).unwrap();
        assert!(!config.is_utc);
        assert_eq!(config.display_name(), "Asia/Tokyo");
    }

    #[test]
    fn test_invalid_timezone() {
        let result = TimezoneConfig::from_cli(Some("Mars/Olympus_Mons"), false);
        assert!(matches!(result, Err(PacioliError::InvalidTimezone(_))));
    }

    #[test]
    fn test_format_timestamp_shifts_zone() {
        let config = TimezoneConfig::from_cli(Some("Asia/Tokyo"), false).unwrap();
        let instant = Utc.with_ymd_and_hms(2022, 11, 14, 23, 30, 0).unwrap();
        assert_eq!(config.format_timestamp(instant), "2022-11-15 08:30 Asia/Tokyo");
    }

    #[tokio::test]
    async fn test_tz_env_var_is_honoured() {
        let _lock = ENV_MUTEX.lock().await;
        let mut guard = EnvVarGuard::new();
        guard.set("TZ", "Europe/Berlin");
        assert_eq!(get_local_timezone(), Tz::Europe__Berlin);
    }
}
