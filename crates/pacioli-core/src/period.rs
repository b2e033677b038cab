//! Reporting period boundaries
//!
//! The billing API reports the current day incompletely, so reports are
//! anchored on the most recent fully elapsed day and compared against the
//! month before it.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Dates a report run is anchored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBoundaries {
    /// Most recent day whose billing data is treated as complete
    pub most_recent_full_date: NaiveDate,
    /// First day of `most_recent_full_date`'s month
    pub current_month_start: NaiveDate,
    /// First day of the month before `current_month_start`
    pub previous_month_start: NaiveDate,
}

impl PeriodBoundaries {
    /// Boundaries for the current instant in UTC
    pub fn current() -> Self {
        compute_period_boundaries(None)
    }

    /// Boundaries for the given calendar date
    ///
    /// On the first of a month the date itself is used, on any other day the
    /// previous day is the most recent full date.
    pub fn from_date(today: NaiveDate) -> Self {
        let most_recent_full_date = if today.day() == 1 {
            today
        } else {
            today - Days::new(1)
        };
        let current_month_start = first_of_month(most_recent_full_date);
        let previous_month_start = first_of_month(current_month_start - Days::new(1));

        Self {
            most_recent_full_date,
            current_month_start,
            previous_month_start,
        }
    }
}

/// Compute the period boundaries for `now`, defaulting to the current UTC instant
///
/// # Examples
/// ```
/// use pacioli_core::period::compute_period_boundaries;
/// use chrono::{NaiveDate, TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2019, 1, 5, 0, 0, 0).unwrap();
/// let bounds = compute_period_boundaries(Some(now));
/// assert_eq!(bounds.most_recent_full_date, NaiveDate::from_ymd_opt(2019, 1, 4).unwrap());
/// assert_eq!(bounds.current_month_start, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
/// assert_eq!(bounds.previous_month_start, NaiveDate::from_ymd_opt(2018, 12, 1).unwrap());
/// ```
pub fn compute_period_boundaries(now: Option<DateTime<Utc>>) -> PeriodBoundaries {
    let now = now.unwrap_or_else(Utc::now);
    PeriodBoundaries::from_date(now.date_naive())
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
