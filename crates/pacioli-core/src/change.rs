//! Period-over-period change calculation
//!
//! Compares each entity's month-to-date cost at the latest reported day with
//! the previous month's cost at the same day of month. Gaps never raise
//! errors: a missing latest day walks back to the closest earlier day, and a
//! missing baseline yields a zero previous cost with no percentage change.

use crate::cumulative::DailyCumulativeTable;
use crate::types::{EntityId, YearMonth};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Costs below this value are too small to produce a meaningful percentage
pub const MIN_PERCENTAGE_CHANGE: f64 = 0.01;

/// Current vs previous cost of one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostChange {
    pub current: f64,
    pub previous: f64,
    pub percentage_change: f64,
}

/// Round to one decimal place, ties to even
///
/// Rounds the exact binary value, so `0.45` (stored slightly above the tie)
/// goes up while `-99.25` (an exact tie) goes to `-99.2`.
///
/// # Examples
/// ```
/// use pacioli_core::change::round_to_tenth;
///
/// assert_eq!(round_to_tenth(-99.25), -99.2);
/// assert_eq!(round_to_tenth(0.45), 0.5);
/// ```
pub fn round_to_tenth(value: f64) -> f64 {
    // Float formatting is correctly rounded on the exact decimal expansion
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Percentage change from `previous` to `current`, rounded to one decimal
///
/// Returns 0.0 when either side is below [`MIN_PERCENTAGE_CHANGE`].
///
/// # Examples
/// ```
/// use pacioli_core::change::percentage_change;
///
/// assert_eq!(percentage_change(110.0, 100.0), 10.0);
/// assert_eq!(percentage_change(0.005, 10.0), 0.0);
/// assert_eq!(percentage_change(5.0, 0.0), 0.0);
/// ```
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if current >= MIN_PERCENTAGE_CHANGE && previous >= MIN_PERCENTAGE_CHANGE {
        round_to_tenth((current / previous - 1.0) * 100.0)
    } else {
        0.0
    }
}

/// Compute the change for every entity in `table`
///
/// `earliest` selects the baseline month and `latest` the reference day. The
/// result is keyed by raw entity id and is not ranked; ordering by cost is
/// left to the reporting layer.
pub fn compute_change(
    table: &DailyCumulativeTable,
    earliest: NaiveDate,
    latest: NaiveDate,
) -> BTreeMap<EntityId, CostChange> {
    let current_month = YearMonth::of(latest);
    let baseline_month = YearMonth::of(earliest);
    let latest_day = latest.day();

    table
        .entities()
        .map(|entity| {
            let current = current_cost(table, entity, current_month, latest_day);
            let previous = previous_cost(table, entity, baseline_month, latest_day);
            let change = CostChange {
                current,
                previous,
                percentage_change: percentage_change(current, previous),
            };
            (entity.clone(), change)
        })
        .collect()
}

/// Cumulative cost at `day`, or the closest earlier recorded day, or 0.0
fn current_cost(table: &DailyCumulativeTable, entity: &EntityId, month: YearMonth, day: u32) -> f64 {
    let Some(days) = table.month(entity, month) else {
        return 0.0;
    };
    days.range(..=day)
        .next_back()
        .map(|(_, cost)| *cost)
        .unwrap_or(0.0)
}

/// Baseline cost at `day`, falling back to `day - 1` once
///
/// Shorter baseline months (e.g. the 31st compared against a 30-day month)
/// are covered by the single step back.
fn previous_cost(table: &DailyCumulativeTable, entity: &EntityId, month: YearMonth, day: u32) -> f64 {
    let Some(days) = table.month(entity, month) else {
        return 0.0;
    };
    days.get(&day)
        .or_else(|| day.checked_sub(1).and_then(|d| days.get(&d)))
        .copied()
        .unwrap_or(0.0)
}
