//! Month-to-date cumulative cost tables
//!
//! The billing API reports daily increments. Comparisons between months need
//! month-to-date totals, so each entity's daily amounts are re-accumulated
//! here: the running total resets on the first of every month and otherwise
//! carries the previous day's total forward.
//!
//! An entity whose previous day is absent restarts from zero on the day it
//! reappears. This mirrors how sparse data from newly created accounts and
//! projects has always been reported and is kept as is.
//!
//! # Examples
//!
//! ```
//! use pacioli_core::cumulative::{DailyCumulativeTable, KeySelector};
//! use pacioli_core::types::{CostGroup, CostRecordPeriod, EntityId, YearMonth};
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2022, 11, d).unwrap();
//! let periods = vec![
//!     CostRecordPeriod::daily(day(2), vec![CostGroup::new(["000000000001"], 2.0)]),
//!     CostRecordPeriod::daily(day(1), vec![CostGroup::new(["000000000001"], 1.0)]),
//! ];
//!
//! let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
//! let account = EntityId::new("000000000001");
//! let month = YearMonth::of(day(1));
//! assert_eq!(table.get(&account, month, 1), Some(1.0));
//! assert_eq!(table.get(&account, month, 2), Some(3.0));
//! ```

use crate::error::{PacioliError, Result};
use crate::types::{CostGroup, CostQuery, CostRecordPeriod, EntityId, YearMonth};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Cumulative costs of one entity within one month, keyed by day of month
pub type MonthCumulative = BTreeMap<u32, f64>;

/// How an entity id is derived from a cost group's keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySelector {
    /// The group must carry exactly one key, used as is
    Single,
    /// One or two keys concatenated in order
    Joined,
}

impl KeySelector {
    /// Extract the entity id, rejecting groups of the wrong arity
    pub fn select(&self, group: &CostGroup, date: NaiveDate) -> Result<EntityId> {
        let found = group.keys.len();
        match self {
            KeySelector::Single if found == 1 => Ok(EntityId::new(group.keys[0].clone())),
            KeySelector::Single => Err(PacioliError::GroupArity {
                expected: 1,
                found,
                date,
            }),
            KeySelector::Joined if (1..=CostQuery::MAX_GROUP_BY).contains(&found) => {
                Ok(EntityId::new(group.joined_key()))
            }
            KeySelector::Joined => Err(PacioliError::GroupArity {
                expected: CostQuery::MAX_GROUP_BY,
                found,
                date,
            }),
        }
    }
}

/// Return the periods ordered by start date
///
/// The fetcher does not guarantee chronological order, and cumulative
/// reconstruction depends on it.
pub fn sorted_periods(periods: &[CostRecordPeriod]) -> Vec<&CostRecordPeriod> {
    let mut sorted: Vec<&CostRecordPeriod> = periods.iter().collect();
    sorted.sort_by_key(|p| p.start);
    sorted
}

/// Per-entity, per-month, per-day month-to-date costs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyCumulativeTable {
    entries: BTreeMap<EntityId, BTreeMap<YearMonth, MonthCumulative>>,
    earliest: Option<NaiveDate>,
    latest: Option<NaiveDate>,
}

impl DailyCumulativeTable {
    /// Build the table from every period
    pub fn build(periods: &[CostRecordPeriod], selector: KeySelector) -> Result<Self> {
        Self::accumulate(periods, selector, None)
    }

    /// Build the table ignoring periods that start after `cutoff`
    pub fn build_until(
        periods: &[CostRecordPeriod],
        selector: KeySelector,
        cutoff: NaiveDate,
    ) -> Result<Self> {
        Self::accumulate(periods, selector, Some(cutoff))
    }

    fn accumulate(
        periods: &[CostRecordPeriod],
        selector: KeySelector,
        cutoff: Option<NaiveDate>,
    ) -> Result<Self> {
        let mut table = Self::default();

        for period in sorted_periods(periods) {
            let date = period.start;
            if cutoff.is_some_and(|cutoff| date > cutoff) {
                debug!("Skipping period {} after cutoff", date);
                continue;
            }
            table.earliest = Some(table.earliest.map_or(date, |d| d.min(date)));
            table.latest = Some(table.latest.map_or(date, |d| d.max(date)));

            let month = YearMonth::of(date);
            let day = date.day();
            let mut seen = HashSet::with_capacity(period.groups.len());

            for group in &period.groups {
                let entity = selector.select(group, date)?;
                if !seen.insert(entity.clone()) {
                    return Err(PacioliError::DuplicateEntry {
                        entity: entity.to_string(),
                        date,
                    });
                }

                let days = table
                    .entries
                    .entry(entity)
                    .or_default()
                    .entry(month)
                    .or_default();
                let previous = if day == 1 {
                    0.0
                } else {
                    days.get(&(day - 1)).copied().unwrap_or(0.0)
                };
                days.insert(day, previous + group.amount);
            }
        }

        debug!(
            "Built cumulative table for {} entities ({:?} to {:?})",
            table.entries.len(),
            table.earliest,
            table.latest
        );
        Ok(table)
    }

    /// Cumulative cost of `entity` on `day` of `month`, if recorded
    pub fn get(&self, entity: &EntityId, month: YearMonth, day: u32) -> Option<f64> {
        self.month(entity, month)?.get(&day).copied()
    }

    /// All recorded days of `entity` in `month`
    pub fn month(&self, entity: &EntityId, month: YearMonth) -> Option<&MonthCumulative> {
        self.entries.get(entity)?.get(&month)
    }

    /// Entities present in the table, in id order
    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.entries.keys()
    }

    /// Earliest period start seen
    pub fn earliest(&self) -> Option<NaiveDate> {
        self.earliest
    }

    /// Latest period start seen
    pub fn latest(&self) -> Option<NaiveDate> {
        self.latest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(start: NaiveDate, groups: &[(&str, f64)]) -> CostRecordPeriod {
        CostRecordPeriod::daily(
            start,
            groups
                .iter()
                .map(|(key, amount)| CostGroup::new([*key], *amount))
                .collect(),
        )
    }

    #[test]
    fn test_day_one_resets_across_month_boundary() {
        let periods = vec![
            period(date(2022, 10, 30), &[("a", 5.0)]),
            period(date(2022, 10, 31), &[("a", 5.0)]),
            period(date(2022, 11, 1), &[("a", 2.0)]),
        ];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        let a = EntityId::new("a");

        assert_eq!(table.get(&a, YearMonth::of(date(2022, 10, 1)), 31), Some(5.0));
        assert_eq!(table.get(&a, YearMonth::of(date(2022, 11, 1)), 1), Some(2.0));
    }

    #[test]
    fn test_running_total_carries_forward() {
        let periods = vec![
            period(date(2022, 11, 1), &[("a", 1.0), ("b", 10.0)]),
            period(date(2022, 11, 2), &[("a", 2.0), ("b", 0.5)]),
            period(date(2022, 11, 3), &[("a", 3.0)]),
        ];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        let month = YearMonth::of(date(2022, 11, 1));

        assert_eq!(table.get(&EntityId::new("a"), month, 3), Some(6.0));
        assert_eq!(table.get(&EntityId::new("b"), month, 2), Some(10.5));
        assert_eq!(table.get(&EntityId::new("b"), month, 3), None);
    }

    #[test]
    fn test_missing_previous_day_restarts_from_zero() {
        let periods = vec![
            period(date(2022, 11, 1), &[("a", 4.0)]),
            period(date(2022, 11, 3), &[("a", 1.0)]),
        ];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        assert_eq!(
            table.get(&EntityId::new("a"), YearMonth::of(date(2022, 11, 1)), 3),
            Some(1.0)
        );
    }

    #[test]
    fn test_entity_first_seen_mid_month() {
        let periods = vec![
            period(date(2022, 11, 1), &[("a", 1.0)]),
            period(date(2022, 11, 2), &[("a", 1.0), ("new", 7.0)]),
            period(date(2022, 11, 3), &[("a", 1.0), ("new", 1.0)]),
        ];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        let month = YearMonth::of(date(2022, 11, 1));
        assert_eq!(table.get(&EntityId::new("new"), month, 2), Some(7.0));
        assert_eq!(table.get(&EntityId::new("new"), month, 3), Some(8.0));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let sorted = vec![
            period(date(2022, 11, 1), &[("a", 1.0)]),
            period(date(2022, 11, 2), &[("a", 2.0)]),
            period(date(2022, 11, 3), &[("a", 3.0)]),
        ];
        let mut shuffled = sorted.clone();
        shuffled.reverse();

        let expected = DailyCumulativeTable::build(&sorted, KeySelector::Single).unwrap();
        let actual = DailyCumulativeTable::build(&shuffled, KeySelector::Single).unwrap();
        assert_eq!(actual, expected);
        assert_eq!(actual.earliest(), Some(date(2022, 11, 1)));
        assert_eq!(actual.latest(), Some(date(2022, 11, 3)));
    }

    #[test]
    fn test_build_until_skips_later_periods() {
        let periods = vec![
            period(date(2022, 11, 13), &[("a", 1.0)]),
            period(date(2022, 11, 14), &[("a", 1.0)]),
            period(date(2022, 11, 15), &[("a", 1.0)]),
        ];
        let table =
            DailyCumulativeTable::build_until(&periods, KeySelector::Single, date(2022, 11, 14))
                .unwrap();
        assert_eq!(table.latest(), Some(date(2022, 11, 14)));
        assert_eq!(
            table.get(&EntityId::new("a"), YearMonth::of(date(2022, 11, 1)), 15),
            None
        );
    }

    #[test]
    fn test_empty_periods_still_bound_range() {
        let periods = vec![
            CostRecordPeriod::daily(date(2022, 10, 1), vec![]),
            period(date(2022, 11, 2), &[("a", 1.0)]),
        ];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        assert_eq!(table.earliest(), Some(date(2022, 10, 1)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_joined_selector_concatenates_keys() {
        let periods = vec![CostRecordPeriod::daily(
            date(2022, 11, 1),
            vec![CostGroup::new(["ProjectId$abc", "Amazon S3"], 1.0)],
        )];
        let table = DailyCumulativeTable::build(&periods, KeySelector::Joined).unwrap();
        let ids: Vec<_> = table.entities().map(|e| e.as_str()).collect();
        assert_eq!(ids, vec!["ProjectId$abcAmazon S3"]);
    }

    #[test]
    fn test_single_selector_rejects_pairs() {
        let periods = vec![CostRecordPeriod::daily(
            date(2022, 11, 1),
            vec![CostGroup::new(["000000000001", "Amazon S3"], 1.0)],
        )];
        let err = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap_err();
        assert!(matches!(
            err,
            PacioliError::GroupArity {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_joined_selector_rejects_empty_keys() {
        let group = CostGroup::new(Vec::<String>::new(), 1.0);
        let err = KeySelector::Joined
            .select(&group, date(2022, 11, 1))
            .unwrap_err();
        assert!(matches!(err, PacioliError::GroupArity { found: 0, .. }));
    }

    #[test]
    fn test_duplicate_entity_in_period_is_rejected() {
        let periods = vec![period(date(2022, 11, 1), &[("a", 1.0), ("a", 2.0)])];
        let err = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap_err();
        assert!(matches!(err, PacioliError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_build_is_idempotent() {
        let periods = vec![
            period(date(2022, 10, 1), &[("a", 0.1), ("b", 0.2)]),
            period(date(2022, 10, 2), &[("a", 0.3)]),
        ];
        let first = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        let second = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        assert_eq!(first, second);
    }
}
