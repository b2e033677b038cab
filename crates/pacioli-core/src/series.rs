//! Daily month-to-date series for the cost chart
//!
//! Every account contributes one value per day of the current month, up to
//! the latest reported day. Days without a record carry the closest earlier
//! cumulative value, so a stacked rendering never dips. The previous month is
//! summed over all accounts and spans its full length.

use crate::cumulative::DailyCumulativeTable;
use crate::manager::CumulativeWindow;
use crate::mapping::DisplayNameMapping;
use crate::types::{EntityId, YearMonth};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Month-to-date values of one account, index 0 being the 1st
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountSeries {
    pub id: String,
    pub name: String,
    pub values: Vec<f64>,
}

impl AccountSeries {
    /// Value at the latest day
    pub fn total(&self) -> f64 {
        self.values.last().copied().unwrap_or(0.0)
    }
}

/// Current month per account against the previous month's total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyChartSeries {
    pub latest: NaiveDate,
    /// Most expensive account first
    pub accounts: Vec<AccountSeries>,
    /// Previous month's total over all accounts, index 0 being the 1st
    pub previous_month_total: Vec<f64>,
}

fn value_on(table: &DailyCumulativeTable, entity: &EntityId, month: YearMonth, day: u32) -> f64 {
    table
        .month(entity, month)
        .and_then(|days| days.range(..=day).next_back())
        .map_or(0.0, |(_, cost)| *cost)
}

impl DailyChartSeries {
    /// Build the series from a cumulative window, naming accounts via `names`
    ///
    /// # Examples
    /// ```
    /// use pacioli_core::cumulative::{DailyCumulativeTable, KeySelector};
    /// use pacioli_core::manager::CumulativeWindow;
    /// use pacioli_core::mapping::DisplayNameMapping;
    /// use pacioli_core::series::DailyChartSeries;
    /// use pacioli_core::types::{CostGroup, CostRecordPeriod};
    /// use chrono::NaiveDate;
    ///
    /// let day = |m, d| NaiveDate::from_ymd_opt(2022, m, d).unwrap();
    /// let periods = vec![
    ///     CostRecordPeriod::daily(day(10, 1), vec![CostGroup::new(["000000000001"], 3.0)]),
    ///     CostRecordPeriod::daily(day(11, 1), vec![CostGroup::new(["000000000001"], 1.0)]),
    ///     CostRecordPeriod::daily(day(11, 2), vec![CostGroup::new(["000000000001"], 1.0)]),
    /// ];
    /// let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
    /// let window = CumulativeWindow { table, earliest: day(10, 1), latest: day(11, 2) };
    ///
    /// let series = DailyChartSeries::from_window(&window, &DisplayNameMapping::new());
    /// assert_eq!(series.accounts[0].values, vec![1.0, 2.0]);
    /// assert_eq!(series.previous_month_total.len(), 31);
    /// ```
    pub fn from_window(window: &CumulativeWindow, names: &DisplayNameMapping) -> Self {
        let current_month = YearMonth::of(window.latest);
        let baseline_month = YearMonth::of(window.earliest);
        let last_day = window.latest.day();

        let mut accounts: Vec<AccountSeries> = window
            .table
            .entities()
            .filter(|entity| window.table.month(entity, current_month).is_some())
            .map(|entity| AccountSeries {
                id: entity.to_string(),
                name: names.name_for(entity.as_str()),
                values: (1..=last_day)
                    .map(|day| value_on(&window.table, entity, current_month, day))
                    .collect(),
            })
            .collect();
        accounts.sort_by(|a, b| {
            b.total()
                .total_cmp(&a.total())
                .then_with(|| a.id.cmp(&b.id))
        });

        let previous_month_total = if baseline_month == current_month {
            Vec::new()
        } else {
            (1..=baseline_month.days())
                .map(|day| {
                    window
                        .table
                        .entities()
                        .map(|entity| value_on(&window.table, entity, baseline_month, day))
                        .sum()
                })
                .collect()
        };

        Self {
            latest: window.latest,
            accounts,
            previous_month_total,
        }
    }

    /// Top edge of each account's band when stacked in order
    pub fn stacked(&self) -> Vec<Vec<f64>> {
        let mut running = vec![0.0; self.latest.day() as usize];
        self.accounts
            .iter()
            .map(|account| {
                for (sum, value) in running.iter_mut().zip(&account.values) {
                    *sum += value;
                }
                running.clone()
            })
            .collect()
    }

    /// Month-to-date total over all accounts at the latest day
    pub fn current_total(&self) -> f64 {
        self.accounts.iter().map(AccountSeries::total).sum()
    }

    /// Previous month's total at the latest day of month, stepping back
    /// into shorter months
    pub fn previous_total(&self) -> f64 {
        let day = (self.latest.day() as usize).min(self.previous_month_total.len());
        day.checked_sub(1)
            .and_then(|index| self.previous_month_total.get(index))
            .copied()
            .unwrap_or(0.0)
    }

    /// Number of days on the x axis
    pub fn days(&self) -> u32 {
        (self.latest.day() as usize).max(self.previous_month_total.len()) as u32
    }

    /// Largest value either line reaches
    pub fn max_value(&self) -> f64 {
        let stacked = self.current_total();
        self.previous_month_total
            .iter()
            .copied()
            .fold(stacked, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.previous_month_total.iter().all(|v| *v == 0.0)
    }
}
