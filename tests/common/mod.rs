//! Common test utilities and fixture builders for pacioli tests

#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use pacioli_core::fetcher::InMemoryCostFetcher;
use pacioli_core::manager::CostManager;
use pacioli_core::mapping::DisplayNameMapping;
use pacioli_core::period::PeriodBoundaries;
use pacioli_core::report::ReportManager;
use pacioli_core::types::{CostGroup, CostRecordPeriod, DEFAULT_TAG_NAME};
use std::collections::BTreeMap;

/// Account used across fixtures
pub const ACCOUNT_ID: &str = "000000000001";

/// Tagged project used across fixtures
pub const PROJECT_ID: &str = "2895b79a-c8ff-428c-b45a-e581dad87b84";

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Raw project key as the billing API returns it
pub fn project_key(value: &str) -> String {
    format!("{DEFAULT_TAG_NAME}${value}")
}

/// Builder collecting daily cost groups into periods
#[derive(Debug, Default)]
pub struct PeriodsBuilder {
    days: BTreeMap<NaiveDate, Vec<CostGroup>>,
}

impl PeriodsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one group on `day`
    pub fn cost(mut self, day: NaiveDate, keys: &[&str], amount: f64) -> Self {
        self.days
            .entry(day)
            .or_default()
            .push(CostGroup::new(keys.iter().copied(), amount));
        self
    }

    /// Add consecutive daily amounts starting at `first`
    pub fn series(mut self, first: NaiveDate, keys: &[&str], amounts: &[f64]) -> Self {
        for (offset, amount) in amounts.iter().enumerate() {
            let day = first + Days::new(offset as u64);
            self = self.cost(day, keys, *amount);
        }
        self
    }

    /// Periods in ascending date order
    pub fn build(self) -> Vec<CostRecordPeriod> {
        self.days
            .into_iter()
            .map(|(day, groups)| CostRecordPeriod::daily(day, groups))
            .collect()
    }

    /// Periods in descending date order, as an unordered source might return them
    pub fn build_reversed(self) -> Vec<CostRecordPeriod> {
        let mut periods = self.build();
        periods.reverse();
        periods
    }
}

/// Split `total` into daily amounts proportional to `weights`
pub fn spread(total: f64, weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| total * w / sum).collect()
}

/// Report manager over `fetcher` for a run on `today`
pub fn report_manager(
    fetcher: InMemoryCostFetcher,
    today: NaiveDate,
) -> ReportManager<InMemoryCostFetcher> {
    let accounts: DisplayNameMapping = [(ACCOUNT_ID, "production")].into_iter().collect();
    let projects: DisplayNameMapping = [(PROJECT_ID, "billing-api")].into_iter().collect();
    ReportManager::new(
        CostManager::new(fetcher, DEFAULT_TAG_NAME),
        PeriodBoundaries::from_date(today),
        accounts,
        projects,
    )
}
