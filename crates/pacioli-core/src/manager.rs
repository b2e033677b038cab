//! Cost manager: fetch and aggregate
//!
//! `CostManager` owns a [`CostFetcher`] and turns the raw grouped periods it
//! returns into per-entity totals, changes, itemized breakdowns, and tax.

use crate::change::{CostChange, compute_change};
use crate::cumulative::{DailyCumulativeTable, KeySelector, sorted_periods};
use crate::error::Result;
use crate::fetcher::CostFetcher;
use crate::itemized::{
    CATCH_ALL_SERVICE, ServiceTotals, aggregate_itemized, aggregate_usage_type_breakdown,
};
use crate::period::PeriodBoundaries;
use crate::tax::sum_tax;
use crate::types::{
    CostFilter, CostQuery, CostRecordPeriod, EntityId, GroupDefinition, dimension,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Changes for every entity plus the dates they were computed against
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityChanges {
    /// First day of the baseline month
    pub earliest: NaiveDate,
    /// Reference day for current and previous costs
    pub latest: NaiveDate,
    pub changes: BTreeMap<EntityId, CostChange>,
}

/// A cumulative table with the dates its changes are computed against
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeWindow {
    pub table: DailyCumulativeTable,
    /// First day of the baseline month
    pub earliest: NaiveDate,
    /// Latest reported day, never after the most recent full date
    pub latest: NaiveDate,
}

/// Fetches grouped costs and aggregates them per account or project
pub struct CostManager<F> {
    fetcher: F,
    tag_name: String,
}

impl<F: CostFetcher> CostManager<F> {
    /// Create a manager grouping project costs by `tag_name`
    pub fn new(fetcher: F, tag_name: impl Into<String>) -> Self {
        Self {
            fetcher,
            tag_name: tag_name.into(),
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch every period of `query`
    pub async fn collect(&self, query: &CostQuery) -> Result<Vec<CostRecordPeriod>> {
        info!(
            "Collecting costs start={} end={} granularity={:?} group_by={:?}",
            query.start(),
            query.end(),
            query.granularity(),
            query.group_by()
        );
        self.fetcher.fetch(query).await
    }

    fn account_grouping() -> Vec<GroupDefinition> {
        vec![GroupDefinition::dimension(dimension::LINKED_ACCOUNT)]
    }

    fn project_grouping(&self) -> Vec<GroupDefinition> {
        vec![GroupDefinition::tag(&self.tag_name)]
    }

    async fn flat_totals(
        &self,
        query: CostQuery,
        selector: KeySelector,
    ) -> Result<BTreeMap<EntityId, f64>> {
        let periods = self.collect(&query).await?;
        let mut totals = BTreeMap::new();
        for period in sorted_periods(&periods) {
            for group in &period.groups {
                let entity = selector.select(group, period.start)?;
                *totals.entry(entity).or_insert(0.0) += group.amount;
            }
        }
        Ok(totals)
    }

    /// Total cost per linked account over `[start, end)`
    pub async fn get_account_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<EntityId, f64>> {
        let query = CostQuery::new(start, end, Self::account_grouping())?;
        self.flat_totals(query, KeySelector::Single).await
    }

    /// Total cost per raw project tag value over `[start, end)`
    pub async fn get_project_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<EntityId, f64>> {
        let query = CostQuery::new(start, end, self.project_grouping())?;
        self.flat_totals(query, KeySelector::Joined).await
    }

    async fn cumulative_window(
        &self,
        boundaries: &PeriodBoundaries,
        group_by: Vec<GroupDefinition>,
        selector: KeySelector,
    ) -> Result<CumulativeWindow> {
        let query = CostQuery::new(
            boundaries.previous_month_start,
            boundaries.most_recent_full_date,
            group_by,
        )?;
        let periods = self.collect(&query).await?;
        let table = DailyCumulativeTable::build_until(
            &periods,
            selector,
            boundaries.most_recent_full_date,
        )?;

        let earliest = table.earliest().unwrap_or(boundaries.previous_month_start);
        let latest = table
            .latest()
            .map_or(boundaries.most_recent_full_date, |latest| {
                latest.min(boundaries.most_recent_full_date)
            });
        Ok(CumulativeWindow {
            table,
            earliest,
            latest,
        })
    }

    async fn change_for(
        &self,
        boundaries: &PeriodBoundaries,
        group_by: Vec<GroupDefinition>,
        selector: KeySelector,
    ) -> Result<EntityChanges> {
        let window = self.cumulative_window(boundaries, group_by, selector).await?;
        debug!(
            "Computing change earliest={} latest={}",
            window.earliest, window.latest
        );

        Ok(EntityChanges {
            changes: compute_change(&window.table, window.earliest, window.latest),
            earliest: window.earliest,
            latest: window.latest,
        })
    }

    /// Daily month-to-date costs per linked account over the report window
    pub async fn get_account_cumulative(
        &self,
        boundaries: &PeriodBoundaries,
    ) -> Result<CumulativeWindow> {
        self.cumulative_window(boundaries, Self::account_grouping(), KeySelector::Single)
            .await
    }

    /// Month-to-date change per linked account
    pub async fn get_change_in_accounts(
        &self,
        boundaries: &PeriodBoundaries,
    ) -> Result<EntityChanges> {
        self.change_for(boundaries, Self::account_grouping(), KeySelector::Single)
            .await
    }

    /// Month-to-date change per raw project tag value
    pub async fn get_change_in_projects(
        &self,
        boundaries: &PeriodBoundaries,
    ) -> Result<EntityChanges> {
        self.change_for(boundaries, self.project_grouping(), KeySelector::Joined)
            .await
    }

    /// Cost per raw project tag value and service over `[start, end)`
    pub async fn get_project_itemized_totals(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<EntityId, ServiceTotals>> {
        let mut group_by = self.project_grouping();
        group_by.push(GroupDefinition::dimension(dimension::SERVICE));
        let query = CostQuery::new(start, end, group_by)?;
        let periods = self.collect(&query).await?;
        aggregate_itemized(&periods)
    }

    /// Break the catch-all service of one project down by usage type
    ///
    /// `tag_value` is the project's tag value without the `<tag>$` prefix
    /// (empty for untagged resources). Failures are logged and yield an
    /// empty breakdown so the caller keeps the undivided bucket.
    pub async fn get_catch_all_breakdown(
        &self,
        tag_value: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ServiceTotals {
        match self.try_catch_all_breakdown(tag_value, start, end).await {
            Ok(breakdown) => breakdown,
            Err(e) => {
                warn!(
                    "Could not break down '{}' for project '{}': {}",
                    CATCH_ALL_SERVICE, tag_value, e
                );
                ServiceTotals::new()
            }
        }
    }

    async fn try_catch_all_breakdown(
        &self,
        tag_value: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ServiceTotals> {
        let filter = CostFilter {
            tag: Some((self.tag_name.clone(), tag_value.to_string())),
            service: Some(CATCH_ALL_SERVICE.to_string()),
            linked_account: None,
        };
        let query = CostQuery::new(
            start,
            end,
            vec![
                GroupDefinition::dimension(dimension::SERVICE),
                GroupDefinition::dimension(dimension::USAGE_TYPE),
            ],
        )?
        .with_filter(filter);
        let periods = self.collect(&query).await?;
        aggregate_usage_type_breakdown(&periods, CATCH_ALL_SERVICE)
    }

    /// Total tax over `[start, end)`
    pub async fn get_period_total_tax(&self, start: NaiveDate, end: NaiveDate) -> Result<f64> {
        let query = CostQuery::new(
            start,
            end,
            vec![GroupDefinition::dimension(dimension::RECORD_TYPE)],
        )?;
        let periods = self.collect(&query).await?;
        sum_tax(&periods)
    }
}
