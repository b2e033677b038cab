//! Report generation
//!
//! `ReportManager` binds a [`CostManager`] to one set of period boundaries
//! and the display-name mappings, and turns aggregated costs into the
//! ranked, named rows the output layers render.

use crate::error::Result;
use crate::fetcher::CostFetcher;
use crate::itemized::{CATCH_ALL_SERVICE, DEFAULT_EXCLUDED_SERVICES, itemize_services};
use crate::manager::{CostManager, EntityChanges};
use crate::mapping::DisplayNameMapping;
use crate::period::PeriodBoundaries;
use crate::series::DailyChartSeries;
use crate::types::{CostChangeResult, EntityId, ItemizedEntityCost, NO_TAG_ID};
use std::cmp::Ordering;
use tracing::info;

/// Produces account, project, itemized and tax reports for one run
pub struct ReportManager<F> {
    costs: CostManager<F>,
    boundaries: PeriodBoundaries,
    account_names: DisplayNameMapping,
    project_names: DisplayNameMapping,
}

fn by_current_cost_desc(a: &CostChangeResult, b: &CostChangeResult) -> Ordering {
    b.current_cost
        .total_cmp(&a.current_cost)
        .then_with(|| a.id.cmp(&b.id))
}

impl<F: CostFetcher> ReportManager<F> {
    pub fn new(
        costs: CostManager<F>,
        boundaries: PeriodBoundaries,
        account_names: DisplayNameMapping,
        project_names: DisplayNameMapping,
    ) -> Self {
        info!(
            "most_recent_full_date={} current_month_start={} previous_month_start={}",
            boundaries.most_recent_full_date,
            boundaries.current_month_start,
            boundaries.previous_month_start
        );
        Self {
            costs,
            boundaries,
            account_names,
            project_names,
        }
    }

    pub fn boundaries(&self) -> &PeriodBoundaries {
        &self.boundaries
    }

    pub fn cost_manager(&self) -> &CostManager<F> {
        &self.costs
    }

    fn rows(
        &self,
        changes: EntityChanges,
        id_of: impl Fn(&str) -> String,
        names: &DisplayNameMapping,
    ) -> Vec<CostChangeResult> {
        let date = changes.latest;
        let mut rows: Vec<CostChangeResult> = changes
            .changes
            .into_iter()
            .map(|(entity, change)| {
                let id = id_of(entity.as_str());
                CostChangeResult {
                    name: names.name_for(&id),
                    id,
                    date,
                    current_cost: change.current,
                    previous_cost: change.previous,
                    percentage_change: change.percentage_change,
                }
            })
            .collect();
        rows.sort_by(by_current_cost_desc);
        rows
    }

    /// Change per account, most expensive first
    pub async fn generate_accounts_report(&self) -> Result<Vec<CostChangeResult>> {
        let changes = self.costs.get_change_in_accounts(&self.boundaries).await?;
        Ok(self.rows(changes, |raw| raw.to_string(), &self.account_names))
    }

    /// Change per project, most expensive first
    ///
    /// Ids have the tag prefix removed; untagged costs use the no-tag id.
    pub async fn generate_project_report(&self) -> Result<Vec<CostChangeResult>> {
        let changes = self.costs.get_change_in_projects(&self.boundaries).await?;
        let tag_name = self.costs.tag_name();
        Ok(self.rows(
            changes,
            |raw| EntityId::new(raw).display_id(tag_name),
            &self.project_names,
        ))
    }

    /// Per-project service breakdown for the current month, tax excluded
    ///
    /// With `expand_catch_all`, projects with a catch-all service get it
    /// replaced by a usage-type breakdown when one is available.
    pub async fn generate_project_itemized_report(
        &self,
        expand_catch_all: bool,
    ) -> Result<Vec<ItemizedEntityCost>> {
        let start = self.boundaries.current_month_start;
        let end = self.boundaries.most_recent_full_date;
        let totals = self.costs.get_project_itemized_totals(start, end).await?;
        let tag_name = self.costs.tag_name();

        let mut items = Vec::with_capacity(totals.len());
        for (raw_id, services) in totals {
            let id = raw_id.display_id(tag_name);
            let breakdown = if expand_catch_all && services.contains_key(CATCH_ALL_SERVICE) {
                let tag_value = if id == NO_TAG_ID { "" } else { id.as_str() };
                Some(self.costs.get_catch_all_breakdown(tag_value, start, end).await)
            } else {
                None
            };

            let lines = itemize_services(&services, DEFAULT_EXCLUDED_SERVICES, breakdown.as_ref());
            let name = self.project_names.name_for(&id);
            items.push(ItemizedEntityCost::new(
                raw_id,
                id,
                name,
                self.boundaries.most_recent_full_date,
                lines,
            ));
        }

        items.sort_by(|a, b| {
            b.total_cost
                .total_cmp(&a.total_cost)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(items)
    }

    /// Daily month-to-date cost per account for the chart
    pub async fn generate_daily_chart_series(&self) -> Result<DailyChartSeries> {
        let window = self.costs.get_account_cumulative(&self.boundaries).await?;
        Ok(DailyChartSeries::from_window(&window, &self.account_names))
    }

    /// Tax accrued in the current month so far
    pub async fn get_period_total_tax(&self) -> Result<f64> {
        self.costs
            .get_period_total_tax(
                self.boundaries.current_month_start,
                self.boundaries.most_recent_full_date,
            )
            .await
    }

    /// `(name, id)` of every project seen in the current month, sorted by name
    pub async fn list_projects(&self) -> Result<Vec<(String, String)>> {
        let totals = self
            .costs
            .get_project_totals(
                self.boundaries.current_month_start,
                self.boundaries.most_recent_full_date,
            )
            .await?;
        let tag_name = self.costs.tag_name();

        let mut projects: Vec<(String, String)> = totals
            .keys()
            .map(|raw| raw.display_id(tag_name))
            .filter(|id| id != NO_TAG_ID)
            .map(|id| (self.project_names.name_for(&id), id))
            .collect();
        projects.sort();
        projects.dedup();
        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::InMemoryCostFetcher;
    use crate::types::{
        CostGroup, CostRecordPeriod, DEFAULT_TAG_NAME, TAX_RECORD_TYPE, UNDEFINED_NAME, dimension,
    };
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn boundaries() -> PeriodBoundaries {
        PeriodBoundaries::from_date(date(2022, 11, 15))
    }

    fn manager(fetcher: InMemoryCostFetcher) -> ReportManager<InMemoryCostFetcher> {
        let accounts: DisplayNameMapping = [("000000000001", "production")].into_iter().collect();
        let projects: DisplayNameMapping = [("abc", "Project ABC")].into_iter().collect();
        ReportManager::new(
            CostManager::new(fetcher, DEFAULT_TAG_NAME),
            boundaries(),
            accounts,
            projects,
        )
    }

    fn project_days() -> Vec<CostRecordPeriod> {
        (1..=13)
            .map(|d| {
                CostRecordPeriod::daily(
                    date(2022, 11, d),
                    vec![
                        CostGroup::new(["ProjectId$abc"], 1.0),
                        CostGroup::new(["ProjectId$"], 3.0),
                        CostGroup::new(["ProjectId$zzz"], 0.5),
                    ],
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_daily_chart_series_uses_account_names() {
        let fetcher = InMemoryCostFetcher::new().with_response(
            &[dimension::LINKED_ACCOUNT],
            vec![
                CostRecordPeriod::daily(date(2022, 10, 1), vec![CostGroup::new(["000000000001"], 6.0)]),
                CostRecordPeriod::daily(date(2022, 11, 1), vec![CostGroup::new(["000000000001"], 2.0)]),
                CostRecordPeriod::daily(date(2022, 11, 2), vec![CostGroup::new(["000000000001"], 2.0)]),
            ],
        );
        let series = manager(fetcher).generate_daily_chart_series().await.unwrap();

        assert_eq!(series.latest, date(2022, 11, 2));
        assert_eq!(series.accounts[0].name, "production");
        assert_eq!(series.current_total(), 4.0);
        assert_eq!(series.previous_total(), 6.0);
    }

    #[tokio::test]
    async fn test_accounts_report_sorted_and_named() {
        let fetcher = InMemoryCostFetcher::new().with_response(
            &[dimension::LINKED_ACCOUNT],
            vec![CostRecordPeriod::daily(
                date(2022, 11, 1),
                vec![
                    CostGroup::new(["000000000001"], 1.0),
                    CostGroup::new(["000000000002"], 5.0),
                ],
            )],
        );
        let report = manager(fetcher).generate_accounts_report().await.unwrap();

        assert_eq!(report[0].id, "000000000002");
        assert_eq!(report[0].name, UNDEFINED_NAME);
        assert_eq!(report[1].name, "production");
        assert_eq!(report[1].date, date(2022, 11, 1));
    }

    #[tokio::test]
    async fn test_project_report_strips_prefix() {
        let fetcher = InMemoryCostFetcher::new().with_response(&[DEFAULT_TAG_NAME], project_days());
        let report = manager(fetcher).generate_project_report().await.unwrap();

        let ids: Vec<_> = report.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![NO_TAG_ID, "abc", "zzz"]);
        assert_eq!(report[1].name, "Project ABC");
        assert_eq!(report[1].current_cost, 13.0);
    }

    #[tokio::test]
    async fn test_itemized_report_excludes_tax_and_sorts() {
        let fetcher = InMemoryCostFetcher::new().with_response(
            &[DEFAULT_TAG_NAME, dimension::SERVICE],
            vec![CostRecordPeriod::daily(
                date(2022, 11, 1),
                vec![
                    CostGroup::new(["ProjectId$abc", "Amazon S3"], 1.0),
                    CostGroup::new(["ProjectId$abc", TAX_RECORD_TYPE], 0.1),
                    CostGroup::new(["ProjectId$abc", "AWS Lambda"], 2.0),
                    CostGroup::new(["ProjectId$big", "Amazon RDS"], 9.0),
                ],
            )],
        );
        let report = manager(fetcher)
            .generate_project_itemized_report(false)
            .await
            .unwrap();

        assert_eq!(report[0].id, "big");
        let abc = &report[1];
        assert_eq!(abc.total_cost, 3.0);
        assert_eq!(abc.services[0].name, "AWS Lambda");
        assert!(abc.services.iter().all(|s| s.name != TAX_RECORD_TYPE));
    }

    #[tokio::test]
    async fn test_itemized_report_expands_catch_all() {
        let fetcher = InMemoryCostFetcher::new()
            .with_response(
                &[DEFAULT_TAG_NAME, dimension::SERVICE],
                vec![CostRecordPeriod::daily(
                    date(2022, 11, 1),
                    vec![CostGroup::new(["ProjectId$abc", CATCH_ALL_SERVICE], 5.0)],
                )],
            )
            .with_response(
                &[dimension::SERVICE, dimension::USAGE_TYPE],
                vec![CostRecordPeriod::daily(
                    date(2022, 11, 1),
                    vec![
                        CostGroup::new([CATCH_ALL_SERVICE, "USW2-NatGateway-Hours"], 3.0),
                        CostGroup::new([CATCH_ALL_SERVICE, "USW2-EBS:VolumeUsage"], 2.0),
                    ],
                )],
            );
        let report = manager(fetcher)
            .generate_project_itemized_report(true)
            .await
            .unwrap();

        let names: Vec<_> = report[0].services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "EC2 - NAT Gateway Hours (USW2-NatGateway-Hours)",
                "EC2 - Other (USW2-EBS:VolumeUsage)"
            ]
        );
        assert_eq!(report[0].total_cost, 5.0);
    }

    #[tokio::test]
    async fn test_tax_uses_current_month() {
        let fetcher = InMemoryCostFetcher::new().with_response(
            &[dimension::RECORD_TYPE],
            vec![
                CostRecordPeriod::daily(date(2022, 10, 31), vec![CostGroup::new(["Tax"], 7.0)]),
                CostRecordPeriod::daily(date(2022, 11, 2), vec![CostGroup::new(["Tax"], 1.25)]),
            ],
        );
        assert_eq!(manager(fetcher).get_period_total_tax().await.unwrap(), 1.25);
    }

    #[tokio::test]
    async fn test_list_projects_sorted_by_name() {
        let fetcher = InMemoryCostFetcher::new().with_response(&[DEFAULT_TAG_NAME], project_days());
        let projects = manager(fetcher).list_projects().await.unwrap();
        assert_eq!(
            projects,
            vec![
                ("Project ABC".to_string(), "abc".to_string()),
                (UNDEFINED_NAME.to_string(), "zzz".to_string()),
            ]
        );
    }
}
