//! AWS Cost Explorer cost source
//!
//! Maps [`CostQuery`] onto `GetCostAndUsage` and the response's
//! `ResultsByTime` back onto [`CostRecordPeriod`]. Only the `UnblendedCost`
//! metric is requested and read.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_costexplorer::Client;
use aws_sdk_costexplorer::error::DisplayErrorContext;
use aws_sdk_costexplorer::types::{
    DateInterval, Dimension, DimensionValues, Expression, Granularity as CeGranularity,
    GroupDefinition as CeGroupDefinition, GroupDefinitionType, MatchOption, ResultByTime,
    TagValues,
};
use chrono::NaiveDate;
use pacioli_core::error::{PacioliError, Result};
use pacioli_core::fetcher::{CostPage, PagedCostSource, Paginated};
use pacioli_core::types::{
    CostFilter, CostGroup, CostQuery, CostRecordPeriod, GroupDefinition, GroupKind, Granularity,
};
use tracing::debug;

/// Cost metric read from every group
pub const COST_METRIC: &str = "UnblendedCost";

/// Cost Explorer backed [`PagedCostSource`]
#[derive(Debug, Clone)]
pub struct CostExplorerSource {
    client: Client,
}

impl CostExplorerSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self::new(Client::new(config))
    }

    /// Wrap into a fetcher that follows continuation tokens
    pub fn into_fetcher(self) -> Paginated<Self> {
        Paginated::new(self)
    }
}

#[async_trait]
impl PagedCostSource for CostExplorerSource {
    async fn fetch_page(&self, query: &CostQuery, token: Option<&str>) -> Result<CostPage> {
        let interval = DateInterval::builder()
            .start(query.start().to_string())
            .end(query.end().to_string())
            .build()
            .map_err(|e| PacioliError::InvalidQuery(e.to_string()))?;

        let mut request = self
            .client
            .get_cost_and_usage()
            .time_period(interval)
            .granularity(to_granularity(query.granularity()))
            .metrics(COST_METRIC)
            .set_next_page_token(token.map(String::from));
        for definition in query.group_by() {
            request = request.group_by(to_group_definition(definition));
        }
        if let Some(expression) = to_expression(query.filter()) {
            request = request.filter(expression);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PacioliError::Fetch(DisplayErrorContext(&e).to_string()))?;

        let periods = response
            .results_by_time()
            .iter()
            .map(to_period)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Cost Explorer returned {} periods for {}..{}",
            periods.len(),
            query.start(),
            query.end()
        );

        Ok(CostPage {
            periods,
            next_token: response.next_page_token().map(String::from),
        })
    }
}

fn to_granularity(granularity: Granularity) -> CeGranularity {
    match granularity {
        Granularity::Daily => CeGranularity::Daily,
        Granularity::Monthly => CeGranularity::Monthly,
    }
}

fn to_group_definition(definition: &GroupDefinition) -> CeGroupDefinition {
    let kind = match definition.kind {
        GroupKind::Dimension => GroupDefinitionType::Dimension,
        GroupKind::Tag => GroupDefinitionType::Tag,
    };
    CeGroupDefinition::builder()
        .r#type(kind)
        .key(&definition.key)
        .build()
}

fn dimension_filter(dimension: Dimension, value: &str) -> Expression {
    Expression::builder()
        .dimensions(
            DimensionValues::builder()
                .key(dimension)
                .values(value)
                .build(),
        )
        .build()
}

/// Build the Cost Explorer filter expression, `None` when unconstrained
///
/// An empty tag value selects resources without the tag.
pub fn to_expression(filter: &CostFilter) -> Option<Expression> {
    let mut parts = Vec::new();

    if let Some((key, value)) = &filter.tag {
        let tag = if value.is_empty() {
            TagValues::builder()
                .key(key)
                .match_options(MatchOption::Absent)
                .build()
        } else {
            TagValues::builder().key(key).values(value).build()
        };
        parts.push(Expression::builder().tags(tag).build());
    }
    if let Some(service) = &filter.service {
        parts.push(dimension_filter(Dimension::Service, service));
    }
    if let Some(account) = &filter.linked_account {
        parts.push(dimension_filter(Dimension::LinkedAccount, account));
    }

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(Expression::builder().set_and(Some(parts)).build()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| PacioliError::InvalidDate(format!("'{value}': {e}")))
}

/// Convert one `ResultsByTime` entry
///
/// Groups without a parseable `UnblendedCost` amount are malformed and
/// rejected rather than counted as zero.
pub fn to_period(result: &ResultByTime) -> Result<CostRecordPeriod> {
    let interval = result
        .time_period()
        .ok_or_else(|| PacioliError::Fetch("result without time period".to_string()))?;
    let start = parse_date(interval.start())?;
    let end = parse_date(interval.end())?;

    let groups = result
        .groups()
        .iter()
        .map(|group| {
            let amount = group
                .metrics()
                .and_then(|metrics| metrics.get(COST_METRIC))
                .and_then(|metric| metric.amount())
                .ok_or_else(|| {
                    PacioliError::Fetch(format!(
                        "group {:?} on {start} has no {COST_METRIC} amount",
                        group.keys()
                    ))
                })?;
            let amount: f64 = amount.parse().map_err(|_| {
                PacioliError::Fetch(format!("invalid {COST_METRIC} amount '{amount}' on {start}"))
            })?;
            Ok(CostGroup::new(group.keys().iter().cloned(), amount))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CostRecordPeriod { start, end, groups })
}
