//! Core domain types for pacioli
//!
//! This module contains the fundamental types used throughout the pacioli crates.
//! Billing records arrive from the cost API as periods (one per day for daily
//! granularity), each holding cost groups keyed by one or two grouping values.

use crate::error::{PacioliError, Result};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Id used for resources that carry no project tag value
pub const NO_TAG_ID: &str = "nothing_project_tag";

/// Name used when an entity has no entry in the display mapping
pub const UNDEFINED_NAME: &str = "UNDEFINED";

/// Record type / service name under which the billing API reports tax
pub const TAX_RECORD_TYPE: &str = "Tax";

/// Default cost-allocation tag used to group project costs
pub const DEFAULT_TAG_NAME: &str = "ProjectId";

/// Grouping dimension keys understood by the billing API
pub mod dimension {
    pub const LINKED_ACCOUNT: &str = "LINKED_ACCOUNT";
    pub const SERVICE: &str = "SERVICE";
    pub const RECORD_TYPE: &str = "RECORD_TYPE";
    pub const USAGE_TYPE: &str = "USAGE_TYPE";
}

/// Raw entity id as returned by the billing API
///
/// Account ids are used verbatim. Project tag values come back prefixed with
/// the tag name and a `$` separator (`ProjectId$<value>`); use
/// [`EntityId::display_id`] to obtain the id shown to people.
///
/// # Examples
/// ```
/// use pacioli_core::types::{EntityId, NO_TAG_ID};
///
/// let project = EntityId::new("ProjectId$2895b79a-c8ff-428c-b45a-e581dad87b84");
/// assert_eq!(project.display_id("ProjectId"), "2895b79a-c8ff-428c-b45a-e581dad87b84");
///
/// let untagged = EntityId::new("ProjectId$");
/// assert_eq!(untagged.display_id("ProjectId"), NO_TAG_ID);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new EntityId from any string-like type
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip the `<tag_name>$` prefix, mapping an empty tag value to [`NO_TAG_ID`]
    pub fn display_id(&self, tag_name: &str) -> String {
        let prefix = format!("{tag_name}$");
        let stripped = self.0.strip_prefix(&prefix).unwrap_or(&self.0).trim();
        if stripped.is_empty() {
            NO_TAG_ID.to_string()
        } else {
            stripped.to_string()
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Grouping key values of a cost group (at most two per query)
pub type GroupKeys = SmallVec<[String; 2]>;

/// One grouping-key tuple and its cost for a single period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostGroup {
    /// Grouping values, in the order of the query's group-by definitions
    pub keys: GroupKeys,
    /// Cost amount for the selected metric
    pub amount: f64,
}

impl CostGroup {
    /// Create a cost group from its key values and amount
    pub fn new<I, S>(keys: I, amount: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            amount,
        }
    }

    /// All key values concatenated, the way the API's single-dimension keys are read
    pub fn joined_key(&self) -> String {
        self.keys.concat()
    }
}

/// One reporting period (typically one day) of grouped costs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecordPeriod {
    /// Inclusive period start
    pub start: NaiveDate,
    /// Exclusive period end
    pub end: NaiveDate,
    /// Cost groups reported for the period
    pub groups: Vec<CostGroup>,
}

impl CostRecordPeriod {
    /// Create a one-day period starting at `start`
    pub fn daily(start: NaiveDate, groups: Vec<CostGroup>) -> Self {
        Self {
            start,
            end: start + Days::new(1),
            groups,
        }
    }
}

/// Calendar month used to key cumulative tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Month containing `date`
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Number of days in the month
    pub fn days(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|next| next.pred_opt())
            .map_or(31, |last| last.day())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Kind of grouping dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupKind {
    Dimension,
    Tag,
}

/// A single group-by definition of a cost query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDefinition {
    pub kind: GroupKind,
    pub key: String,
}

impl GroupDefinition {
    /// Group by an API dimension such as `LINKED_ACCOUNT`
    pub fn dimension(key: impl Into<String>) -> Self {
        Self {
            kind: GroupKind::Dimension,
            key: key.into(),
        }
    }

    /// Group by a cost-allocation tag
    pub fn tag(key: impl Into<String>) -> Self {
        Self {
            kind: GroupKind::Tag,
            key: key.into(),
        }
    }
}

/// Time granularity of returned periods
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
}

/// Optional constraints narrowing a cost query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostFilter {
    /// `(tag name, tag value)` the costs must carry
    pub tag: Option<(String, String)>,
    /// Service name the costs must belong to
    pub service: Option<String>,
    /// Linked account the costs must belong to
    pub linked_account: Option<String>,
}

impl CostFilter {
    /// Whether no constraint is set
    pub fn is_empty(&self) -> bool {
        self.tag.is_none() && self.service.is_none() && self.linked_account.is_none()
    }
}

/// A validated request for grouped cost records
///
/// The billing API treats `end` as exclusive and rejects ranges where it does
/// not come after `start`, so an empty range is widened to a single day.
///
/// # Examples
/// ```
/// use pacioli_core::types::{CostQuery, GroupDefinition};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap();
/// let query = CostQuery::new(day, day, vec![GroupDefinition::dimension("SERVICE")]).unwrap();
/// assert_eq!(query.end(), NaiveDate::from_ymd_opt(2022, 11, 2).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostQuery {
    start: NaiveDate,
    end: NaiveDate,
    group_by: Vec<GroupDefinition>,
    granularity: Granularity,
    filter: CostFilter,
}

impl CostQuery {
    /// Maximum number of group-by definitions the API accepts
    pub const MAX_GROUP_BY: usize = 2;

    /// Build a daily query over `[start, end)`
    pub fn new(start: NaiveDate, end: NaiveDate, group_by: Vec<GroupDefinition>) -> Result<Self> {
        if group_by.is_empty() || group_by.len() > Self::MAX_GROUP_BY {
            return Err(PacioliError::InvalidQuery(format!(
                "expected 1 to {} group-by definitions, got {}",
                Self::MAX_GROUP_BY,
                group_by.len()
            )));
        }
        if end < start {
            return Err(PacioliError::InvalidQuery(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let end = if end == start {
            start + Days::new(1)
        } else {
            end
        };

        Ok(Self {
            start,
            end,
            group_by,
            granularity: Granularity::Daily,
            filter: CostFilter::default(),
        })
    }

    /// Set the period granularity
    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Restrict the query with a filter
    pub fn with_filter(mut self, filter: CostFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn group_by(&self) -> &[GroupDefinition] {
        &self.group_by
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn filter(&self) -> &CostFilter {
        &self.filter
    }
}

/// Cost of one service line within an itemized report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub name: String,
    pub cost: f64,
}

/// Period-over-period change for one account or project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostChangeResult {
    /// Display-safe id (account id, or project tag value with prefix removed)
    pub id: String,
    /// Human readable name from the display mapping
    pub name: String,
    /// Reference date the costs were taken at
    pub date: NaiveDate,
    /// Month-to-date cost at the reference date
    pub current_cost: f64,
    /// Previous month's cost at the equivalent day
    pub previous_cost: f64,
    /// `round((current / previous - 1) * 100, 1)`, or 0.0 when suppressed
    pub percentage_change: f64,
}

/// Per-entity breakdown of current-period cost by service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemizedEntityCost {
    /// Display-safe id
    pub id: String,
    /// Raw id as returned by the billing API
    pub raw_id: EntityId,
    /// Human readable name from the display mapping
    pub name: String,
    /// Reference date
    pub date: NaiveDate,
    /// Services sorted by cost, most expensive first
    pub services: Vec<ServiceCost>,
    /// Sum of the listed service costs
    pub total_cost: f64,
}

impl ItemizedEntityCost {
    /// Build from an unsorted service list; sorts services and derives the total
    pub fn new(
        raw_id: EntityId,
        id: String,
        name: String,
        date: NaiveDate,
        mut services: Vec<ServiceCost>,
    ) -> Self {
        services.sort_by(|a, b| b.cost.total_cmp(&a.cost).then_with(|| a.name.cmp(&b.name)));
        let total_cost = services.iter().map(|s| s.cost).sum();
        Self {
            id,
            raw_id,
            name,
            date,
            services,
            total_cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_display_id_strips_tag_prefix() {
        let id = EntityId::new("ProjectId$2895b79a-c8ff-428c-b45a-e581dad87b84");
        assert_eq!(id.display_id("ProjectId"), "2895b79a-c8ff-428c-b45a-e581dad87b84");
    }

    #[test]
    fn test_display_id_empty_tag_is_sentinel() {
        assert_eq!(EntityId::new("ProjectId$").display_id("ProjectId"), NO_TAG_ID);
        assert_eq!(EntityId::new("ProjectId$  ").display_id("ProjectId"), NO_TAG_ID);
    }

    #[test]
    fn test_display_id_passthrough_for_accounts() {
        let id = EntityId::new("000000000001");
        assert_eq!(id.display_id("ProjectId"), "000000000001");
    }

    #[test]
    fn test_display_id_custom_tag_name() {
        let id = EntityId::new("Team$payments");
        assert_eq!(id.display_id("Team"), "payments");
    }

    #[test]
    fn test_cost_group_joined_key() {
        let group = CostGroup::new(["ProjectId$abc", "Amazon S3"], 1.0);
        assert_eq!(group.joined_key(), "ProjectId$abcAmazon S3");
        assert_eq!(CostGroup::new(["Tax"], 1.0).joined_key(), "Tax");
    }

    #[test]
    fn test_query_rejects_too_many_dimensions() {
        let result = CostQuery::new(
            date(2022, 11, 1),
            date(2022, 11, 15),
            vec![
                GroupDefinition::dimension(dimension::LINKED_ACCOUNT),
                GroupDefinition::dimension(dimension::SERVICE),
                GroupDefinition::tag(DEFAULT_TAG_NAME),
            ],
        );
        assert!(matches!(result, Err(PacioliError::InvalidQuery(_))));
    }

    #[test]
    fn test_query_rejects_no_dimensions() {
        let result = CostQuery::new(date(2022, 11, 1), date(2022, 11, 15), vec![]);
        assert!(matches!(result, Err(PacioliError::InvalidQuery(_))));
    }

    #[test]
    fn test_query_rejects_reversed_range() {
        let result = CostQuery::new(
            date(2022, 11, 15),
            date(2022, 11, 1),
            vec![GroupDefinition::dimension(dimension::SERVICE)],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_query_widens_empty_range() {
        let query = CostQuery::new(
            date(2022, 12, 31),
            date(2022, 12, 31),
            vec![GroupDefinition::dimension(dimension::RECORD_TYPE)],
        )
        .unwrap();
        assert_eq!(query.start(), date(2022, 12, 31));
        assert_eq!(query.end(), date(2023, 1, 1));
        assert_eq!(query.granularity(), Granularity::Daily);
        assert!(query.filter().is_empty());
    }

    #[test]
    fn test_itemized_entity_sorts_and_totals() {
        let item = ItemizedEntityCost::new(
            EntityId::new("ProjectId$abc"),
            "abc".to_string(),
            UNDEFINED_NAME.to_string(),
            date(2022, 11, 14),
            vec![
                ServiceCost { name: "Amazon S3".into(), cost: 1.5 },
                ServiceCost { name: "AWS Lambda".into(), cost: 4.0 },
                ServiceCost { name: "Amazon SNS".into(), cost: 0.5 },
            ],
        );
        let names: Vec<_> = item.services.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["AWS Lambda", "Amazon S3", "Amazon SNS"]);
        assert_eq!(item.total_cost, 6.0);
    }

    #[test]
    fn test_year_month_display() {
        assert_eq!(YearMonth::of(date(2022, 3, 9)).to_string(), "2022-03");
    }

    #[test]
    fn test_year_month_days() {
        assert_eq!(YearMonth::of(date(2022, 2, 9)).days(), 28);
        assert_eq!(YearMonth::of(date(2024, 2, 9)).days(), 29);
        assert_eq!(YearMonth::of(date(2022, 11, 1)).days(), 30);
        assert_eq!(YearMonth::of(date(2022, 12, 31)).days(), 31);
    }
}
