//! Itemized per-entity service breakdown
//!
//! Itemized reports cover the current month to date as a single total, so
//! costs are summed flat over all periods per `(entity, service)` pair. Tax is
//! never itemized. The catch-all `EC2 - Other` bucket can be replaced by a
//! finer breakdown obtained by re-querying with the usage type dimension.

use crate::cumulative::sorted_periods;
use crate::error::{PacioliError, Result};
use crate::types::{CostRecordPeriod, EntityId, ServiceCost, TAX_RECORD_TYPE};
use std::collections::BTreeMap;
use tracing::info;

/// Service name of the catch-all bucket that can be broken down further
pub const CATCH_ALL_SERVICE: &str = "EC2 - Other";

/// Services never shown in itemized output
pub const DEFAULT_EXCLUDED_SERVICES: &[&str] = &[TAX_RECORD_TYPE];

/// Summed cost per service (or sub-category) name
pub type ServiceTotals = BTreeMap<String, f64>;

/// Usage type patterns for the catch-all bucket, matched in order
const USAGE_TYPE_PATTERNS: &[(&str, &str)] = &[
    ("DataTransfer-In-Bytes", "EC2 - Data Transfer In"),
    ("DataTransfer-Out-Bytes", "EC2 - Data Transfer Out"),
    ("DataTransfer", "EC2 - Data Transfer"),
    ("DataTransfer-Regional-Bytes", "EC2 - Regional Data Transfer"),
    ("DataTransfer-InterZone-In", "EC2 - Inter-AZ Data Transfer In"),
    ("DataTransfer-InterZone-Out", "EC2 - Inter-AZ Data Transfer Out"),
    ("ElasticIP:IdleAddress", "EC2 - Elastic IP (Idle)"),
    ("ElasticIP:AdditionalAddress", "EC2 - Elastic IP (Additional)"),
    ("NatGateway-Hours", "EC2 - NAT Gateway Hours"),
    ("NatGateway-Bytes", "EC2 - NAT Gateway Data Processing"),
    ("VpcEndpoint-Hours", "EC2 - VPC Endpoint Hours"),
    ("VpcEndpoint-Bytes", "EC2 - VPC Endpoint Data Processing"),
    ("LoadBalancerUsage", "EC2 - Load Balancer Usage"),
    ("EBSOptimized", "EC2 - EBS Optimized"),
    ("DedicatedUsage", "EC2 - Dedicated Host"),
    ("SpotUsage", "EC2 - Spot Instance Usage"),
    ("InstanceStore", "EC2 - Instance Store"),
    ("Unknown", "EC2 - Other (Unknown)"),
];

/// Label a catch-all usage type with a readable sub-category
///
/// Matching is a case-insensitive substring test and the first pattern wins.
/// The raw usage type is kept in the label.
///
/// # Examples
/// ```
/// use pacioli_core::itemized::categorize_usage_type;
///
/// assert_eq!(
///     categorize_usage_type("APN1-NatGateway-Hours"),
///     "EC2 - NAT Gateway Hours (APN1-NatGateway-Hours)"
/// );
/// assert_eq!(categorize_usage_type("APN1-Foo"), "EC2 - Other (APN1-Foo)");
/// ```
pub fn categorize_usage_type(usage_type: &str) -> String {
    let lowered = usage_type.to_lowercase();
    USAGE_TYPE_PATTERNS
        .iter()
        .find(|(pattern, _)| lowered.contains(&pattern.to_lowercase()))
        .map(|(_, description)| format!("{description} ({usage_type})"))
        .unwrap_or_else(|| format!("{CATCH_ALL_SERVICE} ({usage_type})"))
}

fn key_pair<'a>(period: &CostRecordPeriod, keys: &'a [String]) -> Result<(&'a str, &'a str)> {
    match keys {
        [first, second] => Ok((first.as_str(), second.as_str())),
        _ => Err(PacioliError::GroupArity {
            expected: 2,
            found: keys.len(),
            date: period.start,
        }),
    }
}

/// Sum costs per entity and service over all periods
///
/// Every group must carry exactly `(entity, service)` keys.
pub fn aggregate_itemized(
    periods: &[CostRecordPeriod],
) -> Result<BTreeMap<EntityId, ServiceTotals>> {
    let mut totals: BTreeMap<EntityId, ServiceTotals> = BTreeMap::new();
    for period in sorted_periods(periods) {
        for group in &period.groups {
            let (entity, service) = key_pair(period, &group.keys)?;
            *totals
                .entry(EntityId::new(entity))
                .or_default()
                .entry(service.to_string())
                .or_insert(0.0) += group.amount;
        }
    }
    Ok(totals)
}

/// Sum catch-all costs per labelled usage type
///
/// Groups must carry `(service, usage type)` keys; groups for any service
/// other than `service` are ignored.
pub fn aggregate_usage_type_breakdown(
    periods: &[CostRecordPeriod],
    service: &str,
) -> Result<ServiceTotals> {
    let mut totals = ServiceTotals::new();
    for period in sorted_periods(periods) {
        for group in &period.groups {
            let (group_service, usage_type) = key_pair(period, &group.keys)?;
            if group_service != service {
                continue;
            }
            *totals.entry(categorize_usage_type(usage_type)).or_insert(0.0) += group.amount;
        }
    }
    Ok(totals)
}

/// Turn one entity's service totals into report lines
///
/// Services listed in `excluded` are dropped. When a non-empty `breakdown` is
/// given, the catch-all service is replaced by its sub-categories.
pub fn itemize_services(
    services: &ServiceTotals,
    excluded: &[&str],
    breakdown: Option<&ServiceTotals>,
) -> Vec<ServiceCost> {
    let breakdown = breakdown.filter(|b| !b.is_empty());
    let mut lines = ServiceTotals::new();

    for (name, cost) in services {
        if excluded.contains(&name.as_str()) {
            info!("excluding service '{}' {}", name, cost);
            continue;
        }
        match breakdown {
            Some(breakdown) if name == CATCH_ALL_SERVICE => {
                for (sub_category, sub_cost) in breakdown {
                    *lines.entry(sub_category.clone()).or_insert(0.0) += sub_cost;
                }
            }
            _ => *lines.entry(name.clone()).or_insert(0.0) += cost,
        }
    }

    lines
        .into_iter()
        .map(|(name, cost)| ServiceCost { name, cost })
        .collect()
}
