//! Property-based tests for the cumulative and change calculations

mod common;

use chrono::{Datelike, Days, NaiveDate};
use common::{date, project_key};
use pacioli_core::change::{MIN_PERCENTAGE_CHANGE, compute_change, percentage_change};
use pacioli_core::cumulative::{DailyCumulativeTable, KeySelector};
use pacioli_core::types::{CostGroup, CostRecordPeriod, EntityId, NO_TAG_ID, YearMonth};
use proptest::prelude::*;

const ENTITIES: &[&str] = &["000000000001", "000000000002", "000000000003"];

prop_compose! {
    /// Daily costs for up to three entities over consecutive days from October 1st
    fn arb_periods()(
        days in prop::collection::vec(
            prop::collection::vec(prop::option::of(0.0f64..500.0), ENTITIES.len()),
            1..62,
        )
    ) -> Vec<CostRecordPeriod> {
        let first = date(2022, 10, 1);
        days.into_iter()
            .enumerate()
            .map(|(offset, amounts)| {
                let groups = ENTITIES
                    .iter()
                    .zip(amounts)
                    .filter_map(|(entity, amount)| amount.map(|a| CostGroup::new([*entity], a)))
                    .collect();
                CostRecordPeriod::daily(first + Days::new(offset as u64), groups)
            })
            .collect()
    }
}

fn amount_on(periods: &[CostRecordPeriod], entity: &str, day: NaiveDate) -> Option<f64> {
    periods
        .iter()
        .find(|p| p.start == day)?
        .groups
        .iter()
        .find(|g| g.keys[0] == entity)
        .map(|g| g.amount)
}

proptest! {
    #[test]
    fn cumulative_costs_never_decrease(periods in arb_periods()) {
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();

        for entity in table.entities() {
            for month in [YearMonth::of(date(2022, 10, 1)), YearMonth::of(date(2022, 11, 1))] {
                let Some(days) = table.month(entity, month) else { continue };
                for (day, value) in days {
                    if let Some(previous) = days.get(&(day - 1)) {
                        prop_assert!(value >= previous, "{entity} day {day}: {value} < {previous}");
                    }
                }
            }
        }
    }

    #[test]
    fn first_of_month_has_no_carry_in(periods in arb_periods()) {
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();

        for first in [date(2022, 10, 1), date(2022, 11, 1)] {
            for entity in ENTITIES {
                let cumulative = table.get(&EntityId::new(*entity), YearMonth::of(first), 1);
                prop_assert_eq!(cumulative, amount_on(&periods, entity, first));
            }
        }
    }

    #[test]
    fn aggregation_is_idempotent(mut periods in arb_periods()) {
        let first = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        periods.reverse();
        let second = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        prop_assert_eq!(&first, &second);

        if let (Some(earliest), Some(latest)) = (first.earliest(), first.latest()) {
            prop_assert_eq!(
                compute_change(&first, earliest, latest),
                compute_change(&second, earliest, latest)
            );
        }
    }

    #[test]
    fn change_within_a_month_is_cumulative_at_latest_day(periods in arb_periods()) {
        let table = DailyCumulativeTable::build(&periods, KeySelector::Single).unwrap();
        let (Some(earliest), Some(latest)) = (table.earliest(), table.latest()) else {
            return Ok(());
        };

        for (entity, change) in compute_change(&table, earliest, latest) {
            let month = YearMonth::of(latest);
            let expected = (1..=latest.day())
                .rev()
                .find_map(|day| table.get(&entity, month, day))
                .unwrap_or(0.0);
            prop_assert_eq!(change.current, expected);
        }
    }

    #[test]
    fn near_zero_costs_never_report_change(current in 0.0f64..1000.0, previous in 0.0f64..1000.0) {
        let pct = percentage_change(current, previous);
        if current < MIN_PERCENTAGE_CHANGE || previous < MIN_PERCENTAGE_CHANGE {
            prop_assert_eq!(pct, 0.0);
        } else {
            prop_assert!(pct.is_finite());
            prop_assert_eq!(pct > 0.0, current > previous && pct != 0.0);
        }
    }

    #[test]
    fn project_prefix_is_stripped(value in "[a-z0-9-]{1,36}") {
        let raw = EntityId::new(project_key(&value));
        prop_assert_eq!(raw.display_id("ProjectId"), value);
    }
}

#[test]
fn test_untagged_project_maps_to_sentinel() {
    assert_eq!(EntityId::new(project_key("")).display_id("ProjectId"), NO_TAG_ID);
    assert_eq!(
        EntityId::new("ProjectId$2895b79a-c8ff-428c-b45a-e581dad87b84").display_id("ProjectId"),
        "2895b79a-c8ff-428c-b45a-e581dad87b84"
    );
}

#[test]
fn test_threshold_suppresses_change() {
    assert_eq!(percentage_change(0.005, 10.0), 0.0);
}
