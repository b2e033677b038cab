//! Record-type totals (tax)

use crate::cumulative::{KeySelector, sorted_periods};
use crate::error::Result;
use crate::types::{CostRecordPeriod, TAX_RECORD_TYPE};

/// Sum the cost of every group whose key equals `record_type`
///
/// Periods are expected to be grouped by the `RECORD_TYPE` dimension.
/// Returns 0.0 when no matching group exists.
///
/// # Examples
/// ```
/// use pacioli_core::tax::sum_record_type;
/// use pacioli_core::types::{CostGroup, CostRecordPeriod};
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2022, 11, 1).unwrap();
/// let periods = vec![CostRecordPeriod::daily(day, vec![
///     CostGroup::new(["Usage"], 100.0),
///     CostGroup::new(["Tax"], 10.0),
/// ])];
/// assert_eq!(sum_record_type(&periods, "Tax").unwrap(), 10.0);
/// ```
pub fn sum_record_type(periods: &[CostRecordPeriod], record_type: &str) -> Result<f64> {
    let mut total = 0.0;
    for period in sorted_periods(periods) {
        for group in &period.groups {
            let key = KeySelector::Joined.select(group, period.start)?;
            if key.as_str() == record_type {
                total += group.amount;
            }
        }
    }
    Ok(total)
}

/// Sum the tax record type
pub fn sum_tax(periods: &[CostRecordPeriod]) -> Result<f64> {
    sum_record_type(periods, TAX_RECORD_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CostGroup;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 10, d).unwrap()
    }

    #[test]
    fn test_tax_summed_over_days() {
        let periods = vec![
            CostRecordPeriod::daily(
                date(1),
                vec![CostGroup::new(["Usage"], 3.0), CostGroup::new(["Tax"], 0.25)],
            ),
            CostRecordPeriod::daily(date(31), vec![CostGroup::new(["Tax"], 0.5)]),
        ];
        assert_eq!(sum_tax(&periods).unwrap(), 0.75);
    }

    #[test]
    fn test_no_tax_is_zero() {
        let periods = vec![CostRecordPeriod::daily(
            date(1),
            vec![CostGroup::new(["Usage"], 3.0), CostGroup::new(["Credit"], -1.0)],
        )];
        assert_eq!(sum_tax(&periods).unwrap(), 0.0);
        assert_eq!(sum_tax(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_match_is_exact() {
        let periods = vec![CostRecordPeriod::daily(
            date(1),
            vec![CostGroup::new(["tax"], 1.0), CostGroup::new(["Taxes"], 1.0)],
        )];
        assert_eq!(sum_tax(&periods).unwrap(), 0.0);
    }
}
