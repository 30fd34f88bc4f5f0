#![deny(warnings)]

//! Funnel metrics for the prospecting plan.
//!
//! A small pure pipeline from three raw inputs to five derived outputs:
//! - sales per month from the sales goal and average ticket
//! - sales per week and per business day from the monthly figure
//! - required leads from the monthly sales and the conversion rate
//! - daily outreach contacts from the required leads
//!
//! Every stage rounds up, since the outputs are minimums. A zero or negative
//! denominator yields zero for that stage instead of an error.

use plan_core::{FunnelConstants, WorksheetState};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

/// Raw numeric inputs of the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FunnelInputs {
    /// Monthly sales goal, canonical amount.
    pub sales_goal: Decimal,
    /// Average ticket, canonical amount.
    pub average_ticket: Decimal,
    /// Conversion rate in percent.
    pub conversion_rate: Decimal,
}

impl FunnelInputs {
    pub fn from_state(state: &WorksheetState) -> Self {
        Self {
            sales_goal: state.sales_goal,
            average_ticket: state.average_ticket,
            conversion_rate: state.conversion_rate,
        }
    }
}

/// Derived funnel numbers. All values are integral.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FunnelMetrics {
    #[serde(with = "rust_decimal::serde::float")]
    pub sales_per_month: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sales_per_week: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub sales_per_day: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub required_leads: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_outreach: Decimal,
}

/// `ceil(numerator / denominator)`, or zero when the denominator is not positive.
///
/// An overflowing division also yields zero and is logged.
///
/// Example:
/// assert_eq!(ceil_div(Decimal::new(21, 0), Decimal::new(4, 0)), Decimal::new(6, 0));
/// assert_eq!(ceil_div(Decimal::ONE, Decimal::ZERO), Decimal::ZERO);
pub fn ceil_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match numerator.checked_div(denominator) {
        Some(q) => q.ceil(),
        None => {
            warn!(%numerator, %denominator, "funnel division overflowed; using 0");
            Decimal::ZERO
        }
    }
}

/// Sales needed per month to reach the goal.
pub fn sales_per_month(sales_goal: Decimal, average_ticket: Decimal) -> Decimal {
    ceil_div(sales_goal, average_ticket)
}

pub fn sales_per_week(sales_per_month: Decimal, constants: &FunnelConstants) -> Decimal {
    ceil_div(sales_per_month, Decimal::from(constants.weeks_per_month))
}

pub fn sales_per_day(sales_per_week: Decimal, constants: &FunnelConstants) -> Decimal {
    ceil_div(sales_per_week, Decimal::from(constants.business_days_per_week))
}

/// Leads needed per month at the given conversion rate (percent).
pub fn required_leads(sales_per_month: Decimal, conversion_rate: Decimal) -> Decimal {
    if conversion_rate <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    ceil_div(sales_per_month, conversion_rate / Decimal::ONE_HUNDRED)
}

/// New contacts the operation has to start per day.
pub fn daily_outreach(required_leads: Decimal, constants: &FunnelConstants) -> Decimal {
    ceil_div(required_leads, Decimal::from(constants.leads_per_outreach_day))
}

/// Run the whole pipeline. Pure and deterministic.
pub fn compute_metrics(inputs: &FunnelInputs, constants: &FunnelConstants) -> FunnelMetrics {
    let month = sales_per_month(inputs.sales_goal, inputs.average_ticket);
    let week = sales_per_week(month, constants);
    let day = sales_per_day(week, constants);
    let leads = required_leads(month, inputs.conversion_rate);
    let outreach = daily_outreach(leads, constants);
    FunnelMetrics {
        sales_per_month: month,
        sales_per_week: week,
        sales_per_day: day,
        required_leads: leads,
        daily_outreach: outreach,
    }
}

/// Convenience wrapper over [`compute_metrics`] for a worksheet.
pub fn metrics_for(state: &WorksheetState, constants: &FunnelConstants) -> FunnelMetrics {
    compute_metrics(&FunnelInputs::from_state(state), constants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(v: i64) -> Decimal {
        Decimal::new(v, 0)
    }

    fn inputs(goal: i64, ticket: i64, rate: i64) -> FunnelInputs {
        FunnelInputs {
            sales_goal: d(goal),
            average_ticket: d(ticket),
            conversion_rate: d(rate),
        }
    }

    #[test]
    fn reference_scenario() {
        let m = compute_metrics(&inputs(10_000, 500, 10), &FunnelConstants::default());
        assert_eq!(m.sales_per_month, d(20));
        assert_eq!(m.sales_per_week, d(5));
        assert_eq!(m.sales_per_day, d(1));
        assert_eq!(m.required_leads, d(200));
        assert_eq!(m.daily_outreach, d(10));
    }

    #[test]
    fn zero_ticket_short_circuits() {
        let m = compute_metrics(&inputs(10_000, 0, 10), &FunnelConstants::default());
        assert_eq!(m.sales_per_month, Decimal::ZERO);
        assert_eq!(m.sales_per_week, Decimal::ZERO);
        assert_eq!(m.sales_per_day, Decimal::ZERO);
        assert_eq!(m.required_leads, Decimal::ZERO);
        assert_eq!(m.daily_outreach, Decimal::ZERO);
    }

    #[test]
    fn zero_rate_yields_no_leads() {
        let m = compute_metrics(&inputs(10_000, 500, 0), &FunnelConstants::default());
        assert_eq!(m.sales_per_month, d(20));
        assert_eq!(m.required_leads, Decimal::ZERO);
        assert_eq!(m.daily_outreach, Decimal::ZERO);
    }

    #[test]
    fn negative_denominators_yield_zero() {
        let m = compute_metrics(&inputs(10_000, -500, -10), &FunnelConstants::default());
        assert_eq!(m, FunnelMetrics::default());
    }

    #[test]
    fn every_stage_rounds_up() {
        // 10001 / 500 = 20.002 -> 21; 21/4 -> 6; 6/5 -> 2; 21 / 0.03 = 700 -> 35
        let m = compute_metrics(&inputs(10_001, 500, 3), &FunnelConstants::default());
        assert_eq!(m.sales_per_month, d(21));
        assert_eq!(m.sales_per_week, d(6));
        assert_eq!(m.sales_per_day, d(2));
        assert_eq!(m.required_leads, d(700));
        assert_eq!(m.daily_outreach, d(35));
    }

    #[test]
    fn fractional_rate_and_amounts() {
        let i = FunnelInputs {
            sales_goal: Decimal::new(1_000_050, 2), // 10000.50
            average_ticket: Decimal::new(33_333, 2), // 333.33
            conversion_rate: Decimal::new(25, 1),   // 2.5%
        };
        let m = compute_metrics(&i, &FunnelConstants::default());
        assert_eq!(m.sales_per_month, d(31));
        assert_eq!(m.required_leads, d(1240));
        assert_eq!(m.daily_outreach, d(62));
    }

    #[test]
    fn zero_constant_is_guarded() {
        let c = FunnelConstants {
            weeks_per_month: 0,
            business_days_per_week: 5,
            leads_per_outreach_day: 0,
        };
        let m = compute_metrics(&inputs(10_000, 500, 10), &c);
        assert_eq!(m.sales_per_week, Decimal::ZERO);
        assert_eq!(m.sales_per_day, Decimal::ZERO);
        assert_eq!(m.daily_outreach, Decimal::ZERO);
        assert_eq!(m.required_leads, d(200));
    }

    #[test]
    fn overflow_is_zero_not_panic() {
        assert_eq!(ceil_div(Decimal::MAX, Decimal::new(1, 28)), Decimal::ZERO);
    }

    #[test]
    fn metrics_from_state() {
        let state = WorksheetState {
            sales_goal: d(10_000),
            average_ticket: d(500),
            conversion_rate: d(10),
            ..Default::default()
        };
        let m = metrics_for(&state, &FunnelConstants::default());
        assert_eq!(m.required_leads, d(200));
    }

    proptest! {
        #[test]
        fn monthly_sales_is_minimal_cover(goal in 0i64..10_000_000_00, ticket in 1i64..1_000_000_00) {
            let goal = Decimal::new(goal, 2);
            let ticket = Decimal::new(ticket, 2);
            let n = sales_per_month(goal, ticket);
            prop_assert!(n * ticket >= goal);
            prop_assert!(n.is_zero() || (n - Decimal::ONE) * ticket < goal);
        }

        #[test]
        fn leads_cover_monthly_sales(month in 0i64..100_000, rate_tenths in 1i64..1000) {
            let month = Decimal::from(month);
            let rate = Decimal::new(rate_tenths, 1);
            let leads = required_leads(month, rate);
            let converted = leads * rate / Decimal::ONE_HUNDRED;
            prop_assert!(converted >= month);
            prop_assert_eq!(leads, ceil_div(month, rate / Decimal::ONE_HUNDRED));
        }

        #[test]
        fn pipeline_is_idempotent(goal in 0i64..1_000_000, ticket in 0i64..10_000, rate in 0i64..100) {
            let i = inputs(goal, ticket, rate);
            let c = FunnelConstants::default();
            prop_assert_eq!(compute_metrics(&i, &c), compute_metrics(&i, &c));
        }

        #[test]
        fn outputs_non_negative_for_non_negative_inputs(goal in 0i64..1_000_000, ticket in 0i64..10_000, rate in 0i64..100) {
            let m = compute_metrics(&inputs(goal, ticket, rate), &FunnelConstants::default());
            for v in [m.sales_per_month, m.sales_per_week, m.sales_per_day, m.required_leads, m.daily_outreach] {
                prop_assert!(v >= Decimal::ZERO);
                prop_assert_eq!(v, v.trunc());
            }
        }
    }
}
