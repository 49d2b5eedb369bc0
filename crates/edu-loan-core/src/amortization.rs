use chrono::{Local, Months, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::types::{with_metadata, ComputationOutput, Currency, Money, Rate};

/// A balance at or below this is treated as fully repaid and snapped to zero.
/// Changing it shifts schedule lengths by a month for near-payoff inputs.
const PAYOFF_THRESHOLD: Decimal = dec!(0.01);

const MONTHS_PER_YEAR: Decimal = dec!(12);
const PERCENT: Decimal = dec!(100);

/// Grace-period accrual model. Repayment months always compound monthly;
/// the choice only changes how interest builds up before repayment starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestType {
    Compound,
    Simple,
}

/// Loan parameters as collected by the form layer. The engine assumes the
/// caller has run [`crate::validation::validate`]; anything out of range is
/// clamped rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanFormValues {
    pub tuition: Money,
    pub living_expenses: Money,
    /// Annual percentage rate, e.g. 5.5 for 5.5%
    pub interest_rate: Rate,
    pub loan_term_years: Decimal,
    pub grace_period_months: i64,
    /// ISO date (YYYY-MM-DD); empty or unparseable falls back to today
    pub start_date: String,
    pub currency: Currency,
    /// Monthly income applied as an extra principal payment
    pub part_time_income: Money,
    /// Fraction of the base payment added as extra principal, 0 to 0.5
    pub early_repayment_rate: Rate,
    pub interest_type: InterestType,
}

impl Default for LoanFormValues {
    fn default() -> Self {
        LoanFormValues {
            tuition: dec!(15000),
            living_expenses: dec!(8000),
            interest_rate: dec!(5.5),
            loan_term_years: dec!(10),
            grace_period_months: 6,
            start_date: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            currency: Currency::USD,
            part_time_income: dec!(250),
            early_repayment_rate: dec!(0.1),
            interest_type: InterestType::Compound,
        }
    }
}

/// One month of the projection, covering both grace and repayment phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBreakdown {
    /// 0-based, continuous across grace and repayment months
    pub month_index: u32,
    /// Human month/year label, e.g. "Jan 2026"
    pub label: String,
    pub principal_paid: Money,
    pub interest_paid: Money,
    pub remaining_balance: Money,
}

/// Cost of deferring repayment, relative to starting payments immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraceImpact {
    pub interest_accrued_during_grace: Money,
    /// Floored at zero; a grace period never reports a negative added cost
    pub added_interest_from_grace: Money,
    pub total_interest_without_grace: Money,
    pub months_with_grace: u32,
}

/// Full projection output. Totals reflect the grace-adjusted scenario;
/// `alternative_schedule` is the no-grace comparison and stands alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanMetrics {
    /// Base amortized payment, excluding extra prepayments
    pub monthly_payment: Money,
    pub total_repayment: Money,
    pub total_interest: Money,
    pub schedule: Vec<PaymentBreakdown>,
    pub alternative_schedule: Vec<PaymentBreakdown>,
    pub grace_impact: GraceImpact,
}

struct AmortizationResult {
    schedule: Vec<PaymentBreakdown>,
    total_interest: Money,
    total_paid: Money,
}

fn parse_start_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn month_label(base_date: NaiveDate, month_offset: u32) -> String {
    let date = base_date
        .checked_add_months(Months::new(month_offset))
        .unwrap_or(base_date);
    date.format("%b %Y").to_string()
}

/// Fixed payment for a fully amortizing loan; straight-line when the rate is zero.
fn base_monthly_payment(balance: Money, monthly_rate: Rate, months: u32) -> Money {
    if monthly_rate > Decimal::ZERO {
        let factor = (Decimal::ONE + monthly_rate).powd(Decimal::from(months));
        balance * monthly_rate * factor / (factor - Decimal::ONE)
    } else {
        balance / Decimal::from(months)
    }
}

/// Month-by-month repayment loop shared by the primary and no-grace scenarios.
/// `start_offset` continues the month numbering after any grace rows.
fn build_amortization_schedule(
    starting_balance: Money,
    months: u32,
    monthly_rate: Rate,
    base_payment: Money,
    extra_payment: Money,
    base_date: NaiveDate,
    start_offset: u32,
) -> AmortizationResult {
    let mut schedule = Vec::new();
    let mut balance = starting_balance;
    let mut total_interest = Decimal::ZERO;
    let mut total_paid = Decimal::ZERO;

    for i in 0..months {
        if balance <= Decimal::ZERO {
            break;
        }

        let interest_for_month = if monthly_rate > Decimal::ZERO {
            balance * monthly_rate
        } else {
            Decimal::ZERO
        };

        // Base principal component, capped so we never pay down more than owed
        let base_principal = (base_payment - interest_for_month).max(Decimal::ZERO);
        let mut principal_paid = balance.min(base_principal);
        let mut payment_for_month = principal_paid + interest_for_month;

        if extra_payment > Decimal::ZERO && balance - principal_paid > Decimal::ZERO {
            let extra = extra_payment.min(balance - principal_paid);
            principal_paid += extra;
            payment_for_month += extra;
        }

        balance = (balance - principal_paid).max(Decimal::ZERO);
        if balance <= PAYOFF_THRESHOLD {
            // Snap residual dust to an exact zero before reporting the row
            balance = Decimal::ZERO;
        }

        total_interest += interest_for_month;
        total_paid += payment_for_month;

        schedule.push(PaymentBreakdown {
            month_index: start_offset + i,
            label: month_label(base_date, start_offset + i),
            principal_paid,
            interest_paid: interest_for_month,
            remaining_balance: balance,
        });

        if balance == Decimal::ZERO {
            break;
        }
    }

    AmortizationResult {
        schedule,
        total_interest,
        total_paid,
    }
}

/// Project a student loan: grace-period accrual, the grace-adjusted repayment
/// schedule, a no-grace comparison schedule, and summary totals.
///
/// Never fails: out-of-range inputs are clamped and reported as warnings in
/// the output envelope. Two calls with identical input produce identical
/// results (the metadata timing aside).
pub fn calculate_loan_metrics(values: &LoanFormValues) -> ComputationOutput<LoanMetrics> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if values.tuition < Decimal::ZERO {
        warnings.push("Negative tuition clamped to 0".into());
    }
    if values.living_expenses < Decimal::ZERO {
        warnings.push("Negative living expenses clamped to 0".into());
    }
    if values.interest_rate < Decimal::ZERO {
        warnings.push("Negative interest rate clamped to 0".into());
    }
    if values.grace_period_months < 0 {
        warnings.push("Negative grace period clamped to 0 months".into());
    }

    let principal = values.tuition.max(Decimal::ZERO) + values.living_expenses.max(Decimal::ZERO);

    let rounded_months = (values.loan_term_years * MONTHS_PER_YEAR)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    if rounded_months < Decimal::ONE {
        warnings.push("Loan term rounds below one month; using a single month".into());
    }
    let total_months = rounded_months.to_u32().unwrap_or(0).max(1);

    let monthly_rate = values.interest_rate.max(Decimal::ZERO) / PERCENT / MONTHS_PER_YEAR;

    let base_date = match parse_start_date(&values.start_date) {
        Some(date) => date,
        None => {
            warnings.push("Start date missing or unparseable; using today".into());
            Local::now().date_naive()
        }
    };

    // Grace period interest accrual
    let grace_months = values.grace_period_months.max(0) as u32;
    let mut balance = principal;
    let mut total_interest = Decimal::ZERO;
    let mut accrued_simple_interest = Decimal::ZERO;
    let mut schedule: Vec<PaymentBreakdown> = Vec::new();

    for i in 0..grace_months {
        let interest_base = match values.interest_type {
            InterestType::Compound => balance,
            InterestType::Simple => principal,
        };
        let interest_for_month = if monthly_rate > Decimal::ZERO {
            interest_base * monthly_rate
        } else {
            Decimal::ZERO
        };
        total_interest += interest_for_month;

        match values.interest_type {
            InterestType::Compound => balance += interest_for_month,
            InterestType::Simple => accrued_simple_interest += interest_for_month,
        }

        schedule.push(PaymentBreakdown {
            month_index: i,
            label: month_label(base_date, i),
            principal_paid: Decimal::ZERO,
            interest_paid: interest_for_month,
            remaining_balance: match values.interest_type {
                InterestType::Compound => balance,
                InterestType::Simple => principal + accrued_simple_interest,
            },
        });
    }

    // Simple accrual is capitalized in one step when repayment begins
    if values.interest_type == InterestType::Simple {
        balance = principal + accrued_simple_interest;
    }

    let monthly_payment = base_monthly_payment(balance, monthly_rate, total_months);
    let extra_payment = values.part_time_income.max(Decimal::ZERO)
        + values.early_repayment_rate.max(Decimal::ZERO) * monthly_payment;

    let repayment = build_amortization_schedule(
        balance,
        total_months,
        monthly_rate,
        monthly_payment,
        extra_payment,
        base_date,
        schedule.len() as u32,
    );
    total_interest += repayment.total_interest;

    let interest_accrued_during_grace = accrued_simple_interest
        + match values.interest_type {
            InterestType::Compound => balance - (principal + accrued_simple_interest),
            InterestType::Simple => Decimal::ZERO,
        };

    schedule.extend(repayment.schedule);

    // Alternate scenario without a grace period, for comparison only
    let base_payment_no_grace = base_monthly_payment(principal, monthly_rate, total_months);
    let extra_payment_no_grace = values.part_time_income.max(Decimal::ZERO)
        + values.early_repayment_rate.max(Decimal::ZERO) * base_payment_no_grace;
    let alternative = build_amortization_schedule(
        principal,
        total_months,
        monthly_rate,
        base_payment_no_grace,
        extra_payment_no_grace,
        base_date,
        0,
    );

    let added_interest_from_grace =
        (total_interest - alternative.total_interest).max(Decimal::ZERO);

    let metrics = LoanMetrics {
        monthly_payment,
        total_repayment: repayment.total_paid,
        total_interest,
        schedule,
        alternative_schedule: alternative.schedule,
        grace_impact: GraceImpact {
            interest_accrued_during_grace,
            added_interest_from_grace,
            total_interest_without_grace: alternative.total_interest,
            months_with_grace: grace_months,
        },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Grace-Adjusted Loan Amortization",
        &serde_json::json!({
            "principal": principal.to_string(),
            "totalMonths": total_months,
            "monthlyRate": monthly_rate.to_string(),
            "gracePeriodMonths": grace_months,
            "interestType": match values.interest_type {
                InterestType::Compound => "compound",
                InterestType::Simple => "simple",
            },
        }),
        warnings,
        elapsed,
        metrics,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn base_values() -> LoanFormValues {
        LoanFormValues {
            tuition: dec!(15000),
            living_expenses: dec!(8000),
            interest_rate: dec!(5.5),
            loan_term_years: dec!(10),
            grace_period_months: 6,
            start_date: "2026-01-01".into(),
            currency: Currency::USD,
            part_time_income: Decimal::ZERO,
            early_repayment_rate: Decimal::ZERO,
            interest_type: InterestType::Compound,
        }
    }

    fn grace_fixture(interest_type: InterestType) -> LoanFormValues {
        LoanFormValues {
            tuition: dec!(10000),
            living_expenses: Decimal::ZERO,
            interest_rate: dec!(12),
            loan_term_years: dec!(10),
            grace_period_months: 2,
            interest_type,
            ..base_values()
        }
    }

    #[test]
    fn test_compound_grace_capitalizes_monthly() {
        let metrics = calculate_loan_metrics(&grace_fixture(InterestType::Compound)).result;

        // 12% APR => 1% per month: 10000 -> 10100 -> 10201
        assert_eq!(metrics.schedule[0].interest_paid, dec!(100));
        assert_eq!(metrics.schedule[0].remaining_balance, dec!(10100));
        assert_eq!(metrics.schedule[1].interest_paid, dec!(101));
        assert_eq!(metrics.schedule[1].remaining_balance, dec!(10201));
        assert_eq!(metrics.grace_impact.interest_accrued_during_grace, dec!(201));
    }

    #[test]
    fn test_simple_grace_accrues_on_static_principal() {
        let metrics = calculate_loan_metrics(&grace_fixture(InterestType::Simple)).result;

        // Interest stays 100/month; reported balance is principal + accrued
        assert_eq!(metrics.schedule[0].interest_paid, dec!(100));
        assert_eq!(metrics.schedule[0].remaining_balance, dec!(10100));
        assert_eq!(metrics.schedule[1].interest_paid, dec!(100));
        assert_eq!(metrics.schedule[1].remaining_balance, dec!(10200));
        assert_eq!(metrics.grace_impact.interest_accrued_during_grace, dec!(200));
    }

    #[test]
    fn test_grace_rows_pay_no_principal() {
        let metrics = calculate_loan_metrics(&base_values()).result;
        for row in &metrics.schedule[..6] {
            assert_eq!(row.principal_paid, Decimal::ZERO);
            assert!(row.interest_paid > Decimal::ZERO);
        }
        assert!(metrics.schedule[6].principal_paid > Decimal::ZERO);
    }

    #[test]
    fn test_zero_grace_matches_alternative() {
        let values = LoanFormValues {
            grace_period_months: 0,
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        assert_eq!(metrics.grace_impact.months_with_grace, 0);
        assert_eq!(
            metrics.grace_impact.interest_accrued_during_grace,
            Decimal::ZERO
        );
        assert_eq!(metrics.grace_impact.added_interest_from_grace, Decimal::ZERO);
        // With no grace the two scenarios run the same inputs
        assert_eq!(metrics.schedule, metrics.alternative_schedule);
        assert!(metrics.schedule[0].principal_paid > Decimal::ZERO);
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let values = LoanFormValues {
            tuition: dec!(12000),
            living_expenses: Decimal::ZERO,
            interest_rate: Decimal::ZERO,
            grace_period_months: 0,
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        assert_eq!(metrics.monthly_payment, dec!(100));
        assert_eq!(metrics.total_interest, Decimal::ZERO);
        assert_eq!(metrics.schedule.len(), 120);
        assert_eq!(metrics.schedule[119].remaining_balance, Decimal::ZERO);
        assert_eq!(metrics.total_repayment, dec!(12000));
    }

    #[test]
    fn test_zero_rate_with_grace_accrues_nothing() {
        let values = LoanFormValues {
            interest_rate: Decimal::ZERO,
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        assert_eq!(metrics.total_interest, Decimal::ZERO);
        assert_eq!(metrics.grace_impact.interest_accrued_during_grace, Decimal::ZERO);
        assert_eq!(metrics.grace_impact.added_interest_from_grace, Decimal::ZERO);
        // 6 zero-interest grace rows, then 120 repayment rows
        assert_eq!(metrics.schedule.len(), 126);
    }

    #[test]
    fn test_end_to_end_example() {
        let metrics = calculate_loan_metrics(&base_values()).result;

        // Annuity payment on the grace-capitalized balance of ~23638.79
        // at 0.4583%/month over 120 months is ~256.55
        assert!((metrics.monthly_payment - dec!(256.55)).abs() < dec!(0.25));
        assert!(metrics.grace_impact.added_interest_from_grace > Decimal::ZERO);
        assert_eq!(metrics.grace_impact.months_with_grace, 6);
        assert_eq!(metrics.schedule.len(), 126);
        assert_eq!(metrics.alternative_schedule.len(), 120);
        assert_eq!(
            metrics.schedule.last().unwrap().remaining_balance,
            Decimal::ZERO
        );
        assert!(metrics.total_repayment >= dec!(23000));
        assert!(metrics.total_interest > Decimal::ZERO);
    }

    #[test]
    fn test_month_indexes_are_contiguous() {
        let values = LoanFormValues {
            part_time_income: dec!(250),
            early_repayment_rate: dec!(0.1),
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        for (i, row) in metrics.schedule.iter().enumerate() {
            assert_eq!(row.month_index, i as u32);
        }
        for (i, row) in metrics.alternative_schedule.iter().enumerate() {
            assert_eq!(row.month_index, i as u32);
        }
    }

    #[test]
    fn test_balances_never_increase_during_repayment() {
        let values = LoanFormValues {
            part_time_income: dec!(100),
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        let repayment = &metrics.schedule[6..];
        for pair in repayment.windows(2) {
            assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
        }
        for row in repayment {
            assert!(row.remaining_balance >= Decimal::ZERO);
        }
        for pair in metrics.alternative_schedule.windows(2) {
            assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
        }
    }

    #[test]
    fn test_extra_payments_shorten_payoff() {
        let baseline = calculate_loan_metrics(&base_values()).result;
        let boosted = calculate_loan_metrics(&LoanFormValues {
            part_time_income: dec!(250),
            early_repayment_rate: dec!(0.1),
            ..base_values()
        })
        .result;

        assert!(boosted.schedule.len() < baseline.schedule.len());
        assert!(boosted.total_interest < baseline.total_interest);
        assert_eq!(
            boosted.schedule.last().unwrap().remaining_balance,
            Decimal::ZERO
        );
    }

    #[test]
    fn test_added_interest_never_negative() {
        let cases = [
            base_values(),
            LoanFormValues {
                interest_rate: Decimal::ZERO,
                ..base_values()
            },
            LoanFormValues {
                part_time_income: dec!(2000),
                early_repayment_rate: dec!(0.5),
                ..base_values()
            },
            LoanFormValues {
                grace_period_months: 24,
                interest_type: InterestType::Simple,
                ..base_values()
            },
        ];
        for values in cases {
            let metrics = calculate_loan_metrics(&values).result;
            assert!(metrics.grace_impact.added_interest_from_grace >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_zero_principal_produces_no_repayment_rows() {
        let values = LoanFormValues {
            tuition: Decimal::ZERO,
            living_expenses: Decimal::ZERO,
            ..base_values()
        };
        let metrics = calculate_loan_metrics(&values).result;

        assert_eq!(metrics.monthly_payment, Decimal::ZERO);
        assert_eq!(metrics.total_interest, Decimal::ZERO);
        // Only the six grace rows remain, all zero
        assert_eq!(metrics.schedule.len(), 6);
        assert!(metrics.alternative_schedule.is_empty());
    }

    #[test]
    fn test_short_term_floors_at_one_month() {
        let values = LoanFormValues {
            loan_term_years: dec!(0.01),
            grace_period_months: 0,
            ..base_values()
        };
        let output = calculate_loan_metrics(&values);

        assert_eq!(output.result.schedule.len(), 1);
        assert_eq!(
            output.result.schedule[0].remaining_balance,
            Decimal::ZERO
        );
        assert!(!output.warnings.is_empty());
    }

    #[test]
    fn test_negative_inputs_are_clamped_with_warnings() {
        let values = LoanFormValues {
            tuition: dec!(-500),
            living_expenses: dec!(8000),
            interest_rate: dec!(-1),
            grace_period_months: -3,
            ..base_values()
        };
        let output = calculate_loan_metrics(&values);

        assert_eq!(output.warnings.len(), 3);
        assert_eq!(output.result.grace_impact.months_with_grace, 0);
        assert_eq!(output.result.total_interest, Decimal::ZERO);
        // Principal counts only the clamped, non-negative parts
        assert_eq!(output.result.total_repayment, dec!(8000));
    }

    #[test]
    fn test_unparseable_start_date_falls_back() {
        let values = LoanFormValues {
            start_date: "not-a-date".into(),
            ..base_values()
        };
        let output = calculate_loan_metrics(&values);

        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("Start date")));
        assert_eq!(output.result.schedule.len(), 126);
    }

    #[test]
    fn test_idempotent() {
        let values = LoanFormValues {
            part_time_income: dec!(250),
            early_repayment_rate: dec!(0.1),
            ..base_values()
        };
        let first = calculate_loan_metrics(&values).result;
        let second = calculate_loan_metrics(&values).result;
        assert_eq!(first, second);
    }

    #[test]
    fn test_month_labels() {
        let base = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(month_label(base, 0), "Jan 2026");
        assert_eq!(month_label(base, 11), "Dec 2026");
        assert_eq!(month_label(base, 12), "Jan 2027");
    }

    #[test]
    fn test_labels_follow_start_date() {
        let metrics = calculate_loan_metrics(&base_values()).result;
        assert_eq!(metrics.schedule[0].label, "Jan 2026");
        // Repayment begins right after the six grace months
        assert_eq!(metrics.schedule[6].label, "Jul 2026");
        assert_eq!(metrics.alternative_schedule[0].label, "Jan 2026");
    }
}
