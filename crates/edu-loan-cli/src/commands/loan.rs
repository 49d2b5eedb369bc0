use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use edu_loan_core::amortization::{calculate_loan_metrics, InterestType, LoanFormValues};
use edu_loan_core::format::format_money;
use edu_loan_core::types::Currency;
use edu_loan_core::validation;

use crate::input;

/// Loan inputs shared by every subcommand. Individual flags are ignored when
/// a JSON file or piped stdin supplies the full input.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ProjectArgs {
    /// Tuition amount
    #[arg(long)]
    pub tuition: Option<Decimal>,

    /// Living expenses over the study period
    #[arg(long, default_value = "0")]
    pub living_expenses: Decimal,

    /// Annual interest rate in percent (e.g. 5.5)
    #[arg(long, alias = "apr")]
    pub interest_rate: Option<Decimal>,

    /// Loan term in years (fractional values allowed)
    #[arg(long)]
    pub loan_term_years: Option<Decimal>,

    /// Months before repayment starts
    #[arg(long, default_value = "0")]
    pub grace_period_months: i64,

    /// Repayment start date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    pub start_date: Option<String>,

    /// Display currency: USD, INR, EUR, or GBP
    #[arg(long, default_value = "USD")]
    pub currency: String,

    /// Monthly part-time income applied as extra principal
    #[arg(long, default_value = "0")]
    pub part_time_income: Decimal,

    /// Early repayment boost as a fraction of the base payment (0 to 0.5)
    #[arg(long, default_value = "0")]
    pub early_repayment_rate: Decimal,

    /// Grace-period interest model: compound or simple
    #[arg(long, default_value = "compound")]
    pub interest_type: String,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the schedule listing
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub loan: ProjectArgs,

    /// Show the no-grace comparison schedule instead of the primary one
    #[arg(long)]
    pub no_grace: bool,
}

/// Arguments for input validation
#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub loan: ProjectArgs,
}

/// Arguments for the formatted summary
#[derive(Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub loan: ProjectArgs,
}

fn parse_currency(raw: &str) -> Result<Currency, Box<dyn std::error::Error>> {
    match raw.to_ascii_uppercase().as_str() {
        "USD" => Ok(Currency::USD),
        "INR" => Ok(Currency::INR),
        "EUR" => Ok(Currency::EUR),
        "GBP" => Ok(Currency::GBP),
        other => Err(format!("unsupported currency '{other}' (expected USD, INR, EUR, GBP)").into()),
    }
}

fn parse_interest_type(raw: &str) -> Result<InterestType, Box<dyn std::error::Error>> {
    match raw.to_ascii_lowercase().as_str() {
        "compound" => Ok(InterestType::Compound),
        "simple" => Ok(InterestType::Simple),
        other => Err(format!("unknown interest type '{other}' (expected compound or simple)").into()),
    }
}

fn resolve_values(args: &ProjectArgs) -> Result<LoanFormValues, Box<dyn std::error::Error>> {
    if let Some(ref path) = args.input {
        return input::file::read_json(path);
    }
    if let Some(data) = input::stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }

    Ok(LoanFormValues {
        tuition: args
            .tuition
            .ok_or("--tuition is required (or provide --input)")?,
        living_expenses: args.living_expenses,
        interest_rate: args
            .interest_rate
            .ok_or("--interest-rate is required (or provide --input)")?,
        loan_term_years: args
            .loan_term_years
            .ok_or("--loan-term-years is required (or provide --input)")?,
        grace_period_months: args.grace_period_months,
        start_date: args.start_date.clone().unwrap_or_else(|| {
            chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
        }),
        currency: parse_currency(&args.currency)?,
        part_time_income: args.part_time_income,
        early_repayment_rate: args.early_repayment_rate,
        interest_type: parse_interest_type(&args.interest_type)?,
    })
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let values = resolve_values(&args)?;
    validation::ensure_valid(&values)?;
    let output = calculate_loan_metrics(&values);
    Ok(serde_json::to_value(&output)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let values = resolve_values(&args.loan)?;
    validation::ensure_valid(&values)?;
    let output = calculate_loan_metrics(&values);
    let rows = if args.no_grace {
        output.result.alternative_schedule
    } else {
        output.result.schedule
    };
    Ok(serde_json::to_value(&rows)?)
}

pub fn run_check(args: CheckArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let values = resolve_values(&args.loan)?;
    let errors = validation::validate(&values);
    Ok(json!({
        "valid": errors.is_empty(),
        "errors": errors,
    }))
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let values = resolve_values(&args.loan)?;
    validation::ensure_valid(&values)?;
    let currency = values.currency;
    let principal = values.tuition.max(dec!(0)) + values.living_expenses.max(dec!(0));
    let metrics = calculate_loan_metrics(&values).result;

    Ok(json!({
        "principal": format_money(principal, currency),
        "monthlyPayment": format_money(metrics.monthly_payment, currency),
        "totalRepayment": format_money(metrics.total_repayment, currency),
        "totalInterest": format_money(metrics.total_interest, currency),
        "interestAccruedDuringGrace":
            format_money(metrics.grace_impact.interest_accrued_during_grace, currency),
        "addedInterestFromGrace":
            format_money(metrics.grace_impact.added_interest_from_grace, currency),
        "totalInterestWithoutGrace":
            format_money(metrics.grace_impact.total_interest_without_grace, currency),
        "monthsWithGrace": metrics.grace_impact.months_with_grace,
        "payoffMonths": metrics.schedule.len(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_args() -> ProjectArgs {
        ProjectArgs {
            tuition: Some(dec!(15000)),
            living_expenses: dec!(8000),
            interest_rate: Some(dec!(5.5)),
            loan_term_years: Some(dec!(10)),
            grace_period_months: 6,
            start_date: Some("2026-01-01".into()),
            currency: "usd".into(),
            part_time_income: dec!(0),
            early_repayment_rate: dec!(0),
            interest_type: "compound".into(),
            input: None,
        }
    }

    #[test]
    fn test_currency_parsing_is_case_insensitive() {
        assert_eq!(parse_currency("gbp").unwrap(), Currency::GBP);
        assert!(parse_currency("CHF").is_err());
    }

    #[test]
    fn test_interest_type_parsing() {
        assert_eq!(parse_interest_type("Simple").unwrap(), InterestType::Simple);
        assert!(parse_interest_type("continuous").is_err());
    }

    #[test]
    fn test_resolve_values_from_flags() {
        let values = resolve_values(&flag_args()).unwrap();
        assert_eq!(values.tuition, dec!(15000));
        assert_eq!(values.currency, Currency::USD);
        assert_eq!(values.interest_type, InterestType::Compound);
    }

    #[test]
    fn test_missing_tuition_flag_errors() {
        let args = ProjectArgs {
            tuition: None,
            ..flag_args()
        };
        let err = resolve_values(&args).unwrap_err();
        assert!(err.to_string().contains("--tuition"));
    }
}
