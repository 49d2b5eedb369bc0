//! Field-level validation for loan inputs. The engine itself clamps rather
//! than rejects, so enforcing user-facing constraints is the caller's job;
//! this module gives every front end (CLI, bindings) the same rules.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::LoanFormValues;
use crate::error::EduLoanError;
use crate::EduLoanResult;

const MAX_EARLY_REPAYMENT_RATE: Decimal = dec!(0.5);

/// A single failed constraint, keyed by the camelCase field name the form uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check every user-facing constraint and return all failures.
pub fn validate(values: &LoanFormValues) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if values.tuition <= Decimal::ZERO {
        errors.push(FieldError::new(
            "tuition",
            "Enter a tuition amount greater than 0.",
        ));
    }
    if values.living_expenses < Decimal::ZERO {
        errors.push(FieldError::new(
            "livingExpenses",
            "Living expenses cannot be negative.",
        ));
    }
    if values.interest_rate < Decimal::ZERO {
        errors.push(FieldError::new(
            "interestRate",
            "Interest rate cannot be negative.",
        ));
    }
    if values.loan_term_years <= Decimal::ZERO {
        errors.push(FieldError::new(
            "loanTermYears",
            "Loan term should be at least 0.5 years.",
        ));
    }
    if values.grace_period_months < 0 {
        errors.push(FieldError::new(
            "gracePeriodMonths",
            "Grace period cannot be negative.",
        ));
    }
    if values.start_date.trim().is_empty() {
        errors.push(FieldError::new(
            "startDate",
            "Please choose when your repayments start.",
        ));
    }
    if values.early_repayment_rate < Decimal::ZERO
        || values.early_repayment_rate > MAX_EARLY_REPAYMENT_RATE
    {
        errors.push(FieldError::new(
            "earlyRepaymentRate",
            "Early repayment boost must be between 0% and 50% of the base payment.",
        ));
    }
    if values.part_time_income < Decimal::ZERO {
        errors.push(FieldError::new(
            "partTimeIncome",
            "Part-time income cannot be negative.",
        ));
    }

    let total_principal =
        values.tuition.max(Decimal::ZERO) + values.living_expenses.max(Decimal::ZERO);
    if total_principal <= Decimal::ZERO {
        errors.push(FieldError::new(
            "tuition",
            "Provide tuition and living expenses before calculating.",
        ));
    }

    errors
}

/// Validate and convert the first failure into an error, for callers that
/// want to bail instead of collecting field messages.
pub fn ensure_valid(values: &LoanFormValues) -> EduLoanResult<()> {
    match validate(values).into_iter().next() {
        None => Ok(()),
        Some(err) => Err(EduLoanError::InvalidInput {
            field: err.field,
            reason: err.message,
        }),
    }
}
