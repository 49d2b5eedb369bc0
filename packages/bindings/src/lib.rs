use napi::Result as NapiResult;
use napi_derive::napi;

use edu_loan_core::amortization::{self, LoanFormValues};
use edu_loan_core::format;
use edu_loan_core::types::Currency;
use edu_loan_core::validation;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Run the full projection. Input and output are JSON strings using the
/// same camelCase shape the web form exchanges.
#[napi]
pub fn calculate_loan_metrics(input_json: String) -> NapiResult<String> {
    let values: LoanFormValues = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = amortization::calculate_loan_metrics(&values);
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Field-level validation; returns a JSON array of {field, message} entries,
/// empty when the inputs are acceptable.
#[napi]
pub fn validate_loan_inputs(input_json: String) -> NapiResult<String> {
    let values: LoanFormValues = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let errors = validation::validate(&values);
    serde_json::to_string(&errors).map_err(to_napi_error)
}

/// Default form values for a fresh session, as JSON.
#[napi]
pub fn default_loan_values() -> NapiResult<String> {
    serde_json::to_string(&LoanFormValues::default()).map_err(to_napi_error)
}

/// Display-only currency formatting, e.g. ("23000.4", "USD") -> "$23,000".
#[napi]
pub fn format_currency(amount: String, currency_code: String) -> NapiResult<String> {
    let value: rust_decimal::Decimal = amount.parse().map_err(to_napi_error)?;
    let currency: Currency =
        serde_json::from_value(serde_json::Value::String(currency_code)).map_err(to_napi_error)?;
    Ok(format::format_money(value, currency))
}
