pub mod amortization;
pub mod error;
pub mod format;
pub mod types;
pub mod validation;

pub use error::EduLoanError;
pub use types::*;

/// Standard result type for all edu-loan operations
pub type EduLoanResult<T> = Result<T, EduLoanError>;
