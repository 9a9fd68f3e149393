use crate::account::AccountError;
use crate::domain::SystemId;
use std::fmt;
use thiserror::Error;

/// Which of the two portfolio-assigned ledgers a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountRole {
    Live,
    Shadow,
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRole::Live => write!(f, "live"),
            AccountRole::Shadow => write!(f, "shadow"),
        }
    }
}

/// Errors from an allocation pass.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocateError {
    /// Policy weight outside `[0, 1]`. Only raised with weight validation on.
    #[error("invalid weight {weight} for system {system}: expected a value in [0, 1]")]
    InvalidWeight { system: SystemId, weight: f64 },

    #[error("{0} account is not attached; the portfolio must assign it before allocating")]
    AccountNotAttached(AccountRole),

    /// Live and shadow are the same ledger, so committing would write the live account.
    #[error("live and shadow accounts share one handle; they must be distinct ledgers")]
    AliasedAccounts,

    /// Ledger failure, propagated unmodified.
    #[error(transparent)]
    Account(#[from] AccountError),
}
