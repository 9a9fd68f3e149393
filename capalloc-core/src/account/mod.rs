//! Account — cash pool plus per-system holdings.
//!
//! The same type backs both the live account (what the portfolio really holds)
//! and the shadow account (the allocation engine's simulation ledger). The
//! allocation engine only ever writes to the shadow account; settlement of
//! buys and deferred sells is done by the portfolio controller.

use crate::domain::SystemId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Errors raised by ledger operations. The allocation engine propagates these
/// unmodified.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccountError {
    #[error("account '{account}' opened on {opened}, cannot be read at {date}")]
    BeforeOpen {
        account: String,
        opened: NaiveDate,
        date: NaiveDate,
    },

    #[error("insufficient funds in '{account}': requested {requested:.2}, available {available:.2}")]
    InsufficientFunds {
        account: String,
        requested: f64,
        available: f64,
    },

    #[error("system {system} has no holding in '{account}'")]
    UnknownSystem { account: String, system: SystemId },

    #[error("sell of {requested:.2} exceeds unsold value {available:.2} of system {system}")]
    ExcessiveSell {
        system: SystemId,
        requested: f64,
        available: f64,
    },

    #[error("amount must be finite and non-negative, got {0}")]
    InvalidAmount(f64),

    #[error("account lock poisoned: {0}")]
    Poisoned(String),
}

/// What a single trading system holds inside an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    /// Cash allocated to the system but not yet invested.
    pub cash: f64,
    /// Marked value of the system's open positions.
    pub market_value: f64,
    /// Value already promised to deferred sells that have not settled.
    pub pending_sell: f64,
}

impl Holding {
    /// Held value = allocated cash + position value.
    pub fn value(&self) -> f64 {
        self.cash + self.market_value
    }

    /// Value not yet earmarked for a deferred sell.
    pub fn unsold_value(&self) -> f64 {
        (self.value() - self.pending_sell).max(0.0)
    }
}

/// Point-in-time view of an account's funds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundsSnapshot {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings_value: f64,
    pub pending_sells: f64,
    pub total_assets: f64,
}

/// Ledger of pool cash and per-system holdings.
///
/// Accounting identity: `total_assets == cash + sum(holding values)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    name: String,
    opened: NaiveDate,
    cash: f64,
    holdings: BTreeMap<SystemId, Holding>,
}

/// Account handle shared between the portfolio controller and the engine.
pub type SharedAccount = Arc<RwLock<Account>>;

/// Wrap an account for sharing.
pub fn shared(account: Account) -> SharedAccount {
    Arc::new(RwLock::new(account))
}

/// Read-lock a shared account, mapping poisoning to `AccountError`.
pub fn read(account: &SharedAccount) -> Result<RwLockReadGuard<'_, Account>, AccountError> {
    account
        .read()
        .map_err(|e| AccountError::Poisoned(e.to_string()))
}

/// Write-lock a shared account, mapping poisoning to `AccountError`.
pub fn write(account: &SharedAccount) -> Result<RwLockWriteGuard<'_, Account>, AccountError> {
    account
        .write()
        .map_err(|e| AccountError::Poisoned(e.to_string()))
}

fn check_amount(amount: f64) -> Result<(), AccountError> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(AccountError::InvalidAmount(amount))
    }
}

impl Account {
    pub fn new(name: impl Into<String>, opened: NaiveDate, cash: f64) -> Self {
        Self {
            name: name.into(),
            opened,
            cash,
            holdings: BTreeMap::new(),
        }
    }

    /// Builder: seed a system holding with `value` of open positions.
    pub fn with_holding(mut self, system: impl Into<SystemId>, value: f64) -> Self {
        self.holdings.entry(system.into()).or_default().market_value += value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opened(&self) -> NaiveDate {
        self.opened
    }

    /// Unallocated pool cash.
    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holding(&self, system: &SystemId) -> Option<&Holding> {
        self.holdings.get(system)
    }

    pub fn holdings(&self) -> impl Iterator<Item = (&SystemId, &Holding)> {
        self.holdings.iter()
    }

    /// Pool cash plus every system's held value.
    pub fn total_assets(&self) -> f64 {
        self.cash + self.holdings.values().map(Holding::value).sum::<f64>()
    }

    fn check_date(&self, date: NaiveDate) -> Result<(), AccountError> {
        if date < self.opened {
            return Err(AccountError::BeforeOpen {
                account: self.name.clone(),
                opened: self.opened,
                date,
            });
        }
        Ok(())
    }

    /// Funds as of `date`.
    pub fn funds(&self, date: NaiveDate) -> Result<FundsSnapshot, AccountError> {
        self.check_date(date)?;
        let holdings_value = self.holdings.values().map(Holding::value).sum::<f64>();
        let pending_sells = self.holdings.values().map(|h| h.pending_sell).sum::<f64>();
        Ok(FundsSnapshot {
            date,
            cash: self.cash,
            holdings_value,
            pending_sells,
            total_assets: self.cash + holdings_value,
        })
    }

    /// Held value of one system as of `date`; zero when it holds nothing.
    pub fn holding_value(&self, system: &SystemId, date: NaiveDate) -> Result<f64, AccountError> {
        self.check_date(date)?;
        Ok(self.holdings.get(system).map_or(0.0, Holding::value))
    }

    /// Add cash to the pool.
    pub fn deposit(&mut self, amount: f64) -> Result<(), AccountError> {
        check_amount(amount)?;
        self.cash += amount;
        Ok(())
    }

    /// Move `amount` of pool cash into `system`'s holding.
    pub fn allocate(&mut self, system: &SystemId, amount: f64) -> Result<(), AccountError> {
        check_amount(amount)?;
        if amount > self.cash {
            return Err(AccountError::InsufficientFunds {
                account: self.name.clone(),
                requested: amount,
                available: self.cash,
            });
        }
        self.cash -= amount;
        self.holdings.entry(system.clone()).or_default().cash += amount;
        Ok(())
    }

    /// Record the outstanding deferred sell for `system`, replacing any earlier
    /// unsettled decision. A later decision supersedes an earlier one, so
    /// re-running a pass on the same date does not stack sells.
    pub fn set_pending_sell(&mut self, system: &SystemId, amount: f64) -> Result<(), AccountError> {
        check_amount(amount)?;
        let account = &self.name;
        let holding = self
            .holdings
            .get_mut(system)
            .ok_or_else(|| AccountError::UnknownSystem {
                account: account.clone(),
                system: system.clone(),
            })?;
        if amount > holding.value() {
            return Err(AccountError::ExcessiveSell {
                system: system.clone(),
                requested: amount,
                available: holding.value(),
            });
        }
        holding.pending_sell = amount;
        Ok(())
    }

    /// Settle a sell of `amount`: the holding shrinks, proceeds return to the
    /// pool, and any matching pending amount is cleared. Allocated cash is
    /// released before positions are reduced.
    pub fn settle_sell(&mut self, system: &SystemId, amount: f64) -> Result<(), AccountError> {
        check_amount(amount)?;
        let account = &self.name;
        let holding = self
            .holdings
            .get_mut(system)
            .ok_or_else(|| AccountError::UnknownSystem {
                account: account.clone(),
                system: system.clone(),
            })?;
        if amount > holding.value() {
            return Err(AccountError::ExcessiveSell {
                system: system.clone(),
                requested: amount,
                available: holding.value(),
            });
        }
        let from_cash = amount.min(holding.cash);
        holding.cash -= from_cash;
        holding.market_value -= amount - from_cash;
        holding.pending_sell = (holding.pending_sell - amount).max(0.0);
        if holding.value() <= 0.0 && holding.pending_sell <= 0.0 {
            self.holdings.remove(system);
        }
        self.cash += amount;
        Ok(())
    }

    /// Re-mark a system's positions at `market_value`.
    pub fn mark_to_market(
        &mut self,
        system: &SystemId,
        market_value: f64,
    ) -> Result<(), AccountError> {
        check_amount(market_value)?;
        let account = &self.name;
        let holding = self
            .holdings
            .get_mut(system)
            .ok_or_else(|| AccountError::UnknownSystem {
                account: account.clone(),
                system: system.clone(),
            })?;
        holding.market_value = market_value;
        Ok(())
    }
}
