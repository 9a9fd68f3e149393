//! AllocationEngine — splits a shared capital pool across trading systems.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::error::{AccountRole, AllocateError};
use super::intent::{AllocationPath, BuyIntent, FundsAdjustment};
use super::params::{clamp_percent, AllocatorParams, SellUnit};
use super::partition::partition;
use crate::account::{self, Account, SharedAccount};
use crate::allocators::{WeightAllocator, WeightContext};
use crate::domain::{Query, SystemId, SystemWeight, SystemWeightList};
use crate::fingerprint::EngineConfig;

/// Shortfalls smaller than this share of allocatable capital are float noise,
/// not a capped buy.
const CAP_TOLERANCE: f64 = 1e-9;

/// Capital allocation engine.
///
/// Owned by a portfolio controller, which assigns the live and shadow accounts
/// and is the only caller of [`adjust_funds`](Self::adjust_funds). The engine
/// reads the live account and writes only the shadow account.
///
/// Cloning copies configuration (name, parameters, query, reserve percentage)
/// and the policy's private state, but never the accounts: a clone starts
/// detached until its own portfolio attaches ledgers.
#[derive(Debug)]
pub struct AllocationEngine {
    name: String,
    params: AllocatorParams,
    query: Query,
    reserve_percent: f64,
    allocator: Box<dyn WeightAllocator>,
    live: Option<SharedAccount>,
    shadow: Option<SharedAccount>,
    last_adjusted: Option<NaiveDate>,
}

impl AllocationEngine {
    pub fn new(
        name: impl Into<String>,
        params: AllocatorParams,
        allocator: Box<dyn WeightAllocator>,
    ) -> Self {
        Self::from_config(EngineConfig::new(name, params), allocator)
    }

    /// Build a detached engine from persisted configuration.
    pub fn from_config(config: EngineConfig, allocator: Box<dyn WeightAllocator>) -> Self {
        let config = config.normalized();
        Self {
            name: config.name,
            params: config.params,
            query: config.query,
            reserve_percent: config.reserve_percent,
            allocator,
            live: None,
            shadow: None,
            last_adjusted: None,
        }
    }

    /// The persisted fields. Accounts are not part of it.
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            name: self.name.clone(),
            reserve_percent: self.reserve_percent,
            params: self.params.clone(),
            query: self.query,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn params(&self) -> &AllocatorParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut AllocatorParams {
        &mut self.params
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn set_query(&mut self, query: Query) {
        self.query = query;
    }

    pub fn reserve_percent(&self) -> f64 {
        self.reserve_percent
    }

    /// Set the share of assets kept out of allocation. Clamped to `[0, 1]`;
    /// `reset()` restores `default_reserve_percent`.
    pub fn set_reserve_percent(&mut self, p: f64) {
        self.reserve_percent = clamp_percent(p);
    }

    pub fn allocator(&self) -> &dyn WeightAllocator {
        self.allocator.as_ref()
    }

    pub fn live_account(&self) -> Option<&SharedAccount> {
        self.live.as_ref()
    }

    pub fn shadow_account(&self) -> Option<&SharedAccount> {
        self.shadow.as_ref()
    }

    pub fn set_live_account(&mut self, account: SharedAccount) {
        self.live = Some(account);
    }

    pub fn set_shadow_account(&mut self, account: SharedAccount) {
        self.shadow = Some(account);
    }

    pub fn attach_accounts(&mut self, live: SharedAccount, shadow: SharedAccount) {
        self.live = Some(live);
        self.shadow = Some(shadow);
    }

    /// Restore the reserve percentage to its configured default and clear
    /// run state, including the policy's.
    pub fn reset(&mut self) {
        self.reserve_percent = clamp_percent(self.params.default_reserve_percent);
        self.last_adjusted = None;
        self.allocator.reset_state();
    }

    /// Run one allocation pass for `date`.
    ///
    /// Returns the immediate buys and the deferred sells. Buys and pending sells
    /// are recorded in a projected copy of the shadow account, which replaces
    /// the shadow account only once the whole pass has succeeded. The live
    /// account is never written, so live and shadow must be distinct ledgers.
    pub fn adjust_funds(
        &mut self,
        date: NaiveDate,
        selected: &[SystemWeight],
        running: &HashSet<SystemId>,
    ) -> Result<FundsAdjustment, AllocateError> {
        let live = self
            .live
            .clone()
            .ok_or(AllocateError::AccountNotAttached(AccountRole::Live))?;
        let shadow = self
            .shadow
            .clone()
            .ok_or(AllocateError::AccountNotAttached(AccountRole::Shadow))?;
        if Arc::ptr_eq(&live, &shadow) {
            return Err(AllocateError::AliasedAccounts);
        }

        if self.last_adjusted == Some(date) {
            warn!(
                engine = %self.name,
                %date,
                "funds already adjusted for this date; shadow sells are superseded"
            );
        }

        let ctx = WeightContext {
            date,
            query: self.query.visible_until(date),
        };
        let weighted = self.allocator.compute_weights(&ctx, selected);
        if self.params.validate_weights {
            check_weights(&weighted)?;
        }

        let mut parts = partition(&weighted, running);
        parts.absorb_dropped(selected);

        // Live reads happen under one short read lock.
        let (total_assets, current) = {
            let live = account::read(&live)?;
            let total = live.funds(date)?.total_assets;
            let mut current = HashMap::new();
            for sw in parts.reconcile() {
                current.insert(sw.system.clone(), live.holding_value(&sw.system, date)?);
            }
            (total, current)
        };
        let mut projected: Account = account::read(&shadow)?.clone();
        projected.funds(date)?;

        let reserve = total_assets * self.reserve_percent;
        let allocatable = total_assets - reserve;

        let mut pass = Pass {
            projected: &mut projected,
            reserve,
            allocatable,
            buys: Vec::new(),
        };
        let mut deferred_sells = SystemWeightList::new();
        let mut holders = parts.reconcile().count();

        for (sw, path) in &parts.selected {
            let target = sw.weight * allocatable;
            match path {
                AllocationPath::Reconcile => {
                    if !self.params.adjust_running {
                        debug!(
                            system = %sw.system,
                            "running system left as is (adjust_running off)"
                        );
                        continue;
                    }
                    let held = current.get(&sw.system).copied().unwrap_or(0.0);
                    if target.is_nan() {
                        warn!(system = %sw.system, "non-numeric weight, running system left as is");
                        continue;
                    }
                    if target >= held {
                        pass.buy(&sw.system, target - held, AllocationPath::Reconcile)?;
                    } else {
                        // a negative target sells at most the whole holding
                        let excess = (held - target).min(held);
                        if excess <= 0.0 {
                            continue;
                        }
                        pass.projected.set_pending_sell(&sw.system, excess)?;
                        let amount = match self.params.sell_unit {
                            SellUnit::Value => excess,
                            SellUnit::Fraction => excess / held,
                        };
                        debug!(system = %sw.system, held, target, excess, "deferred sell");
                        deferred_sells.push(SystemWeight::new(sw.system.clone(), amount));
                    }
                }
                AllocationPath::Fresh => {
                    if sw.weight.is_nan() || sw.weight < self.params.weight_unit {
                        debug!(
                            system = %sw.system,
                            weight = sw.weight,
                            "weight below unit, skipped"
                        );
                        continue;
                    }
                    if let Some(max) = self.params.max_systems {
                        if holders >= max {
                            warn!(
                                system = %sw.system,
                                max,
                                "system cap reached, fresh allocation skipped"
                            );
                            continue;
                        }
                    }
                    if pass.buy(&sw.system, target, AllocationPath::Fresh)? {
                        holders += 1;
                    }
                }
            }
        }

        let buys = pass.buys;
        *account::write(&shadow)? = projected;
        self.last_adjusted = Some(date);

        info!(
            engine = %self.name,
            %date,
            total_assets,
            allocatable,
            buys = buys.len(),
            deferred_sells = deferred_sells.len(),
            untouched = parts.untouched.len(),
            "funds adjusted"
        );

        Ok(FundsAdjustment {
            date,
            total_assets,
            reserve,
            allocatable,
            buys,
            deferred_sells,
            untouched: parts.untouched,
        })
    }
}

impl Clone for AllocationEngine {
    fn clone(&self) -> Self {
        Self::from_config(self.config(), self.allocator.clone())
    }
}

/// Buy bookkeeping for one pass.
struct Pass<'a> {
    projected: &'a mut Account,
    reserve: f64,
    allocatable: f64,
    buys: Vec<BuyIntent>,
}

impl Pass<'_> {
    /// Pool cash the pass may still spend without touching the reserve.
    /// Pending sells never add to it.
    fn spendable(&self) -> f64 {
        (self.projected.cash() - self.reserve).max(0.0)
    }

    /// Record a buy of up to `amount`. Returns whether anything was bought.
    fn buy(
        &mut self,
        system: &SystemId,
        amount: f64,
        path: AllocationPath,
    ) -> Result<bool, AllocateError> {
        if amount.is_nan() || amount <= 0.0 {
            return Ok(false);
        }
        let spendable = self.spendable();
        if spendable <= 0.0 {
            warn!(%system, wanted = amount, "no spendable cash left, buy skipped");
            return Ok(false);
        }
        let size = amount.min(spendable);
        if amount - size > CAP_TOLERANCE * self.allocatable.max(1.0) {
            warn!(%system, wanted = amount, size, "buy capped by spendable cash");
        }
        self.projected.allocate(system, size)?;
        debug!(%system, size, ?path, "buy");
        self.buys.push(BuyIntent {
            system: system.clone(),
            amount: size,
            path,
        });
        Ok(true)
    }
}

/// Reject any weight outside `[0, 1]` (NaN included).
fn check_weights(weights: &[SystemWeight]) -> Result<(), AllocateError> {
    match weights.iter().find(|sw| !(0.0..=1.0).contains(&sw.weight)) {
        Some(sw) => Err(AllocateError::InvalidWeight {
            system: sw.system.clone(),
            weight: sw.weight,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::shared;
    use crate::allocators::{EqualWeight, FixedWeightList, SelectorWeight};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn opened() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    }

    fn engine(policy: Box<dyn WeightAllocator>) -> AllocationEngine {
        AllocationEngine::new("test", AllocatorParams::default(), policy)
    }

    fn attach(engine: &mut AllocationEngine, account: Account) {
        engine.attach_accounts(shared(account.clone()), shared(account));
    }

    #[test]
    fn check_weights_accepts_bounds() {
        let weights = vec![SystemWeight::new("a", 0.0), SystemWeight::new("b", 1.0)];
        assert!(check_weights(&weights).is_ok());
    }

    #[test]
    fn check_weights_rejects_nan() {
        let weights = vec![SystemWeight::new("a", f64::NAN)];
        assert!(matches!(
            check_weights(&weights),
            Err(AllocateError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn detached_engine_reports_missing_live_account() {
        let mut engine = engine(Box::new(EqualWeight));
        let err = engine
            .adjust_funds(date(), &[SystemWeight::new("a", 1.0)], &HashSet::new())
            .unwrap_err();
        assert_eq!(err, AllocateError::AccountNotAttached(AccountRole::Live));
    }

    #[test]
    fn missing_shadow_account_is_reported() {
        let mut engine = engine(Box::new(EqualWeight));
        engine.set_live_account(shared(Account::new("live", opened(), 100.0)));
        let err = engine.adjust_funds(date(), &[], &HashSet::new()).unwrap_err();
        assert_eq!(err, AllocateError::AccountNotAttached(AccountRole::Shadow));
    }

    #[test]
    fn reserve_is_never_spent() {
        let mut engine = engine(Box::new(SelectorWeight));
        engine.set_reserve_percent(0.25);
        attach(&mut engine, Account::new("pool", opened(), 1_000.0));
        let adj = engine
            .adjust_funds(date(), &[SystemWeight::new("a", 1.0)], &HashSet::new())
            .unwrap();
        assert_eq!(adj.reserve, 250.0);
        assert_eq!(adj.allocatable, 750.0);
        assert_eq!(adj.total_bought(), 750.0);
        let shadow = account::read(engine.shadow_account().unwrap()).unwrap().cash();
        assert_eq!(shadow, 250.0);
    }

    #[test]
    fn buys_are_capped_in_list_order() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.7, 0.7])));
        attach(&mut engine, Account::new("pool", opened(), 1_000.0));
        let selected = vec![SystemWeight::new("first", 1.0), SystemWeight::new("second", 1.0)];
        let adj = engine.adjust_funds(date(), &selected, &HashSet::new()).unwrap();
        assert_eq!(adj.buys.len(), 2);
        assert!((adj.buys[0].amount - 700.0).abs() < 1e-9);
        assert!((adj.buys[1].amount - 300.0).abs() < 1e-9);
    }

    #[test]
    fn pass_stops_buying_when_cash_runs_out() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![1.0, 0.5])));
        attach(&mut engine, Account::new("pool", opened(), 1_000.0));
        let selected = vec![SystemWeight::new("a", 1.0), SystemWeight::new("b", 1.0)];
        let adj = engine.adjust_funds(date(), &selected, &HashSet::new()).unwrap();
        assert_eq!(adj.buys.len(), 1);
        assert_eq!(adj.buys[0].system, SystemId::new("a"));
    }

    #[test]
    fn weight_below_unit_gets_no_buy() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.00001, 0.5])));
        attach(&mut engine, Account::new("pool", opened(), 1_000.0));
        let selected = vec![SystemWeight::new("tiny", 1.0), SystemWeight::new("real", 1.0)];
        let adj = engine.adjust_funds(date(), &selected, &HashSet::new()).unwrap();
        assert_eq!(adj.buys.len(), 1);
        assert_eq!(adj.buys[0].system, SystemId::new("real"));
    }

    #[test]
    fn max_systems_counts_running_holders() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.2, 0.2, 0.2])));
        engine.params_mut().max_systems = Some(2);
        let account = Account::new("pool", opened(), 800.0).with_holding("held", 200.0);
        attach(&mut engine, account);
        let selected = vec![
            SystemWeight::new("held", 1.0),
            SystemWeight::new("new1", 1.0),
            SystemWeight::new("new2", 1.0),
        ];
        let running: HashSet<SystemId> = [SystemId::new("held")].into_iter().collect();
        let adj = engine.adjust_funds(date(), &selected, &running).unwrap();
        let bought: Vec<&str> = adj.buys.iter().map(|b| b.system.as_str()).collect();
        assert_eq!(bought, vec!["new1"]);
    }

    #[test]
    fn adjust_running_off_leaves_running_systems_alone() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.1, 0.3])));
        engine.params_mut().adjust_running = false;
        let account = Account::new("pool", opened(), 500.0).with_holding("held", 500.0);
        attach(&mut engine, account);
        let selected = vec![SystemWeight::new("held", 1.0), SystemWeight::new("new", 1.0)];
        let running: HashSet<SystemId> = [SystemId::new("held")].into_iter().collect();
        let adj = engine.adjust_funds(date(), &selected, &running).unwrap();
        assert!(adj.deferred_sells.is_empty());
        assert_eq!(adj.buys.len(), 1);
        assert_eq!(adj.buys[0].system, SystemId::new("new"));
    }

    #[test]
    fn fraction_sell_unit_reports_share_of_holding() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.2])));
        engine.params_mut().sell_unit = SellUnit::Fraction;
        let account = Account::new("pool", opened(), 200.0).with_holding("held", 800.0);
        attach(&mut engine, account);
        let running: HashSet<SystemId> = [SystemId::new("held")].into_iter().collect();
        let adj = engine
            .adjust_funds(date(), &[SystemWeight::new("held", 1.0)], &running)
            .unwrap();
        // target 200 of 800 held: sell three quarters
        assert!((adj.deferred_sells[0].weight - 0.75).abs() < 1e-12);
    }

    #[test]
    fn pending_sell_lands_in_shadow_not_live() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.2])));
        let account = Account::new("pool", opened(), 200.0).with_holding("held", 800.0);
        attach(&mut engine, account);
        let running: HashSet<SystemId> = [SystemId::new("held")].into_iter().collect();
        engine
            .adjust_funds(date(), &[SystemWeight::new("held", 1.0)], &running)
            .unwrap();
        let held = SystemId::new("held");
        let shadow = account::read(engine.shadow_account().unwrap()).unwrap();
        assert_eq!(shadow.holding(&held).unwrap().pending_sell, 600.0);
        let live = account::read(engine.live_account().unwrap()).unwrap();
        assert_eq!(live.holding(&held).unwrap().pending_sell, 0.0);
    }

    #[test]
    fn failed_pass_leaves_shadow_untouched() {
        let mut engine = engine(Box::new(FixedWeightList::new(vec![0.5, 0.1])));
        // Live knows "ghost" but shadow does not, so its deferred sell fails.
        let live = Account::new("live", opened(), 500.0).with_holding("ghost", 500.0);
        let shadow = Account::new("shadow", opened(), 1_000.0);
        engine.attach_accounts(shared(live), shared(shadow.clone()));
        let selected = vec![SystemWeight::new("new", 1.0), SystemWeight::new("ghost", 1.0)];
        let running: HashSet<SystemId> = [SystemId::new("ghost")].into_iter().collect();
        let err = engine.adjust_funds(date(), &selected, &running).unwrap_err();
        assert!(matches!(err, AllocateError::Account(_)));
        let after = account::read(engine.shadow_account().unwrap()).unwrap().clone();
        assert_eq!(after, shadow);
    }

    #[test]
    fn date_before_account_open_propagates() {
        let mut engine = engine(Box::new(EqualWeight));
        attach(&mut engine, Account::new("pool", opened(), 100.0));
        let early = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let err = engine.adjust_funds(early, &[], &HashSet::new()).unwrap_err();
        assert!(matches!(
            err,
            AllocateError::Account(crate::account::AccountError::BeforeOpen { .. })
        ));
    }

    #[test]
    fn same_handle_for_live_and_shadow_is_rejected() {
        let mut engine = engine(Box::new(EqualWeight));
        let handle = shared(Account::new("pool", opened(), 100.0));
        engine.attach_accounts(handle.clone(), handle.clone());
        let err = engine
            .adjust_funds(date(), &[SystemWeight::new("a", 1.0)], &HashSet::new())
            .unwrap_err();
        assert_eq!(err, AllocateError::AliasedAccounts);
        assert_eq!(account::read(&handle).unwrap().cash(), 100.0);
    }

    #[test]
    fn nan_amount_is_not_a_buy() {
        let mut account = Account::new("pool", opened(), 1_000.0);
        let mut pass = Pass {
            projected: &mut account,
            reserve: 0.0,
            allocatable: 1_000.0,
            buys: Vec::new(),
        };
        let bought = pass
            .buy(&SystemId::new("a"), f64::NAN, AllocationPath::Fresh)
            .unwrap();
        assert!(!bought);
        assert!(pass.buys.is_empty());
        assert_eq!(account.cash(), 1_000.0);
    }
}
