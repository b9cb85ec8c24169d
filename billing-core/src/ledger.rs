//! Value-transfer ledger seam
//!
//! The engine never moves value itself; it asks an external ledger to. Every
//! ledger operation returns a `Result`: a failure return and a transport
//! error are treated identically by the engine (there is no exception path),
//! and a failed call must leave ledger state unchanged.

use crate::types::{AccountId, AssetId};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Result type for ledger calls
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Ledger-level failure
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The ledger refused the operation (insufficient funds, no allowance, …)
    #[error("transfer rejected: {0}")]
    Rejected(String),

    /// The ledger could not be reached or answered garbage
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// External value-transfer ledger
///
/// Calls are synchronous and atomic: they either fully succeed or fully fail
/// with no partial application. Retry and timeout policy belong to the
/// implementation, not to the billing engine.
pub trait ValueLedger: Send + Sync {
    /// Available balance of `holder` in `asset`
    fn balance_of(&self, holder: &AccountId, asset: &AssetId) -> LedgerResult<Decimal>;

    /// Amount `spender` is authorized to pull from `holder` in `asset`
    fn authorized_amount(
        &self,
        holder: &AccountId,
        spender: &AccountId,
        asset: &AssetId,
    ) -> LedgerResult<Decimal>;

    /// Draw pre-authorized funds from `from` and credit `to`
    fn pull(
        &self,
        from: &AccountId,
        to: &AccountId,
        asset: &AssetId,
        amount: Decimal,
    ) -> LedgerResult<()>;

    /// Move `amount` out of funds the caller supplied with the operation and
    /// credit `to`; with `refund_excess`, anything above `amount` goes back
    /// to `from`
    fn push(
        &self,
        from: &AccountId,
        to: &AccountId,
        asset: &AssetId,
        amount: Decimal,
        refund_excess: bool,
    ) -> LedgerResult<()>;
}

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    balances: HashMap<(AccountId, AssetId), Decimal>,
    allowances: HashMap<(AccountId, AccountId, AssetId), Decimal>,
}

/// In-memory ledger for tests and demos
///
/// Pulls are gated on the allowance granted to the configured spender (the
/// billing engine's ledger identity) and decrement it, mirroring how an
/// allowance-based ledger behaves.
#[derive(Debug)]
pub struct MemoryLedger {
    spender: AccountId,
    inner: Mutex<MemoryLedgerInner>,
}

impl MemoryLedger {
    /// Create an empty ledger; `spender` is the identity pulls are charged
    /// against
    pub fn new(spender: AccountId) -> Self {
        Self {
            spender,
            inner: Mutex::new(MemoryLedgerInner::default()),
        }
    }

    /// Credit `holder` with `amount` of `asset`
    pub fn credit(&self, holder: &AccountId, asset: &AssetId, amount: Decimal) {
        let mut inner = self.inner.lock();
        *inner
            .balances
            .entry((holder.clone(), asset.clone()))
            .or_insert(Decimal::ZERO) += amount;
    }

    /// Set the allowance `holder` grants the spender for `asset`
    pub fn approve(&self, holder: &AccountId, asset: &AssetId, amount: Decimal) {
        let mut inner = self.inner.lock();
        inner
            .allowances
            .insert((holder.clone(), self.spender.clone(), asset.clone()), amount);
    }

    fn transfer(
        inner: &mut MemoryLedgerInner,
        from: &AccountId,
        to: &AccountId,
        asset: &AssetId,
        amount: Decimal,
    ) -> LedgerResult<()> {
        let from_key = (from.clone(), asset.clone());
        let available = inner
            .balances
            .get(&from_key)
            .copied()
            .unwrap_or(Decimal::ZERO);
        if available < amount {
            return Err(LedgerError::Rejected(format!(
                "insufficient balance: {} < {}",
                available, amount
            )));
        }
        *inner.balances.entry(from_key).or_insert(Decimal::ZERO) -= amount;
        *inner
            .balances
            .entry((to.clone(), asset.clone()))
            .or_insert(Decimal::ZERO) += amount;
        Ok(())
    }
}

impl ValueLedger for MemoryLedger {
    fn balance_of(&self, holder: &AccountId, asset: &AssetId) -> LedgerResult<Decimal> {
        let inner = self.inner.lock();
        Ok(inner
            .balances
            .get(&(holder.clone(), asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    fn authorized_amount(
        &self,
        holder: &AccountId,
        spender: &AccountId,
        asset: &AssetId,
    ) -> LedgerResult<Decimal> {
        let inner = self.inner.lock();
        Ok(inner
            .allowances
            .get(&(holder.clone(), spender.clone(), asset.clone()))
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    fn pull(
        &self,
        from: &AccountId,
        to: &AccountId,
        asset: &AssetId,
        amount: Decimal,
    ) -> LedgerResult<()> {
        let mut inner = self.inner.lock();

        let key = (from.clone(), self.spender.clone(), asset.clone());
        let allowance = inner.allowances.get(&key).copied().unwrap_or(Decimal::ZERO);
        if allowance < amount {
            return Err(LedgerError::Rejected(format!(
                "insufficient allowance: {} < {}",
                allowance, amount
            )));
        }

        Self::transfer(&mut inner, from, to, asset, amount)?;
        *inner.allowances.entry(key).or_insert(Decimal::ZERO) -= amount;
        Ok(())
    }

    fn push(
        &self,
        from: &AccountId,
        to: &AccountId,
        asset: &AssetId,
        amount: Decimal,
        _refund_excess: bool,
    ) -> LedgerResult<()> {
        // Caller-supplied funds are modeled as the caller's balance; any
        // excess simply never leaves it.
        let mut inner = self.inner.lock();
        Self::transfer(&mut inner, from, to, asset, amount)
    }
}
