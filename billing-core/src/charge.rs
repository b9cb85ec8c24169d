//! Charge eligibility evaluation
//!
//! The evaluation order is fixed and load-bearing: callers and events expose
//! the *first* matching reason, so reordering the checks changes observable
//! behavior. Keep the order exactly as written.

use crate::ledger::ValueLedger;
use crate::types::{AccountId, AssetId, ChargeReason, Plan, Subscription, SubscriptionStatus};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Evaluate whether a renewal charge can proceed right now.
///
/// Order (first match wins):
/// 1. plan inactive
/// 2. subscription terminal (Canceled or Expired)
/// 3. subscription paused
/// 4. period not over yet
/// 5. ledger balance below the plan amount
/// 6. authorization below the plan amount
/// 7. success
///
/// A ledger error during the balance or authorization read counts as the
/// corresponding failure: the engine never distinguishes a ledger exception
/// from a negative answer.
pub(crate) fn evaluate_eligibility(
    plan: &Plan,
    sub: &Subscription,
    ledger: &dyn ValueLedger,
    spender: &AccountId,
    native_asset: &AssetId,
    now: DateTime<Utc>,
) -> ChargeReason {
    if !plan.active {
        return ChargeReason::PlanInactive;
    }
    if sub.status.is_terminal() {
        return ChargeReason::Canceled;
    }
    if sub.status == SubscriptionStatus::Paused {
        return ChargeReason::Paused;
    }
    if now < sub.current_period_end {
        return ChargeReason::NotDue;
    }

    let balance = ledger
        .balance_of(&sub.subscriber, &plan.asset)
        .unwrap_or(Decimal::ZERO);
    if balance < plan.amount {
        return ChargeReason::InsufficientBalance;
    }

    // The native asset has no authorization concept: a pull can never be
    // pre-approved, so native-asset plans cannot auto-renew and the payer
    // has to subscribe again.
    if plan.asset == *native_asset {
        return ChargeReason::NotApproved;
    }
    let authorized = ledger
        .authorized_amount(&sub.subscriber, spender, &plan.asset)
        .unwrap_or(Decimal::ZERO);
    if authorized < plan.amount {
        return ChargeReason::NotApproved;
    }

    ChargeReason::Success
}
