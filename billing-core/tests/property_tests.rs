//! Property-based tests for billing invariants
//!
//! These tests use proptest to verify critical invariants:
//! - Period ordering: `current_period_end > current_period_start`, always
//! - Fixed-schedule renewal: new period start equals old period end exactly
//! - Pause accounting: resuming extends the period by the paused duration
//! - Pagination: totals are true sizes regardless of the requested page
//! - Order idempotency: one payment per order identifier, ever

use billing_core::{
    AccountId, AssetId, BillingEngine, ChargeReason, Clock, Config, LedgerError, LedgerResult,
    ManualClock, MemoryLedger, OrderId, PlanId, SubscriptionStatus, ValueLedger,
};
use chrono::{Duration, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::sync::Arc;

const DAY: u64 = 86_400;

struct TestEnv {
    engine: BillingEngine,
    ledger: Arc<MemoryLedger>,
    clock: Arc<ManualClock>,
    _dir: tempfile::TempDir,
}

fn merchant() -> AccountId {
    AccountId::new("merchant-1")
}

fn alice() -> AccountId {
    AccountId::new("alice")
}

fn admin() -> AccountId {
    AccountId::new("admin")
}

fn usdc() -> AssetId {
    AssetId::new("USDC")
}

/// Engine with USDC registered, one plan, and a funded, approved subscriber
async fn env_with_plan(amount: Decimal, interval_seconds: u64) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = dir.path().to_path_buf();
    config.snapshot.save_on_shutdown = false;

    let ledger = Arc::new(MemoryLedger::new(config.engine_account()));
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let engine = BillingEngine::open_with(config, ledger.clone(), clock.clone())
        .await
        .unwrap();

    engine.add_asset(admin(), usdc()).await.unwrap();
    engine
        .create_plan(merchant(), PlanId::new("plan"), amount, usdc(), interval_seconds)
        .await
        .unwrap();
    ledger.credit(&alice(), &usdc(), Decimal::from(1_000_000_000u64));
    ledger.approve(&alice(), &usdc(), Decimal::from(1_000_000_000u64));

    TestEnv {
        engine,
        ledger,
        clock,
        _dir: dir,
    }
}

fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1u64..1_000_000u64).prop_map(Decimal::from)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a late renewal anchors at the old period end, advancing by
    /// exactly one interval, and the period stays well-ordered
    #[test]
    fn prop_renewal_anchoring(
        amount in amount_strategy(),
        interval_days in 1u64..120,
        delay_seconds in 0i64..2_000_000,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let interval = interval_days * DAY;
            let env = env_with_plan(amount, interval).await;

            let sub = env
                .engine
                .subscribe(alice(), PlanId::new("plan"), amount)
                .await
                .unwrap();
            let first_end = sub.current_period_end;

            // Charge some time after the due instant.
            env.clock.set(first_end + Duration::seconds(delay_seconds));
            let outcome = env.engine.charge(sub.id).await.unwrap();
            prop_assert!(outcome.success);

            let renewed = env.engine.get_subscription(&sub.id).unwrap();
            prop_assert_eq!(renewed.current_period_start, first_end);
            prop_assert_eq!(
                renewed.current_period_end,
                first_end + Duration::seconds(interval as i64)
            );
            prop_assert!(renewed.current_period_end > renewed.current_period_start);
            prop_assert_eq!(renewed.payment_count, 2);

            env.engine.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: payment count always equals the history length
    #[test]
    fn prop_payment_count_matches_history(charges in 0usize..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let interval = 30 * DAY;
            let env = env_with_plan(Decimal::from(1000), interval).await;

            let sub = env
                .engine
                .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
                .await
                .unwrap();

            for _ in 0..charges {
                env.clock.advance(Duration::seconds(interval as i64));
                let outcome = env.engine.charge(sub.id).await.unwrap();
                prop_assert!(outcome.success);
            }

            let state = env.engine.get_subscription(&sub.id).unwrap();
            let history = env.engine.payment_history(&sub.id, 0, 1000).unwrap();
            prop_assert_eq!(state.payment_count as usize, history.total);

            env.engine.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: resuming extends the period end by exactly the paused time
    /// and clears the deferred-cancel flag
    #[test]
    fn prop_resume_extends_exactly(paused_days in 1i64..365) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let env = env_with_plan(Decimal::from(1000), 30 * DAY).await;

            let sub = env
                .engine
                .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
                .await
                .unwrap();
            let original_end = sub.current_period_end;

            env.engine
                .cancel_subscription(alice(), sub.id, false)
                .await
                .unwrap();
            env.engine.pause_subscription(alice(), sub.id).await.unwrap();
            env.clock.advance(Duration::days(paused_days));
            let resumed = env.engine.resume_subscription(alice(), sub.id).await.unwrap();

            prop_assert_eq!(
                resumed.current_period_end,
                original_end + Duration::days(paused_days)
            );
            prop_assert_eq!(resumed.paused_at, None);
            prop_assert!(!resumed.cancel_at_period_end);
            prop_assert_eq!(resumed.status, SubscriptionStatus::Active);

            env.engine.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: pending-charge pagination reports the true total for any
    /// page, including pages past the end
    #[test]
    fn prop_pending_pagination_totals(
        subscriptions in 1usize..12,
        offset in 0usize..20,
        limit in 1usize..8,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let interval = 30 * DAY;
            let env = env_with_plan(Decimal::from(100), interval).await;

            for _ in 0..subscriptions {
                env.engine
                    .subscribe(alice(), PlanId::new("plan"), Decimal::from(100))
                    .await
                    .unwrap();
            }
            env.clock.advance(Duration::seconds(interval as i64));

            let page = env.engine.pending_charges(offset, limit);
            prop_assert_eq!(page.total, subscriptions);
            let expected = subscriptions.saturating_sub(offset).min(limit);
            prop_assert_eq!(page.items.len(), expected);

            // Items are ordered by due time, then id.
            let due: Vec<_> = page.items.iter().map(|p| (p.due_at, p.subscription_id)).collect();
            let mut sorted = due.clone();
            sorted.sort();
            prop_assert_eq!(due, sorted);

            env.engine.shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: an order identifier pays out exactly once
    #[test]
    fn prop_one_payment_per_order(amount in amount_strategy(), attempts in 2usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let env = env_with_plan(Decimal::from(1000), 30 * DAY).await;
            let order = OrderId::new("order-1");

            let mut successes = 0;
            for _ in 0..attempts {
                let result = env
                    .engine
                    .pay(alice(), order.clone(), amount, usdc(), merchant(), amount)
                    .await;
                if result.is_ok() {
                    successes += 1;
                }
            }

            prop_assert_eq!(successes, 1);
            // Exactly one payment's worth moved.
            prop_assert_eq!(
                env.ledger.balance_of(&merchant(), &usdc()).unwrap(),
                amount
            );
            let recorded = env.engine.get_payment(&order).unwrap();
            prop_assert_eq!(recorded.amount, amount);

            env.engine.shutdown().await.unwrap();
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    const MONTH: u64 = 2_592_000;

    #[tokio::test]
    async fn test_subscription_lifecycle_scenario() {
        let env = env_with_plan(Decimal::from(1000), MONTH).await;
        let t0 = env.clock.now();

        // Subscribe with sufficient funds: Active, one payment, one period.
        let s1 = env
            .engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();
        assert_eq!(s1.status, SubscriptionStatus::Active);
        assert_eq!(s1.payment_count, 1);
        assert_eq!(s1.current_period_start, t0);
        assert_eq!(s1.current_period_end, t0 + Duration::seconds(MONTH as i64));

        // A second subscriber, paused.
        let s2 = env
            .engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();
        env.engine.pause_subscription(alice(), s2.id).await.unwrap();

        // At t0 + interval: the charge succeeds and advances the period.
        env.clock.set(t0 + Duration::seconds(MONTH as i64));
        let outcome = env.engine.charge(s1.id).await.unwrap();
        assert!(outcome.success);
        let renewed = env.engine.get_subscription(&s1.id).unwrap();
        assert_eq!(renewed.payment_count, 2);
        assert_eq!(renewed.current_period_start, t0 + Duration::seconds(MONTH as i64));
        assert_eq!(
            renewed.current_period_end,
            t0 + Duration::seconds(2 * MONTH as i64)
        );

        // Immediately re-charging: NotDue.
        let again = env.engine.charge(s1.id).await.unwrap();
        assert!(!again.success);
        assert_eq!(again.reason, ChargeReason::NotDue);

        // Batch with an unknown id and the paused subscription: per-item
        // independence, input order, no early abort.
        let unknown = billing_core::SubscriptionId::generate();
        let results = env
            .engine
            .batch_charge(vec![s1.id, unknown, s2.id])
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].reason, Some(ChargeReason::NotDue));
        assert!(!results[1].success && results[1].reason.is_none());
        assert_eq!(results[2].reason, Some(ChargeReason::Paused));

        env.engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_trial_charges_nothing_until_due() {
        let env = env_with_plan(Decimal::from(1000), MONTH).await;
        let merchant_before = env.ledger.balance_of(&merchant(), &usdc()).unwrap();

        let sub = env
            .engine
            .subscribe_with_trial(alice(), PlanId::new("plan"), 14)
            .await
            .unwrap();
        assert_eq!(sub.payment_count, 0);
        assert_eq!(
            env.ledger.balance_of(&merchant(), &usdc()).unwrap(),
            merchant_before
        );

        // First real charge happens at trial end, for a full interval.
        env.clock.advance(Duration::days(14));
        let outcome = env.engine.charge(sub.id).await.unwrap();
        assert!(outcome.success);

        let charged = env.engine.get_subscription(&sub.id).unwrap();
        assert_eq!(charged.payment_count, 1);
        assert_eq!(
            charged.current_period_end,
            sub.current_period_end + Duration::seconds(MONTH as i64)
        );

        env.engine.shutdown().await.unwrap();
    }

    /// Ledger whose pulls always fail, simulating value disappearing between
    /// the eligibility check and the transfer
    struct PullRejectingLedger(Arc<MemoryLedger>);

    impl ValueLedger for PullRejectingLedger {
        fn balance_of(&self, holder: &AccountId, asset: &AssetId) -> LedgerResult<Decimal> {
            self.0.balance_of(holder, asset)
        }
        fn authorized_amount(
            &self,
            holder: &AccountId,
            spender: &AccountId,
            asset: &AssetId,
        ) -> LedgerResult<Decimal> {
            self.0.authorized_amount(holder, spender, asset)
        }
        fn pull(
            &self,
            _from: &AccountId,
            _to: &AccountId,
            _asset: &AssetId,
            _amount: Decimal,
        ) -> LedgerResult<()> {
            Err(LedgerError::Rejected("funds moved away".to_string()))
        }
        fn push(
            &self,
            from: &AccountId,
            to: &AccountId,
            asset: &AssetId,
            amount: Decimal,
            refund_excess: bool,
        ) -> LedgerResult<()> {
            self.0.push(from, to, asset, amount, refund_excess)
        }
    }

    #[tokio::test]
    async fn test_expired_subscription_requires_resubscription() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();
        config.snapshot.save_on_shutdown = false;

        let memory = Arc::new(MemoryLedger::new(config.engine_account()));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = BillingEngine::open_with(
            config,
            Arc::new(PullRejectingLedger(memory.clone())),
            clock.clone(),
        )
        .await
        .unwrap();

        engine.add_asset(admin(), usdc()).await.unwrap();
        engine
            .create_plan(merchant(), PlanId::new("plan"), Decimal::from(1000), usdc(), MONTH)
            .await
            .unwrap();
        memory.credit(&alice(), &usdc(), Decimal::from(100_000));
        memory.approve(&alice(), &usdc(), Decimal::from(100_000));

        let sub = engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();

        // Eligibility passes, the pull itself fails: defined outcome is
        // Expired with period fields untouched.
        clock.advance(Duration::seconds(MONTH as i64));
        let outcome = engine.charge(sub.id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.reason, ChargeReason::InsufficientBalance);

        let expired = engine.get_subscription(&sub.id).unwrap();
        assert_eq!(expired.status, SubscriptionStatus::Expired);
        assert_eq!(expired.current_period_end, sub.current_period_end);

        // No self-heal: the payer starts over with a new subscription.
        assert!(engine.resume_subscription(alice(), sub.id).await.is_err());
        let replacement = engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();
        assert_ne!(replacement.id, sub.id);
        assert_eq!(replacement.status, SubscriptionStatus::Active);

        engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_refund_is_not_capped_by_charges() {
        let env = env_with_plan(Decimal::from(1000), MONTH).await;
        let sub = env
            .engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();

        // The merchant refunds more than was ever charged; the engine does
        // not second-guess it as long as the ledger push succeeds.
        env.ledger.credit(&merchant(), &usdc(), Decimal::from(10_000));
        env.engine
            .refund(merchant(), sub.id, Decimal::from(5000), None)
            .await
            .unwrap();

        let alice_balance = env.ledger.balance_of(&alice(), &usdc()).unwrap();
        assert_eq!(
            alice_balance,
            Decimal::from(1_000_000_000u64) - Decimal::from(1000) + Decimal::from(5000)
        );

        env.engine.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_payment_history_pages_are_stable() {
        let env = env_with_plan(Decimal::from(1000), 30 * DAY).await;
        let sub = env
            .engine
            .subscribe(alice(), PlanId::new("plan"), Decimal::from(1000))
            .await
            .unwrap();

        for _ in 0..4 {
            env.clock.advance(Duration::days(30));
            assert!(env.engine.charge(sub.id).await.unwrap().success);
        }

        // 5 records; every page reports the same total.
        let first = env.engine.payment_history(&sub.id, 0, 2).unwrap();
        assert_eq!((first.items.len(), first.total), (2, 5));
        let middle = env.engine.payment_history(&sub.id, 2, 2).unwrap();
        assert_eq!((middle.items.len(), middle.total), (2, 5));
        let past = env.engine.payment_history(&sub.id, 40, 2).unwrap();
        assert_eq!((past.items.len(), past.total), (0, 5));

        // Oldest first, contiguous periods.
        assert!(first.items[0].period_start < first.items[1].period_start);
        assert_eq!(first.items[1].period_start, first.items[0].period_end);

        env.engine.shutdown().await.unwrap();
    }
}
