//! Billing core: composition and operations
//!
//! `BillingCore` owns the four entity collections and executes every
//! operation synchronously against them. It is deliberately unaware of
//! concurrency: the actor layer serializes mutating calls, and each call
//! receives the operation's single `now` sample from above.
//!
//! Write discipline: every operation validates first and mutates last, so a
//! rejection (validation, authorization, not-found, state) leaves no partial
//! effects. A ledger failure during `subscribe`/`pay`/`refund` aborts before
//! any engine state was touched; during renewal it commits the defined
//! Expired transition and nothing else.

use crate::charge::evaluate_eligibility;
use crate::config::Config;
use crate::events::*;
use crate::ledger::ValueLedger;
use crate::metrics::Metrics;
use crate::payments::PaymentLog;
use crate::plans::PlanStore;
use crate::registry::AssetRegistry;
use crate::storage::Snapshot;
use crate::subscriptions::SubscriptionBook;
use crate::types::*;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use event_bus::EventBus;
use rust_decimal::Decimal;
use std::sync::Arc;

/// The billing engine's state and operations
pub struct BillingCore {
    config: Config,
    registry: AssetRegistry,
    plans: PlanStore,
    subscriptions: SubscriptionBook,
    payments: PaymentLog,
    ledger: Arc<dyn ValueLedger>,
    events: EventBus,
    metrics: Metrics,
    administrator: AccountId,
    engine_account: AccountId,
    native_asset: AssetId,
}

impl BillingCore {
    /// Create an empty core
    pub fn new(
        config: Config,
        ledger: Arc<dyn ValueLedger>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let administrator = config.administrator();
        let engine_account = config.engine_account();
        let native_asset = config.native_asset();
        Self {
            registry: AssetRegistry::new(native_asset.clone()),
            plans: PlanStore::new(),
            subscriptions: SubscriptionBook::new(),
            payments: PaymentLog::new(),
            config,
            ledger,
            events,
            metrics,
            administrator,
            engine_account,
            native_asset,
        }
    }

    /// Rebuild a core from a snapshot
    pub fn from_snapshot(
        config: Config,
        snapshot: Snapshot,
        ledger: Arc<dyn ValueLedger>,
        events: EventBus,
        metrics: Metrics,
    ) -> Self {
        let administrator = config.administrator();
        let engine_account = config.engine_account();
        let native_asset = config.native_asset();

        let subscriptions = SubscriptionBook::restore(
            snapshot.subscriptions,
            snapshot.history,
            snapshot.subscriptions_created,
        );

        let core = Self {
            registry: AssetRegistry::restore(native_asset.clone(), snapshot.assets),
            plans: PlanStore::restore(snapshot.plans),
            payments: PaymentLog::restore(snapshot.orders),
            subscriptions,
            config,
            ledger,
            events,
            metrics,
            administrator,
            engine_account,
            native_asset,
        };

        let active = core
            .subscriptions
            .due_ids(DateTime::<Utc>::MAX_UTC, 0, usize::MAX)
            .1;
        core.metrics.active_subscriptions.set(active as i64);
        core
    }

    /// Serialize the current state
    pub fn to_snapshot(&self) -> Snapshot {
        let (subscriptions, history, subscriptions_created) = self.subscriptions.to_parts();
        Snapshot {
            assets: self.registry.list(),
            plans: self.plans.all_sorted(),
            subscriptions,
            history,
            orders: self.payments.all_sorted(),
            subscriptions_created,
        }
    }

    // ── Asset registry ───────────────────────────────────────────────────

    /// Register an asset (administrator only)
    pub fn add_asset(&mut self, caller: &AccountId, asset: AssetId, now: DateTime<Utc>) -> Result<()> {
        self.require_administrator(caller)?;
        self.registry.add(asset.clone())?;
        tracing::info!("Asset registered: {}", asset);
        self.emit(BillingEvent::AssetAdded(AssetAddedEvent { asset }), now);
        Ok(())
    }

    /// Deregister an asset (administrator only; never the native asset)
    pub fn remove_asset(
        &mut self,
        caller: &AccountId,
        asset: &AssetId,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.require_administrator(caller)?;
        self.registry.remove(asset)?;
        tracing::info!("Asset deregistered: {}", asset);
        self.emit(
            BillingEvent::AssetRemoved(AssetRemovedEvent {
                asset: asset.clone(),
            }),
            now,
        );
        Ok(())
    }

    /// Whether an asset is accepted
    pub fn is_asset_supported(&self, asset: &AssetId) -> bool {
        self.registry.is_supported(asset)
    }

    /// Accepted assets in insertion order
    pub fn supported_assets(&self) -> Vec<AssetId> {
        self.registry.list()
    }

    // ── Plans ────────────────────────────────────────────────────────────

    /// Create a plan owned by `merchant`
    pub fn create_plan(
        &mut self,
        merchant: AccountId,
        id: PlanId,
        amount: Decimal,
        asset: AssetId,
        interval_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Plan> {
        if !self.registry.is_supported(&asset) {
            return Err(Error::Validation(format!("asset {} not supported", asset)));
        }
        let plan = self.plans.create(
            id,
            amount,
            asset,
            interval_seconds,
            merchant,
            self.config.charging.min_interval_seconds,
            now,
        )?;
        tracing::info!(
            "Plan created: {} ({} {} every {}s, merchant {})",
            plan.id,
            plan.amount,
            plan.asset,
            plan.interval_seconds,
            plan.merchant
        );
        self.emit(
            BillingEvent::PlanCreated(PlanCreatedEvent {
                plan_id: plan.id.clone(),
                merchant: plan.merchant.clone(),
                amount: plan.amount,
                asset: plan.asset.clone(),
                interval_seconds: plan.interval_seconds,
            }),
            now,
        );
        Ok(plan)
    }

    /// Toggle a plan's active flag (plan merchant or administrator)
    pub fn update_plan(
        &mut self,
        caller: &AccountId,
        id: &PlanId,
        active: bool,
        now: DateTime<Utc>,
    ) -> Result<Plan> {
        let plan = self.plans.get(id)?;
        if *caller != plan.merchant && *caller != self.administrator {
            return Err(Error::Unauthorized(format!(
                "{} may not update plan {}",
                caller, id
            )));
        }
        let plan = self.plans.set_active(id, active)?;
        tracing::info!("Plan updated: {} active={}", plan.id, plan.active);
        self.emit(
            BillingEvent::PlanUpdated(PlanUpdatedEvent {
                plan_id: plan.id.clone(),
                active: plan.active,
            }),
            now,
        );
        Ok(plan)
    }

    /// Look up a plan
    pub fn get_plan(&self, id: &PlanId) -> Result<Plan> {
        self.plans.get(id).cloned()
    }

    /// Whether a plan exists
    pub fn plan_exists(&self, id: &PlanId) -> bool {
        self.plans.exists(id)
    }

    // ── Subscription lifecycle ───────────────────────────────────────────

    /// Subscribe to a plan with an immediate caller-funded first charge
    ///
    /// `provided` is the value the caller supplied with the call; it must
    /// cover the plan amount. Excess is returned by the ledger. Underpayment
    /// or a push failure aborts the whole operation: no subscription exists
    /// afterwards.
    pub fn subscribe(
        &mut self,
        subscriber: AccountId,
        plan_id: &PlanId,
        provided: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let plan = self.subscribable_plan(plan_id)?;

        if provided < plan.amount {
            return Err(Error::Transfer(format!(
                "provided {} does not cover plan amount {}",
                provided, plan.amount
            )));
        }
        self.ledger
            .push(&subscriber, &plan.merchant, &plan.asset, plan.amount, true)
            .map_err(Error::from)?;

        let record = PaymentRecord {
            amount: plan.amount,
            timestamp: now,
            period_start: now,
            period_end: now + plan.interval(),
        };
        let sub = self.build_subscription(&plan, subscriber, now, record.period_end, 1);
        self.subscriptions.insert(sub.clone(), Some(record.clone()));
        self.plans.increment_subscribers(plan_id)?;
        self.metrics.subscriptions_created_total.inc();
        self.metrics.active_subscriptions.inc();

        tracing::info!(
            "Subscription created: {} plan {} subscriber {}",
            sub.id,
            plan.id,
            sub.subscriber
        );
        self.emit(
            BillingEvent::SubscriptionCreated(SubscriptionCreatedEvent {
                subscription_id: sub.id,
                plan_id: plan.id.clone(),
                subscriber: sub.subscriber.clone(),
                trial: false,
            }),
            now,
        );
        self.emit(
            BillingEvent::PaymentExecuted(PaymentExecutedEvent {
                subscription_id: sub.id,
                amount: record.amount,
                period_start: record.period_start,
                period_end: record.period_end,
            }),
            now,
        );
        Ok(sub)
    }

    /// Subscribe with a trial period: no charge, no record, payment count 0
    pub fn subscribe_with_trial(
        &mut self,
        subscriber: AccountId,
        plan_id: &PlanId,
        trial_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let plan = self.subscribable_plan(plan_id)?;
        if trial_days == 0 {
            return Err(Error::Validation(
                "trial must be at least one day".to_string(),
            ));
        }

        let period_end = now + Duration::days(i64::from(trial_days));
        let sub = self.build_subscription(&plan, subscriber, now, period_end, 0);
        self.subscriptions.insert(sub.clone(), None);
        self.plans.increment_subscribers(plan_id)?;
        self.metrics.subscriptions_created_total.inc();
        self.metrics.active_subscriptions.inc();

        tracing::info!(
            "Trial subscription created: {} plan {} ({} days)",
            sub.id,
            plan.id,
            trial_days
        );
        self.emit(
            BillingEvent::SubscriptionCreated(SubscriptionCreatedEvent {
                subscription_id: sub.id,
                plan_id: plan.id.clone(),
                subscriber: sub.subscriber.clone(),
                trial: true,
            }),
            now,
        );
        Ok(sub)
    }

    /// Pause an Active subscription (subscriber or plan merchant)
    pub fn pause_subscription(
        &mut self,
        caller: &AccountId,
        id: &SubscriptionId,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let (subscriber, merchant) = self.parties(id)?;
        if *caller != subscriber && *caller != merchant {
            return Err(Error::Unauthorized(format!(
                "{} may not pause subscription {}",
                caller, id
            )));
        }

        let sub = self.subscriptions.pause(id, now)?;
        self.metrics.active_subscriptions.dec();
        self.emit_status_change(id, SubscriptionStatus::Active, SubscriptionStatus::Paused, now);
        Ok(sub)
    }

    /// Resume a Paused subscription (subscriber only)
    pub fn resume_subscription(
        &mut self,
        caller: &AccountId,
        id: &SubscriptionId,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let (subscriber, _) = self.parties(id)?;
        if *caller != subscriber {
            return Err(Error::Unauthorized(format!(
                "only the subscriber may resume subscription {}",
                id
            )));
        }

        let sub = self.subscriptions.resume(id, now)?;
        self.metrics.active_subscriptions.inc();
        self.emit_status_change(id, SubscriptionStatus::Paused, SubscriptionStatus::Active, now);
        Ok(sub)
    }

    /// Cancel a subscription (subscriber or plan merchant)
    ///
    /// Immediate cancellation cuts the paid period short at `now`. Deferred
    /// cancellation only sets the flag; the transition happens at the next
    /// charge attempt and no further charge is taken.
    pub fn cancel_subscription(
        &mut self,
        caller: &AccountId,
        id: &SubscriptionId,
        immediately: bool,
        now: DateTime<Utc>,
    ) -> Result<Subscription> {
        let (subscriber, merchant) = self.parties(id)?;
        if *caller != subscriber && *caller != merchant {
            return Err(Error::Unauthorized(format!(
                "{} may not cancel subscription {}",
                caller, id
            )));
        }

        if immediately {
            let old = self.subscriptions.get(id)?.status;
            let sub = self.subscriptions.cancel_now(id, now)?;
            if old == SubscriptionStatus::Active {
                self.metrics.active_subscriptions.dec();
            }
            self.emit(
                BillingEvent::SubscriptionCanceled(SubscriptionCanceledEvent {
                    subscription_id: *id,
                    immediately: true,
                }),
                now,
            );
            self.emit_status_change(id, old, SubscriptionStatus::Canceled, now);
            Ok(sub)
        } else {
            let sub = self.subscriptions.request_cancel(id)?;
            self.emit(
                BillingEvent::SubscriptionCanceled(SubscriptionCanceledEvent {
                    subscription_id: *id,
                    immediately: false,
                }),
                now,
            );
            Ok(sub)
        }
    }

    /// Look up a subscription
    pub fn get_subscription(&self, id: &SubscriptionId) -> Result<Subscription> {
        self.subscriptions.get(id).cloned()
    }

    /// Whether a subscription exists
    pub fn subscription_exists(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.contains(id)
    }

    /// Subscriptions of one user, in creation order
    pub fn subscriptions_by_user(&self, user: &AccountId) -> Vec<Subscription> {
        self.subscriptions.by_user(user)
    }

    /// Subscriptions of one plan, paged
    pub fn subscriptions_by_plan(
        &self,
        plan_id: &PlanId,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Subscription>> {
        self.plans.get(plan_id)?;
        Ok(self.subscriptions.by_plan_page(plan_id, offset, limit))
    }

    /// Total subscriptions ever created
    pub fn subscription_count(&self) -> u64 {
        self.subscriptions.created_total()
    }

    // ── Charging ─────────────────────────────────────────────────────────

    /// Evaluate eligibility without side effects
    pub fn can_charge(&self, id: &SubscriptionId, now: DateTime<Utc>) -> Result<ChargeEligibility> {
        let sub = self.subscriptions.get(id)?;
        let plan = self.plans.get(&sub.plan_id)?;
        let reason = evaluate_eligibility(
            plan,
            sub,
            self.ledger.as_ref(),
            &self.engine_account,
            &self.native_asset,
            now,
        );
        Ok(ChargeEligibility {
            eligible: reason == ChargeReason::Success,
            reason,
        })
    }

    /// Attempt one renewal charge
    pub fn charge(&mut self, id: &SubscriptionId, now: DateTime<Utc>) -> Result<ChargeOutcome> {
        let sub = self.subscriptions.get(id)?.clone();
        let plan = self.plans.get(&sub.plan_id)?.clone();

        let reason = evaluate_eligibility(
            &plan,
            &sub,
            self.ledger.as_ref(),
            &self.engine_account,
            &self.native_asset,
            now,
        );
        if reason != ChargeReason::Success {
            self.metrics.record_charge_failure(reason.as_str());
            self.emit(
                BillingEvent::PaymentFailed(PaymentFailedEvent {
                    subscription_id: *id,
                    reason,
                }),
                now,
            );
            return Ok(ChargeOutcome {
                success: false,
                reason,
            });
        }

        // Deferred cancellation completes here, instead of a charge.
        if sub.cancel_at_period_end {
            self.subscriptions.cancel_deferred(id)?;
            self.metrics.active_subscriptions.dec();
            self.emit_status_change(id, SubscriptionStatus::Active, SubscriptionStatus::Canceled, now);
            return Ok(ChargeOutcome {
                success: false,
                reason: ChargeReason::Canceled,
            });
        }

        match self
            .ledger
            .pull(&sub.subscriber, &plan.merchant, &plan.asset, plan.amount)
        {
            Err(err) => {
                // The defined outcome of a failed pull: the subscription
                // expires, period fields stay as they were.
                tracing::warn!("Renewal pull failed for {}: {}", id, err);
                self.subscriptions.expire(id)?;
                self.metrics.active_subscriptions.dec();
                self.metrics
                    .record_charge_failure(ChargeReason::InsufficientBalance.as_str());
                self.emit_status_change(
                    id,
                    SubscriptionStatus::Active,
                    SubscriptionStatus::Expired,
                    now,
                );
                self.emit(
                    BillingEvent::PaymentFailed(PaymentFailedEvent {
                        subscription_id: *id,
                        reason: ChargeReason::InsufficientBalance,
                    }),
                    now,
                );
                Ok(ChargeOutcome {
                    success: false,
                    reason: ChargeReason::InsufficientBalance,
                })
            }
            Ok(()) => {
                let (advanced, record) =
                    self.subscriptions
                        .advance_period(id, plan.interval(), plan.amount, now)?;
                self.metrics.record_charge();
                tracing::info!(
                    "Charged subscription {}: {} {} for [{}, {})",
                    id,
                    record.amount,
                    plan.asset,
                    record.period_start,
                    record.period_end
                );
                self.emit(
                    BillingEvent::PaymentExecuted(PaymentExecutedEvent {
                        subscription_id: advanced.id,
                        amount: record.amount,
                        period_start: record.period_start,
                        period_end: record.period_end,
                    }),
                    now,
                );
                Ok(ChargeOutcome {
                    success: true,
                    reason: ChargeReason::Success,
                })
            }
        }
    }

    /// Charge a batch of subscriptions, independently and in order
    ///
    /// One `now` sample covers the whole batch. Unknown identifiers yield a
    /// failed item with no side effects; one item's outcome never affects
    /// another's.
    pub fn batch_charge(
        &mut self,
        ids: &[SubscriptionId],
        now: DateTime<Utc>,
    ) -> Result<Vec<BatchChargeResult>> {
        let max = self.config.charging.max_batch_size;
        if ids.len() > max {
            return Err(Error::Validation(format!(
                "batch of {} exceeds the maximum of {}",
                ids.len(),
                max
            )));
        }
        self.metrics.record_batch(ids.len());

        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            if !self.subscriptions.contains(id) {
                results.push(BatchChargeResult {
                    subscription_id: *id,
                    success: false,
                    reason: None,
                });
                continue;
            }
            match self.charge(id, now) {
                Ok(outcome) => results.push(BatchChargeResult {
                    subscription_id: *id,
                    success: outcome.success,
                    reason: Some(outcome.reason),
                }),
                Err(err) => {
                    tracing::warn!("Batch item {} failed: {}", id, err);
                    results.push(BatchChargeResult {
                        subscription_id: *id,
                        success: false,
                        reason: None,
                    });
                }
            }
        }
        Ok(results)
    }

    /// Due Active subscriptions, paged and ordered by (due time, id)
    pub fn pending_charges(
        &self,
        now: DateTime<Utc>,
        offset: usize,
        limit: usize,
    ) -> Page<PendingCharge> {
        let (ids, total) = self.subscriptions.due_ids(now, offset, limit);
        let items = ids
            .into_iter()
            .map(|id| {
                let sub = self.subscriptions.get(&id).expect("indexed id exists");
                let plan = self.plans.get(&sub.plan_id).expect("plan of a subscription exists");
                PendingCharge {
                    subscription_id: id,
                    plan_id: plan.id.clone(),
                    subscriber: sub.subscriber.clone(),
                    merchant: plan.merchant.clone(),
                    amount: plan.amount,
                    asset: plan.asset.clone(),
                    due_at: sub.current_period_end,
                }
            })
            .collect();
        Page {
            items,
            total,
            offset,
        }
    }

    /// Payment history of one subscription, paged, oldest first
    pub fn payment_history(
        &self,
        id: &SubscriptionId,
        offset: usize,
        limit: usize,
    ) -> Result<Page<PaymentRecord>> {
        self.subscriptions.history_page(id, offset, limit)
    }

    // ── One-time payments & refunds ──────────────────────────────────────

    /// Execute a one-time caller-funded payment keyed by `order_id`
    #[allow(clippy::too_many_arguments)]
    pub fn pay(
        &mut self,
        payer: AccountId,
        order_id: OrderId,
        amount: Decimal,
        asset: AssetId,
        merchant: AccountId,
        provided: Decimal,
        now: DateTime<Utc>,
    ) -> Result<OneTimePayment> {
        self.payments.check_unused(&order_id)?;
        validate_amount(amount, "payment amount")?;
        if merchant.is_empty() {
            return Err(Error::Validation("merchant must not be empty".to_string()));
        }
        if !self.registry.is_supported(&asset) {
            return Err(Error::Validation(format!("asset {} not supported", asset)));
        }
        if provided < amount {
            return Err(Error::Transfer(format!(
                "provided {} does not cover amount {}",
                provided, amount
            )));
        }

        self.ledger
            .push(&payer, &merchant, &asset, amount, true)
            .map_err(Error::from)?;

        let payment = OneTimePayment {
            order_id: order_id.clone(),
            payer,
            merchant,
            amount,
            asset,
            timestamp: now,
            paid: true,
        };
        self.payments.record(payment.clone())?;
        self.metrics.one_time_payments_total.inc();

        tracing::info!("Payment received: order {} amount {}", order_id, amount);
        self.emit(
            BillingEvent::PaymentReceived(PaymentReceivedEvent {
                order_id,
                payer: payment.payer.clone(),
                merchant: payment.merchant.clone(),
                amount,
            }),
            now,
        );
        Ok(payment)
    }

    /// Look up a one-time payment
    pub fn get_payment(&self, order_id: &OrderId) -> Result<OneTimePayment> {
        self.payments.get(order_id).cloned()
    }

    /// Merchant-funded refund against a subscription
    ///
    /// `to` defaults to the subscriber. The amount is not checked against
    /// cumulative charges; the plan merchant is trusted.
    pub fn refund(
        &mut self,
        caller: &AccountId,
        id: &SubscriptionId,
        amount: Decimal,
        to: Option<AccountId>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let sub = self.subscriptions.get(id)?.clone();
        let plan = self.plans.get(&sub.plan_id)?.clone();
        if *caller != plan.merchant {
            return Err(Error::Unauthorized(format!(
                "only the plan merchant may refund subscription {}",
                id
            )));
        }
        validate_amount(amount, "refund amount")?;

        let recipient = to.unwrap_or(sub.subscriber);
        self.ledger
            .push(&plan.merchant, &recipient, &plan.asset, amount, true)
            .map_err(Error::from)?;
        self.metrics.refunds_total.inc();

        tracing::info!("Refunded {} to {} for subscription {}", amount, recipient, id);
        self.emit(
            BillingEvent::Refunded(RefundedEvent {
                subscription_id: *id,
                to: recipient,
                amount,
            }),
            now,
        );
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn require_administrator(&self, caller: &AccountId) -> Result<()> {
        if *caller != self.administrator {
            return Err(Error::Unauthorized(format!(
                "{} is not the administrator",
                caller
            )));
        }
        Ok(())
    }

    /// Plan lookup for enrollment: must exist, be active, and its asset must
    /// still be registered
    fn subscribable_plan(&self, plan_id: &PlanId) -> Result<Plan> {
        let plan = self.plans.get(plan_id)?.clone();
        if !plan.active {
            return Err(Error::InvalidState(format!("plan {} is not active", plan_id)));
        }
        if !self.registry.is_supported(&plan.asset) {
            return Err(Error::Validation(format!(
                "asset {} of plan {} is no longer supported",
                plan.asset, plan_id
            )));
        }
        Ok(plan)
    }

    fn build_subscription(
        &self,
        plan: &Plan,
        subscriber: AccountId,
        now: DateTime<Utc>,
        period_end: DateTime<Utc>,
        payment_count: u64,
    ) -> Subscription {
        Subscription {
            id: SubscriptionId::generate(),
            plan_id: plan.id.clone(),
            subscriber,
            status: SubscriptionStatus::Active,
            started_at: now,
            current_period_start: now,
            current_period_end: period_end,
            cancel_at_period_end: false,
            paused_at: None,
            payment_count,
        }
    }

    fn emit(&self, event: BillingEvent, now: DateTime<Utc>) {
        self.events.publish(event.into_envelope(now));
    }

    fn emit_status_change(
        &self,
        id: &SubscriptionId,
        old: SubscriptionStatus,
        new: SubscriptionStatus,
        now: DateTime<Utc>,
    ) {
        self.emit(
            BillingEvent::SubscriptionStatusChanged(SubscriptionStatusChangedEvent {
                subscription_id: *id,
                old,
                new,
            }),
            now,
        );
    }

    fn parties(&self, id: &SubscriptionId) -> Result<(AccountId, AccountId)> {
        let sub = self.subscriptions.get(id)?;
        let plan = self.plans.get(&sub.plan_id)?;
        Ok((sub.subscriber.clone(), plan.merchant.clone()))
    }
}
