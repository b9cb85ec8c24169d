//! Main billing engine orchestration layer
//!
//! Ties together the core state, the single-writer actor, the event stream,
//! snapshot persistence, and metrics into a high-level API.
//!
//! Mutating calls go through the actor mailbox; read-only queries take the
//! state read lock directly and run concurrently with each other, always
//! seeing fully applied operations.
//!
//! # Example
//!
//! ```no_run
//! use billing_core::{BillingEngine, Config, MemoryLedger};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> billing_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Arc::new(MemoryLedger::new(config.engine_account()));
//!     let engine = BillingEngine::open(config, ledger).await?;
//!
//!     // let plan = engine.create_plan(...).await?;
//!     engine.shutdown().await?;
//!     Ok(())
//! }
//! ```

use crate::actor::{spawn_billing_actor, BillingHandle};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::core::BillingCore;
use crate::ledger::ValueLedger;
use crate::metrics::Metrics;
use crate::storage::SnapshotStore;
use crate::types::*;
use crate::Result;
use event_bus::{EventBus, EventSubscriber};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Main billing engine interface
pub struct BillingEngine {
    /// Actor handle for mutating operations
    handle: BillingHandle,

    /// Shared state (for direct reads)
    core: Arc<RwLock<BillingCore>>,

    /// Per-operation time source
    clock: Arc<dyn Clock>,

    /// Event stream
    events: EventBus,

    /// Metrics collector
    metrics: Metrics,
}

impl BillingEngine {
    /// Open the engine with the system clock
    pub async fn open(config: Config, ledger: Arc<dyn ValueLedger>) -> Result<Self> {
        Self::open_with(config, ledger, Arc::new(SystemClock)).await
    }

    /// Open the engine with an explicit clock
    pub async fn open_with(
        config: Config,
        ledger: Arc<dyn ValueLedger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let events = EventBus::new(config.events.channel_capacity);
        let metrics = Metrics::new()
            .map_err(|e| crate::Error::Config(format!("metrics registration failed: {}", e)))?;

        let store = SnapshotStore::open(&config.data_dir, &config.snapshot.file_name)?;
        let core = match store.load()? {
            Some(snapshot) => {
                tracing::info!("Restoring billing state from {}", store.path().display());
                BillingCore::from_snapshot(
                    config.clone(),
                    snapshot,
                    ledger,
                    events.clone(),
                    metrics.clone(),
                )
            }
            None => BillingCore::new(config.clone(), ledger, events.clone(), metrics.clone()),
        };
        let core = Arc::new(RwLock::new(core));

        let handle = spawn_billing_actor(
            core.clone(),
            clock.clone(),
            Some(store),
            config.snapshot.save_on_shutdown,
            config.actor.mailbox_capacity,
        );

        Ok(Self {
            handle,
            core,
            clock,
            events,
            metrics,
        })
    }

    // ── Asset registry ───────────────────────────────────────────────────

    /// Register an asset (administrator only)
    pub async fn add_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
        self.handle.add_asset(caller, asset).await
    }

    /// Deregister an asset (administrator only; never the native asset)
    pub async fn remove_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
        self.handle.remove_asset(caller, asset).await
    }

    /// Whether an asset is accepted
    pub fn is_asset_supported(&self, asset: &AssetId) -> bool {
        self.core.read().is_asset_supported(asset)
    }

    /// Accepted assets in insertion order
    pub fn supported_assets(&self) -> Vec<AssetId> {
        self.core.read().supported_assets()
    }

    // ── Plans ────────────────────────────────────────────────────────────

    /// Create a plan owned by `merchant`
    pub async fn create_plan(
        &self,
        merchant: AccountId,
        plan_id: PlanId,
        amount: Decimal,
        asset: AssetId,
        interval_seconds: u64,
    ) -> Result<Plan> {
        self.handle
            .create_plan(merchant, plan_id, amount, asset, interval_seconds)
            .await
    }

    /// Toggle a plan's active flag (plan merchant or administrator)
    pub async fn update_plan(
        &self,
        caller: AccountId,
        plan_id: PlanId,
        active: bool,
    ) -> Result<Plan> {
        self.handle.update_plan(caller, plan_id, active).await
    }

    /// Look up a plan
    pub fn get_plan(&self, plan_id: &PlanId) -> Result<Plan> {
        self.core.read().get_plan(plan_id)
    }

    /// Whether a plan exists
    pub fn plan_exists(&self, plan_id: &PlanId) -> bool {
        self.core.read().plan_exists(plan_id)
    }

    // ── Subscription lifecycle ───────────────────────────────────────────

    /// Subscribe to a plan; `provided` must cover the plan amount and funds
    /// the immediate first charge
    pub async fn subscribe(
        &self,
        subscriber: AccountId,
        plan_id: PlanId,
        provided: Decimal,
    ) -> Result<Subscription> {
        self.handle.subscribe(subscriber, plan_id, provided).await
    }

    /// Subscribe with a trial period of `trial_days` days (no charge)
    pub async fn subscribe_with_trial(
        &self,
        subscriber: AccountId,
        plan_id: PlanId,
        trial_days: u32,
    ) -> Result<Subscription> {
        self.handle
            .subscribe_with_trial(subscriber, plan_id, trial_days)
            .await
    }

    /// Pause an Active subscription (subscriber or plan merchant)
    pub async fn pause_subscription(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription> {
        self.handle.pause(caller, subscription_id).await
    }

    /// Resume a Paused subscription (subscriber only)
    pub async fn resume_subscription(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription> {
        self.handle.resume(caller, subscription_id).await
    }

    /// Cancel a subscription, immediately or at period end
    pub async fn cancel_subscription(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
        immediately: bool,
    ) -> Result<Subscription> {
        self.handle
            .cancel(caller, subscription_id, immediately)
            .await
    }

    /// Look up a subscription
    pub fn get_subscription(&self, subscription_id: &SubscriptionId) -> Result<Subscription> {
        self.core.read().get_subscription(subscription_id)
    }

    /// Whether a subscription exists
    pub fn subscription_exists(&self, subscription_id: &SubscriptionId) -> bool {
        self.core.read().subscription_exists(subscription_id)
    }

    /// Subscriptions of one user, in creation order
    pub fn subscriptions_by_user(&self, user: &AccountId) -> Vec<Subscription> {
        self.core.read().subscriptions_by_user(user)
    }

    /// Subscriptions of one plan, paged
    pub fn subscriptions_by_plan(
        &self,
        plan_id: &PlanId,
        offset: usize,
        limit: usize,
    ) -> Result<Page<Subscription>> {
        self.core.read().subscriptions_by_plan(plan_id, offset, limit)
    }

    /// Total subscriptions ever created
    pub fn subscription_count(&self) -> u64 {
        self.core.read().subscription_count()
    }

    // ── Charging ─────────────────────────────────────────────────────────

    /// Evaluate eligibility without side effects
    pub fn can_charge(&self, subscription_id: &SubscriptionId) -> Result<ChargeEligibility> {
        let now = self.clock.now();
        self.core.read().can_charge(subscription_id, now)
    }

    /// Attempt one renewal charge
    pub async fn charge(&self, subscription_id: SubscriptionId) -> Result<ChargeOutcome> {
        self.handle.charge(subscription_id).await
    }

    /// Charge a batch of subscriptions, independently and in input order
    pub async fn batch_charge(
        &self,
        subscription_ids: Vec<SubscriptionId>,
    ) -> Result<Vec<BatchChargeResult>> {
        self.handle.batch_charge(subscription_ids).await
    }

    /// Due Active subscriptions, paged, ordered by (due time, id)
    pub fn pending_charges(&self, offset: usize, limit: usize) -> Page<PendingCharge> {
        let now = self.clock.now();
        self.core.read().pending_charges(now, offset, limit)
    }

    /// Payment history of one subscription, paged, oldest first
    pub fn payment_history(
        &self,
        subscription_id: &SubscriptionId,
        offset: usize,
        limit: usize,
    ) -> Result<Page<PaymentRecord>> {
        self.core
            .read()
            .payment_history(subscription_id, offset, limit)
    }

    // ── One-time payments & refunds ──────────────────────────────────────

    /// Execute a one-time caller-funded payment keyed by `order_id`
    #[allow(clippy::too_many_arguments)]
    pub async fn pay(
        &self,
        payer: AccountId,
        order_id: OrderId,
        amount: Decimal,
        asset: AssetId,
        merchant: AccountId,
        provided: Decimal,
    ) -> Result<OneTimePayment> {
        self.handle
            .pay(payer, order_id, amount, asset, merchant, provided)
            .await
    }

    /// Look up a one-time payment
    pub fn get_payment(&self, order_id: &OrderId) -> Result<OneTimePayment> {
        self.core.read().get_payment(order_id)
    }

    /// Merchant-funded refund against a subscription; `to` defaults to the
    /// subscriber
    pub async fn refund(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
        amount: Decimal,
        to: Option<AccountId>,
    ) -> Result<()> {
        self.handle.refund(caller, subscription_id, amount, to).await
    }

    // ── Infrastructure ───────────────────────────────────────────────────

    /// Subscribe to the event stream from this point on
    pub fn subscribe_events(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Persist a snapshot now
    pub async fn snapshot(&self) -> Result<()> {
        self.handle.snapshot().await
    }

    /// Shutdown: persists a final snapshot when configured
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
