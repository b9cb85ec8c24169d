//! Actor-based concurrency guard
//!
//! All mutating operations funnel through one actor task with a bounded
//! mailbox: exactly one mutation is in flight at any time, so no operation
//! can observe a half-updated plan, subscription, or payment record. A batch
//! charge is one message and therefore one critical section.
//!
//! Reads do not go through the mailbox; they take the state read lock
//! directly and run concurrently with each other (see `engine.rs`). The
//! actor takes the write lock once per message, which gives readers
//! atomic visibility of every mutation.
//!
//! The actor samples `now` from the injected clock exactly once per message.

use crate::clock::Clock;
use crate::core::BillingCore;
use crate::storage::SnapshotStore;
use crate::types::{
    AccountId, AssetId, BatchChargeResult, ChargeOutcome, OneTimePayment, OrderId, Plan, PlanId,
    Subscription, SubscriptionId,
};
use crate::{Error, Result};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the billing actor
pub enum BillingMessage {
    /// Register an asset
    AddAsset {
        caller: AccountId,
        asset: AssetId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Deregister an asset
    RemoveAsset {
        caller: AccountId,
        asset: AssetId,
        response: oneshot::Sender<Result<()>>,
    },

    /// Create a plan
    CreatePlan {
        merchant: AccountId,
        plan_id: PlanId,
        amount: Decimal,
        asset: AssetId,
        interval_seconds: u64,
        response: oneshot::Sender<Result<Plan>>,
    },

    /// Toggle a plan's active flag
    UpdatePlan {
        caller: AccountId,
        plan_id: PlanId,
        active: bool,
        response: oneshot::Sender<Result<Plan>>,
    },

    /// Subscribe with an immediate first charge
    Subscribe {
        subscriber: AccountId,
        plan_id: PlanId,
        provided: Decimal,
        response: oneshot::Sender<Result<Subscription>>,
    },

    /// Subscribe with a trial period
    SubscribeWithTrial {
        subscriber: AccountId,
        plan_id: PlanId,
        trial_days: u32,
        response: oneshot::Sender<Result<Subscription>>,
    },

    /// Pause a subscription
    Pause {
        caller: AccountId,
        subscription_id: SubscriptionId,
        response: oneshot::Sender<Result<Subscription>>,
    },

    /// Resume a subscription
    Resume {
        caller: AccountId,
        subscription_id: SubscriptionId,
        response: oneshot::Sender<Result<Subscription>>,
    },

    /// Cancel a subscription
    Cancel {
        caller: AccountId,
        subscription_id: SubscriptionId,
        immediately: bool,
        response: oneshot::Sender<Result<Subscription>>,
    },

    /// Attempt one renewal charge
    Charge {
        subscription_id: SubscriptionId,
        response: oneshot::Sender<Result<ChargeOutcome>>,
    },

    /// Charge a batch of subscriptions
    BatchCharge {
        subscription_ids: Vec<SubscriptionId>,
        response: oneshot::Sender<Result<Vec<BatchChargeResult>>>,
    },

    /// Execute a one-time payment
    Pay {
        payer: AccountId,
        order_id: OrderId,
        amount: Decimal,
        asset: AssetId,
        merchant: AccountId,
        provided: Decimal,
        response: oneshot::Sender<Result<OneTimePayment>>,
    },

    /// Execute a merchant refund
    Refund {
        caller: AccountId,
        subscription_id: SubscriptionId,
        amount: Decimal,
        to: Option<AccountId>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Persist a snapshot now
    Snapshot {
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor (persists a final snapshot when configured)
    Shutdown,
}

/// Actor that serializes all mutating operations
pub struct BillingActor {
    /// Shared state; the actor is the only writer
    core: Arc<RwLock<BillingCore>>,

    /// Time source; sampled once per message
    clock: Arc<dyn Clock>,

    /// Snapshot store (None disables persistence)
    store: Option<SnapshotStore>,

    /// Save a snapshot on shutdown
    save_on_shutdown: bool,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<BillingMessage>,
}

impl BillingActor {
    /// Create new actor
    pub fn new(
        core: Arc<RwLock<BillingCore>>,
        clock: Arc<dyn Clock>,
        store: Option<SnapshotStore>,
        save_on_shutdown: bool,
        mailbox: mpsc::Receiver<BillingMessage>,
    ) -> Self {
        Self {
            core,
            clock,
            store,
            save_on_shutdown,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                BillingMessage::Shutdown => {
                    if self.save_on_shutdown {
                        if let Err(e) = self.persist() {
                            tracing::error!("Final snapshot failed: {}", e);
                        }
                    }
                    break;
                }
                _ => self.handle_message(msg),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: BillingMessage) {
        let now = self.clock.now();
        match msg {
            BillingMessage::AddAsset {
                caller,
                asset,
                response,
            } => {
                let result = self.core.write().add_asset(&caller, asset, now);
                let _ = response.send(result);
            }

            BillingMessage::RemoveAsset {
                caller,
                asset,
                response,
            } => {
                let result = self.core.write().remove_asset(&caller, &asset, now);
                let _ = response.send(result);
            }

            BillingMessage::CreatePlan {
                merchant,
                plan_id,
                amount,
                asset,
                interval_seconds,
                response,
            } => {
                let result = self.core.write().create_plan(
                    merchant,
                    plan_id,
                    amount,
                    asset,
                    interval_seconds,
                    now,
                );
                let _ = response.send(result);
            }

            BillingMessage::UpdatePlan {
                caller,
                plan_id,
                active,
                response,
            } => {
                let result = self.core.write().update_plan(&caller, &plan_id, active, now);
                let _ = response.send(result);
            }

            BillingMessage::Subscribe {
                subscriber,
                plan_id,
                provided,
                response,
            } => {
                let result = self
                    .core
                    .write()
                    .subscribe(subscriber, &plan_id, provided, now);
                let _ = response.send(result);
            }

            BillingMessage::SubscribeWithTrial {
                subscriber,
                plan_id,
                trial_days,
                response,
            } => {
                let result =
                    self.core
                        .write()
                        .subscribe_with_trial(subscriber, &plan_id, trial_days, now);
                let _ = response.send(result);
            }

            BillingMessage::Pause {
                caller,
                subscription_id,
                response,
            } => {
                let result = self
                    .core
                    .write()
                    .pause_subscription(&caller, &subscription_id, now);
                let _ = response.send(result);
            }

            BillingMessage::Resume {
                caller,
                subscription_id,
                response,
            } => {
                let result = self
                    .core
                    .write()
                    .resume_subscription(&caller, &subscription_id, now);
                let _ = response.send(result);
            }

            BillingMessage::Cancel {
                caller,
                subscription_id,
                immediately,
                response,
            } => {
                let result =
                    self.core
                        .write()
                        .cancel_subscription(&caller, &subscription_id, immediately, now);
                let _ = response.send(result);
            }

            BillingMessage::Charge {
                subscription_id,
                response,
            } => {
                let result = self.core.write().charge(&subscription_id, now);
                let _ = response.send(result);
            }

            BillingMessage::BatchCharge {
                subscription_ids,
                response,
            } => {
                let result = self.core.write().batch_charge(&subscription_ids, now);
                let _ = response.send(result);
            }

            BillingMessage::Pay {
                payer,
                order_id,
                amount,
                asset,
                merchant,
                provided,
                response,
            } => {
                let result = self
                    .core
                    .write()
                    .pay(payer, order_id, amount, asset, merchant, provided, now);
                let _ = response.send(result);
            }

            BillingMessage::Refund {
                caller,
                subscription_id,
                amount,
                to,
                response,
            } => {
                let result = self
                    .core
                    .write()
                    .refund(&caller, &subscription_id, amount, to, now);
                let _ = response.send(result);
            }

            BillingMessage::Snapshot { response } => {
                let _ = response.send(self.persist());
            }

            BillingMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Write a snapshot if a store is configured
    fn persist(&self) -> Result<()> {
        match &self.store {
            Some(store) => {
                let snapshot = self.core.read().to_snapshot();
                store.save(&snapshot)
            }
            None => Ok(()),
        }
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct BillingHandle {
    sender: mpsc::Sender<BillingMessage>,
}

impl BillingHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<BillingMessage>) -> Self {
        Self { sender }
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> BillingMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Register an asset
    pub async fn add_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
        self.call(|response| BillingMessage::AddAsset {
            caller,
            asset,
            response,
        })
        .await
    }

    /// Deregister an asset
    pub async fn remove_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
        self.call(|response| BillingMessage::RemoveAsset {
            caller,
            asset,
            response,
        })
        .await
    }

    /// Create a plan
    pub async fn create_plan(
        &self,
        merchant: AccountId,
        plan_id: PlanId,
        amount: Decimal,
        asset: AssetId,
        interval_seconds: u64,
    ) -> Result<Plan> {
        self.call(|response| BillingMessage::CreatePlan {
            merchant,
            plan_id,
            amount,
            asset,
            interval_seconds,
            response,
        })
        .await
    }

    /// Toggle a plan's active flag
    pub async fn update_plan(&self, caller: AccountId, plan_id: PlanId, active: bool) -> Result<Plan> {
        self.call(|response| BillingMessage::UpdatePlan {
            caller,
            plan_id,
            active,
            response,
        })
        .await
    }

    /// Subscribe with an immediate first charge
    pub async fn subscribe(
        &self,
        subscriber: AccountId,
        plan_id: PlanId,
        provided: Decimal,
    ) -> Result<Subscription> {
        self.call(|response| BillingMessage::Subscribe {
            subscriber,
            plan_id,
            provided,
            response,
        })
        .await
    }

    /// Subscribe with a trial period
    pub async fn subscribe_with_trial(
        &self,
        subscriber: AccountId,
        plan_id: PlanId,
        trial_days: u32,
    ) -> Result<Subscription> {
        self.call(|response| BillingMessage::SubscribeWithTrial {
            subscriber,
            plan_id,
            trial_days,
            response,
        })
        .await
    }

    /// Pause a subscription
    pub async fn pause(&self, caller: AccountId, subscription_id: SubscriptionId) -> Result<Subscription> {
        self.call(|response| BillingMessage::Pause {
            caller,
            subscription_id,
            response,
        })
        .await
    }

    /// Resume a subscription
    pub async fn resume(&self, caller: AccountId, subscription_id: SubscriptionId) -> Result<Subscription> {
        self.call(|response| BillingMessage::Resume {
            caller,
            subscription_id,
            response,
        })
        .await
    }

    /// Cancel a subscription
    pub async fn cancel(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
        immediately: bool,
    ) -> Result<Subscription> {
        self.call(|response| BillingMessage::Cancel {
            caller,
            subscription_id,
            immediately,
            response,
        })
        .await
    }

    /// Attempt one renewal charge
    pub async fn charge(&self, subscription_id: SubscriptionId) -> Result<ChargeOutcome> {
        self.call(|response| BillingMessage::Charge {
            subscription_id,
            response,
        })
        .await
    }

    /// Charge a batch of subscriptions
    pub async fn batch_charge(
        &self,
        subscription_ids: Vec<SubscriptionId>,
    ) -> Result<Vec<BatchChargeResult>> {
        self.call(|response| BillingMessage::BatchCharge {
            subscription_ids,
            response,
        })
        .await
    }

    /// Execute a one-time payment
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
        self.call(|response| BillingMessage::Pay {
            payer,
            order_id,
            amount,
            asset,
            merchant,
            provided,
            response,
        })
        .await
    }

    /// Execute a merchant refund
    pub async fn refund(
        &self,
        caller: AccountId,
        subscription_id: SubscriptionId,
        amount: Decimal,
        to: Option<AccountId>,
    ) -> Result<()> {
        self.call(|response| BillingMessage::Refund {
            caller,
            subscription_id,
            amount,
            to,
            response,
        })
        .await
    }

    /// Persist a snapshot now
    pub async fn snapshot(&self) -> Result<()> {
        self.call(|response| BillingMessage::Snapshot { response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(BillingMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the billing actor
pub fn spawn_billing_actor(
    core: Arc<RwLock<BillingCore>>,
    clock: Arc<dyn Clock>,
    store: Option<SnapshotStore>,
    save_on_shutdown: bool,
    mailbox_capacity: usize,
) -> BillingHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity); // Bounded channel for backpressure
    let actor = BillingActor::new(core, clock, store, save_on_shutdown, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    BillingHandle::new(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::Config;
    use crate::ledger::MemoryLedger;
    use crate::metrics::Metrics;
    use event_bus::EventBus;

    fn spawn_test_actor() -> BillingHandle {
        let config = Config::default();
        let ledger = Arc::new(MemoryLedger::new(config.engine_account()));
        let core = Arc::new(RwLock::new(BillingCore::new(
            config,
            ledger,
            EventBus::default(),
            Metrics::new().unwrap(),
        )));
        spawn_billing_actor(core, Arc::new(SystemClock), None, false, 100)
    }

    #[tokio::test]
    async fn test_actor_spawn_and_shutdown() {
        let handle = spawn_test_actor();
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_actor_routes_operations() {
        let handle = spawn_test_actor();

        handle
            .add_asset(AccountId::new("admin"), AssetId::new("USDC"))
            .await
            .unwrap();
        let plan = handle
            .create_plan(
                AccountId::new("merchant-1"),
                PlanId::new("basic"),
                Decimal::from(1000),
                AssetId::new("USDC"),
                2_592_000,
            )
            .await
            .unwrap();
        assert!(plan.active);

        // Errors come back typed through the mailbox.
        let result = handle
            .add_asset(AccountId::new("mallory"), AssetId::new("EURC"))
            .await;
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_calls_after_shutdown_fail_cleanly() {
        let handle = spawn_test_actor();
        handle.shutdown().await.unwrap();

        // Give the actor task a moment to drain and drop the mailbox.
        tokio::task::yield_now().await;
        let result = handle.charge(SubscriptionId::generate()).await;
        assert!(matches!(result, Err(Error::Concurrency(_))));
    }
}
