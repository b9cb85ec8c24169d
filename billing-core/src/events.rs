//! Domain events published by the engine
//!
//! Each event is a typed payload serialized as JSON into an
//! [`event_bus::EventEnvelope`]. Consumers (reconciliation, notifications)
//! subscribe to the stream; the engine never waits for them.

use crate::types::{
    AccountId, AssetId, ChargeReason, OrderId, PlanId, SubscriptionId, SubscriptionStatus,
};
use chrono::{DateTime, Utc};
use event_bus::{EventEnvelope, EventKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// Plan created
#[derive(Debug, Clone, Serialize)]
pub struct PlanCreatedEvent {
    /// New plan
    pub plan_id: PlanId,
    /// Owning merchant
    pub merchant: AccountId,
    /// Charge amount per interval
    pub amount: Decimal,
    /// Asset charged in
    pub asset: AssetId,
    /// Charge interval in seconds
    pub interval_seconds: u64,
}

/// Plan activated or deactivated
#[derive(Debug, Clone, Serialize)]
pub struct PlanUpdatedEvent {
    /// Updated plan
    pub plan_id: PlanId,
    /// New active flag
    pub active: bool,
}

/// Asset registered
#[derive(Debug, Clone, Serialize)]
pub struct AssetAddedEvent {
    /// Registered asset
    pub asset: AssetId,
}

/// Asset deregistered
#[derive(Debug, Clone, Serialize)]
pub struct AssetRemovedEvent {
    /// Deregistered asset
    pub asset: AssetId,
}

/// Subscription created
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCreatedEvent {
    /// New subscription
    pub subscription_id: SubscriptionId,
    /// Plan billed against
    pub plan_id: PlanId,
    /// Paying account
    pub subscriber: AccountId,
    /// Whether the first period is an uncharged trial
    pub trial: bool,
}

/// Subscription status transition
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatusChangedEvent {
    /// Affected subscription
    pub subscription_id: SubscriptionId,
    /// Status before
    pub old: SubscriptionStatus,
    /// Status after
    pub new: SubscriptionStatus,
}

/// Cancellation requested
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCanceledEvent {
    /// Affected subscription
    pub subscription_id: SubscriptionId,
    /// True for immediate cancellation, false for cancel-at-period-end
    pub immediately: bool,
}

/// Renewal charge taken
#[derive(Debug, Clone, Serialize)]
pub struct PaymentExecutedEvent {
    /// Charged subscription
    pub subscription_id: SubscriptionId,
    /// Amount pulled
    pub amount: Decimal,
    /// Start of the period paid for
    pub period_start: DateTime<Utc>,
    /// End of the period paid for
    pub period_end: DateTime<Utc>,
}

/// Charge attempt failed
#[derive(Debug, Clone, Serialize)]
pub struct PaymentFailedEvent {
    /// Affected subscription
    pub subscription_id: SubscriptionId,
    /// Why the charge did not proceed
    pub reason: ChargeReason,
}

/// One-time payment recorded
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceivedEvent {
    /// Order paid
    pub order_id: OrderId,
    /// Paying account
    pub payer: AccountId,
    /// Receiving merchant
    pub merchant: AccountId,
    /// Amount paid
    pub amount: Decimal,
}

/// Merchant refund executed
#[derive(Debug, Clone, Serialize)]
pub struct RefundedEvent {
    /// Subscription the refund refers to
    pub subscription_id: SubscriptionId,
    /// Receiving account
    pub to: AccountId,
    /// Amount refunded
    pub amount: Decimal,
}

/// Any billing domain event
#[derive(Debug, Clone, Serialize)]
pub enum BillingEvent {
    /// Plan created
    PlanCreated(PlanCreatedEvent),
    /// Plan updated
    PlanUpdated(PlanUpdatedEvent),
    /// Asset registered
    AssetAdded(AssetAddedEvent),
    /// Asset deregistered
    AssetRemoved(AssetRemovedEvent),
    /// Subscription created
    SubscriptionCreated(SubscriptionCreatedEvent),
    /// Status transition
    SubscriptionStatusChanged(SubscriptionStatusChangedEvent),
    /// Cancellation requested
    SubscriptionCanceled(SubscriptionCanceledEvent),
    /// Renewal charge taken
    PaymentExecuted(PaymentExecutedEvent),
    /// Charge attempt failed
    PaymentFailed(PaymentFailedEvent),
    /// One-time payment recorded
    PaymentReceived(PaymentReceivedEvent),
    /// Refund executed
    Refunded(RefundedEvent),
}

impl BillingEvent {
    /// Event kind on the stream
    pub fn kind(&self) -> EventKind {
        match self {
            BillingEvent::PlanCreated(_) => EventKind::PlanCreated,
            BillingEvent::PlanUpdated(_) => EventKind::PlanUpdated,
            BillingEvent::AssetAdded(_) => EventKind::AssetAdded,
            BillingEvent::AssetRemoved(_) => EventKind::AssetRemoved,
            BillingEvent::SubscriptionCreated(_) => EventKind::SubscriptionCreated,
            BillingEvent::SubscriptionStatusChanged(_) => EventKind::SubscriptionStatusChanged,
            BillingEvent::SubscriptionCanceled(_) => EventKind::SubscriptionCanceled,
            BillingEvent::PaymentExecuted(_) => EventKind::PaymentExecuted,
            BillingEvent::PaymentFailed(_) => EventKind::PaymentFailed,
            BillingEvent::PaymentReceived(_) => EventKind::PaymentReceived,
            BillingEvent::Refunded(_) => EventKind::Refunded,
        }
    }

    /// Wrap into a stream envelope stamped at the operation's timestamp
    pub fn into_envelope(self, timestamp: DateTime<Utc>) -> EventEnvelope {
        let kind = self.kind();
        let payload = match self {
            BillingEvent::PlanCreated(e) => serde_json::to_value(e),
            BillingEvent::PlanUpdated(e) => serde_json::to_value(e),
            BillingEvent::AssetAdded(e) => serde_json::to_value(e),
            BillingEvent::AssetRemoved(e) => serde_json::to_value(e),
            BillingEvent::SubscriptionCreated(e) => serde_json::to_value(e),
            BillingEvent::SubscriptionStatusChanged(e) => serde_json::to_value(e),
            BillingEvent::SubscriptionCanceled(e) => serde_json::to_value(e),
            BillingEvent::PaymentExecuted(e) => serde_json::to_value(e),
            BillingEvent::PaymentFailed(e) => serde_json::to_value(e),
            BillingEvent::PaymentReceived(e) => serde_json::to_value(e),
            BillingEvent::Refunded(e) => serde_json::to_value(e),
        }
        .expect("event payload serialization cannot fail");
        EventEnvelope::new(kind, payload, timestamp)
    }
}
