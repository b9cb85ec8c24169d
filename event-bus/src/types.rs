//! Type definitions for the event stream

use serde::{Deserialize, Serialize};

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Plan created
    PlanCreated,
    /// Plan activated/deactivated
    PlanUpdated,
    /// Asset accepted for payment
    AssetAdded,
    /// Asset no longer accepted
    AssetRemoved,
    /// Subscription created
    SubscriptionCreated,
    /// Subscription status transition
    SubscriptionStatusChanged,
    /// Subscription cancellation requested
    SubscriptionCanceled,
    /// Renewal charge taken
    PaymentExecuted,
    /// Charge attempt failed
    PaymentFailed,
    /// One-time payment recorded
    PaymentReceived,
    /// Merchant refund executed
    Refunded,
}

impl EventKind {
    /// Get stable subject name for this event kind
    pub fn subject(&self) -> &'static str {
        match self {
            EventKind::PlanCreated => "billing.plan.created",
            EventKind::PlanUpdated => "billing.plan.updated",
            EventKind::AssetAdded => "billing.asset.added",
            EventKind::AssetRemoved => "billing.asset.removed",
            EventKind::SubscriptionCreated => "billing.subscription.created",
            EventKind::SubscriptionStatusChanged => "billing.subscription.status_changed",
            EventKind::SubscriptionCanceled => "billing.subscription.canceled",
            EventKind::PaymentExecuted => "billing.payment.executed",
            EventKind::PaymentFailed => "billing.payment.failed",
            EventKind::PaymentReceived => "billing.payment.received",
            EventKind::Refunded => "billing.refund.executed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_names_are_stable() {
        assert_eq!(EventKind::PlanCreated.subject(), "billing.plan.created");
        assert_eq!(EventKind::PaymentExecuted.subject(), "billing.payment.executed");
        assert_eq!(EventKind::Refunded.subject(), "billing.refund.executed");
    }

    #[test]
    fn test_subject_names_are_distinct() {
        let kinds = [
            EventKind::PlanCreated,
            EventKind::PlanUpdated,
            EventKind::AssetAdded,
            EventKind::AssetRemoved,
            EventKind::SubscriptionCreated,
            EventKind::SubscriptionStatusChanged,
            EventKind::SubscriptionCanceled,
            EventKind::PaymentExecuted,
            EventKind::PaymentFailed,
            EventKind::PaymentReceived,
            EventKind::Refunded,
        ];

        let mut subjects: Vec<&str> = kinds.iter().map(|k| k.subject()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        assert_eq!(subjects.len(), kinds.len());
    }
}
