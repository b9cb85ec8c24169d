//! Core types for the billing engine
//!
//! All types are designed for:
//! - Deterministic serialization (snapshot + event payloads)
//! - Exact arithmetic (Decimal in asset base units)
//! - Auditability (terminal states retained, history append-only)

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Account identifier (payer, subscriber, or merchant)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the identifier is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asset identifier accepted by the value-transfer ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    /// Create new asset ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plan identifier (caller-supplied, unique)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(String);

impl PlanId {
    /// Create new plan ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order identifier for one-time payments (caller-supplied, unique)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create new order ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription identifier (engine-allocated, UUIDv7 for time-ordering)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Upper bound, usable as a range sentinel in ordered indexes
    pub(crate) const MAX: SubscriptionId = SubscriptionId(Uuid::max());

    /// Allocate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get underlying UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurring charge template owned by a merchant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Plan ID (unique, caller-supplied)
    pub id: PlanId,

    /// Charge amount per interval, in asset base units
    pub amount: Decimal,

    /// Asset the plan charges in
    pub asset: AssetId,

    /// Charge interval in whole seconds (minimum one day)
    pub interval_seconds: u64,

    /// Merchant receiving the charges
    pub merchant: AccountId,

    /// Whether new charges are allowed
    pub active: bool,

    /// Number of subscriptions ever created against this plan.
    /// Monotonic: never decremented, not even on cancellation.
    pub subscriber_count: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Charge interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::seconds(self.interval_seconds as i64)
    }
}

/// Subscription lifecycle state
///
/// `Canceled` and `Expired` are terminal: billing for that payer resumes only
/// through a new subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionStatus {
    /// Charges can be processed
    Active,
    /// Temporarily suspended; the paid period stops running
    Paused,
    /// Permanently terminated (terminal)
    Canceled,
    /// Terminated by a failed renewal pull (terminal)
    Expired,
}

impl SubscriptionStatus {
    /// True for states with no outgoing transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled | SubscriptionStatus::Expired)
    }

    /// Validate a status transition against the state machine
    ///
    /// | From   | To                          |
    /// |--------|-----------------------------|
    /// | Active | Paused, Canceled, Expired   |
    /// | Paused | Active, Canceled            |
    /// | Canceled | (none)                    |
    /// | Expired  | (none)                    |
    pub fn validate_transition(self, to: SubscriptionStatus) -> crate::Result<()> {
        let valid = match self {
            SubscriptionStatus::Active => matches!(
                to,
                SubscriptionStatus::Paused
                    | SubscriptionStatus::Canceled
                    | SubscriptionStatus::Expired
            ),
            SubscriptionStatus::Paused => {
                matches!(to, SubscriptionStatus::Active | SubscriptionStatus::Canceled)
            }
            SubscriptionStatus::Canceled | SubscriptionStatus::Expired => false,
        };

        if valid {
            Ok(())
        } else {
            Err(crate::Error::InvalidState(format!(
                "invalid status transition {:?} -> {:?}",
                self, to
            )))
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Paused => "Paused",
            SubscriptionStatus::Canceled => "Canceled",
            SubscriptionStatus::Expired => "Expired",
        };
        write!(f, "{}", s)
    }
}

/// A payer's enrollment in a plan, with its own period clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,

    /// Plan this subscription bills against
    pub plan_id: PlanId,

    /// Paying account
    pub subscriber: AccountId,

    /// Lifecycle state. Modified only through state machine transitions.
    pub status: SubscriptionStatus,

    /// Enrollment timestamp
    pub started_at: DateTime<Utc>,

    /// Start of the period currently paid for
    pub current_period_start: DateTime<Utc>,

    /// End of the period currently paid for (strictly after the start)
    pub current_period_end: DateTime<Utc>,

    /// When set, the next charge attempt cancels instead of charging
    pub cancel_at_period_end: bool,

    /// When the subscription was paused (meaningful only while Paused)
    pub paused_at: Option<DateTime<Utc>>,

    /// Number of successful charges; always equals the history length
    pub payment_count: u64,
}

impl Subscription {
    /// True when no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One successful charge, appended to a subscription's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Amount taken, in asset base units
    pub amount: Decimal,

    /// When the charge executed
    pub timestamp: DateTime<Utc>,

    /// Start of the period this charge paid for
    pub period_start: DateTime<Utc>,

    /// End of the period this charge paid for
    pub period_end: DateTime<Utc>,
}

/// One-time payment keyed by caller-supplied order ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneTimePayment {
    /// Order ID (unique)
    pub order_id: OrderId,

    /// Paying account
    pub payer: AccountId,

    /// Receiving merchant
    pub merchant: AccountId,

    /// Amount paid, in asset base units
    pub amount: Decimal,

    /// Asset paid in
    pub asset: AssetId,

    /// When the payment executed
    pub timestamp: DateTime<Utc>,

    /// Whether the transfer completed (always true for recorded payments;
    /// kept so consumers need no out-of-band convention)
    pub paid: bool,
}

/// Why a charge did or did not proceed
///
/// The vocabulary is closed; callers match on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeReason {
    /// Charge can proceed / did proceed
    Success,
    /// The current period has not ended yet
    NotDue,
    /// Ledger balance below the plan amount
    InsufficientBalance,
    /// Ledger authorization below the plan amount
    NotApproved,
    /// Subscription is paused
    Paused,
    /// Subscription is in a terminal state
    Canceled,
    /// Plan has been deactivated
    PlanInactive,
}

impl ChargeReason {
    /// Stable label (metrics, event payloads)
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeReason::Success => "success",
            ChargeReason::NotDue => "not_due",
            ChargeReason::InsufficientBalance => "insufficient_balance",
            ChargeReason::NotApproved => "not_approved",
            ChargeReason::Paused => "paused",
            ChargeReason::Canceled => "canceled",
            ChargeReason::PlanInactive => "plan_inactive",
        }
    }
}

impl fmt::Display for ChargeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of an eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeEligibility {
    /// Whether a charge would proceed right now
    pub eligible: bool,

    /// First matching reason in the fixed evaluation order
    pub reason: ChargeReason,
}

/// Result of a charge attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeOutcome {
    /// Whether value moved and the period advanced
    pub success: bool,

    /// Reason; `Success` only when `success` is true
    pub reason: ChargeReason,
}

/// Per-item result of a batch charge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchChargeResult {
    /// Subscription the item refers to
    pub subscription_id: SubscriptionId,

    /// Whether this item charged successfully
    pub success: bool,

    /// Failure reason; `None` when the subscription does not exist
    pub reason: Option<ChargeReason>,
}

/// A due subscription, as seen by an external scheduler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCharge {
    /// Subscription due for a charge
    pub subscription_id: SubscriptionId,

    /// Plan billed against
    pub plan_id: PlanId,

    /// Paying account
    pub subscriber: AccountId,

    /// Receiving merchant
    pub merchant: AccountId,

    /// Amount the next charge will pull
    pub amount: Decimal,

    /// Asset charged in
    pub asset: AssetId,

    /// When the subscription became due (current period end)
    pub due_at: DateTime<Utc>,
}

/// One page of a deterministic listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    /// Items in this page, in the collection's canonical order
    pub items: Vec<T>,

    /// True size of the underlying collection, regardless of the page
    pub total: usize,

    /// Offset this page was requested at
    pub offset: usize,
}

impl<T> Page<T> {
    /// Build a page from the full ordered collection
    pub(crate) fn slice(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();
        Self {
            items,
            total,
            offset,
        }
    }
}

/// Validate an amount in base units: positive and integral
pub(crate) fn validate_amount(amount: Decimal, what: &str) -> crate::Result<()> {
    if amount <= Decimal::ZERO {
        return Err(crate::Error::Validation(format!(
            "{} must be positive, got {}",
            what, amount
        )));
    }
    if !amount.fract().is_zero() {
        return Err(crate::Error::Validation(format!(
            "{} must be in whole base units, got {}",
            what, amount
        )));
    }
    Ok(())
}
