//! Meridian Billing Core
//!
//! Recurring-billing engine over an external value-transfer ledger: plans,
//! subscription lifecycle, renewal charges, one-time payments, and merchant
//! refunds.
//!
//! # Architecture
//!
//! - **Single Writer**: one actor task serializes every mutating operation
//! - **Fixed-Schedule Billing**: renewals anchor at the old period end, so a
//!   late charge never shifts future due dates
//! - **Typed Outcomes**: a declined charge is a value, not an error
//! - **Event Stream**: every state change is published for reconciliation
//!   and notification consumers
//!
//! # Invariants
//!
//! - A subscription's period end is strictly after its period start
//! - Payment count equals the length of the payment history
//! - Terminal subscriptions (Canceled, Expired) never transition again
//! - An order identifier maps to at most one one-time payment
//! - Plan subscriber counts never decrease

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod actor;
pub mod charge;
pub mod clock;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod events;
pub mod ledger;
pub mod metrics;
pub mod payments;
pub mod plans;
pub mod registry;
pub mod storage;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use engine::BillingEngine;
pub use error::{Error, Result};
pub use ledger::{LedgerError, LedgerResult, MemoryLedger, ValueLedger};
pub use metrics::Metrics;
pub use types::{
    AccountId, AssetId, BatchChargeResult, ChargeEligibility, ChargeOutcome, ChargeReason,
    OneTimePayment, OrderId, Page, PaymentRecord, PendingCharge, Plan, PlanId, Subscription,
    SubscriptionId, SubscriptionStatus,
};
