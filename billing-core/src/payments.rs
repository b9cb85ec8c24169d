//! One-time payment log
//!
//! Payments live in their own namespace keyed by caller-supplied order ids.
//! An order id maps to at most one payment, ever: replays are rejected here,
//! before any transfer happens.

use crate::types::{OneTimePayment, OrderId};
use crate::{Error, Result};
use std::collections::HashMap;

/// Append-only log of one-time payments
#[derive(Debug, Default)]
pub struct PaymentLog {
    orders: HashMap<OrderId, OneTimePayment>,
}

impl PaymentLog {
    /// Create empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an order id has been used
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Guard an order id before transferring: fails if already used
    pub fn check_unused(&self, order_id: &OrderId) -> Result<()> {
        if self.contains(order_id) {
            return Err(Error::Validation(format!(
                "order {} already paid",
                order_id
            )));
        }
        Ok(())
    }

    /// Record a completed payment
    pub fn record(&mut self, payment: OneTimePayment) -> Result<()> {
        self.check_unused(&payment.order_id)?;
        self.orders.insert(payment.order_id.clone(), payment);
        Ok(())
    }

    /// Look up a payment
    pub fn get(&self, order_id: &OrderId) -> Result<&OneTimePayment> {
        self.orders
            .get(order_id)
            .ok_or_else(|| Error::NotFound(format!("order {} not found", order_id)))
    }

    /// Number of recorded payments
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// All payments ordered by order id (deterministic)
    pub(crate) fn all_sorted(&self) -> Vec<OneTimePayment> {
        let mut payments: Vec<OneTimePayment> = self.orders.values().cloned().collect();
        payments.sort_by(|a, b| a.order_id.as_str().cmp(b.order_id.as_str()));
        payments
    }

    pub(crate) fn restore(payments: Vec<OneTimePayment>) -> Self {
        Self {
            orders: payments
                .into_iter()
                .map(|p| (p.order_id.clone(), p))
                .collect(),
        }
    }
}
