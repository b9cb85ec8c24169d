//! Plan store
//!
//! Plans are created by merchants, may be deactivated, and are never
//! physically deleted. The subscriber count only ever grows; cancellations do
//! not decrement it.

use crate::types::{validate_amount, AccountId, AssetId, Plan, PlanId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// In-memory plan store
#[derive(Debug, Default)]
pub struct PlanStore {
    plans: HashMap<PlanId, Plan>,
}

impl PlanStore {
    /// Create empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plan
    ///
    /// The asset must already have passed the registry check; this validates
    /// everything else: id uniqueness, amount, interval, merchant.
    pub fn create(
        &mut self,
        id: PlanId,
        amount: Decimal,
        asset: AssetId,
        interval_seconds: u64,
        merchant: AccountId,
        min_interval_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<Plan> {
        if self.plans.contains_key(&id) {
            return Err(Error::Validation(format!("plan {} already exists", id)));
        }
        validate_amount(amount, "plan amount")?;
        if interval_seconds < min_interval_seconds {
            return Err(Error::Validation(format!(
                "plan interval {}s is below the {}s minimum",
                interval_seconds, min_interval_seconds
            )));
        }
        if merchant.is_empty() {
            return Err(Error::Validation("merchant must not be empty".to_string()));
        }

        let plan = Plan {
            id: id.clone(),
            amount,
            asset,
            interval_seconds,
            merchant,
            active: true,
            subscriber_count: 0,
            created_at: now,
        };
        self.plans.insert(id, plan.clone());
        Ok(plan)
    }

    /// Toggle a plan's active flag. Authorization happens at the operation
    /// layer; the store only knows about existence.
    pub fn set_active(&mut self, id: &PlanId, active: bool) -> Result<Plan> {
        let plan = self
            .plans
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("plan {} not found", id)))?;
        plan.active = active;
        Ok(plan.clone())
    }

    /// Record one more subscription against the plan
    pub fn increment_subscribers(&mut self, id: &PlanId) -> Result<()> {
        let plan = self
            .plans
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("plan {} not found", id)))?;
        plan.subscriber_count += 1;
        Ok(())
    }

    /// Look up a plan
    pub fn get(&self, id: &PlanId) -> Result<&Plan> {
        self.plans
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("plan {} not found", id)))
    }

    /// Whether a plan exists
    pub fn exists(&self, id: &PlanId) -> bool {
        self.plans.contains_key(id)
    }

    /// Number of plans ever created
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// All plans, ordered by creation time then id (deterministic)
    pub(crate) fn all_sorted(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self.plans.values().cloned().collect();
        plans.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        plans
    }

    pub(crate) fn restore(plans: Vec<Plan>) -> Self {
        Self {
            plans: plans.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }
}
