//! Subscription book
//!
//! Owns the subscription collection, its secondary indexes, and the
//! append-only payment history. All period and status mutations go through
//! the methods here so the due-time index can never drift from the primary
//! map.
//!
//! The due-time index is a `BTreeMap` keyed by `(current_period_end, id)`:
//! it contains exactly the Active subscriptions, so "everything due at `now`"
//! is a prefix range scan instead of a full-collection walk.

use crate::types::{
    AccountId, Page, PaymentRecord, PlanId, Subscription, SubscriptionId, SubscriptionStatus,
};
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Subscription collection with indexes and history
#[derive(Debug, Default)]
pub struct SubscriptionBook {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    by_user: HashMap<AccountId, Vec<SubscriptionId>>,
    by_plan: HashMap<PlanId, Vec<SubscriptionId>>,
    due: BTreeMap<(DateTime<Utc>, SubscriptionId), ()>,
    history: HashMap<SubscriptionId, Vec<PaymentRecord>>,
    created_total: u64,
}

impl SubscriptionBook {
    /// Create empty book
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created subscription, optionally with the record of
    /// its immediate first charge
    pub fn insert(&mut self, sub: Subscription, initial_record: Option<PaymentRecord>) {
        let id = sub.id;
        self.by_user
            .entry(sub.subscriber.clone())
            .or_default()
            .push(id);
        self.by_plan.entry(sub.plan_id.clone()).or_default().push(id);
        if sub.status == SubscriptionStatus::Active {
            self.due.insert((sub.current_period_end, id), ());
        }
        self.history
            .insert(id, initial_record.into_iter().collect());
        self.subscriptions.insert(id, sub);
        self.created_total += 1;
    }

    /// Look up a subscription
    pub fn get(&self, id: &SubscriptionId) -> Result<&Subscription> {
        self.subscriptions
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("subscription {} not found", id)))
    }

    /// Whether a subscription exists
    pub fn contains(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.contains_key(id)
    }

    /// Total subscriptions ever created
    pub fn created_total(&self) -> u64 {
        self.created_total
    }

    /// Pause an Active subscription
    pub fn pause(&mut self, id: &SubscriptionId, now: DateTime<Utc>) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        sub.status.validate_transition(SubscriptionStatus::Paused)?;

        let old_end = sub.current_period_end;
        sub.status = SubscriptionStatus::Paused;
        sub.paused_at = Some(now);
        let snapshot = sub.clone();

        self.due.remove(&(old_end, *id));
        Ok(snapshot)
    }

    /// Resume a Paused subscription
    ///
    /// The paid period stops running while paused: the period end moves
    /// forward by exactly the paused duration. A pending
    /// cancel-at-period-end request is dropped.
    pub fn resume(&mut self, id: &SubscriptionId, now: DateTime<Utc>) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        sub.status.validate_transition(SubscriptionStatus::Active)?;

        let paused_at = sub.paused_at.ok_or_else(|| {
            Error::InvalidState(format!("subscription {} has no pause timestamp", id))
        })?;
        let paused_for = now.signed_duration_since(paused_at);

        sub.status = SubscriptionStatus::Active;
        sub.current_period_end = sub.current_period_end + paused_for;
        sub.paused_at = None;
        sub.cancel_at_period_end = false;
        let snapshot = sub.clone();

        self.due.insert((snapshot.current_period_end, *id), ());
        Ok(snapshot)
    }

    /// Flag an Active subscription for cancellation at period end. The status
    /// transition happens lazily, at the next charge attempt.
    pub fn request_cancel(&mut self, id: &SubscriptionId) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        if sub.status != SubscriptionStatus::Active {
            return Err(Error::InvalidState(format!(
                "deferred cancel requires an Active subscription, {} is {}",
                id, sub.status
            )));
        }
        sub.cancel_at_period_end = true;
        Ok(sub.clone())
    }

    /// Cancel immediately: the paid period is cut short at `now`
    pub fn cancel_now(&mut self, id: &SubscriptionId, now: DateTime<Utc>) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        sub.status.validate_transition(SubscriptionStatus::Canceled)?;

        let old_end = sub.current_period_end;
        sub.status = SubscriptionStatus::Canceled;
        // The period end never moves at or below the period start.
        if now > sub.current_period_start {
            sub.current_period_end = now;
        }
        let snapshot = sub.clone();

        self.due.remove(&(old_end, *id));
        Ok(snapshot)
    }

    /// Complete a deferred cancellation at charge time: status only, the
    /// period fields keep their last charged values
    pub fn cancel_deferred(&mut self, id: &SubscriptionId) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        sub.status.validate_transition(SubscriptionStatus::Canceled)?;

        let old_end = sub.current_period_end;
        sub.status = SubscriptionStatus::Canceled;
        let snapshot = sub.clone();

        self.due.remove(&(old_end, *id));
        Ok(snapshot)
    }

    /// Expire an Active subscription after a failed renewal pull
    pub fn expire(&mut self, id: &SubscriptionId) -> Result<Subscription> {
        let sub = self.get_mut(id)?;
        sub.status.validate_transition(SubscriptionStatus::Expired)?;

        let old_end = sub.current_period_end;
        sub.status = SubscriptionStatus::Expired;
        let snapshot = sub.clone();

        self.due.remove(&(old_end, *id));
        Ok(snapshot)
    }

    /// Advance the period after a successful renewal charge
    ///
    /// The new period is anchored at the old period end, not at `now`: a late
    /// charge does not shift future due dates, and one call advances by
    /// exactly one interval.
    pub fn advance_period(
        &mut self,
        id: &SubscriptionId,
        interval: Duration,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<(Subscription, PaymentRecord)> {
        let sub = self.get_mut(id)?;
        if sub.status != SubscriptionStatus::Active {
            return Err(Error::InvalidState(format!(
                "cannot advance period of {} subscription {}",
                sub.status, id
            )));
        }

        let old_end = sub.current_period_end;
        sub.current_period_start = old_end;
        sub.current_period_end = old_end + interval;
        sub.payment_count += 1;

        let record = PaymentRecord {
            amount,
            timestamp: now,
            period_start: sub.current_period_start,
            period_end: sub.current_period_end,
        };
        let snapshot = sub.clone();

        self.due.remove(&(old_end, *id));
        self.due.insert((snapshot.current_period_end, *id), ());
        self.history
            .get_mut(id)
            .expect("history exists for every subscription")
            .push(record.clone());

        Ok((snapshot, record))
    }

    /// Subscriptions of one user, in creation order
    pub fn by_user(&self, user: &AccountId) -> Vec<Subscription> {
        self.by_user
            .get(user)
            .map(|ids| {
                ids.iter()
                    .map(|id| self.subscriptions[id].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Subscriptions of one plan, paged, in creation order
    pub fn by_plan_page(&self, plan_id: &PlanId, offset: usize, limit: usize) -> Page<Subscription> {
        let all = self
            .by_plan
            .get(plan_id)
            .map(|ids| {
                ids.iter()
                    .map(|id| self.subscriptions[id].clone())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Page::slice(all, offset, limit)
    }

    /// Payment history of one subscription, paged, oldest first
    pub fn history_page(
        &self,
        id: &SubscriptionId,
        offset: usize,
        limit: usize,
    ) -> Result<Page<PaymentRecord>> {
        let records = self
            .history
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("subscription {} not found", id)))?;
        Ok(Page::slice(records.clone(), offset, limit))
    }

    /// Ids of Active subscriptions due at `now`, ordered by (due time, id)
    pub fn due_ids(&self, now: DateTime<Utc>, offset: usize, limit: usize) -> (Vec<SubscriptionId>, usize) {
        let mut total = 0usize;
        let mut ids = Vec::new();
        for ((_, id), ()) in self.due.range(..=(now, SubscriptionId::MAX)) {
            if total >= offset && ids.len() < limit {
                ids.push(*id);
            }
            total += 1;
        }
        (ids, total)
    }

    pub(crate) fn to_parts(&self) -> (Vec<Subscription>, Vec<(SubscriptionId, Vec<PaymentRecord>)>, u64) {
        let mut subs: Vec<Subscription> = self.subscriptions.values().cloned().collect();
        subs.sort_by_key(|s| s.id);
        let mut history: Vec<(SubscriptionId, Vec<PaymentRecord>)> = self
            .history
            .iter()
            .map(|(id, records)| (*id, records.clone()))
            .collect();
        history.sort_by_key(|(id, _)| *id);
        (subs, history, self.created_total)
    }

    /// Rebuild the book from snapshot parts. Subscriptions are inserted in id
    /// order; ids are time-ordered, so the per-user and per-plan listings
    /// come back in creation order.
    pub(crate) fn restore(
        subscriptions: Vec<Subscription>,
        history: Vec<(SubscriptionId, Vec<PaymentRecord>)>,
        created_total: u64,
    ) -> Self {
        let mut book = Self {
            created_total,
            ..Self::default()
        };
        let mut sorted = subscriptions;
        sorted.sort_by_key(|s| s.id);
        for sub in sorted {
            let id = sub.id;
            book.by_user
                .entry(sub.subscriber.clone())
                .or_default()
                .push(id);
            book.by_plan.entry(sub.plan_id.clone()).or_default().push(id);
            if sub.status == SubscriptionStatus::Active {
                book.due.insert((sub.current_period_end, id), ());
            }
            book.subscriptions.insert(id, sub);
        }
        for (id, records) in history {
            book.history.insert(id, records);
        }
        // Subscriptions without a history entry still need one.
        for id in book.subscriptions.keys() {
            book.history.entry(*id).or_default();
        }
        book
    }

    fn get_mut(&mut self, id: &SubscriptionId) -> Result<&mut Subscription> {
        self.subscriptions
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("subscription {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_subscription(now: DateTime<Utc>, interval: Duration) -> Subscription {
        Subscription {
            id: SubscriptionId::generate(),
            plan_id: PlanId::new("basic"),
            subscriber: AccountId::new("alice"),
            status: SubscriptionStatus::Active,
            started_at: now,
            current_period_start: now,
            current_period_end: now + interval,
            cancel_at_period_end: false,
            paused_at: None,
            payment_count: 1,
        }
    }

    fn month() -> Duration {
        Duration::seconds(2_592_000)
    }

    #[test]
    fn test_insert_and_indexes() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;

        book.insert(sub, None);

        assert!(book.contains(&id));
        assert_eq!(book.created_total(), 1);
        assert_eq!(book.by_user(&AccountId::new("alice")).len(), 1);
        assert_eq!(book.by_plan_page(&PlanId::new("basic"), 0, 10).total, 1);

        // Not due before the period ends.
        let (ids, total) = book.due_ids(now, 0, 10);
        assert!(ids.is_empty());
        assert_eq!(total, 0);

        // Due once the period has ended.
        let (ids, total) = book.due_ids(now + month(), 0, 10);
        assert_eq!(ids, vec![id]);
        assert_eq!(total, 1);
    }

    #[test]
    fn test_pause_resume_extends_period_exactly() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        let original_end = sub.current_period_end;
        book.insert(sub, None);

        let paused = book.pause(&id, now + Duration::days(3)).unwrap();
        assert_eq!(paused.status, SubscriptionStatus::Paused);
        assert_eq!(paused.paused_at, Some(now + Duration::days(3)));
        // Paused subscriptions are never due.
        assert_eq!(book.due_ids(now + month(), 0, 10).1, 0);

        let resumed = book.resume(&id, now + Duration::days(10)).unwrap();
        assert_eq!(resumed.status, SubscriptionStatus::Active);
        assert_eq!(resumed.paused_at, None);
        assert_eq!(resumed.current_period_end, original_end + Duration::days(7));
    }

    #[test]
    fn test_resume_clears_cancel_request() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        book.insert(sub, None);

        book.request_cancel(&id).unwrap();
        book.pause(&id, now).unwrap();
        let resumed = book.resume(&id, now + Duration::days(1)).unwrap();
        assert!(!resumed.cancel_at_period_end);
    }

    #[test]
    fn test_pause_requires_active() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        book.insert(sub, None);

        book.pause(&id, now).unwrap();
        assert!(book.pause(&id, now).is_err());

        book.cancel_now(&id, now + Duration::days(1)).unwrap();
        assert!(book.pause(&id, now).is_err());
        assert!(book.resume(&id, now).is_err());
    }

    #[test]
    fn test_cancel_now_cuts_period_short() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        book.insert(sub, None);

        let canceled = book.cancel_now(&id, now + Duration::days(5)).unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);
        assert_eq!(canceled.current_period_end, now + Duration::days(5));
        assert!(canceled.current_period_end > canceled.current_period_start);

        // Terminal: no longer due, ever.
        assert_eq!(book.due_ids(now + month(), 0, 10).1, 0);
    }

    #[test]
    fn test_cancel_at_creation_instant_keeps_period_ordering() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        book.insert(sub, None);

        let canceled = book.cancel_now(&id, now).unwrap();
        assert!(canceled.current_period_end > canceled.current_period_start);
    }

    #[test]
    fn test_cancel_deferred_keeps_period_fields() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        let end = sub.current_period_end;
        book.insert(sub, None);

        book.request_cancel(&id).unwrap();
        let canceled = book.cancel_deferred(&id).unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);
        assert_eq!(canceled.current_period_end, end);
    }

    #[test]
    fn test_advance_period_is_anchored() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let sub = new_subscription(now, month());
        let id = sub.id;
        let old_end = sub.current_period_end;
        book.insert(sub, None);

        // Charge runs late; the schedule does not drift.
        let late = old_end + Duration::days(4);
        let (advanced, record) = book
            .advance_period(&id, month(), Decimal::from(1000), late)
            .unwrap();

        assert_eq!(advanced.current_period_start, old_end);
        assert_eq!(advanced.current_period_end, old_end + month());
        assert_eq!(advanced.payment_count, 2);
        assert_eq!(record.period_start, old_end);
        assert_eq!(record.timestamp, late);

        let history = book.history_page(&id, 0, 10).unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(history.items[0], record);
    }

    #[test]
    fn test_due_pagination_totals() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        for _ in 0..5 {
            book.insert(new_subscription(now, month()), None);
        }

        let later = now + month();
        let (page, total) = book.due_ids(later, 0, 2);
        assert_eq!(page.len(), 2);
        assert_eq!(total, 5);

        let (page, total) = book.due_ids(later, 4, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(total, 5);

        // Offset beyond the end: empty page, true total.
        let (page, total) = book.due_ids(later, 10, 2);
        assert!(page.is_empty());
        assert_eq!(total, 5);
    }

    #[test]
    fn test_due_order_is_deterministic() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        let a = new_subscription(now, month());
        let b = new_subscription(now, Duration::days(10));
        let (a_id, b_id) = (a.id, b.id);
        book.insert(a, None);
        book.insert(b, None);

        // b ends earlier, so it comes first.
        let (ids, _) = book.due_ids(now + month(), 0, 10);
        assert_eq!(ids, vec![b_id, a_id]);
    }

    #[test]
    fn test_restore_rebuilds_indexes() {
        let mut book = SubscriptionBook::new();
        let now = Utc::now();
        for _ in 0..3 {
            book.insert(new_subscription(now, month()), None);
        }
        book.insert(
            {
                let mut s = new_subscription(now, month());
                s.status = SubscriptionStatus::Paused;
                s.paused_at = Some(now);
                s
            },
            None,
        );

        let (subs, history, created_total) = book.to_parts();
        let restored = SubscriptionBook::restore(subs, history, created_total);

        assert_eq!(restored.created_total(), 4);
        assert_eq!(restored.by_user(&AccountId::new("alice")).len(), 4);
        // Only the Active ones are in the due index.
        assert_eq!(restored.due_ids(now + month(), 0, 10).1, 3);
    }
}
