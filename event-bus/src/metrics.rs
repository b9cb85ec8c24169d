//! Metrics for the event stream

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    /// Total events published, by subject
    pub static ref EVENTS_PUBLISHED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "billing_events_published_total",
        "Total events published to the event stream",
        &["subject"]
    )
    .expect("metric registration");

    /// Total events a subscriber missed due to lag, by subject of the stream
    pub static ref SUBSCRIBER_LAG_TOTAL: IntCounterVec = register_int_counter_vec!(
        "billing_events_subscriber_lag_total",
        "Total events skipped by lagging subscribers",
        &["reason"]
    )
    .expect("metric registration");
}
