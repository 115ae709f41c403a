//! Business metrics for the admission engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `turnstile_holds_total{status}` - Holds by outcome (created, released, expired)
//! - `turnstile_purchases_total{status}` - Purchase submissions by outcome
//!   (confirmed, replayed, rejected, refunded)
//! - `turnstile_units_sold_total` - Units moved to sold
//! - `turnstile_revenue_cents_total` - Revenue from confirmed purchases, in cents
//! - `turnstile_refunds_cents_total` - Refunds issued, in cents
//!
//! ## Gauges
//! - `turnstile_active_holds` - Holds currently counting against availability

use metrics::{describe_counter, describe_gauge};

/// Register metric descriptions with the installed recorder.
///
/// Call once at startup, before any metrics are recorded.
pub fn register_engine_metrics() {
    describe_counter!(
        "turnstile_holds_total",
        "Total holds by outcome (created, released, expired)"
    );
    describe_gauge!(
        "turnstile_active_holds",
        "Holds currently counting against availability"
    );
    describe_counter!(
        "turnstile_purchases_total",
        "Purchase submissions by outcome (confirmed, replayed, rejected, refunded)"
    );
    describe_counter!("turnstile_units_sold_total", "Units moved to sold");
    describe_counter!(
        "turnstile_revenue_cents_total",
        "Revenue from confirmed purchases in cents"
    );
    describe_counter!("turnstile_refunds_cents_total", "Refunds issued in cents");

    tracing::info!("Engine metrics registered");
}

pub(crate) fn record_hold_created(quantity: u32) {
    metrics::counter!("turnstile_holds_total", "status" => "created").increment(1);
    metrics::gauge!("turnstile_active_holds").increment(1.0);
    tracing::debug!(quantity, "Recorded hold_created metric");
}

pub(crate) fn record_hold_released() {
    metrics::counter!("turnstile_holds_total", "status" => "released").increment(1);
    metrics::gauge!("turnstile_active_holds").decrement(1.0);
}

pub(crate) fn record_hold_expired() {
    metrics::counter!("turnstile_holds_total", "status" => "expired").increment(1);
    metrics::gauge!("turnstile_active_holds").decrement(1.0);
}

pub(crate) fn record_purchase_confirmed(quantity: u32, total_cents: u64) {
    metrics::counter!("turnstile_purchases_total", "status" => "confirmed").increment(1);
    metrics::gauge!("turnstile_active_holds").decrement(1.0);
    metrics::counter!("turnstile_units_sold_total").increment(u64::from(quantity));
    metrics::counter!("turnstile_revenue_cents_total").increment(total_cents);
    tracing::debug!(quantity, total_cents, "Recorded purchase_confirmed metric");
}

pub(crate) fn record_purchase_replayed() {
    metrics::counter!("turnstile_purchases_total", "status" => "replayed").increment(1);
}

pub(crate) fn record_purchase_rejected(reason: &'static str) {
    metrics::counter!("turnstile_purchases_total", "status" => "rejected", "reason" => reason)
        .increment(1);
}

pub(crate) fn record_purchase_refunded(amount_cents: u64) {
    metrics::counter!("turnstile_purchases_total", "status" => "refunded").increment(1);
    metrics::counter!("turnstile_refunds_cents_total").increment(amount_cents);
    tracing::debug!(amount_cents, "Recorded purchase_refunded metric");
}
