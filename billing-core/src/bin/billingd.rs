//! Billing daemon
//!
//! Minimal reference driver for the engine: opens it against an in-memory
//! ledger, mirrors the event stream to the log, and sweeps due subscriptions
//! on a fixed interval the way an external scheduler would.

use billing_core::{BillingEngine, Config, MemoryLedger};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Meridian billing daemon");

    let config = Config::from_env()?;
    let max_batch = config.charging.max_batch_size;

    let ledger = Arc::new(MemoryLedger::new(config.engine_account()));
    let engine = BillingEngine::open(config, ledger).await?;

    // Mirror the event stream to the log as JSON lines.
    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.next().await {
                Ok(envelope) => match envelope.to_bytes() {
                    Ok(bytes) => {
                        tracing::info!("event {}: {}", envelope.subject(), String::from_utf8_lossy(&bytes))
                    }
                    Err(e) => tracing::warn!("event serialization failed: {}", e),
                },
                Err(event_bus::Error::Lagged(skipped)) => {
                    tracing::warn!("event log fell behind, {} events skipped", skipped);
                }
                Err(_) => break,
            }
        }
    });

    let mut sweep = tokio::time::interval(Duration::from_secs(60));
    loop {
        tokio::select! {
            _ = sweep.tick() => {
                let pending = engine.pending_charges(0, max_batch);
                if pending.items.is_empty() {
                    continue;
                }
                tracing::info!("Sweeping {} of {} due subscriptions", pending.items.len(), pending.total);
                let ids = pending.items.iter().map(|p| p.subscription_id).collect();
                match engine.batch_charge(ids).await {
                    Ok(results) => {
                        let charged = results.iter().filter(|r| r.success).count();
                        tracing::info!("Sweep complete: {}/{} charged", charged, results.len());
                    }
                    Err(e) => tracing::error!("Sweep failed: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("Shutting down billing daemon");
    engine.shutdown().await?;
    Ok(())
}
