//! Charging throughput benchmarks

use billing_core::{
    AccountId, AssetId, BillingEngine, Config, ManualClock, MemoryLedger, PlanId, SubscriptionId,
};
use chrono::{Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;
use std::sync::Arc;

const MONTH: u64 = 2_592_000;

struct BenchEnv {
    engine: BillingEngine,
    ids: Vec<SubscriptionId>,
    _dir: tempfile::TempDir,
}

fn setup(rt: &tokio::runtime::Runtime, subscriptions: usize) -> BenchEnv {
    rt.block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = dir.path().to_path_buf();
        config.snapshot.save_on_shutdown = false;

        let ledger = Arc::new(MemoryLedger::new(config.engine_account()));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let engine = BillingEngine::open_with(config, ledger.clone(), clock.clone())
            .await
            .unwrap();

        let alice = AccountId::new("alice");
        let usdc = AssetId::new("USDC");
        engine
            .add_asset(AccountId::new("admin"), usdc.clone())
            .await
            .unwrap();
        engine
            .create_plan(
                AccountId::new("merchant-1"),
                PlanId::new("plan"),
                Decimal::from(1000),
                usdc.clone(),
                MONTH,
            )
            .await
            .unwrap();
        ledger.credit(&alice, &usdc, Decimal::from(u64::MAX / 2));
        ledger.approve(&alice, &usdc, Decimal::from(u64::MAX / 2));

        let mut ids = Vec::with_capacity(subscriptions);
        for _ in 0..subscriptions {
            let sub = engine
                .subscribe(alice.clone(), PlanId::new("plan"), Decimal::from(1000))
                .await
                .unwrap();
            ids.push(sub.id);
        }
        // Everything becomes due; charges in the benchmark loop keep
        // advancing each subscription by one interval.
        clock.advance(Duration::seconds(MONTH as i64));

        BenchEnv {
            engine,
            ids,
            _dir: dir,
        }
    })
}

fn bench_can_charge(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let env = setup(&rt, 100);

    c.bench_function("can_charge_100_due", |b| {
        b.iter(|| {
            for id in &env.ids {
                let _ = env.engine.can_charge(id).unwrap();
            }
        })
    });
}

fn bench_pending_charges(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let env = setup(&rt, 100);

    c.bench_function("pending_charges_page_of_100", |b| {
        b.iter(|| env.engine.pending_charges(0, 100))
    });
}

fn bench_batch_charge(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let env = setup(&rt, 100);

    c.bench_function("batch_charge_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                env.engine.batch_charge(env.ids.clone()).await.unwrap();
            })
        })
    });
}

criterion_group!(
    benches,
    bench_can_charge,
    bench_pending_charges,
    bench_batch_charge
);
criterion_main!(benches);
