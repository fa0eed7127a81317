use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use stockledger_core::TenantId;
use stockledger_infra::{InMemoryInventoryStore, InventoryStore, ProductCatalog, ProductLocks, StockEngine};
use stockledger_inventory::{
    plan_movement, MovementDetails, MovementId, MovementReason, MovementRequest, MovementType, ReversalRequest,
    StatsWindow,
};
use stockledger_products::{NewProduct, Product, SkuGenerator};

type Engine = StockEngine<InMemoryInventoryStore>;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap()
}

fn new_product(initial_stock: u64) -> NewProduct {
    NewProduct {
        sku: None,
        name: "Bench Widget".to_string(),
        description: None,
        category: "Hardware".to_string(),
        unit_price: Decimal::new(999, 2),
        initial_stock,
        min_stock_level: 0,
        max_stock_level: None,
        supplier: None,
        tags: Vec::new(),
        expiration_date: None,
    }
}

fn request(product: &Product, movement_type: MovementType, reason: MovementReason, quantity: i64) -> MovementRequest {
    MovementRequest {
        product_id: product.id_typed(),
        movement_type,
        quantity,
        reason,
        performed_by: "bench".to_string(),
        details: MovementDetails::default(),
    }
}

fn setup(rt: &tokio::runtime::Runtime, initial_stock: u64) -> (TenantId, Product, Engine) {
    let store = Arc::new(InMemoryInventoryStore::new());
    let locks = Arc::new(ProductLocks::new());
    let catalog = ProductCatalog::with_generator(store.clone(), locks.clone(), SkuGenerator::seeded(7));
    let engine = StockEngine::with_locks(store, locks);
    let tenant_id = TenantId::new();
    let product = rt
        .block_on(catalog.create_product(tenant_id, new_product(initial_stock)))
        .unwrap();
    (tenant_id, product, engine)
}

fn bench_planning(c: &mut Criterion) {
    let mut group = c.benchmark_group("movement_planning");
    let product = Product::create(
        TenantId::new(),
        stockledger_products::ProductId::generate(),
        new_product(1_000),
        "HARD-BEN-0001",
        Utc::now(),
    )
    .unwrap();

    for (label, movement_type, reason) in [
        ("in", MovementType::In, MovementReason::Purchase),
        ("out", MovementType::Out, MovementReason::Sale),
        ("adjustment", MovementType::Adjustment, MovementReason::InventoryAdjustment),
    ] {
        group.bench_function(label, |b| {
            b.iter(|| {
                let mutation = plan_movement(
                    black_box(&product),
                    request(&product, movement_type, reason, 10),
                    MovementId::new(),
                    Utc::now(),
                )
                .unwrap();
                black_box(mutation);
            });
        });
    }

    group.finish();
}

fn bench_apply_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("apply_movement_latency");
    group.sample_size(1000);

    let (tenant_id, product, engine) = setup(&rt, 0);
    group.bench_function("in_then_out", |b| {
        b.iter(|| {
            rt.block_on(async {
                engine
                    .apply_movement(tenant_id, request(&product, MovementType::In, MovementReason::Purchase, 5))
                    .await
                    .unwrap();
                engine
                    .apply_movement(tenant_id, request(&product, MovementType::Out, MovementReason::Sale, 5))
                    .await
                    .unwrap();
            });
        });
    });

    let (tenant_id, product, engine) = setup(&rt, 0);
    group.bench_function("apply_and_reverse", |b| {
        b.iter(|| {
            rt.block_on(async {
                let applied = engine
                    .apply_movement(tenant_id, request(&product, MovementType::In, MovementReason::Purchase, 3))
                    .await
                    .unwrap();
                engine
                    .reverse_movement(
                        tenant_id,
                        ReversalRequest {
                            movement_id: applied.movement.id,
                            performed_by: "bench".to_string(),
                            notes: None,
                        },
                    )
                    .await
                    .unwrap();
            });
        });
    });

    group.finish();
}

fn bench_contended_writers(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("contended_writers");

    for writers in [1_u64, 8, 32].iter() {
        group.throughput(Throughput::Elements(*writers));
        group.bench_with_input(BenchmarkId::from_parameter(writers), writers, |b, &writers| {
            b.iter(|| {
                let (tenant_id, product, engine) = setup(&rt, writers);
                rt.block_on(async {
                    let handles: Vec<_> = (0..writers)
                        .map(|_| {
                            let engine = engine.clone();
                            let req = request(&product, MovementType::Out, MovementReason::Sale, 1);
                            tokio::spawn(async move { engine.apply_movement(tenant_id, req).await })
                        })
                        .collect();
                    for handle in handles {
                        handle.await.unwrap().unwrap();
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_ledger_queries(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("ledger_queries");

    for history in [100_usize, 1_000].iter() {
        let (tenant_id, product, engine) = setup(&rt, 0);
        rt.block_on(async {
            for _ in 0..*history {
                engine
                    .apply_movement(tenant_id, request(&product, MovementType::In, MovementReason::Purchase, 1))
                    .await
                    .unwrap();
            }
        });

        group.bench_with_input(BenchmarkId::new("product_history", history), history, |b, _| {
            b.iter(|| {
                let rows = rt
                    .block_on(engine.store().movements_for_product(tenant_id, product.id_typed(), 50))
                    .unwrap();
                black_box(rows);
            });
        });

        group.bench_with_input(BenchmarkId::new("stats", history), history, |b, _| {
            b.iter(|| {
                let window = StatsWindow::resolve(None, None, None, Utc::now()).unwrap();
                let stats = rt.block_on(engine.movement_stats(tenant_id, window)).unwrap();
                black_box(stats);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_planning,
    bench_apply_latency,
    bench_contended_writers,
    bench_ledger_queries
);
criterion_main!(benches);
