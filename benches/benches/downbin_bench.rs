//! # Downbin Run Benchmarks
//!
//! Measures complete orchestrator runs per chip family, from topology to
//! fuse export.
//!
//! Run: `cargo bench --bench downbin_bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use downbin_orchestration::prelude::*;

fn gx100_sku() -> SkuConfig {
    SkuConfig::new("gx100-bench")
        .unit(UnitKind::Tpc, UnitSkuConfig { max_enable_count: Some(64), skyline: vec![8; 8], ..Default::default() })
        .unit(UnitKind::Fbp, UnitSkuConfig { max_enable_count: Some(10), ..Default::default() })
        .unit(UnitKind::Link, UnitSkuConfig { max_enable_count: Some(10), ..Default::default() })
}

fn gx200_sku() -> SkuConfig {
    SkuConfig::new("gx200-bench")
        .unit(UnitKind::Tpc, UnitSkuConfig { max_enable_count: Some(30), ..Default::default() })
        .unit(UnitKind::L2Slice, UnitSkuConfig { max_enable_count: Some(48), ..Default::default() })
}

fn bench_runs(c: &mut Criterion) {
    let mut group = c.benchmark_group("downbin_run");

    let gx100_input = MemoryFuseStore::new()
        .with("opt_tpc_gpc2_defective", 0b1)
        .with("opt_ltc_defective", 1 << 7);
    group.bench_function("gx100", |bench| {
        bench.iter(|| {
            let mut output = MemoryFuseStore::new();
            let mut orch = Orchestrator::for_family("gx100", gx100_sku()).unwrap();
            black_box(orch.run(&gx100_input, &mut output))
        })
    });

    let gx200_input = MemoryFuseStore::new().with("opt_l2slice_fbp1_defective", 0b0100);
    group.bench_function("gx200", |bench| {
        bench.iter(|| {
            let mut output = MemoryFuseStore::new();
            let mut orch = Orchestrator::for_family("gx200", gx200_sku()).unwrap();
            black_box(orch.run(&gx200_input, &mut output))
        })
    });

    group.finish();
}

fn bench_fuse_io(c: &mut Criterion) {
    let mut group = c.benchmark_group("fuse_io");

    let mut store = MemoryFuseStore::new();
    let mut orch = Orchestrator::for_family("gx100", gx100_sku()).unwrap();
    orch.run(&MemoryFuseStore::new(), &mut store).unwrap();
    let json = store.to_json().unwrap();

    group.bench_function("to_json", |bench| bench.iter(|| black_box(store.to_json())));
    group.bench_function("from_json", |bench| bench.iter(|| black_box(MemoryFuseStore::from_json(&json))));

    group.finish();
}

criterion_group!(benches, bench_runs, bench_fuse_io);
criterion_main!(benches);
