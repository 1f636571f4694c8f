//! # Mask & Cascade Benchmarks
//!
//! Measures mask primitives, skyline feasibility and the greedy disable path
//! with its rule cascade.
//!
//! Run: `cargo bench --bench mask_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use downbin_core::prelude::*;

fn bench_mask_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("mask_ops");

    let a = Mask::from_bits(32, 0xF0F0_1234).unwrap();
    let b = Mask::from_bits(32, 0x0FF0_4321).unwrap();

    group.bench_function("and_or", |bench| {
        bench.iter(|| black_box(a.and(&b).and_then(|m| m.or(&a))))
    });

    group.bench_function("num_set_bits", |bench| bench.iter(|| black_box(a.num_set_bits())));

    group.bench_function("iter_set", |bench| bench.iter(|| black_box(a.iter_set().sum::<u32>())));

    group.bench_function("extract", |bench| bench.iter(|| black_box(a.extract(8, 8))));

    group.finish();
}

fn bench_skyline(c: &mut Criterion) {
    let mut group = c.benchmark_group("skyline_feasible");

    for groups in [8usize, 16, 32] {
        let required: Vec<u32> = (0..groups as u32).map(|g| g % 4 + 4).collect();
        let current: Vec<u32> = (0..groups as u32).map(|g| (g * 7) % 5 + 5).collect();
        group.bench_with_input(BenchmarkId::from_parameter(groups), &groups, |bench, _| {
            bench.iter(|| black_box(skyline_feasible(&required, &current)))
        });
    }

    group.finish();
}

fn gpc_chip(groups: u32) -> Chip {
    let mut chip = Chip::new();
    chip.add_set(
        &SetSpec::new(UnitKind::Gpc, groups)
            .primary(UnitKind::Tpc)
            .element(ElementSpec::new(UnitKind::Tpc, 9))
            .element(ElementSpec::new(UnitKind::Cpc, 3).derivative()),
    )
    .unwrap();
    for group in 0..groups as usize {
        chip.add_rule(SubElementDependency::new(UnitKind::Gpc, group, UnitKind::Cpc, UnitKind::Tpc))
            .unwrap();
    }
    chip.add_rule(MinGroupElementCount::new(UnitKind::Gpc, UnitKind::Tpc, 2)).unwrap();
    chip
}

fn bench_greedy(c: &mut Criterion) {
    let mut group = c.benchmark_group("greedy_disable");

    for groups in [4u32, 8, 16] {
        group.bench_with_input(BenchmarkId::new("one_element", groups), &groups, |bench, &groups| {
            bench.iter_with_setup(
                || gpc_chip(groups),
                |mut chip| black_box(chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc)),
            )
        });

        group.bench_with_input(BenchmarkId::new("group_cascade", groups), &groups, |bench, &groups| {
            bench.iter_with_setup(
                || gpc_chip(groups),
                |mut chip| black_box(chip.disable_group(UnitKind::Gpc, 0)),
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_mask_ops, bench_skyline, bench_greedy);
criterion_main!(benches);
