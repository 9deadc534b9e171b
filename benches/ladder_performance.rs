//! Performance benchmarks for ladder calculations

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ready_room::ladder::{apply_delta, Division, LadderRank, Tier};

fn bench_apply_delta(c: &mut Criterion) {
    let mid_ladder = LadderRank::new(Tier::Ouro, Division::II, 50);
    let near_promotion = LadderRank::new(Tier::Ouro, Division::I, 90);
    let at_floor = LadderRank::new(Tier::Prata, Division::IV, 10);

    c.bench_function("apply_delta_plain_win", |b| {
        b.iter(|| apply_delta(black_box(mid_ladder), black_box(true)))
    });

    c.bench_function("apply_delta_tier_promotion", |b| {
        b.iter(|| apply_delta(black_box(near_promotion), black_box(true)))
    });

    c.bench_function("apply_delta_floor_clamp", |b| {
        b.iter(|| apply_delta(black_box(at_floor), black_box(false)))
    });
}

fn bench_full_season(c: &mut Criterion) {
    // A long alternating win/loss streak across the whole ladder.
    c.bench_function("apply_delta_500_match_season", |b| {
        b.iter(|| {
            let mut rank = LadderRank::new(Tier::Prata, Division::IV, 0);
            for i in 0..500u32 {
                rank = apply_delta(rank, i % 3 != 0);
            }
            black_box(rank)
        })
    });
}

criterion_group!(benches, bench_apply_delta, bench_full_season);
criterion_main!(benches);
