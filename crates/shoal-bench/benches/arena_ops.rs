//! Criterion micro-benchmarks for the block allocator.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use shoal_arena::{Arena, ArenaConfig};
use shoal_bench::{fragmented_arena, PROFILE_ARENA_SIZE};

/// Benchmark: malloc + free of one block on a fresh arena (bump path).
fn bench_malloc_free_bump(c: &mut Criterion) {
    let arena = Arena::new(&ArenaConfig::new(PROFILE_ARENA_SIZE)).unwrap();
    c.bench_function("arena_malloc_free_bump", |b| {
        b.iter(|| {
            let addr = arena.malloc(black_box(64));
            black_box(arena.free(addr));
        });
    });
}

/// Benchmark: first-fit malloc against a 1K-entry free list.
fn bench_malloc_fragmented(c: &mut Criterion) {
    let (arena, _live) = fragmented_arena(2_048, 48).unwrap();
    c.bench_function("arena_malloc_fragmented_1k", |b| {
        b.iter(|| {
            // Larger than every hole: walks the whole free list, then bumps.
            let addr = arena.malloc(black_box(96));
            black_box(arena.free(addr));
        });
    });
}

/// Benchmark: free scanning a used list of 1K blocks.
fn bench_free_deep_used_list(c: &mut Criterion) {
    c.bench_function("arena_free_deep_used_list", |b| {
        b.iter_batched(
            || {
                let arena = Arena::new(&ArenaConfig::shared(64 * 1_024)).unwrap();
                let first = arena.malloc(16);
                for _ in 0..1_000 {
                    arena.malloc(16);
                }
                (arena, first)
            },
            // The oldest block sits at the end of the LIFO used list.
            |(arena, first)| black_box(arena.free(first)),
            BatchSize::SmallInput,
        );
    });
}

/// Benchmark: realloc growing the top-most block in place, then shrinking.
fn bench_realloc_top(c: &mut Criterion) {
    // No splitting, so the shrink retracts top and the block stays top-most.
    let arena = Arena::new(&ArenaConfig::shared(PROFILE_ARENA_SIZE)).unwrap();
    let addr = arena.malloc(64);
    c.bench_function("arena_realloc_top", |b| {
        b.iter(|| {
            black_box(arena.realloc(addr, 4_096));
            black_box(arena.realloc(addr, 64));
        });
    });
}

criterion_group!(
    benches,
    bench_malloc_free_bump,
    bench_malloc_fragmented,
    bench_free_deep_used_list,
    bench_realloc_top
);
criterion_main!(benches);
