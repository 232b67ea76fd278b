use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ratelimiter::config::{RateLimiterConfig, ScopeLimitConfig};
use ratelimiter::{new_limiter, LimiterKind, MemoryStore, TieredRateLimiter};
use std::sync::Arc;
use std::time::Duration;

fn benchmark_single_scope_admit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");
    let _guard = rt.enter();

    let mut group = c.benchmark_group("single_scope_admit");

    for kind in [
        LimiterKind::FixedWindow,
        LimiterKind::SlidingWindow,
        LimiterKind::TokenBucket,
    ] {
        let limiter = new_limiter(kind, 1_000, Duration::from_millis(10))
            .expect("Failed to create limiter");

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", kind)),
            &kind,
            |b, _| b.iter(|| black_box(limiter.admit())),
        );
    }

    group.finish();
}

fn benchmark_tiered_allow(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create runtime");

    let mut group = c.benchmark_group("tiered_allow");

    for num_endpoints in [1, 10, 100].iter() {
        let mut config = RateLimiterConfig {
            global: Some(ScopeLimitConfig::new(1_000_000, 60)),
            per_user: Some(ScopeLimitConfig::new(1_000_000, 60)),
            ..Default::default()
        };
        for i in 0..*num_endpoints {
            config
                .endpoints
                .insert(format!("/api/service{}", i), ScopeLimitConfig::new(1_000_000, 60));
        }

        let limiter = TieredRateLimiter::new(&config, Arc::new(MemoryStore::new()))
            .expect("Failed to create limiter");

        group.bench_with_input(
            BenchmarkId::from_parameter(num_endpoints),
            num_endpoints,
            |b, &_num| {
                b.to_async(&rt)
                    .iter(|| async { black_box(limiter.allow("/api/service0", "user1").await) })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_scope_admit, benchmark_tiered_allow);
criterion_main!(benches);
