use std::hint::black_box;
use std::sync::Arc;

use async_trait::async_trait;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use futures::future::join_all;
use tokio::runtime::Runtime;

use spotter::{
    Completion, CompletionProvider, GenerationOptions, GenerationRequest, Post, ResponseCache,
    Result,
};

/// Provider that answers immediately, so the benchmarks measure cache
/// machinery rather than model latency.
struct InstantProvider;

#[async_trait]
impl CompletionProvider for InstantProvider {
    async fn complete(&self, _request: GenerationRequest) -> Result<Completion> {
        Ok(Completion::text("Strong work!"))
    }

    fn default_model(&self) -> &str {
        "instant"
    }

    fn name(&self) -> &str {
        "instant"
    }
}

fn warmed_cache(rt: &Runtime) -> (ResponseCache, Post) {
    let cache = ResponseCache::new(Arc::new(InstantProvider), GenerationOptions::new());
    let post = Post::new_with_id("bench-post", "Avery", "Morning 5k done");
    rt.block_on(cache.ensure_loaded(&post))
        .expect("warmup generation failed");
    (cache, post)
}

fn benchmark_cached_lookup(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (cache, post) = warmed_cache(&rt);

    let mut group = c.benchmark_group("cached_lookup");

    group.bench_function("get_hit", |b| {
        b.iter(|| black_box(cache.get(black_box(&post.id))));
    });

    group.bench_function("get_miss", |b| {
        b.iter(|| black_box(cache.get(black_box("nobody-home"))));
    });

    group.bench_function("ensure_loaded_hot", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(cache.ensure_loaded(&post).await);
        });
    });

    group.finish();
}

fn benchmark_cold_stampede(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("cold_stampede");

    for concurrency in [2usize, 8, 32] {
        group.bench_function(format!("callers_{concurrency}"), |b| {
            b.to_async(&rt).iter_batched(
                || {
                    let cache =
                        ResponseCache::new(Arc::new(InstantProvider), GenerationOptions::new());
                    let post = Post::new_with_id("stampede", "Avery", "Race day!");
                    (cache, post)
                },
                |(cache, post)| async move {
                    let results =
                        join_all((0..concurrency).map(|_| cache.ensure_loaded(&post))).await;
                    black_box(results)
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_cached_lookup, benchmark_cold_stampede);
criterion_main!(benches);
