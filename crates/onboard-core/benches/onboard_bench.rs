// crates/onboard-core/benches/onboard_bench.rs
//
// Two Criterion benchmark groups:
//   extractor_throughput — raw Extract() driver cost per block
//   cache_get_randomness — end-to-end get_randomness() cost under each
//                          cache policy, with a pre-warmed ring

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use onboard_core::cache::{Cache, CachePolicy};
use onboard_core::extractor::{Extractor, ExtractorParams};
use onboard_core::seed::{Seed, SEED_CONTENT_LEN, SEED_SIGNATURE_LEN};
use onboard_core::error::WsrError;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

struct CountingWsr(AtomicU8);
impl onboard_core::wsr::WsrProvider for CountingWsr {
    fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError> {
        for b in buf.iter_mut() {
            *b = self.0.fetch_add(1, Ordering::Relaxed) ^ 0b0101_0101;
        }
        Ok(())
    }
}

fn eval_seed() -> Seed {
    let mut content = vec![0u8; SEED_CONTENT_LEN];
    content[..10].copy_from_slice(b"evaluation");
    Seed::from_parts(content, vec![0u8; SEED_SIGNATURE_LEN]).unwrap()
}

fn extractor_throughput(c: &mut Criterion) {
    let extractor = Extractor::new(
        eval_seed(),
        Arc::new(CountingWsr(AtomicU8::new(0))),
        ExtractorParams::default(),
        true,
    );

    c.bench_function("extract_block_32b", |b| {
        b.iter(|| black_box(extractor.extract_block().unwrap()))
    });
}

fn cache_get_randomness(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get_randomness");

    for (name, policy) in [
        ("none", CachePolicy::None),
        ("sync", CachePolicy::SyncCache),
        ("async", CachePolicy::AsyncCache),
        ("multi_thread_4", CachePolicy::MultiThread { thread_count: 4 }),
    ] {
        let extractor = Arc::new(Extractor::new(
            eval_seed(),
            Arc::new(CountingWsr(AtomicU8::new(0))),
            ExtractorParams::default(),
            true,
        ));
        let mut cache = Cache::new(policy, 65536, 32768, 8192, extractor);

        group.bench_function(name, |b| {
            b.iter(|| black_box(cache.get_randomness(64).unwrap()))
        });

        cache.shutdown();
    }

    group.finish();
}

criterion_group!(benches, extractor_throughput, cache_get_randomness);
criterion_main!(benches);
