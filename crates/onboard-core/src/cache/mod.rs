//! Cache / refill engine.
//!
//! Generalizes the teacher's `InterpreterPool` (`pool.rs`): there, N
//! dedicated threads each hold a ready VM and register themselves into a
//! `Mutex<VecDeque<_>>` + `Condvar` queue for the caller to dispatch work
//! to. Here, N dedicated threads watch a single shared byte ring and push
//! freshly extracted blocks into it whenever its level has dropped to or
//! below the low watermark, until it reaches the high watermark — the
//! `Idle ⇄ Refilling` state machine is the direct analogue of the
//! teacher's available/busy slot bookkeeping.

pub mod ring;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use crate::error::OnboardError;
use crate::extractor::Extractor;
use ring::Ring;

/// Which refill policy fronts the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// No cache: every `get_randomness` call drives the extractor directly.
    None,
    /// A single caller-thread refill, run inline inside `get_randomness`.
    SyncCache,
    /// One background worker thread refills the ring.
    AsyncCache,
    /// `thread_count` background worker threads refill the ring.
    MultiThread { thread_count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatermarkState {
    Idle,
    Refilling,
}

struct Shared {
    ring: Mutex<Ring>,
    state: Mutex<WatermarkState>,
    cv: Condvar,
    stopping: AtomicBool,
}

/// The cache/refill engine fronting an [`Extractor`].
pub enum Cache {
    None {
        extractor: Arc<Extractor>,
    },
    Sync {
        extractor: Arc<Extractor>,
        shared: Arc<Shared>,
    },
    Workers {
        shared: Arc<Shared>,
        workers: Vec<JoinHandle<()>>,
    },
}

impl Cache {
    /// Builds a cache for the given policy. `size`/`prefill`/`refill_at`
    /// are validated by the caller (`crate::context`) before this is
    /// invoked — the watermark invariant `refill_at < prefill <= size` is
    /// assumed to already hold.
    pub fn new(
        policy: CachePolicy,
        size: usize,
        prefill: usize,
        refill_at: usize,
        extractor: Arc<Extractor>,
    ) -> Self {
        match policy {
            CachePolicy::None => Cache::None { extractor },
            CachePolicy::SyncCache => Cache::Sync {
                extractor,
                shared: Arc::new(Shared {
                    ring: Mutex::new(Ring::new(size)),
                    state: Mutex::new(WatermarkState::Idle),
                    cv: Condvar::new(),
                    stopping: AtomicBool::new(false),
                }),
            },
            CachePolicy::AsyncCache => Self::spawn_workers(1, size, prefill, refill_at, extractor),
            CachePolicy::MultiThread { thread_count } => {
                Self::spawn_workers(thread_count.max(1), size, prefill, refill_at, extractor)
            }
        }
    }

    fn spawn_workers(
        thread_count: usize,
        size: usize,
        prefill: usize,
        refill_at: usize,
        extractor: Arc<Extractor>,
    ) -> Self {
        let shared = Arc::new(Shared {
            ring: Mutex::new(Ring::new(size)),
            state: Mutex::new(WatermarkState::Refilling),
            cv: Condvar::new(),
            stopping: AtomicBool::new(false),
        });

        let workers = (0..thread_count)
            .map(|worker_id| {
                let extractor = Arc::clone(&extractor);
                let shared = Arc::clone(&shared);
                std::thread::Builder::new()
                    .name(format!("onboard-cache-worker-{worker_id}"))
                    .spawn(move || worker::run(worker_id, extractor, shared, prefill, refill_at))
                    .expect("failed to spawn cache refill worker thread")
            })
            .collect();

        Cache::Workers { shared, workers }
    }

    /// Returns exactly `n` bytes, or fails with no output consumed.
    pub fn get_randomness(&self, n: usize) -> Result<Vec<u8>, OnboardError> {
        if n == 0 {
            return Err(OnboardError::ZeroLengthRequest);
        }

        match self {
            Cache::None { extractor } => extract_exact(extractor, n),
            Cache::Sync { extractor, shared } => {
                loop {
                    let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                    if ring.len() >= n {
                        return Ok(ring.take(n).expect("length checked above"));
                    }
                    drop(ring);
                    let block = extractor.extract_block()?;
                    let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                    ring.push_block(&block);
                }
            }
            Cache::Workers { shared, .. } => {
                // A request larger than the ring could ever hold can never
                // be satisfied by waiting; fail immediately rather than
                // blocking forever on the condvar.
                let capacity = shared.ring.lock().expect("ring mutex poisoned").capacity();
                if n > capacity {
                    return Err(OnboardError::CacheUnderrun {
                        requested: n,
                        available: capacity,
                    });
                }

                loop {
                    {
                        let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                        if ring.len() >= n {
                            return Ok(ring.take(n).expect("length checked above"));
                        }
                    }
                    if shared.stopping.load(Ordering::Acquire) {
                        let available = shared.ring.lock().expect("ring mutex poisoned").len();
                        return Err(OnboardError::CacheUnderrun {
                            requested: n,
                            available,
                        });
                    }
                    let state = shared.state.lock().expect("state mutex poisoned");
                    let _ = shared.cv.wait_timeout(state, worker::WAIT_POLL_INTERVAL);
                }
            }
        }
    }

    /// Stops any refill workers, joins them, and zeroizes the ring.
    /// Idempotent: safe to call multiple times.
    pub fn shutdown(&mut self) {
        match self {
            Cache::None { .. } => {}
            Cache::Sync { shared, .. } => {
                let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                ring.zeroize_all();
            }
            Cache::Workers { shared, workers } => {
                shared.stopping.store(true, Ordering::Release);
                shared.cv.notify_all();
                for handle in workers.drain(..) {
                    let _ = handle.join();
                }
                let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                ring.zeroize_all();
            }
        }
    }
}

/// Used by `CachePolicy::None`: drives the extractor directly, accumulating
/// blocks until `n` bytes are available, then truncates to exactly `n`.
fn extract_exact(extractor: &Extractor, n: usize) -> Result<Vec<u8>, OnboardError> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let block = extractor.extract_block()?;
        out.extend_from_slice(&block);
    }
    out.truncate(n);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WsrError;
    use crate::extractor::ExtractorParams;
    use crate::seed::{Seed, SEED_CONTENT_LEN, SEED_SIGNATURE_LEN};
    use crate::wsr::WsrProvider;
    use std::sync::atomic::AtomicU8;

    struct CountingWsr(AtomicU8);
    impl WsrProvider for CountingWsr {
        fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError> {
            for b in buf.iter_mut() {
                *b = self.0.fetch_add(1, Ordering::Relaxed) ^ 0b0101_0101;
            }
            Ok(())
        }
    }

    fn test_seed() -> Seed {
        let mut content = vec![0u8; SEED_CONTENT_LEN];
        content[..10].copy_from_slice(b"evaluation");
        Seed::from_parts(content, vec![0u8; SEED_SIGNATURE_LEN]).unwrap()
    }

    fn test_extractor() -> Arc<Extractor> {
        Arc::new(Extractor::new(
            test_seed(),
            Arc::new(CountingWsr(AtomicU8::new(0))),
            ExtractorParams::default(),
            true,
        ))
    }

    #[test]
    fn none_policy_returns_exact_size() {
        let cache = Cache::new(CachePolicy::None, 0, 0, 0, test_extractor());
        let out = cache.get_randomness(17).unwrap();
        assert_eq!(out.len(), 17);
    }

    #[test]
    fn sync_policy_returns_exact_size_and_refills_inline() {
        let cache = Cache::new(CachePolicy::SyncCache, 64, 32, 8, test_extractor());
        let out = cache.get_randomness(50).unwrap();
        assert_eq!(out.len(), 50);
    }

    #[test]
    fn zero_length_request_is_rejected() {
        let cache = Cache::new(CachePolicy::None, 0, 0, 0, test_extractor());
        assert!(matches!(
            cache.get_randomness(0),
            Err(OnboardError::ZeroLengthRequest)
        ));
    }

    #[test]
    fn async_worker_fills_ring_to_prefill_eventually() {
        let mut cache = Cache::new(CachePolicy::AsyncCache, 256, 128, 32, test_extractor());
        // No warm-up sleep: get_randomness blocks on the refill condvar
        // until the worker has caught up, rather than racing it.
        let out = cache.get_randomness(64);
        assert!(out.is_ok(), "expected worker to have filled the ring by now");
        cache.shutdown();
    }

    #[test]
    fn multi_thread_workers_shut_down_cleanly() {
        let mut cache = Cache::new(
            CachePolicy::MultiThread { thread_count: 3 },
            256,
            128,
            32,
            test_extractor(),
        );
        std::thread::sleep(std::time::Duration::from_millis(100));
        cache.shutdown();
        // shutdown is idempotent
        cache.shutdown();
    }

    #[test]
    fn underrun_reported_when_ring_not_yet_filled() {
        let cache = Cache::new(CachePolicy::AsyncCache, 256, 128, 32, test_extractor());
        // Immediately requesting more than could possibly be ready yet.
        match cache.get_randomness(1_000_000) {
            Err(OnboardError::CacheUnderrun { requested, .. }) => assert_eq!(requested, 1_000_000),
            other => panic!("expected CacheUnderrun, got {other:?}"),
        }
    }
}
