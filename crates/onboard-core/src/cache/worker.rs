//! Refill worker thread loop, generalized from the teacher's
//! `InterpreterPool` slot-thread loop: instead of waiting for dispatched
//! work items, each worker watches the shared ring's watermark state and
//! extracts blocks from the extractor whenever the ring has dropped to or
//! below `refill_at`, until it reaches `prefill` again.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::{Shared, WatermarkState};
use crate::extractor::Extractor;

/// Upper bound on how long a worker sleeps on the condvar before
/// re-checking the stop flag, so shutdown is never blocked indefinitely.
pub(super) const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub(super) fn run(worker_id: usize, extractor: Arc<Extractor>, shared: Arc<Shared>, prefill: usize, refill_at: usize) {
    tracing::trace!(worker_id, "cache refill worker starting");
    loop {
        if shared.stopping.load(Ordering::Acquire) {
            break;
        }

        let ring_len = shared.ring.lock().expect("ring mutex poisoned").len();
        {
            let mut state = shared.state.lock().expect("state mutex poisoned");
            if ring_len <= refill_at {
                *state = WatermarkState::Refilling;
            } else if ring_len >= prefill {
                *state = WatermarkState::Idle;
            }

            if *state == WatermarkState::Idle {
                let _ = shared
                    .cv
                    .wait_timeout(state, WAIT_POLL_INTERVAL)
                    .expect("state mutex poisoned");
                continue;
            }
        }

        match extractor.extract_block() {
            Ok(block) => {
                let mut ring = shared.ring.lock().expect("ring mutex poisoned");
                ring.push_block(&block);
                drop(ring);
                shared.cv.notify_all();
            }
            Err(err) => {
                tracing::error!(worker_id, error = %err, "cache refill worker stopping: extractor failed");
                shared.stopping.store(true, Ordering::Release);
                shared.cv.notify_all();
                break;
            }
        }
    }
    tracing::trace!(worker_id, "cache refill worker exiting");
}
