//! Fixed-capacity byte ring backing the cache. Shared between the
//! `get_randomness` caller and any refill worker threads via
//! `Arc<Mutex<Ring>>`, following the same interior-mutability shape the
//! teacher uses for its output buffer.

use zeroize::Zeroize;

/// A FIFO byte ring of fixed maximum capacity (`size`). Bytes are consumed
/// from the front (oldest first, matching `get_randomness`'s "never reuse
/// output bytes" invariant) and appended at the back by refill workers.
pub struct Ring {
    buf: Vec<u8>,
    capacity: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Ring {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn free_space(&self) -> usize {
        self.capacity - self.buf.len()
    }

    /// Appends `block` to the back of the ring. Returns the number of
    /// bytes actually appended (truncated if `block` would overflow
    /// capacity — callers size blocks to avoid this in steady state).
    pub fn push_block(&mut self, block: &[u8]) -> usize {
        let room = self.free_space();
        let take = room.min(block.len());
        self.buf.extend_from_slice(&block[..take]);
        take
    }

    /// Removes and returns exactly `n` bytes from the front of the ring,
    /// or `None` if fewer than `n` bytes are currently available (the
    /// ring is left unchanged in that case).
    pub fn take(&mut self, n: usize) -> Option<Vec<u8>> {
        if self.buf.len() < n {
            return None;
        }
        let out = self.buf.drain(..n).collect();
        Some(out)
    }

    pub fn zeroize_all(&mut self) {
        self.buf.zeroize();
        self.buf.clear();
    }
}
