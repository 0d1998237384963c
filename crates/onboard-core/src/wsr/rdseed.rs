//! `RDSEED`-backed WSR provider.
//!
//! The hardware instruction's own entropy-gathering behavior is out of
//! scope; this provider only specifies the bounded retry loop around it,
//! per-`u64`-word, used to drive a caller-supplied buffer.

use super::WsrProvider;
use crate::error::WsrError;

/// Maximum consecutive failed `rdseed` attempts per word before giving up,
/// matching the instruction's own documented worst-case retry guidance.
const MAX_ATTEMPTS_PER_WORD: u32 = 10;

pub struct RdSeedWsr;

impl RdSeedWsr {
    pub fn new() -> Self {
        RdSeedWsr
    }
}

impl Default for RdSeedWsr {
    fn default() -> Self {
        Self::new()
    }
}

impl WsrProvider for RdSeedWsr {
    fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError> {
        #[cfg(target_arch = "x86_64")]
        {
            let mut chunks = buf.chunks_exact_mut(8);
            for chunk in &mut chunks {
                let word = rdseed64_with_retry()?;
                chunk.copy_from_slice(&word.to_le_bytes());
            }
            let rem = chunks.into_remainder();
            if !rem.is_empty() {
                let word = rdseed64_with_retry()?;
                rem.copy_from_slice(&word.to_le_bytes()[..rem.len()]);
            }
            Ok(())
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            let _ = buf;
            Err(WsrError::RdSeedUnavailable)
        }
    }
}

#[cfg(target_arch = "x86_64")]
fn rdseed64_with_retry() -> Result<u64, WsrError> {
    use core::arch::x86_64::_rdseed64_step;

    let mut value: u64 = 0;
    for _ in 0..MAX_ATTEMPTS_PER_WORD {
        // SAFETY: `_rdseed64_step` requires only that the CPU support the
        // RDSEED feature; this module is compiled only for x86_64 and the
        // instruction traps to an illegal-instruction fault (not UB) on
        // unsupported CPUs, a tradeoff accepted for this placeholder.
        let ok = unsafe { _rdseed64_step(&mut value) };
        if ok == 1 {
            return Ok(value);
        }
    }
    Err(WsrError::RdSeedExhausted {
        attempts: MAX_ATTEMPTS_PER_WORD,
    })
}
