//! Seed material: the immutable `(signature, content)` pair verified once
//! at build time and consumed by the extractor for the lifetime of a
//! context.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Expected seed content size, matching the sample programs this engine
/// was validated against.
pub const SEED_CONTENT_LEN: usize = 8164;
/// Expected seed signature size.
pub const SEED_SIGNATURE_LEN: usize = 132;

/// Fixed key used to stand in for the real (out-of-scope) signature
/// verification primitive. Not a secret: the real primitive's key material
/// and algorithm are outside this engine's scope (see `spec.md` §1).
const VERIFICATION_KEY: &[u8] = b"onboard-core-placeholder-signature-verification-key";

/// The literal sentinel value sample programs use to request the
/// well-known insecure evaluation-mode seed.
const EVALUATION_SENTINEL: &[u8] = b"evaluation";

/// An immutable, verified seed. Zeroized on drop.
pub struct Seed {
    content: Vec<u8>,
    signature: Vec<u8>,
    evaluation_mode: bool,
}

impl Seed {
    /// Builds and verifies a seed from raw builder-supplied bytes.
    ///
    /// If `content`/`signature` exactly match the evaluation-mode sentinel
    /// (padded to the declared sizes), a fixed, well-known insecure seed is
    /// substituted instead of running signature verification — the caller
    /// is expected to have logged a warning before this returns `Ok`.
    pub fn from_parts(content: Vec<u8>, signature: Vec<u8>) -> Result<Self, ConfigError> {
        if content.len() != SEED_CONTENT_LEN {
            return Err(ConfigError::SeedContentSizeMismatch {
                expected: SEED_CONTENT_LEN,
                actual: content.len(),
            });
        }
        if signature.len() != SEED_SIGNATURE_LEN {
            return Err(ConfigError::SeedSignatureSizeMismatch {
                expected: SEED_SIGNATURE_LEN,
                actual: signature.len(),
            });
        }

        if is_evaluation_sentinel(&content) {
            return Ok(Seed {
                content,
                signature,
                evaluation_mode: true,
            });
        }

        verify_signature(&content, &signature)?;
        Ok(Seed {
            content,
            signature,
            evaluation_mode: false,
        })
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// True if this seed was constructed from the evaluation-mode
    /// sentinel rather than a signed production seed.
    pub fn is_evaluation_mode(&self) -> bool {
        self.evaluation_mode
    }
}

impl Drop for Seed {
    fn drop(&mut self) {
        self.content.zeroize();
        self.signature.zeroize();
    }
}

/// Returns true if `content` is the sentinel value used to request
/// evaluation mode: the literal bytes `b"evaluation"` followed by padding,
/// matching the fixed-size buffers in the sample programs.
fn is_evaluation_sentinel(content: &[u8]) -> bool {
    content.starts_with(EVALUATION_SENTINEL)
        && content[EVALUATION_SENTINEL.len()..]
            .iter()
            .all(|&b| b == 0)
}

fn verify_signature(content: &[u8], signature: &[u8]) -> Result<(), ConfigError> {
    let mut mac =
        HmacSha256::new_from_slice(VERIFICATION_KEY).expect("HMAC accepts keys of any length");
    mac.update(content);
    let expected = mac.finalize().into_bytes();

    // signature carries the 32-byte MAC left-padded to SEED_SIGNATURE_LEN.
    let tag_start = signature.len() - expected.len();
    if &signature[tag_start..] == expected.as_slice() {
        Ok(())
    } else {
        Err(ConfigError::SeedSignatureVerificationFailed)
    }
}
