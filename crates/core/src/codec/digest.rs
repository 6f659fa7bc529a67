//! Message digests used by the key derivation algorithms.

use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

/// MD5 of the concatenation of `parts`.
pub fn md5_concat(parts: &[&[u8]]) -> [u8; 16] {
    let mut ctx = md5::Context::new();
    for part in parts {
        ctx.consume(part);
    }
    ctx.finalize().0
}

/// Re-hash `digest` 50 times, feeding back only its first `key_len` bytes
/// (legacy revisions 3 and 4).
pub fn md5_rehash(digest: &mut [u8; 16], key_len: usize) {
    let n = key_len.min(16);
    for _ in 0..50 {
        *digest = md5::compute(&digest[..n]).0;
    }
}

/// The SHA-2 variants the revision 6 hash rotates through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Sha256,
    Sha384,
    Sha512,
}

impl HashKind {
    /// Variant selected by the sum of the first 16 bytes of an AES round
    /// output, modulo 3.
    pub fn select(block: &[u8]) -> Self {
        let sum: u32 = block.iter().take(16).map(|&b| u32::from(b)).sum();
        match sum % 3 {
            0 => Self::Sha256,
            1 => Self::Sha384,
            _ => Self::Sha512,
        }
    }

    pub fn digest(self, data: &[u8]) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        })
    }
}

/// SHA-256 of the concatenation of `parts`.
pub fn sha256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_concat_matches_single_buffer() {
        assert_eq!(md5_concat(&[b"ab", b"c"]), md5::compute(b"abc").0);
    }

    #[test]
    fn select_uses_sum_mod_three() {
        assert_eq!(HashKind::select(&[0u8; 16]), HashKind::Sha256);
        let mut block = [0u8; 32];
        block[0] = 1;
        assert_eq!(HashKind::select(&block), HashKind::Sha384);
        block[15] = 1;
        assert_eq!(HashKind::select(&block), HashKind::Sha512);
        // Bytes past the first 16 do not count.
        block[20] = 1;
        assert_eq!(HashKind::select(&block), HashKind::Sha512);
    }
}
