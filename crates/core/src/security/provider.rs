//! Crypto provider capabilities.
//!
//! Which algorithms may be used is decided once, when a provider is built,
//! and then passed by reference to every handler constructor. Nothing here
//! is mutable after construction.

use once_cell::sync::Lazy;
use tracing::debug;

use super::algorithm::{AlgorithmSet, EncryptionAlgorithm};
use crate::error::{PdfError, Result};

static SYSTEM: Lazy<CryptoProvider> = Lazy::new(CryptoProvider::detect);

/// The set of algorithms this process may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoProvider {
    enabled: AlgorithmSet,
}

impl CryptoProvider {
    /// Detect the compiled-in ciphers.
    ///
    /// AES handlers are always available; RC4 handlers only when the
    /// `legacy-rc4` feature is enabled.
    pub fn detect() -> Self {
        let mut enabled = AlgorithmSet::AES;
        if cfg!(feature = "legacy-rc4") {
            enabled |= AlgorithmSet::RC4;
        }
        debug!(?enabled, "crypto provider capabilities");
        Self { enabled }
    }

    /// Process-wide provider, detected on first use.
    pub fn system() -> &'static Self {
        &SYSTEM
    }

    /// A provider restricted to `algorithms`, for policy or testing.
    ///
    /// Algorithms the build cannot provide stay disabled.
    pub fn with_algorithms(algorithms: AlgorithmSet) -> Self {
        Self {
            enabled: algorithms & Self::detect().enabled,
        }
    }

    pub const fn enabled(&self) -> AlgorithmSet {
        self.enabled
    }

    pub const fn supports(&self, algorithm: EncryptionAlgorithm) -> bool {
        self.enabled.supports(algorithm)
    }

    /// Fail with [`PdfError::UnsupportedFilter`] unless `algorithm` is enabled.
    pub fn require(&self, algorithm: EncryptionAlgorithm) -> Result<()> {
        if self.supports(algorithm) {
            Ok(())
        } else {
            Err(PdfError::UnsupportedFilter(format!(
                "{algorithm} is disabled by the crypto provider"
            )))
        }
    }
}

impl Default for CryptoProvider {
    fn default() -> Self {
        *Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_always_available() {
        let provider = CryptoProvider::detect();
        assert!(provider.supports(EncryptionAlgorithm::AesV2));
        assert!(provider.supports(EncryptionAlgorithm::AesV3R6));
    }

    #[cfg(feature = "legacy-rc4")]
    #[test]
    fn rc4_available_with_feature() {
        assert!(CryptoProvider::system().supports(EncryptionAlgorithm::Rc4V1));
    }

    #[test]
    fn restricted_provider_rejects() {
        let provider = CryptoProvider::with_algorithms(AlgorithmSet::AESV3R6);
        assert!(provider.require(EncryptionAlgorithm::AesV3R6).is_ok());
        assert!(matches!(
            provider.require(EncryptionAlgorithm::AesV2),
            Err(PdfError::UnsupportedFilter(_))
        ));
    }
}
